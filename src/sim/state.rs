//! Game state and core simulation types
//!
//! Everything that belongs to one round lives in `GameState`. Starting a new
//! round means building a new `GameState`; nothing carries over.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::collision::{Rect, rect_floor_collision, rect_pipes_collision};
use crate::consts::*;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Title screen, player bobbing, waiting for the first flap
    Splash,
    /// Active gameplay
    Play,
    /// Player crashed and falls to the floor
    GameOver,
}

/// Player movement model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerMode {
    /// Bobbing in place, no gravity
    Idle,
    /// Gravity and flaps apply
    Active,
    /// Falling after a collision, flaps ignored
    Crashed,
}

/// Things that happened during a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    /// Splash ended, gameplay started
    Started,
    /// Player flapped
    Flapped,
    /// Player passed an obstacle (new score)
    Scored(u32),
    /// Player hit a pipe or the floor (final score)
    Crashed(u32),
    /// Crashed player came to rest on the floor
    Landed,
    /// Input received while resting on the floor after a crash
    RestartRequested,
}

/// Wing animation frames, played in a loop
const WING_CYCLE: [u8; 4] = [0, 1, 2, 1];

/// The player's bird
#[derive(Debug, Clone)]
pub struct Player {
    /// Top-left corner
    pub pos: Vec2,
    pub size: Vec2,
    /// Vertical velocity (pixels/s, negative = up)
    pub vel_y: f32,
    pub mode: PlayerMode,
    /// Visual tilt in degrees (positive = nose up)
    pub rotation: f32,
    /// Height the idle bob oscillates around
    spawn_y: f32,
    /// Seconds spent bobbing
    bob_time: f32,
    anim_ticks: u64,
    wing_index: usize,
}

impl Default for Player {
    fn default() -> Self {
        Self::new()
    }
}

impl Player {
    pub fn new() -> Self {
        let spawn_y = ((WINDOW_HEIGHT - PLAYER_HEIGHT) / 2.0).floor();
        Self {
            pos: Vec2::new(PLAYER_X, spawn_y),
            size: Vec2::new(PLAYER_WIDTH, PLAYER_HEIGHT),
            vel_y: 0.0,
            mode: PlayerMode::Idle,
            rotation: 0.0,
            spawn_y,
            bob_time: 0.0,
            anim_ticks: 0,
            wing_index: 0,
        }
    }

    /// Switch movement model
    pub fn set_mode(&mut self, mode: PlayerMode) {
        self.mode = mode;
        match mode {
            PlayerMode::Idle => {
                self.vel_y = 0.0;
                self.rotation = 0.0;
                self.bob_time = 0.0;
            }
            PlayerMode::Active => {
                // Entering play is not a flap: start from rest
                self.vel_y = 0.0;
            }
            PlayerMode::Crashed => {
                self.vel_y = self.vel_y.max(0.0);
            }
        }
    }

    /// Collision bounds
    #[inline]
    pub fn bounds(&self) -> Rect {
        Rect {
            min: self.pos,
            size: self.size,
        }
    }

    #[inline]
    pub fn center_x(&self) -> f32 {
        self.pos.x + self.size.x / 2.0
    }

    /// Current wing sprite index (0..=2)
    pub fn wing_frame(&self) -> u8 {
        WING_CYCLE[self.wing_index]
    }

    /// Tilt to draw with; nose-up tilt is capped
    pub fn visible_rotation(&self) -> f32 {
        self.rotation.min(MAX_VISIBLE_ROTATION)
    }

    /// Apply the upward impulse. Replaces the current velocity.
    pub fn flap(&mut self) {
        self.vel_y = FLAP_VELOCITY;
        self.rotation = FLAP_ROTATION;
    }

    /// Advance one timestep
    pub fn tick(&mut self, dt: f32, floor_y: f32) {
        self.anim_ticks += 1;
        if self.mode != PlayerMode::Crashed && self.anim_ticks.is_multiple_of(WING_FRAME_TICKS) {
            self.wing_index = (self.wing_index + 1) % WING_CYCLE.len();
        }

        let max_y = floor_y - self.size.y;
        match self.mode {
            PlayerMode::Idle => {
                self.bob_time += dt;
                self.pos.y = self.spawn_y + (self.bob_time * BOB_SPEED).sin() * BOB_AMPLITUDE;
            }
            PlayerMode::Active => {
                self.vel_y = (self.vel_y + GRAVITY * dt).min(MAX_FALL_SPEED);
                // Can't leave the top of the playfield or sink into the floor
                self.pos.y = (self.pos.y + self.vel_y * dt).clamp(0.0, max_y);
                self.rotation = (self.rotation - ROTATION_SPEED * dt).max(MIN_ROTATION);
            }
            PlayerMode::Crashed => {
                if self.pos.y < max_y {
                    self.vel_y = (self.vel_y + CRASH_GRAVITY * dt).min(CRASH_MAX_FALL_SPEED);
                    self.pos.y = (self.pos.y + self.vel_y * dt).min(max_y);
                } else {
                    self.vel_y = 0.0;
                }
                self.rotation = (self.rotation - ROTATION_SPEED * dt).max(MIN_ROTATION);
            }
        }
    }

    /// Resting on (or touching) the floor
    pub fn on_floor(&self, floor: &Floor) -> bool {
        rect_floor_collision(&self.bounds(), floor.y)
    }

    /// Whether the player currently overlaps the floor or any pipe
    pub fn collided(&self, obstacles: &[Obstacle], floor: &Floor) -> bool {
        if self.on_floor(floor) {
            return true;
        }
        let bounds = self.bounds();
        obstacles
            .iter()
            .any(|o| rect_pipes_collision(&bounds, &o.upper_bounds(), &o.lower_bounds()))
    }

    /// Whether the player has moved past an obstacle it has not yet been
    /// credited for
    pub fn crossed(&self, obstacle: &Obstacle) -> bool {
        !obstacle.passed && self.center_x() > obstacle.center_x()
    }
}

/// An upper/lower pipe pair
#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    /// Left edge
    pub x: f32,
    /// Vertical center of the gap
    pub gap_center: f32,
    /// Already credited to the score
    pub passed: bool,
}

impl Obstacle {
    pub fn new(x: f32, gap_center: f32) -> Self {
        Self {
            x,
            gap_center,
            passed: false,
        }
    }

    #[inline]
    pub fn center_x(&self) -> f32 {
        self.x + PIPE_WIDTH / 2.0
    }

    #[inline]
    pub fn gap_top(&self) -> f32 {
        self.gap_center - PIPE_GAP / 2.0
    }

    #[inline]
    pub fn gap_bottom(&self) -> f32 {
        self.gap_center + PIPE_GAP / 2.0
    }

    pub fn upper_bounds(&self) -> Rect {
        Rect::new(self.x, self.gap_top() - PIPE_HEIGHT, PIPE_WIDTH, PIPE_HEIGHT)
    }

    pub fn lower_bounds(&self) -> Rect {
        Rect::new(self.x, self.gap_bottom(), PIPE_WIDTH, PIPE_HEIGHT)
    }

    /// Scrolled completely past the left edge
    #[inline]
    pub fn off_screen(&self) -> bool {
        self.x + PIPE_WIDTH < 0.0
    }
}

/// The scrolling floor strip
#[derive(Debug, Clone)]
pub struct Floor {
    /// Top edge
    pub y: f32,
    /// Scroll offset within one stripe pattern
    pub offset: f32,
}

impl Default for Floor {
    fn default() -> Self {
        Self {
            y: FLOOR_Y,
            offset: 0.0,
        }
    }
}

impl Floor {
    pub fn tick(&mut self, dt: f32) {
        self.offset = (self.offset + FLOOR_SPEED * dt) % FLOOR_PATTERN_WIDTH;
    }
}

/// Slow parallax backdrop
#[derive(Debug, Clone, Default)]
pub struct Background {
    pub offset: f32,
}

impl Background {
    pub fn tick(&mut self, dt: f32) {
        self.offset = (self.offset + BACKGROUND_SPEED * dt) % WINDOW_WIDTH;
    }
}

/// Obstacles passed this round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Score {
    count: u32,
}

impl Score {
    pub fn add(&mut self) {
        self.count += 1;
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }

    #[inline]
    pub fn value(&self) -> u32 {
        self.count
    }
}

/// Complete state of one round (deterministic for a given seed and input)
#[derive(Debug, Clone)]
pub struct GameState {
    /// Round seed for reproducibility
    pub seed: u64,
    /// Gap placement RNG
    pub rng: Pcg32,
    /// Simulation tick counter
    pub time_ticks: u64,
    /// Current phase
    pub phase: GamePhase,
    pub player: Player,
    /// Live obstacles, ordered left to right
    pub obstacles: Vec<Obstacle>,
    pub floor: Floor,
    pub background: Background,
    pub score: Score,
    /// Events from the most recent tick
    pub events: Vec<GameEvent>,
}

impl GameState {
    /// Create a new round with the given seed
    pub fn new(seed: u64) -> Self {
        Self::with_rng(seed, Pcg32::seed_from_u64(seed))
    }

    /// Create a new round drawing gap placement from the given RNG
    pub fn with_rng(seed: u64, rng: Pcg32) -> Self {
        let mut state = Self {
            seed,
            rng,
            time_ticks: 0,
            phase: GamePhase::Splash,
            player: Player::new(),
            obstacles: Vec::new(),
            floor: Floor::default(),
            background: Background::default(),
            score: Score::default(),
            events: Vec::new(),
        };

        // Obstacles wait off-screen until play starts
        super::tick::spawn_obstacles(&mut state.obstacles, &mut state.rng);

        state
    }
}
