//! Jump Flap - a Flappy Bird style game you play by jumping
//!
//! Core modules:
//! - `gesture`: Camera capture, pose extraction and the hysteresis jump detector
//! - `input`: Raw event classification and tap/gesture debouncing
//! - `sim`: Deterministic simulation (physics, collisions, scoring, phases)
//! - `session`: Round lifecycle across the Splash/Play/GameOver cycle
//! - `platform`: Terminal display and input collaborators
//! - `settings`: Runtime configuration

pub mod app;
pub mod error;
pub mod gesture;
pub mod input;
pub mod platform;
pub mod session;
pub mod settings;
pub mod sim;

pub use session::{Session, Step};
pub use settings::Settings;

/// Game configuration constants
///
/// Distances are in playfield pixels, times in seconds. The playfield has its
/// origin at the top-left corner and y grows downward.
pub mod consts {
    /// Fixed simulation timestep (one tick per rendered frame)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Target frame rate of the host loop
    pub const TARGET_FPS: u32 = 60;

    /// Playfield dimensions
    pub const WINDOW_WIDTH: f32 = 288.0;
    pub const WINDOW_HEIGHT: f32 = 512.0;
    /// Top edge of the floor (79% of the window height)
    pub const FLOOR_Y: f32 = 404.0;
    /// Floor stripe pattern repeats every this many pixels
    pub const FLOOR_PATTERN_WIDTH: f32 = 48.0;
    /// Floor scroll speed (pixels/s)
    pub const FLOOR_SPEED: f32 = 240.0;
    /// Background parallax scroll speed (pixels/s)
    pub const BACKGROUND_SPEED: f32 = 30.0;

    /// Player defaults
    pub const PLAYER_X: f32 = 57.0;
    pub const PLAYER_WIDTH: f32 = 34.0;
    pub const PLAYER_HEIGHT: f32 = 24.0;
    /// Gravity while playing (pixels/s²)
    pub const GRAVITY: f32 = 3600.0;
    /// Gravity while falling after a crash (pixels/s²)
    pub const CRASH_GRAVITY: f32 = 7200.0;
    /// Upward impulse applied by a flap (pixels/s, negative = up)
    pub const FLAP_VELOCITY: f32 = -540.0;
    /// Terminal falling speed (pixels/s)
    pub const MAX_FALL_SPEED: f32 = 600.0;
    pub const CRASH_MAX_FALL_SPEED: f32 = 900.0;
    /// Idle bob amplitude (pixels) and angular speed (radians/s)
    pub const BOB_AMPLITUDE: f32 = 8.0;
    pub const BOB_SPEED: f32 = 12.0;
    /// Visual rotation in degrees
    pub const FLAP_ROTATION: f32 = 80.0;
    pub const MIN_ROTATION: f32 = -90.0;
    pub const MAX_VISIBLE_ROTATION: f32 = 25.0;
    pub const ROTATION_SPEED: f32 = 180.0;
    /// Ticks per wing animation frame
    pub const WING_FRAME_TICKS: u64 = 5;

    /// Obstacle (pipe pair) geometry
    pub const PIPE_WIDTH: f32 = 52.0;
    pub const PIPE_HEIGHT: f32 = 320.0;
    pub const PIPE_GAP: f32 = 120.0;
    /// Obstacle scroll speed (pixels/s)
    pub const PIPE_SPEED: f32 = 300.0;
    /// Horizontal distance between consecutive obstacles
    pub const OBSTACLE_SPACING: f32 = WINDOW_WIDTH * 0.75;
    /// First obstacle appears just past the right edge
    pub const OBSTACLE_SPAWN_X: f32 = WINDOW_WIDTH + 10.0;
    /// Gap center range: the gap stays inside the middle 60% of the sky
    pub const GAP_CENTER_MIN: f32 = FLOOR_Y * 0.2 + PIPE_GAP / 2.0;
    pub const GAP_CENTER_MAX: f32 = FLOOR_Y * 0.8 - PIPE_GAP / 2.0;

    /// Gesture detection
    pub const JUMP_THRESHOLD: f32 = 0.02;
    /// Minimum simulated seconds between accepted gesture jumps
    pub const JUMP_COOLDOWN: f64 = 0.1;
    /// Pose landmark used for the jump signal (nose)
    pub const NOSE_LANDMARK: usize = 0;
    /// Landmarks less visible than this are treated as missing
    pub const MIN_LANDMARK_VISIBILITY: f32 = 0.3;
}
