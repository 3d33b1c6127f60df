//! Game session: one round after another until the player quits
//!
//! The session owns the current round, the input debouncer and a clock that
//! keeps running across rounds. Each round gets its own seed drawn from the
//! session's master RNG, so a whole session replays from one seed.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::consts::*;
use crate::input::Debouncer;
use crate::sim::{GameEvent, GamePhase, GameState, TickInput, tick};

/// Everything the game needs to know about one frame's input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameInput {
    pub quit: bool,
    /// A tap (key, pointer, touch) arrived this frame
    pub tapped: bool,
    /// The gesture detector fired this frame
    pub gesture_jump: bool,
}

/// Outcome of a session step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Quit,
}

pub struct Session {
    state: GameState,
    debouncer: Debouncer,
    /// Master RNG handing out round seeds
    seeds: Pcg32,
    /// Ticks since the session started (never reset)
    clock_ticks: u64,
    /// Rounds started, including the current one
    rounds: u32,
    /// Best score this session (not persisted)
    best: u32,
    /// Events of the most recent step, including a restart
    events: Vec<GameEvent>,
}

impl Session {
    pub fn new(seed: u64) -> Self {
        let mut seeds = Pcg32::seed_from_u64(seed);
        let round_seed = seeds.random();
        log::info!("Session seed {}", seed);
        Self {
            state: GameState::new(round_seed),
            debouncer: Debouncer::new(JUMP_COOLDOWN),
            seeds,
            clock_ticks: 0,
            rounds: 1,
            best: 0,
            events: Vec::new(),
        }
    }

    /// Current round
    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn phase(&self) -> GamePhase {
        self.state.phase
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn best(&self) -> u32 {
        self.best
    }

    /// Events produced by the last step
    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    /// Session clock in simulated seconds
    pub fn now(&self) -> f64 {
        self.clock_ticks as f64 / TARGET_FPS as f64
    }

    /// Advance one frame
    pub fn step(&mut self, input: &FrameInput) -> Step {
        if input.quit {
            log::info!(
                "Quit during {:?} after {} rounds (best {})",
                self.state.phase,
                self.rounds,
                self.best
            );
            return Step::Quit;
        }

        self.clock_ticks += 1;
        let flap = self
            .debouncer
            .poll(self.now(), input.tapped, input.gesture_jump);

        tick(&mut self.state, &TickInput { flap }, SIM_DT);
        self.events.clear();
        self.events.extend_from_slice(&self.state.events);

        let mut restart = false;
        for event in &self.events {
            match *event {
                GameEvent::Started => log::info!("Round {} started", self.rounds),
                GameEvent::Crashed(score) => {
                    self.best = self.best.max(score);
                    log::info!("Round {} over: score {} (best {})", self.rounds, score, self.best);
                }
                GameEvent::RestartRequested => restart = true,
                _ => {}
            }
        }
        if restart {
            self.new_round();
        }

        Step::Continue
    }

    /// Throw the current round away and start over at the splash screen
    fn new_round(&mut self) {
        let seed = self.seeds.random();
        self.state = GameState::new(seed);
        self.rounds += 1;
        log::debug!("Round {} seed {}", self.rounds, seed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAP: FrameInput = FrameInput {
        quit: false,
        tapped: true,
        gesture_jump: false,
    };
    const JUMP: FrameInput = FrameInput {
        quit: false,
        tapped: false,
        gesture_jump: true,
    };
    const IDLE: FrameInput = FrameInput {
        quit: false,
        tapped: false,
        gesture_jump: false,
    };

    /// Run idle frames until the phase changes (bounded)
    fn run_until_phase_change(session: &mut Session) {
        let phase = session.phase();
        for _ in 0..10_000 {
            session.step(&IDLE);
            if session.phase() != phase {
                return;
            }
        }
        panic!("phase never left {:?}", phase);
    }

    /// Play a round until the bird is down and resting
    fn crash_and_land(session: &mut Session) {
        assert_eq!(session.step(&TAP), Step::Continue);
        assert_eq!(session.phase(), GamePhase::Play);
        // Without flaps the bird drops onto the floor
        run_until_phase_change(session);
        assert_eq!(session.phase(), GamePhase::GameOver);
        for _ in 0..600 {
            session.step(&IDLE);
        }
        assert!(session.state().player.on_floor(&session.state().floor));
    }

    #[test]
    fn test_gesture_starts_game() {
        let mut session = Session::new(1);
        assert_eq!(session.phase(), GamePhase::Splash);
        session.step(&JUMP);
        assert_eq!(session.phase(), GamePhase::Play);
        assert_eq!(session.events(), &[GameEvent::Started]);
    }

    #[test]
    fn test_full_cycle_resets_round() {
        let mut session = Session::new(2024);
        for round in 1..=3 {
            assert_eq!(session.rounds(), round);
            assert_eq!(session.phase(), GamePhase::Splash);
            assert_eq!(session.state().score.value(), 0);
            assert_eq!(session.state().obstacles.len(), 2);

            crash_and_land(&mut session);
            session.step(&TAP);

            assert_eq!(session.phase(), GamePhase::Splash);
            assert_eq!(session.state().time_ticks, 0);
        }
    }

    #[test]
    fn test_game_over_needs_landing_before_restart() {
        let mut session = Session::new(5);
        session.step(&TAP);
        // Force an immediate crash high up in the air
        session.state.player.pos.y = 50.0;
        session.state.obstacles[0].x = session.state.player.pos.x;
        session.state.obstacles[0].gap_center = 300.0;
        session.step(&IDLE);
        assert_eq!(session.phase(), GamePhase::GameOver);

        // Still falling: taps do nothing
        session.step(&TAP);
        assert_eq!(session.phase(), GamePhase::GameOver);
        assert_eq!(session.rounds(), 1);
    }

    #[test]
    fn test_gesture_restarts_after_landing() {
        let mut session = Session::new(11);
        crash_and_land(&mut session);
        let best = session.best();

        session.step(&JUMP);

        assert_eq!(session.phase(), GamePhase::Splash);
        assert_eq!(session.rounds(), 2);
        assert_eq!(session.state().time_ticks, 0);
        assert_eq!(session.best(), best);

        // The next gesture starts the new round
        for _ in 0..10 {
            session.step(&IDLE);
        }
        session.step(&JUMP);
        assert_eq!(session.phase(), GamePhase::Play);
    }

    #[test]
    fn test_gesture_while_falling_does_not_restart() {
        let mut session = Session::new(5);
        session.step(&TAP);
        session.state.player.pos.y = 50.0;
        session.state.obstacles[0].x = session.state.player.pos.x;
        session.state.obstacles[0].gap_center = 300.0;
        session.step(&IDLE);
        assert_eq!(session.phase(), GamePhase::GameOver);

        session.step(&JUMP);
        assert_eq!(session.phase(), GamePhase::GameOver);
        assert_eq!(session.rounds(), 1);

        // Once down, a gesture past the cooldown restarts
        for _ in 0..600 {
            session.step(&IDLE);
        }
        session.step(&JUMP);
        assert_eq!(session.phase(), GamePhase::Splash);
        assert_eq!(session.rounds(), 2);
    }

    #[test]
    fn test_gesture_cooldown_across_ticks() {
        let mut session = Session::new(8);
        session.step(&JUMP);
        assert_eq!(session.phase(), GamePhase::Play);

        // Jump on the very next tick (1/60 s later) is swallowed
        session.step(&JUMP);
        assert!(!session.events().contains(&GameEvent::Flapped));

        // Seven ticks later (> 0.1 s) it goes through
        for _ in 0..5 {
            session.step(&IDLE);
        }
        session.step(&JUMP);
        assert!(session.events().contains(&GameEvent::Flapped));
    }

    #[test]
    fn test_taps_are_never_debounced() {
        let mut session = Session::new(8);
        session.step(&TAP);
        for _ in 0..5 {
            session.step(&TAP);
            assert!(session.events().contains(&GameEvent::Flapped));
        }
    }

    #[test]
    fn test_quit_in_any_phase() {
        let quit = FrameInput {
            quit: true,
            ..IDLE
        };

        let mut session = Session::new(3);
        assert_eq!(session.step(&quit), Step::Quit);

        session.step(&TAP);
        assert_eq!(session.step(&quit), Step::Quit);

        run_until_phase_change(&mut session);
        assert_eq!(session.phase(), GamePhase::GameOver);
        assert_eq!(session.step(&quit), Step::Quit);
    }

    #[test]
    fn test_best_score_tracks_crashes() {
        let mut session = Session::new(13);
        session.step(&TAP);
        session.state.score.add();
        session.state.score.add();
        session.state.player.pos.y = session.state.floor.y - session.state.player.size.y;
        session.step(&IDLE);
        assert_eq!(session.events(), &[GameEvent::Crashed(2)]);
        assert_eq!(session.best(), 2);
    }

    #[test]
    fn test_same_seed_same_session() {
        let mut a = Session::new(77);
        let mut b = Session::new(77);
        for i in 0..300 {
            let input = if i % 20 == 0 { TAP } else { IDLE };
            a.step(&input);
            b.step(&input);
        }
        assert_eq!(a.state().obstacles, b.state().obstacles);
        assert_eq!(a.state().player.pos, b.state().player.pos);
    }
}
