//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - No rendering, camera or platform dependencies

pub mod collision;
pub mod state;
pub mod tick;

pub use collision::{Rect, rect_floor_collision, rect_pipes_collision};
pub use state::{
    Background, Floor, GameEvent, GamePhase, GameState, Obstacle, Player, PlayerMode, Score,
};
pub use tick::{TickInput, random_gap_center, spawn_obstacles, tick};
