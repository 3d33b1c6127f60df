//! Collision detection for the player, pipes and floor
//!
//! Everything in the playfield is an axis-aligned box, so a collision is a
//! plain rectangle overlap. There is no partial damage: any hit is fatal.

use glam::Vec2;

/// Axis-aligned rectangle in playfield coordinates (y grows downward)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    /// Top-left corner
    pub min: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            min: Vec2::new(x, y),
            size: Vec2::new(w, h),
        }
    }

    /// Bottom-right corner
    #[inline]
    pub fn max(&self) -> Vec2 {
        self.min + self.size
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        self.min + self.size * 0.5
    }

    /// Strict overlap test; rectangles that only share an edge do not collide
    pub fn intersects(&self, other: &Rect) -> bool {
        let a_max = self.max();
        let b_max = other.max();
        self.min.x < b_max.x && a_max.x > other.min.x && self.min.y < b_max.y && a_max.y > other.min.y
    }
}

/// Check if a box touches the floor.
///
/// One pixel of tolerance so a body resting exactly on the floor counts.
#[inline]
pub fn rect_floor_collision(rect: &Rect, floor_y: f32) -> bool {
    rect.max().y >= floor_y - 1.0
}

/// Check a box against both halves of a pipe pair
pub fn rect_pipes_collision(rect: &Rect, upper: &Rect, lower: &Rect) -> bool {
    rect.intersects(upper) || rect.intersects(lower)
}
