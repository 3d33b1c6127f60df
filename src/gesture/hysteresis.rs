//! Hysteresis jump detector
//!
//! Turns a stream of vertical landmark positions into discrete jump events.
//! A jump fires on a rising edge (upward motion above the threshold) and
//! latches; the latch only clears once the landmark moves back down by more
//! than the threshold. One continuous upward motion therefore fires once.

use serde::{Deserialize, Serialize};

/// One processed camera frame reduced to a single coordinate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseSample {
    /// Capture time in seconds
    pub timestamp: f64,
    /// Normalized vertical position of the tracked landmark, in [0, 1]
    pub position: f32,
}

impl PoseSample {
    pub fn new(timestamp: f64, position: f32) -> Self {
        Self {
            timestamp,
            position,
        }
    }
}

/// Direction of the pose backend's vertical axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAxis {
    /// y grows toward the bottom of the image (MediaPipe, OpenCV)
    #[default]
    Down,
    /// y grows toward the top of the image
    Up,
}

impl VerticalAxis {
    /// Signed upward displacement between two positions (positive = moved up)
    #[inline]
    pub fn upward_delta(self, previous: f32, current: f32) -> f32 {
        match self {
            VerticalAxis::Down => previous - current,
            VerticalAxis::Up => current - previous,
        }
    }
}

/// Mutable detector state, reset only by constructing a new detector
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GestureState {
    pub previous_position: Option<f32>,
    /// Latched after a jump until the landmark comes back down
    pub jumping: bool,
}

/// Result of feeding one sample to the detector
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Observation {
    /// Upward displacement since the previous sample (None on the first)
    pub delta: Option<f32>,
    /// A jump fired on this sample
    pub jump: bool,
}

/// Two-threshold edge detector over landmark height
#[derive(Debug, Clone)]
pub struct JumpDetector {
    state: GestureState,
    threshold: f32,
    axis: VerticalAxis,
}

impl JumpDetector {
    pub fn new(threshold: f32, axis: VerticalAxis) -> Self {
        Self {
            state: GestureState::default(),
            threshold,
            axis,
        }
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Feed a sample; true when it completes a jump
    pub fn update(&mut self, sample: PoseSample) -> bool {
        self.observe(sample).jump
    }

    /// Feed a sample and report the measured displacement along with the
    /// jump decision
    pub fn observe(&mut self, sample: PoseSample) -> Observation {
        let mut observation = Observation::default();

        if let Some(previous) = self.state.previous_position {
            let delta = self.axis.upward_delta(previous, sample.position);
            observation.delta = Some(delta);

            if delta > self.threshold && !self.state.jumping {
                self.state.jumping = true;
                observation.jump = true;
            } else if delta < -self.threshold {
                self.state.jumping = false;
            }
        }

        self.state.previous_position = Some(sample.position);
        observation
    }
}
