//! Per-tick jump signal from the camera

use super::capture::{Capture, FrameSource, PoseBackend, VideoSink};
use super::hysteresis::{GestureState, JumpDetector, Observation, VerticalAxis};

/// Camera capture feeding the hysteresis detector
pub struct GestureDetector<S, P, K>
where
    S: FrameSource,
    P: PoseBackend<S::Frame>,
    K: VideoSink<S::Frame>,
{
    capture: Capture<S, P, K>,
    detector: JumpDetector,
    jumps: u64,
}

impl<S, P, K> GestureDetector<S, P, K>
where
    S: FrameSource,
    P: PoseBackend<S::Frame>,
    K: VideoSink<S::Frame>,
{
    pub fn new(capture: Capture<S, P, K>, threshold: f32, axis: VerticalAxis) -> Self {
        let detector = JumpDetector::new(threshold, axis);
        log::info!(
            "Gesture detector ready (threshold {}, axis {:?})",
            detector.threshold(),
            axis
        );
        Self {
            capture,
            detector,
            jumps: 0,
        }
    }

    /// Pull one frame and report whether it completed a jump
    pub fn poll(&mut self) -> bool {
        let observation = match self.capture.next().flatten() {
            Some(sample) => self.detector.observe(sample),
            None => Observation::default(),
        };
        self.capture.record(&observation);

        if observation.jump {
            self.jumps += 1;
            log::debug!(
                "Jump #{} detected (rise {:.3})",
                self.jumps,
                observation.delta.unwrap_or_default()
            );
        }
        observation.jump
    }

    pub fn gesture_state(&self) -> &GestureState {
        self.detector.state()
    }

    /// Jumps detected so far
    pub fn jumps(&self) -> u64 {
        self.jumps
    }

    /// Release camera, backend and sink
    pub fn close(self) {
        log::info!("Gesture detector closing after {} jumps", self.jumps);
        self.capture.close();
    }
}
