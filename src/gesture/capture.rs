//! Camera capture and pose extraction
//!
//! `Capture` owns the three external resources of the gesture pipeline: the
//! frame source, the pose backend and the video sink. It pulls one frame per
//! call, reduces it to a `PoseSample` and appends every processed frame to the
//! sink. The resources are released exactly once, either by `close` or when
//! the `Capture` is dropped.

use std::io;

use serde::{Deserialize, Serialize};

use super::hysteresis::{Observation, PoseSample};
use crate::consts::{MIN_LANDMARK_VISIBILITY, NOSE_LANDMARK};

/// One body landmark in normalized image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
    /// Backend confidence that the point is visible, in [0, 1]
    #[serde(default = "full_visibility")]
    pub visibility: f32,
}

fn full_visibility() -> f32 {
    1.0
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            z: 0.0,
            visibility: 1.0,
        }
    }
}

/// A captured camera frame
pub trait CameraFrame {
    /// Capture time in seconds
    fn timestamp(&self) -> f64;
}

/// Sequential source of camera frames
pub trait FrameSource {
    type Frame: CameraFrame;

    /// Next frame, or None when nothing is available right now. Must not
    /// block longer than a bounded read.
    fn read_frame(&mut self) -> Option<Self::Frame>;

    /// Release the device
    fn close(&mut self) {}
}

/// Pose estimation backend
pub trait PoseBackend<F> {
    /// Landmarks of the single detected body, if any
    fn landmarks(&mut self, frame: &F) -> Option<Vec<Landmark>>;

    /// Shut the backend down
    fn shutdown(&mut self) {}
}

/// Append-only store of processed frames
pub trait VideoSink<F> {
    fn append(&mut self, frame: &F, annotation: &FrameAnnotation) -> io::Result<()>;

    /// Flush and close the sink
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<F, K: VideoSink<F> + ?Sized> VideoSink<F> for Box<K> {
    fn append(&mut self, frame: &F, annotation: &FrameAnnotation) -> io::Result<()> {
        (**self).append(frame, annotation)
    }

    fn finish(&mut self) -> io::Result<()> {
        (**self).finish()
    }
}

/// Debug overlay written alongside each processed frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameAnnotation {
    /// Processed frame counter, starting at 1
    pub frame: u64,
    pub timestamp: f64,
    /// Tracked landmark height, when a pose was found
    pub position: Option<f32>,
    /// Upward displacement since the previous sample
    pub y_change: Option<f32>,
    pub jump: bool,
}

/// Pick the tracked landmark's height out of a pose.
///
/// Returns None when the landmark is missing, barely visible or not a finite
/// number; otherwise the height clamped to [0, 1].
pub fn extract_position(landmarks: &[Landmark]) -> Option<f32> {
    let nose = landmarks.get(NOSE_LANDMARK)?;
    if nose.visibility < MIN_LANDMARK_VISIBILITY || !nose.y.is_finite() {
        return None;
    }
    Some(nose.y.clamp(0.0, 1.0))
}

/// Exclusively owned camera, pose backend and video sink
pub struct Capture<S, P, K>
where
    S: FrameSource,
    P: PoseBackend<S::Frame>,
    K: VideoSink<S::Frame>,
{
    source: S,
    backend: P,
    sink: K,
    /// Last frame read, waiting to be written with its annotation
    pending: Option<S::Frame>,
    /// Height extracted from the pending frame
    pending_position: Option<f32>,
    frames: u64,
    released: bool,
}

impl<S, P, K> Capture<S, P, K>
where
    S: FrameSource,
    P: PoseBackend<S::Frame>,
    K: VideoSink<S::Frame>,
{
    /// Take ownership of already-opened resources
    pub fn open(source: S, backend: P, sink: K) -> Self {
        Self {
            source,
            backend,
            sink,
            pending: None,
            pending_position: None,
            frames: 0,
            released: false,
        }
    }

    /// Number of frames read so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Read one frame and reduce it to a sample.
    ///
    /// None when no frame is available or no usable pose was found; neither
    /// is an error.
    pub fn capture_and_extract(&mut self) -> Option<PoseSample> {
        if self.released {
            return None;
        }
        // A frame nobody annotated still goes to the sink
        self.record(&Observation::default());

        let frame = self.source.read_frame()?;
        self.frames += 1;

        let position = self
            .backend
            .landmarks(&frame)
            .and_then(|landmarks| extract_position(&landmarks));
        let timestamp = frame.timestamp();

        self.pending = Some(frame);
        self.pending_position = position;
        position.map(|p| PoseSample::new(timestamp, p))
    }

    /// Append the most recently captured frame to the sink with the
    /// detector's verdict. Write failures are logged and dropped.
    pub fn record(&mut self, observation: &Observation) {
        let Some(frame) = self.pending.take() else {
            return;
        };
        let annotation = FrameAnnotation {
            frame: self.frames,
            timestamp: frame.timestamp(),
            position: self.pending_position.take(),
            y_change: observation.delta,
            jump: observation.jump,
        };
        if let Err(e) = self.sink.append(&frame, &annotation) {
            log::warn!("Failed to write frame {} to video sink: {}", self.frames, e);
        }
    }

    /// Release everything now
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.record(&Observation::default());
        self.released = true;

        self.source.close();
        self.backend.shutdown();
        if let Err(e) = self.sink.finish() {
            log::warn!("Failed to finalize video sink: {}", e);
        }
        log::info!("Capture released after {} frames", self.frames);
    }
}

impl<S, P, K> Drop for Capture<S, P, K>
where
    S: FrameSource,
    P: PoseBackend<S::Frame>,
    K: VideoSink<S::Frame>,
{
    fn drop(&mut self) {
        self.release();
    }
}

/// Infinite, lazy stream of samples: one item per pulled frame, `None` when
/// that pull produced nothing. Not restartable.
impl<S, P, K> Iterator for Capture<S, P, K>
where
    S: FrameSource,
    P: PoseBackend<S::Frame>,
    K: VideoSink<S::Frame>,
{
    type Item = Option<PoseSample>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.capture_and_extract())
    }
}
