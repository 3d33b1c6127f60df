//! Gesture detection pipeline
//!
//! camera frame -> pose landmarks -> nose height -> hysteresis -> jump
//!
//! The camera, pose backend and video sink are traits. `trace` and `sink`
//! provide the file-backed implementations; `live` (feature `camera`)
//! provides the webcam, the pose model and the annotated video.

pub mod capture;
pub mod detector;
pub mod hysteresis;
#[cfg(feature = "camera")]
pub mod live;
pub mod sink;
pub mod trace;

pub use capture::{
    CameraFrame, Capture, FrameAnnotation, FrameSource, Landmark, PoseBackend, VideoSink,
    extract_position,
};
pub use detector::GestureDetector;
pub use hysteresis::{GestureState, JumpDetector, Observation, PoseSample, VerticalAxis};
pub use sink::{JsonlSink, NullSink};
pub use trace::{TraceBackend, TraceCamera, TraceFrame};
#[cfg(feature = "camera")]
pub use live::{AnnotatedVideoSink, LiveFrame, MoveNetBackend, WebcamSource};
