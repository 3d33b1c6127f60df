//! Recorded pose traces as a camera
//!
//! A trace is a JSON lines file with one frame per line:
//!
//! ```text
//! {"t": 0.033, "landmarks": [{"x": 0.51, "y": 0.42, "visibility": 0.98}, ...]}
//! {"t": 0.066, "landmarks": null}
//! ```
//!
//! Landmarks follow the 33-point body layout, index 0 being the nose.
//! Playing a trace back through the game replays the recorded session.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::capture::{CameraFrame, FrameSource, Landmark, PoseBackend};
use crate::consts::TARGET_FPS;
use crate::error::SetupError;

/// Slack when comparing trace time against playback time
const TIME_EPSILON: f64 = 1e-9;

/// One recorded frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceFrame {
    /// Capture time in seconds
    pub t: f64,
    /// Detected body, None when the backend found nobody
    #[serde(default)]
    pub landmarks: Option<Vec<Landmark>>,
}

impl CameraFrame for TraceFrame {
    fn timestamp(&self) -> f64 {
        self.t
    }
}

/// Frame source reading a pose trace line by line.
///
/// Replay follows the trace's own clock: each `read_frame` call advances
/// playback by one tick period and returns the newest frame whose `t` has
/// come due, so a 30 fps trace is seen every other tick of a 60 Hz loop.
pub struct TraceCamera<R> {
    /// None once closed, at end of trace, or when the camera is disabled
    reader: Option<R>,
    line: String,
    line_no: u64,
    /// Playback advance per read; None hands out one line per read
    period: Option<f64>,
    /// Playback time of the next read, relative to the first frame
    elapsed: f64,
    /// `t` of the first frame
    origin: Option<f64>,
    /// Parsed frame that is not due yet
    ahead: Option<TraceFrame>,
    skipped: u64,
}

impl TraceCamera<BufReader<File>> {
    /// Open a trace file; failing here is fatal
    pub fn open(path: &Path) -> Result<Self, SetupError> {
        let file = File::open(path).map_err(|source| SetupError::CameraOpen {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Camera: replaying pose trace {}", path.display());
        Ok(Self::from_reader(BufReader::new(file)))
    }
}

impl<R: BufRead> TraceCamera<R> {
    /// Replay paced at the game's tick rate
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader: Some(reader),
            line: String::new(),
            line_no: 0,
            period: Some(1.0 / TARGET_FPS as f64),
            elapsed: 0.0,
            origin: None,
            ahead: None,
            skipped: 0,
        }
    }

    /// A camera that never produces frames
    pub fn disabled() -> Self {
        Self {
            reader: None,
            line: String::new(),
            line_no: 0,
            period: None,
            elapsed: 0.0,
            origin: None,
            ahead: None,
            skipped: 0,
        }
    }

    /// Change the playback step; None reads one line per call
    pub fn paced(mut self, period: Option<f64>) -> Self {
        self.period = period;
        self
    }

    /// Frames passed over because a newer one was already due
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    fn next_line(&mut self) -> Line {
        let Some(reader) = self.reader.as_mut() else {
            return Line::End;
        };
        self.line.clear();
        match reader.read_line(&mut self.line) {
            Ok(0) => {
                log::info!("Pose trace ended after {} lines", self.line_no);
                self.reader = None;
                Line::End
            }
            Ok(_) => {
                self.line_no += 1;
                let text = self.line.trim();
                if text.is_empty() {
                    return Line::Gap;
                }
                match serde_json::from_str(text) {
                    Ok(frame) => Line::Frame(frame),
                    Err(e) => {
                        log::warn!("Skipping trace line {}: {}", self.line_no, e);
                        Line::Gap
                    }
                }
            }
            Err(e) => {
                log::warn!("Failed to read trace line {}: {}", self.line_no + 1, e);
                Line::Failed
            }
        }
    }
}

/// Outcome of reading one trace line
enum Line {
    Frame(TraceFrame),
    /// Blank or malformed line
    Gap,
    /// I/O error; retried on the next read
    Failed,
    End,
}

impl<R: BufRead> FrameSource for TraceCamera<R> {
    type Frame = TraceFrame;

    fn read_frame(&mut self) -> Option<TraceFrame> {
        let Some(period) = self.period else {
            return match self.next_line() {
                Line::Frame(frame) => Some(frame),
                _ => None,
            };
        };
        let now = self.elapsed;
        self.elapsed += period;

        let mut due: Option<TraceFrame> = None;
        loop {
            let frame = match self.ahead.take() {
                Some(frame) => frame,
                None => match self.next_line() {
                    Line::Frame(frame) => frame,
                    Line::Gap => continue,
                    Line::Failed | Line::End => break,
                },
            };
            let origin = *self.origin.get_or_insert(frame.t);
            if frame.t - origin > now + TIME_EPSILON {
                self.ahead = Some(frame);
                break;
            }
            if due.replace(frame).is_some() {
                self.skipped += 1;
            }
        }
        due
    }

    fn close(&mut self) {
        self.ahead = None;
        if self.reader.take().is_some() {
            log::info!("Camera closed");
        }
    }
}

/// Pose backend for traces: the landmarks are already in the frame
#[derive(Debug, Default)]
pub struct TraceBackend;

impl PoseBackend<TraceFrame> for TraceBackend {
    fn landmarks(&mut self, frame: &TraceFrame) -> Option<Vec<Landmark>> {
        frame.landmarks.clone().filter(|l| !l.is_empty())
    }

    fn shutdown(&mut self) {
        log::debug!("Pose backend shut down");
    }
}
