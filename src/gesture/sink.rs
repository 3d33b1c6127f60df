//! Annotated frame log
//!
//! Every processed frame is appended as one JSON record holding the frame
//! itself plus the detector's annotation, so a session can be inspected or
//! replayed later.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use super::capture::{FrameAnnotation, VideoSink};
use crate::error::SetupError;

#[derive(Serialize)]
struct Record<'a, F> {
    #[serde(flatten)]
    annotation: &'a FrameAnnotation,
    captured: &'a F,
}

/// JSON lines sink
pub struct JsonlSink<W: Write> {
    /// None once finished
    writer: Option<W>,
    written: u64,
}

impl JsonlSink<BufWriter<File>> {
    /// Create (truncate) the log file; failing here is fatal
    pub fn create(path: &Path) -> Result<Self, SetupError> {
        let file = File::create(path).map_err(|source| SetupError::SinkCreate {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Recording annotated frames to {}", path.display());
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> JsonlSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Some(writer),
            written: 0,
        }
    }

    /// Records written so far
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl<W: Write, F: Serialize> VideoSink<F> for JsonlSink<W> {
    fn append(&mut self, frame: &F, annotation: &FrameAnnotation) -> io::Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink already finished"));
        };
        let record = Record {
            annotation,
            captured: frame,
        };
        serde_json::to_writer(&mut *writer, &record)?;
        writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        match self.writer.take() {
            Some(mut writer) => {
                writer.flush()?;
                log::info!("Video sink closed ({} frames)", self.written);
                Ok(())
            }
            None => Ok(()),
        }
    }
}

/// Sink that discards everything, for when recording is turned off
#[derive(Debug, Default)]
pub struct NullSink;

impl<F> VideoSink<F> for NullSink {
    fn append(&mut self, _frame: &F, _annotation: &FrameAnnotation) -> io::Result<()> {
        Ok(())
    }
}
