//! Error types
//!
//! Only setup can fail. Everything that goes wrong while the game is running
//! (dropped frames, missing poses, sink writes) is recoverable and logged
//! where it happens.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to acquire a resource at startup
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("failed to open camera trace {path}: {source}")]
    CameraOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to open camera {index}: {reason}")]
    CameraDevice { index: i32, reason: String },
    #[error("failed to load pose model {path}: {reason}")]
    PoseModel { path: PathBuf, reason: String },
    #[error("webcam input needs a build with the `camera` feature")]
    CameraSupportMissing,
    #[error("failed to create video sink {path}: {source}")]
    SinkCreate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read settings {path}: {source}")]
    SettingsRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid settings {path}: {source}")]
    SettingsParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to initialize terminal: {0}")]
    Terminal(#[source] io::Error),
}

/// Top-level application failure
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Setup(#[from] SetupError),
    #[error("display failed: {0}")]
    Display(#[source] io::Error),
    #[error("input failed: {0}")]
    Input(#[source] io::Error),
}
