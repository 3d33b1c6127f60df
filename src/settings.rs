//! Runtime settings
//!
//! Loaded from a JSON file next to the game. Only plumbing is configurable
//! (where frames come from, where they are recorded, logging); gameplay
//! constants are fixed in `consts`.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SetupError;
use crate::gesture::VerticalAxis;

/// Where camera frames come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CameraSettings {
    /// Live webcam with a MoveNet pose model (needs the `camera` feature)
    Webcam {
        #[serde(default)]
        index: i32,
        #[serde(default = "default_model")]
        model: PathBuf,
    },
    /// Replay a recorded pose trace
    Trace { path: PathBuf },
    /// No camera; play with taps only
    Disabled,
}

fn default_model() -> PathBuf {
    PathBuf::from("movenet.onnx")
}

impl Default for CameraSettings {
    /// The first webcam when built with camera support, otherwise taps only
    fn default() -> Self {
        if cfg!(feature = "camera") {
            CameraSettings::Webcam {
                index: 0,
                model: default_model(),
            }
        } else {
            CameraSettings::Disabled
        }
    }
}

/// Game settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub camera: CameraSettings,
    /// Annotated frame log; None disables recording
    pub video_sink: Option<PathBuf>,
    /// Axis direction of the pose backend
    pub vertical_axis: VerticalAxis,
    /// Session seed; None picks one from the clock
    pub seed: Option<u64>,
    /// Log destination (the terminal is taken by the game)
    pub log_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            camera: CameraSettings::default(),
            video_sink: Some(PathBuf::from("pose_detection.jsonl")),
            vertical_axis: VerticalAxis::Down,
            seed: None,
            log_file: Some(PathBuf::from("jump-flap.log")),
        }
    }
}

impl Settings {
    /// Environment variable overriding the settings path
    pub const PATH_ENV: &'static str = "JUMP_FLAP_SETTINGS";
    /// Settings file used when the variable is unset
    pub const DEFAULT_PATH: &'static str = "jump-flap.json";

    /// Settings file location
    pub fn path() -> PathBuf {
        Self::path_from(std::env::var_os(Self::PATH_ENV))
    }

    fn path_from(env: Option<OsString>) -> PathBuf {
        env.filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(Self::DEFAULT_PATH))
    }

    /// Load settings from a file. A missing file means defaults; a file that
    /// exists but cannot be read or parsed is an error.
    pub fn load_from(path: &Path) -> Result<Self, SetupError> {
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(SetupError::SettingsRead {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Self::from_json(&json).map_err(|source| SetupError::SettingsParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
