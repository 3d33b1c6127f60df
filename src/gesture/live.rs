//! Live webcam capture with ONNX pose estimation
//!
//! Built with the `camera` feature. `WebcamSource` reads BGR frames through
//! OpenCV, `MoveNetBackend` runs a single-pose MoveNet model through ONNX
//! Runtime and returns the 17 COCO keypoints (index 0 is the nose), and
//! `AnnotatedVideoSink` writes the frames back out as a video with the
//! detector's verdict drawn on top.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use ndarray::{Array4, ArrayViewD};
use opencv::core::{AlgorithmHint, CV_32FC3, Mat, Point, Scalar, Size, Vec3f};
use opencv::prelude::*;
use opencv::{imgproc, videoio};
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::Tensor;
use serde::Serialize;

use super::capture::{CameraFrame, FrameAnnotation, FrameSource, Landmark, PoseBackend, VideoSink};
use crate::consts::TARGET_FPS;
use crate::error::SetupError;

/// MoveNet single-pose input edge (pixels)
const MOVENET_INPUT: i32 = 192;
const MOVENET_INPUT_NAME: &str = "serving_default_input_0";
const MOVENET_OUTPUT_NAME: &str = "StatefulPartitionedCall_0";
const MOVENET_KEYPOINTS: usize = 17;

/// Requested capture resolution
const CAPTURE_WIDTH: f64 = 640.0;
const CAPTURE_HEIGHT: f64 = 480.0;

/// One webcam frame
#[derive(Serialize)]
pub struct LiveFrame {
    /// Seconds since the camera was opened
    pub t: f64,
    pub width: i32,
    pub height: i32,
    #[serde(skip)]
    pub image: Mat,
}

impl CameraFrame for LiveFrame {
    fn timestamp(&self) -> f64 {
        self.t
    }
}

/// OpenCV video capture device
pub struct WebcamSource {
    capture: Option<videoio::VideoCapture>,
    index: i32,
    opened_at: Instant,
}

impl WebcamSource {
    /// Open camera `index`; failing here is fatal
    pub fn open(index: i32) -> Result<Self, SetupError> {
        let device_error = |reason: String| SetupError::CameraDevice { index, reason };

        let mut capture = videoio::VideoCapture::new(index, videoio::CAP_ANY)
            .map_err(|e| device_error(e.to_string()))?;
        if !capture.is_opened().map_err(|e| device_error(e.to_string()))? {
            return Err(device_error("device not available".into()));
        }
        // Resolution is a request; the driver may pick something else
        let _ = capture.set(videoio::CAP_PROP_FRAME_WIDTH, CAPTURE_WIDTH);
        let _ = capture.set(videoio::CAP_PROP_FRAME_HEIGHT, CAPTURE_HEIGHT);

        log::info!("Camera {} opened", index);
        Ok(Self {
            capture: Some(capture),
            index,
            opened_at: Instant::now(),
        })
    }
}

impl FrameSource for WebcamSource {
    type Frame = LiveFrame;

    fn read_frame(&mut self) -> Option<LiveFrame> {
        let capture = self.capture.as_mut()?;
        let mut image = Mat::default();
        match capture.read(&mut image) {
            Ok(true) if image.rows() > 0 => Some(LiveFrame {
                t: self.opened_at.elapsed().as_secs_f64(),
                width: image.cols(),
                height: image.rows(),
                image,
            }),
            Ok(_) => None,
            Err(e) => {
                log::warn!("Camera {} read failed: {}", self.index, e);
                None
            }
        }
    }

    fn close(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            if let Err(e) = capture.release() {
                log::warn!("Failed to release camera {}: {}", self.index, e);
            }
            log::info!("Camera {} closed", self.index);
        }
    }
}

/// Single-pose MoveNet model
pub struct MoveNetBackend {
    session: Option<Session>,
    failures: u64,
}

impl MoveNetBackend {
    /// Load the ONNX model; failing here is fatal
    pub fn load(path: &Path) -> Result<Self, SetupError> {
        let model_error = |reason: String| SetupError::PoseModel {
            path: path.to_path_buf(),
            reason,
        };
        let session = Session::builder()
            .map_err(|e| model_error(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| model_error(e.to_string()))?
            .commit_from_file(path)
            .map_err(|e| model_error(e.to_string()))?;
        log::info!("Pose model {} loaded", path.display());
        Ok(Self {
            session: Some(session),
            failures: 0,
        })
    }

    fn detect(&mut self, image: &Mat) -> Result<Option<Vec<Landmark>>, String> {
        let Some(session) = self.session.as_mut() else {
            return Ok(None);
        };
        let input = preprocess(image).map_err(|e| e.to_string())?;
        let tensor = Tensor::from_array(input).map_err(|e| e.to_string())?;
        let outputs = session
            .run(ort::inputs![MOVENET_INPUT_NAME => tensor])
            .map_err(|e| e.to_string())?;
        let output: ArrayViewD<f32> = outputs[MOVENET_OUTPUT_NAME]
            .try_extract_array()
            .map_err(|e| e.to_string())?;
        Ok(decode_keypoints(&output))
    }
}

impl PoseBackend<LiveFrame> for MoveNetBackend {
    fn landmarks(&mut self, frame: &LiveFrame) -> Option<Vec<Landmark>> {
        match self.detect(&frame.image) {
            Ok(landmarks) => landmarks,
            Err(e) => {
                self.failures += 1;
                // One bad frame is noise; keep the log readable when every frame fails
                if self.failures.is_power_of_two() {
                    log::warn!("Pose inference failed ({} so far): {}", self.failures, e);
                }
                None
            }
        }
    }

    fn shutdown(&mut self) {
        if self.session.take().is_some() {
            log::debug!("Pose model unloaded");
        }
    }
}

/// BGR frame to a 1x192x192x3 RGB float tensor
fn preprocess(frame: &Mat) -> opencv::Result<Array4<f32>> {
    let mut rgb = Mat::default();
    imgproc::cvt_color(
        frame,
        &mut rgb,
        imgproc::COLOR_BGR2RGB,
        0,
        AlgorithmHint::ALGO_HINT_DEFAULT,
    )?;
    let mut resized = Mat::default();
    imgproc::resize(
        &rgb,
        &mut resized,
        Size::new(MOVENET_INPUT, MOVENET_INPUT),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )?;
    let mut float_mat = Mat::default();
    resized.convert_to(&mut float_mat, CV_32FC3, 1.0, 0.0)?;

    let side = MOVENET_INPUT as usize;
    let pixels = float_mat.data_typed::<Vec3f>()?;
    let mut tensor = Array4::<f32>::zeros((1, side, side, 3));
    for (i, px) in pixels.iter().enumerate().take(side * side) {
        let (y, x) = (i / side, i % side);
        for c in 0..3 {
            tensor[[0, y, x, c]] = px.0[c];
        }
    }
    Ok(tensor)
}

/// MoveNet output `[1, 1, 17, 3]` of (y, x, score) to landmarks
fn decode_keypoints(output: &ArrayViewD<f32>) -> Option<Vec<Landmark>> {
    if output.shape() != [1, 1, MOVENET_KEYPOINTS, 3] {
        log::warn!("Unexpected pose output shape {:?}", output.shape());
        return None;
    }
    let landmarks = (0..MOVENET_KEYPOINTS)
        .map(|i| Landmark {
            x: output[[0, 0, i, 1]],
            y: output[[0, 0, i, 0]],
            z: 0.0,
            visibility: output[[0, 0, i, 2]],
        })
        .collect();
    Some(landmarks)
}

/// True for paths the annotated video writer handles
pub fn is_video_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| matches!(e.to_ascii_lowercase().as_str(), "mp4" | "avi" | "mkv"))
}

/// Annotated video file; opened on the first frame, when the size is known
pub struct AnnotatedVideoSink {
    path: PathBuf,
    writer: Option<videoio::VideoWriter>,
    finished: bool,
    written: u64,
}

impl AnnotatedVideoSink {
    pub fn new(path: &Path) -> Self {
        log::info!("Recording annotated video to {}", path.display());
        Self {
            path: path.to_path_buf(),
            writer: None,
            finished: false,
            written: 0,
        }
    }

    fn writer(&mut self, size: Size) -> io::Result<&mut videoio::VideoWriter> {
        if self.writer.is_none() {
            let path = self.path.to_string_lossy().into_owned();
            let writer = videoio::VideoWriter::fourcc('m', 'p', '4', 'v')
                .and_then(|fourcc| {
                    videoio::VideoWriter::new(&path, fourcc, TARGET_FPS as f64, size, true)
                })
                .map_err(io::Error::other)?;
            if !writer.is_opened().map_err(io::Error::other)? {
                return Err(io::Error::other(format!("cannot open video writer {}", path)));
            }
            self.writer = Some(writer);
        }
        self.writer
            .as_mut()
            .ok_or_else(|| io::Error::other("video writer unavailable"))
    }
}

/// Draw the nose height and the jump verdict onto a copy of the frame
fn annotate(image: &Mat, annotation: &FrameAnnotation) -> opencv::Result<Mat> {
    let mut out = image.try_clone()?;
    let width = out.cols();
    let green = Scalar::new(0.0, 255.0, 0.0, 0.0);
    let red = Scalar::new(0.0, 0.0, 255.0, 0.0);

    if let Some(position) = annotation.position {
        let y = (position * out.rows() as f32) as i32;
        imgproc::line(
            &mut out,
            Point::new(0, y),
            Point::new(width, y),
            green,
            2,
            imgproc::LINE_8,
            0,
        )?;
    }
    if let Some(change) = annotation.y_change {
        imgproc::put_text(
            &mut out,
            &format!("y change: {:+.3}", change),
            Point::new(10, 30),
            imgproc::FONT_HERSHEY_SIMPLEX,
            0.8,
            green,
            2,
            imgproc::LINE_8,
            false,
        )?;
    }
    if annotation.jump {
        imgproc::put_text(
            &mut out,
            "JUMP",
            Point::new(10, 70),
            imgproc::FONT_HERSHEY_SIMPLEX,
            1.2,
            red,
            3,
            imgproc::LINE_8,
            false,
        )?;
    }
    Ok(out)
}

impl VideoSink<LiveFrame> for AnnotatedVideoSink {
    fn append(&mut self, frame: &LiveFrame, annotation: &FrameAnnotation) -> io::Result<()> {
        if self.finished {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "video already finished"));
        }
        let annotated = annotate(&frame.image, annotation).map_err(io::Error::other)?;
        self.writer(Size::new(frame.width, frame.height))?
            .write(&annotated)
            .map_err(io::Error::other)?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        self.finished = true;
        if let Some(mut writer) = self.writer.take() {
            writer.release().map_err(io::Error::other)?;
            log::info!("Video closed ({} frames)", self.written);
        }
        Ok(())
    }
}
