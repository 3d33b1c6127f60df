//! Application wiring and the host loop
//!
//! `run` acquires every resource (camera, pose backend, video sink,
//! terminal), then hands them to `run_session`, which ticks the game at a
//! fixed rate until the player quits. The gesture detector is closed exactly
//! once on every exit path.

use std::fs::File;
use std::io::BufReader;
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::consts::*;
use crate::error::{AppError, SetupError};
#[cfg(feature = "camera")]
use crate::gesture::live::{self, AnnotatedVideoSink, LiveFrame, MoveNetBackend, WebcamSource};
use crate::gesture::{
    Capture, FrameSource, GestureDetector, JsonlSink, NullSink, PoseBackend, TraceBackend,
    TraceCamera, TraceFrame, VideoSink,
};
use crate::input::{self, EventSource, RawEvent};
use crate::platform::{Renderer, TerminalEvents, TerminalGuard, TerminalRenderer};
use crate::session::{FrameInput, Session, Step};
use crate::settings::{CameraSettings, Settings};

/// Detector replaying a pose trace (or idle when the camera is disabled)
pub type TraceDetector =
    GestureDetector<TraceCamera<BufReader<File>>, TraceBackend, Box<dyn VideoSink<TraceFrame>>>;

/// Detector on a live webcam
#[cfg(feature = "camera")]
pub type WebcamDetector =
    GestureDetector<WebcamSource, MoveNetBackend, Box<dyn VideoSink<LiveFrame>>>;

/// The detector picked by `CameraSettings`
pub enum Detector {
    Trace(TraceDetector),
    #[cfg(feature = "camera")]
    Webcam(WebcamDetector),
}

/// Seed from settings, or from the wall clock
pub fn session_seed(settings: &Settings) -> u64 {
    settings.seed.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
    })
}

/// Annotated frame log as configured, for any serializable frame
fn frame_log<F: Serialize + 'static>(
    settings: &Settings,
) -> Result<Box<dyn VideoSink<F>>, SetupError> {
    Ok(match &settings.video_sink {
        Some(path) => Box::new(JsonlSink::create(path)?),
        None => Box::new(NullSink),
    })
}

/// Open camera, pose backend and sink as configured
pub fn open_detector(settings: &Settings) -> Result<Detector, AppError> {
    let camera = match &settings.camera {
        CameraSettings::Webcam { index, model } => return open_webcam(settings, *index, model),
        CameraSettings::Trace { path } => TraceCamera::open(path)?,
        CameraSettings::Disabled => {
            log::info!("Camera disabled; taps only");
            TraceCamera::disabled()
        }
    };
    let capture = Capture::open(camera, TraceBackend, frame_log(settings)?);
    Ok(Detector::Trace(GestureDetector::new(
        capture,
        JUMP_THRESHOLD,
        settings.vertical_axis,
    )))
}

/// The model loads before the device opens, so a bad model path fails
/// without touching the camera
#[cfg(feature = "camera")]
fn open_webcam(
    settings: &Settings,
    index: i32,
    model: &std::path::Path,
) -> Result<Detector, AppError> {
    let backend = MoveNetBackend::load(model)?;
    let camera = WebcamSource::open(index)?;
    let sink: Box<dyn VideoSink<LiveFrame>> = match &settings.video_sink {
        Some(path) if live::is_video_path(path) => Box::new(AnnotatedVideoSink::new(path)),
        _ => frame_log(settings)?,
    };
    let capture = Capture::open(camera, backend, sink);
    Ok(Detector::Webcam(GestureDetector::new(
        capture,
        JUMP_THRESHOLD,
        settings.vertical_axis,
    )))
}

#[cfg(not(feature = "camera"))]
fn open_webcam(
    _settings: &Settings,
    index: i32,
    _model: &std::path::Path,
) -> Result<Detector, AppError> {
    log::error!("Camera {} requested but camera support is not built in", index);
    Err(SetupError::CameraSupportMissing.into())
}

/// Run the game in the terminal until the player quits
pub fn run(settings: &Settings) -> Result<(), AppError> {
    let seed = session_seed(settings);
    match open_detector(settings)? {
        Detector::Trace(detector) => play(detector, seed),
        #[cfg(feature = "camera")]
        Detector::Webcam(detector) => play(detector, seed),
    }
}

fn play<S, P, K>(detector: GestureDetector<S, P, K>, seed: u64) -> Result<(), AppError>
where
    S: FrameSource,
    P: PoseBackend<S::Frame>,
    K: VideoSink<S::Frame>,
{
    let mut session = Session::new(seed);

    // The guard outlives the loop so the terminal is restored after it
    let _terminal = TerminalGuard::enter()?;
    let mut renderer = TerminalRenderer::stdout().map_err(AppError::Display)?;
    let mut events = TerminalEvents;

    let pacing = Duration::from_secs_f64(1.0 / TARGET_FPS as f64);
    run_session(detector, &mut events, &mut renderer, &mut session, Some(pacing))
}

/// Tick the session until quit or failure, then release the detector.
///
/// Per tick: drain host events, stop on quit before touching the camera,
/// poll the gesture detector, step the session, present, then sleep out the
/// rest of the frame if `pacing` is set.
pub fn run_session<S, P, K, E, R>(
    mut detector: GestureDetector<S, P, K>,
    events: &mut E,
    renderer: &mut R,
    session: &mut Session,
    pacing: Option<Duration>,
) -> Result<(), AppError>
where
    S: FrameSource,
    P: PoseBackend<S::Frame>,
    K: VideoSink<S::Frame>,
    E: EventSource,
    R: Renderer,
{
    log::info!("Running");
    let mut raw: Vec<RawEvent> = Vec::new();

    let result = loop {
        let frame_start = Instant::now();

        raw.clear();
        if let Err(e) = events.drain(&mut raw) {
            break Err(AppError::Input(e));
        }
        let scan = input::scan(&raw);
        let gesture_jump = !scan.quit && detector.poll();

        let frame = FrameInput {
            quit: scan.quit,
            tapped: scan.tapped,
            gesture_jump,
        };
        if session.step(&frame) == Step::Quit {
            break Ok(());
        }

        if let Err(e) = renderer.present(session) {
            break Err(AppError::Display(e));
        }

        if let Some(frame_dur) = pacing {
            let elapsed = frame_start.elapsed();
            if elapsed < frame_dur {
                thread::sleep(frame_dur - elapsed);
            }
        }
    };

    if let Err(e) = &result {
        log::error!("Game loop stopped: {}", e);
    }
    detector.close();
    result
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io;

    use super::*;
    use crate::gesture::VerticalAxis;
    use crate::gesture::capture::mock;
    use crate::input::Key;
    use crate::sim::GamePhase;

    /// Scripted events; quits once the script runs out
    struct ScriptedEvents {
        ticks: VecDeque<Vec<RawEvent>>,
        fail: bool,
    }

    impl ScriptedEvents {
        fn new(ticks: Vec<Vec<RawEvent>>) -> Self {
            Self {
                ticks: ticks.into(),
                fail: false,
            }
        }
    }

    impl EventSource for ScriptedEvents {
        fn drain(&mut self, out: &mut Vec<RawEvent>) -> io::Result<()> {
            if self.fail {
                return Err(io::Error::other("event queue closed"));
            }
            match self.ticks.pop_front() {
                Some(events) => out.extend(events),
                None => out.push(RawEvent::Quit),
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingRenderer {
        phases: Vec<GamePhase>,
        fail_after: Option<usize>,
    }

    impl Renderer for RecordingRenderer {
        fn present(&mut self, session: &Session) -> io::Result<()> {
            if self.fail_after == Some(self.phases.len()) {
                return Err(io::Error::other("display lost"));
            }
            self.phases.push(session.phase());
            Ok(())
        }
    }

    fn detector(heights: &[Option<f32>]) -> (mock::MockCapture, mock::Counters) {
        let (capture, counters, _) = mock::capture(heights);
        (capture, counters)
    }

    fn assert_released_once(counters: &mock::Counters) {
        assert_eq!(counters.closed.get(), 1);
        assert_eq!(counters.shutdown.get(), 1);
        assert_eq!(counters.finished.get(), 1);
    }

    #[test]
    fn test_quit_on_splash_releases_once() {
        let (capture, counters) = detector(&[Some(0.5); 4]);
        let detector = GestureDetector::new(capture, JUMP_THRESHOLD, VerticalAxis::Down);
        let mut events = ScriptedEvents::new(vec![vec![], vec![]]);
        let mut renderer = RecordingRenderer::default();
        let mut session = Session::new(1);

        run_session(detector, &mut events, &mut renderer, &mut session, None).unwrap();

        assert_eq!(renderer.phases, vec![GamePhase::Splash, GamePhase::Splash]);
        assert_released_once(&counters);
    }

    #[test]
    fn test_quit_skips_camera_poll() {
        let (capture, counters) = detector(&[Some(0.5); 4]);
        let detector = GestureDetector::new(capture, JUMP_THRESHOLD, VerticalAxis::Down);
        let mut events = ScriptedEvents::new(vec![vec![RawEvent::KeyDown(Key::Escape)]]);
        let mut renderer = RecordingRenderer::default();
        let mut session = Session::new(1);

        run_session(detector, &mut events, &mut renderer, &mut session, None).unwrap();

        assert!(renderer.phases.is_empty());
        assert_eq!(counters.written.get(), 0);
        assert_released_once(&counters);
    }

    #[test]
    fn test_gesture_starts_and_quit_during_play() {
        // Nose rises on the second frame
        let (capture, counters) = detector(&[Some(0.50), Some(0.45), Some(0.45), Some(0.45)]);
        let detector = GestureDetector::new(capture, JUMP_THRESHOLD, VerticalAxis::Down);
        let mut events = ScriptedEvents::new(vec![vec![], vec![], vec![]]);
        let mut renderer = RecordingRenderer::default();
        let mut session = Session::new(1);

        run_session(detector, &mut events, &mut renderer, &mut session, None).unwrap();

        assert_eq!(
            renderer.phases,
            vec![GamePhase::Splash, GamePhase::Play, GamePhase::Play]
        );
        assert_released_once(&counters);
    }

    #[test]
    fn test_quit_during_game_over() {
        let (capture, counters) = detector(&[]);
        let detector = GestureDetector::new(capture, JUMP_THRESHOLD, VerticalAxis::Down);
        let tap = vec![RawEvent::KeyDown(Key::Space)];
        // Start, then fall onto the floor without flapping
        let mut script = vec![tap];
        script.extend(std::iter::repeat_n(vec![], 60));
        let mut events = ScriptedEvents::new(script);
        let mut renderer = RecordingRenderer::default();
        let mut session = Session::new(4);

        run_session(detector, &mut events, &mut renderer, &mut session, None).unwrap();

        assert_eq!(renderer.phases.last(), Some(&GamePhase::GameOver));
        assert_eq!(session.rounds(), 1);
        assert_released_once(&counters);
    }

    #[test]
    fn test_display_failure_still_releases() {
        let (capture, counters) = detector(&[Some(0.5); 4]);
        let detector = GestureDetector::new(capture, JUMP_THRESHOLD, VerticalAxis::Down);
        let mut events = ScriptedEvents::new(vec![vec![]; 10]);
        let mut renderer = RecordingRenderer {
            fail_after: Some(2),
            ..Default::default()
        };
        let mut session = Session::new(1);

        let result = run_session(detector, &mut events, &mut renderer, &mut session, None);

        assert!(matches!(result, Err(AppError::Display(_))));
        assert_released_once(&counters);
    }

    #[test]
    fn test_input_failure_still_releases() {
        let (capture, counters) = detector(&[]);
        let detector = GestureDetector::new(capture, JUMP_THRESHOLD, VerticalAxis::Down);
        let mut events = ScriptedEvents::new(vec![]);
        events.fail = true;
        let mut renderer = RecordingRenderer::default();
        let mut session = Session::new(1);

        let result = run_session(detector, &mut events, &mut renderer, &mut session, None);

        assert!(matches!(result, Err(AppError::Input(_))));
        assert_released_once(&counters);
    }

    #[test]
    fn test_seed_from_settings() {
        let settings = Settings {
            seed: Some(99),
            ..Settings::default()
        };
        assert_eq!(session_seed(&settings), 99);
    }

    fn trace_detector(detector: Detector) -> TraceDetector {
        match detector {
            Detector::Trace(detector) => detector,
            #[cfg(feature = "camera")]
            Detector::Webcam(_) => panic!("expected a trace detector"),
        }
    }

    #[test]
    fn test_open_detector_without_camera() {
        let settings = Settings {
            camera: CameraSettings::Disabled,
            video_sink: None,
            ..Settings::default()
        };
        let mut detector = trace_detector(open_detector(&settings).unwrap());
        assert!(!detector.poll());
        detector.close();
    }

    #[test]
    fn test_default_settings_open_without_files() {
        // Nothing on disk is needed to start with the defaults
        let settings = Settings {
            video_sink: None,
            ..Settings::default()
        };
        #[cfg(not(feature = "camera"))]
        {
            let mut detector = trace_detector(open_detector(&settings).unwrap());
            assert!(!detector.poll());
            detector.close();
        }
        #[cfg(feature = "camera")]
        assert!(matches!(settings.camera, CameraSettings::Webcam { .. }));
    }

    #[test]
    fn test_open_detector_missing_trace_fails() {
        let settings = Settings {
            camera: CameraSettings::Trace {
                path: "/nonexistent/trace.jsonl".into(),
            },
            video_sink: None,
            ..Settings::default()
        };
        assert!(matches!(open_detector(&settings), Err(AppError::Setup(_))));
    }

    #[cfg(not(feature = "camera"))]
    #[test]
    fn test_webcam_needs_camera_support() {
        let settings = Settings {
            camera: CameraSettings::Webcam {
                index: 0,
                model: "movenet.onnx".into(),
            },
            video_sink: None,
            ..Settings::default()
        };
        assert!(matches!(
            open_detector(&settings),
            Err(AppError::Setup(SetupError::CameraSupportMissing))
        ));
    }

    #[cfg(feature = "camera")]
    #[test]
    fn test_webcam_missing_model_fails_before_camera() {
        let settings = Settings {
            camera: CameraSettings::Webcam {
                index: 0,
                model: "/nonexistent/movenet.onnx".into(),
            },
            video_sink: None,
            ..Settings::default()
        };
        assert!(matches!(
            open_detector(&settings),
            Err(AppError::Setup(SetupError::PoseModel { .. }))
        ));
    }
}
