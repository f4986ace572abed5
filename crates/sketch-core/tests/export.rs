//! Export Tests
//!
//! PNG and GIF output, encoder availability and recording session bookkeeping.

use image::codecs::gif::GifDecoder;
use image::AnimationDecoder;
use sketch_core::export::{self, CapturedFrame, GifSettings, Mp4Settings, Recorder, Trigger};
use sketch_core::sketches::{ColumnSketch, ColumnVariant};
use sketch_core::video_wrapper::VideoSink;
use sketch_core::{Sketch, SketchError, SketchKind, Stage};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn fast_columns_stage() -> Stage {
    let mut stage = Stage::new(Box::new(ColumnSketch::default())).unwrap();
    stage.apply_control("long_side", "480").unwrap();
    stage.apply_control("speed", "3").unwrap();
    stage
}

#[test]
fn png_has_canvas_dimensions() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mut stage = Stage::new(SketchKind::Columns(ColumnVariant::Sunrise).build(None)).unwrap();
    let path = dir.path().join(export::still::default_file_name(&stage));
    assert!(path.ends_with("columns-gradient.png"));

    export::save_png(&mut stage, &path).unwrap();

    let img = image::open(&path).unwrap();
    assert_eq!((img.width(), img.height()), (1280, 720));
}

/// One loop at speed 3 lasts 2π/3 s, so 10 fps yields round(20.94) = 21 frames.
#[test]
fn gif_holds_exactly_one_loop() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("loop.gif");
    let mut stage = fast_columns_stage();
    let settings = GifSettings {
        fps: 10,
        loop_count: 1,
        speed: 30,
    };
    let mut trigger = Trigger::new("Export GIF");
    let mut progress = Vec::new();

    let written =
        export::export_loop_gif(&mut stage, &settings, &path, &mut trigger, |p| progress.push(p))
            .unwrap();

    assert_eq!(written, 21);
    assert_eq!(progress.len(), 21);
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(progress.last(), Some(&100));
    assert!(trigger.is_enabled());
    assert_eq!(trigger.label(), "Export GIF");
    assert!(stage.clock().is_live());

    let bytes = std::fs::read(&path).unwrap();
    assert!(bytes.windows(11).any(|w| w == b"NETSCAPE2.0"));

    let decoder = GifDecoder::new(BufReader::new(File::open(&path).unwrap())).unwrap();
    let frames = decoder.into_frames().collect_frames().unwrap();
    assert_eq!(frames.len(), 21);
    for frame in &frames {
        let (numer, denom) = frame.delay().numer_denom_ms();
        assert_eq!(numer as f64 / denom as f64, 100.0);
        assert_eq!(frame.buffer().dimensions(), (480, 480));
    }
}

#[test]
fn gif_first_and_last_frames_meet() {
    let mut stage = fast_columns_stage();
    let settings = GifSettings {
        fps: 10,
        ..GifSettings::default()
    };
    let period = stage.sketch().loop_period().unwrap();
    let total = settings.frame_count(period) as u64;

    let mut run = stage.deterministic(settings.fps);
    let first = run.capture_frame(0).unwrap();
    let wrap = run.capture_frame(total).unwrap();
    let last = run.capture_frame(total - 1).unwrap();
    assert_ne!(first, last);

    // Frame `total` lands within half a frame of the period, i.e. near frame 0.
    let diff = first
        .rgba
        .iter()
        .zip(&wrap.rgba)
        .filter(|(a, b)| a.abs_diff(**b) > 24)
        .count();
    assert!(diff < first.rgba.len() / 20, "{} channels differ", diff);
}

/// Paints black and counts how many frames were drawn.
struct CountingSketch {
    draws: Arc<AtomicUsize>,
}

impl Sketch for CountingSketch {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn file_stem(&self) -> &'static str {
        "counting"
    }

    fn canvas_size(&self) -> (u32, u32) {
        (8, 8)
    }

    fn loop_period(&self) -> Option<f64> {
        Some(10.0)
    }

    fn draw(&mut self, pixmap: &mut tiny_skia::Pixmap, _elapsed: f64) -> Result<(), SketchError> {
        pixmap.fill(tiny_skia::Color::BLACK);
        self.draws.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn apply_control(&mut self, id: &str, _raw: &str) -> Result<(), SketchError> {
        Err(SketchError::InvalidControl {
            id: id.to_string(),
            reason: "no controls".into(),
        })
    }

    fn step_control(&mut self, id: &str, _delta: i64) -> Result<i64, SketchError> {
        self.apply_control(id, "").map(|_| 0)
    }

    fn describe_controls(&self) -> Vec<sketch_core::controls::ControlDescriptor> {
        Vec::new()
    }
}

/// Frames are encoded as they are drawn, so progress starts after the first frame
/// rather than after the whole loop has been rendered.
#[test]
fn gif_reports_progress_as_frames_are_encoded() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let draws = Arc::new(AtomicUsize::new(0));
    let mut stage = Stage::new(Box::new(CountingSketch {
        draws: draws.clone(),
    }))
    .unwrap();
    let settings = GifSettings {
        fps: 20,
        loop_count: 1,
        speed: 30,
    };
    let mut trigger = Trigger::new("Export GIF");
    let mut draws_at_progress = Vec::new();

    let written = export::export_loop_gif(
        &mut stage,
        &settings,
        &dir.path().join("count.gif"),
        &mut trigger,
        |_| draws_at_progress.push(draws.load(Ordering::SeqCst)),
    )
    .unwrap();

    assert_eq!(written, 200);
    assert_eq!(draws_at_progress.first(), Some(&1));
    assert_eq!(draws_at_progress.len(), 200);
    assert!(draws_at_progress.iter().enumerate().all(|(i, d)| *d == i + 1));
}

#[test]
fn flow_has_no_loop_to_export() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mut stage = Stage::new(SketchKind::Flow.build(Some((64, 64)))).unwrap();
    let mut trigger = Trigger::new("Export GIF");

    let result = export::export_loop_gif(
        &mut stage,
        &GifSettings::default(),
        &dir.path().join("flow.gif"),
        &mut trigger,
        |_| {},
    );

    assert!(matches!(result, Err(SketchError::NoLoopPeriod(_))));
    assert!(trigger.is_enabled());
    assert!(stage.clock().is_live());
}

#[test]
fn columns_without_speed_have_no_loop() {
    let dir = tempfile::tempdir().unwrap();
    let mut stage = fast_columns_stage();
    stage.apply_control("speed", "0").unwrap();
    let mut trigger = Trigger::new("Export GIF");

    let result = export::export_loop_gif(
        &mut stage,
        &GifSettings::default(),
        &dir.path().join("still.gif"),
        &mut trigger,
        |_| {},
    );
    assert!(matches!(result, Err(SketchError::NoLoopPeriod(_))));
}

#[test]
fn mp4_settings_and_names() {
    let stage = Stage::new(Box::new(ColumnSketch::default())).unwrap();
    let settings = Mp4Settings::default();
    assert_eq!(settings.frame_count(), 150);
    assert_eq!(
        export::video::default_file_name(&stage, &settings),
        "columns-gradient-5s.mp4"
    );
}

#[cfg(not(feature = "video-rs"))]
#[test]
fn mp4_reports_missing_encoder_and_restores_trigger() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.mp4");
    let mut stage = fast_columns_stage();
    let mut trigger = Trigger::new("Export MP4");

    let result = export::export_mp4(&mut stage, &Mp4Settings::default(), &path, &mut trigger);

    assert!(matches!(result, Err(SketchError::EncoderUnavailable(_))));
    assert!(trigger.is_enabled());
    assert_eq!(trigger.label(), "Export MP4");
    assert!(!path.exists());
    assert!(stage.clock().is_live());
}

#[cfg(not(feature = "video-rs"))]
#[test]
fn webm_reports_missing_encoder() {
    let dir = tempfile::tempdir().unwrap();
    let mut recorder = Recorder::default();
    let result = recorder.start_webm(&dir.path().join("out.webm"), (64, 64));
    assert!(matches!(result, Err(SketchError::EncoderUnavailable(_))));
    assert!(!recorder.is_recording());
    assert!(recorder.trigger().is_enabled());
}

#[derive(Clone, Default)]
struct MemorySink {
    times: Arc<Mutex<Vec<f64>>>,
    finished: Arc<AtomicBool>,
}

impl VideoSink for MemorySink {
    fn encode(&mut self, _frame: &CapturedFrame, time: f64) -> anyhow::Result<()> {
        self.times.lock().unwrap().push(time);
        Ok(())
    }

    fn finish(self: Box<Self>) -> anyhow::Result<()> {
        self.finished.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct FailingSink;

impl VideoSink for FailingSink {
    fn encode(&mut self, _frame: &CapturedFrame, _time: f64) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("disk full"))
    }

    fn finish(self: Box<Self>) -> anyhow::Result<()> {
        Ok(())
    }
}

fn tiny_frame() -> CapturedFrame {
    CapturedFrame {
        width: 2,
        height: 2,
        rgba: vec![255; 16],
    }
}

#[test]
fn recorder_refuses_a_second_session() {
    init_tracing();
    let sink = MemorySink::default();
    let mut recorder = Recorder::default();

    recorder.begin(Box::new(sink.clone())).unwrap();
    assert!(recorder.is_recording());
    assert!(!recorder.trigger().is_enabled());
    assert_eq!(recorder.trigger().label(), "Recording...");

    assert!(matches!(
        recorder.begin(Box::new(MemorySink::default())),
        Err(SketchError::AlreadyRecording)
    ));
    assert!(matches!(
        recorder.start_webm(Path::new("second.webm"), (2, 2)),
        Err(SketchError::AlreadyRecording)
    ));

    for k in 0..3 {
        recorder.push_frame(tiny_frame(), k as f64 / 60.0).unwrap();
    }
    let summary = recorder.stop().unwrap();

    assert_eq!(summary.chunks, 3);
    assert_eq!(sink.times.lock().unwrap().len(), 3);
    assert!(sink.finished.load(Ordering::SeqCst));
    assert!(!recorder.is_recording());
    assert!(recorder.trigger().is_enabled());
    assert_eq!(recorder.trigger().label(), "Record WebM");

    // A new session can start once the previous one stopped.
    recorder.begin(Box::new(MemorySink::default())).unwrap();
    recorder.stop().unwrap();
}

#[test]
fn recorder_recovers_from_encoder_failure() {
    init_tracing();
    let mut recorder = Recorder::default();
    recorder.begin(Box::new(FailingSink)).unwrap();

    let pushed = recorder.push_frame(tiny_frame(), 0.0);
    let stopped = recorder.stop();

    assert!(pushed.is_err() || stopped.is_err());
    assert!(!recorder.is_recording());
    assert!(recorder.trigger().is_enabled());
    assert_eq!(recorder.trigger().label(), "Record WebM");
}

#[test]
fn recorder_rejects_remote_destinations() {
    let mut recorder = Recorder::default();
    let result = recorder.start_webm(Path::new("http://example.com/clip.webm"), (64, 64));
    assert!(matches!(result, Err(SketchError::InsecureContext(_))));
    assert!(!recorder.is_recording());
}

#[test]
fn push_without_session_fails() {
    let mut recorder = Recorder::default();
    assert!(recorder.push_frame(tiny_frame(), 0.0).is_err());
}
