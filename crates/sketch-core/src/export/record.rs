//! # Live Recording
//!
//! A [`Recorder`] captures frames while the stage keeps running in live time and
//! streams them to a WebM encoder on a dedicated thread.
//!
//! Frames ("chunks") are handed over through a bounded channel, so a slow encoder
//! applies back-pressure to the render loop instead of buffering without limit.

use super::{CapturedFrame, Trigger};
use crate::errors::SketchError;
use crate::stage::Stage;
use crate::time::frame_interval;
use crate::video_wrapper::{
    backend_available, codec_available, even_dimensions, Encoder, EncoderSettings, VideoCodec,
    VideoSink,
};
use crossbeam_channel::{bounded, Sender};
use std::path::Path;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

const CHANNEL_CAPACITY: usize = 8;

/// Preference order for the recording codec.
const CODEC_PREFERENCE: [VideoCodec; 2] = [VideoCodec::Vp9, VideoCodec::Vp8];

#[derive(Clone, Debug, PartialEq)]
pub struct RecordSettings {
    /// Session length in seconds.
    pub seconds: f64,
    pub fps: u32,
    /// Bits per second.
    pub bitrate: usize,
}

impl Default for RecordSettings {
    fn default() -> Self {
        Self {
            seconds: 10.0,
            fps: 60,
            bitrate: 8_000_000,
        }
    }
}

/// What a finished session produced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordingSummary {
    /// Chunks the encoder accepted.
    pub chunks: usize,
    pub duration: Duration,
}

struct Chunk {
    frame: CapturedFrame,
    time: f64,
}

struct Session {
    sender: Sender<Chunk>,
    worker: JoinHandle<anyhow::Result<usize>>,
    started: Instant,
}

/// Owns at most one recording session and the control that starts it.
pub struct Recorder {
    settings: RecordSettings,
    trigger: Trigger,
    session: Option<Session>,
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new(RecordSettings::default())
    }
}

impl Recorder {
    pub fn new(settings: RecordSettings) -> Self {
        Self {
            settings,
            trigger: Trigger::new("Record WebM"),
            session: None,
        }
    }

    pub fn settings(&self) -> &RecordSettings {
        &self.settings
    }

    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    /// Opens a WebM encoder at `dest` and starts a session.
    ///
    /// Checks run in order: an active session, a non-local destination, then codec
    /// support (VP9 preferred over VP8).
    #[instrument(level = "info", skip(self))]
    pub fn start_webm(&mut self, dest: &Path, size: (u32, u32)) -> Result<VideoCodec, SketchError> {
        if self.is_recording() {
            return Err(SketchError::AlreadyRecording);
        }
        ensure_local_destination(dest)?;
        let codec = select_codec()?;

        let settings = EncoderSettings::preset_webm(
            size.0 as usize,
            size.1 as usize,
            self.settings.fps,
            codec,
            self.settings.bitrate,
        )
        .even_size();
        let dest = dest.to_path_buf();
        self.spawn_session(move || {
            let encoder = Encoder::new(&dest, &settings)?;
            Ok(Box::new(encoder) as Box<dyn VideoSink>)
        })?;
        info!(mime = codec.mime(), "recording started");
        Ok(codec)
    }

    /// Starts a session that feeds an already open `sink`.
    pub fn begin(&mut self, sink: Box<dyn VideoSink + Send>) -> Result<(), SketchError> {
        self.spawn_session(move || Ok(sink as Box<dyn VideoSink>))
    }

    /// Spawns the encoder thread and opens the sink on it.
    ///
    /// Returns once the sink is open, so an open failure surfaces here as
    /// `RecorderInit` and no session is left behind.
    fn spawn_session<F>(&mut self, open: F) -> Result<(), SketchError>
    where
        F: FnOnce() -> anyhow::Result<Box<dyn VideoSink>> + Send + 'static,
    {
        if self.is_recording() {
            return Err(SketchError::AlreadyRecording);
        }

        let (sender, receiver) = bounded::<Chunk>(CHANNEL_CAPACITY);
        let (ready_tx, ready_rx) = bounded::<Result<(), String>>(1);
        let worker = thread::Builder::new()
            .name("webm-encoder".into())
            .spawn(move || -> anyhow::Result<usize> {
                let mut sink = match open() {
                    Ok(sink) => {
                        let _ = ready_tx.send(Ok(()));
                        sink
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return Err(e);
                    }
                };
                let mut chunks = 0usize;
                for chunk in receiver.iter() {
                    sink.encode(&chunk.frame, chunk.time)?;
                    chunks += 1;
                }
                sink.finish()?;
                Ok(chunks)
            })
            .map_err(|e| SketchError::RecorderInit(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(reason)) => {
                let _ = worker.join();
                return Err(SketchError::RecorderInit(reason));
            }
            Err(_) => {
                let _ = worker.join();
                return Err(SketchError::RecorderInit(
                    "encoder thread exited before opening".into(),
                ));
            }
        }

        self.trigger.disable("Recording...");
        self.session = Some(Session {
            sender,
            worker,
            started: Instant::now(),
        });
        Ok(())
    }

    /// Queues one frame presented at `time` seconds into the session.
    pub fn push_frame(&mut self, frame: CapturedFrame, time: f64) -> Result<(), SketchError> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| SketchError::Encoder("no active recording".into()))?;

        if session.sender.send(Chunk { frame, time }).is_err() {
            // The worker hung up early, which only happens on an encode failure.
            return match self.stop() {
                Ok(_) => Err(SketchError::Encoder("encoder thread exited early".into())),
                Err(e) => Err(e),
            };
        }
        Ok(())
    }

    /// Ends the session: flushes the encoder and finalizes the file.
    ///
    /// The recording flag is cleared and the trigger re-enabled even when finalizing fails.
    #[instrument(level = "info", skip(self))]
    pub fn stop(&mut self) -> Result<RecordingSummary, SketchError> {
        let Some(session) = self.session.take() else {
            debug!("stop without an active recording");
            return Ok(RecordingSummary::default());
        };
        self.trigger.restore();

        let duration = session.started.elapsed();
        drop(session.sender);
        let chunks = session
            .worker
            .join()
            .map_err(|_| SketchError::Encoder("encoder thread panicked".into()))?
            .map_err(|e| SketchError::Encoder(e.to_string()))?;

        info!(chunks, seconds = duration.as_secs_f64(), "recording finished");
        Ok(RecordingSummary { chunks, duration })
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if self.is_recording() {
            if let Err(e) = self.stop() {
                warn!("recording dropped mid-session: {}", e);
            }
        }
    }
}

fn ensure_local_destination(dest: &Path) -> Result<(), SketchError> {
    let raw = dest.to_string_lossy();
    if raw.contains("://") {
        return Err(SketchError::InsecureContext(raw.into_owned()));
    }
    Ok(())
}

fn select_codec() -> Result<VideoCodec, SketchError> {
    if !backend_available() {
        return Err(SketchError::EncoderUnavailable(
            "built without the video-rs feature".into(),
        ));
    }
    CODEC_PREFERENCE
        .into_iter()
        .find(|codec| codec_available(*codec))
        .ok_or_else(|| {
            let tried: Vec<&str> = CODEC_PREFERENCE.iter().map(|c| c.mime()).collect();
            SketchError::UnsupportedMimeType(tried.join(", "))
        })
}

/// Records the live stage into `dest` for the configured duration.
///
/// Frames are rendered at the recorder's frame rate against wall-clock time. The session
/// is stopped on every path, so a failed frame never leaves the recorder busy.
#[instrument(level = "info", skip(stage, recorder), fields(sketch = stage.sketch().name()))]
pub fn record_live(
    stage: &mut Stage,
    recorder: &mut Recorder,
    dest: &Path,
) -> Result<RecordingSummary, SketchError> {
    stage.render()?;
    recorder.start_webm(dest, stage.size())?;

    let pumped = pump_frames(stage, recorder);
    let summary = recorder.stop();
    pumped?;
    summary
}

fn pump_frames(stage: &mut Stage, recorder: &mut Recorder) -> Result<(), SketchError> {
    let interval = frame_interval(recorder.settings.fps);
    let length = Duration::from_secs_f64(recorder.settings.seconds.max(0.0));
    let (width, height) = stage.size();
    let (width, height) = even_dimensions(width as usize, height as usize);
    let started = Instant::now();
    let mut next = started;

    while started.elapsed() < length {
        let time = started.elapsed().as_secs_f64();
        stage.render()?;
        recorder.push_frame(stage.capture().padded(width as u32, height as u32), time)?;

        next += interval;
        let now = Instant::now();
        if next > now {
            thread::sleep(next - now);
        } else {
            next = now;
        }
    }
    Ok(())
}
