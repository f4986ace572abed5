use super::{percent, Trigger};
use crate::errors::SketchError;
use crate::stage::Stage;
use crate::video_wrapper::{backend_available, Encoder, EncoderSettings, VideoSink};
use std::path::Path;
use std::time::Instant;
use tracing::{info, instrument};

#[derive(Clone, Debug, PartialEq)]
pub struct Mp4Settings {
    pub fps: u32,
    pub seconds: u32,
}

impl Default for Mp4Settings {
    fn default() -> Self {
        Self { fps: 30, seconds: 5 }
    }
}

impl Mp4Settings {
    pub fn frame_count(&self) -> u64 {
        self.fps as u64 * self.seconds as u64
    }
}

/// Renders `fps * seconds` fixed-step frames and encodes them to an H.264 MP4 at `path`.
///
/// Frames are encoded into a scratch directory first and only copied to `path` once
/// the file is finalized, so a failed export never leaves a partial file behind.
#[instrument(level = "info", skip(stage, trigger), fields(sketch = stage.sketch().name()))]
pub fn export_mp4(
    stage: &mut Stage,
    settings: &Mp4Settings,
    path: &Path,
    trigger: &mut Trigger,
) -> Result<(), SketchError> {
    if !backend_available() {
        return Err(SketchError::EncoderUnavailable(
            "built without the video-rs feature".into(),
        ));
    }

    let mut guard = trigger.lock("Preparing frames... 0%");
    let start_time = Instant::now();

    let (width, height) = stage.sketch().canvas_size();
    let encoder_settings =
        EncoderSettings::preset_h264_yuv420p(width as usize, height as usize, settings.fps)
            .even_size();
    let total = settings.frame_count();
    let workdir = tempfile::tempdir()?;
    let scratch = workdir.path().join("out.mp4");

    let mut encoder = Encoder::new(&scratch, &encoder_settings)
        .map_err(|e| SketchError::Encoder(e.to_string()))?;

    encode_frames(stage, settings, &encoder_settings, &mut encoder, |k| {
        if k % 10 == 0 {
            guard.set_label(format!(
                "Preparing frames... {}%",
                percent(k as usize, total as usize)
            ));
        }
    })?;

    guard.set_label("Exporting...");
    Box::new(encoder)
        .finish()
        .map_err(|e| SketchError::Encoder(e.to_string()))?;
    std::fs::copy(&scratch, path)?;

    info!(
        frames = total,
        width = encoder_settings.width,
        height = encoder_settings.height,
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "mp4 written"
    );
    Ok(())
}

/// Renders `fps * seconds` fixed-step frames into `sink`, padded to the encoder's size.
fn encode_frames(
    stage: &mut Stage,
    settings: &Mp4Settings,
    encoder_settings: &EncoderSettings,
    sink: &mut dyn VideoSink,
    mut on_frame: impl FnMut(u64),
) -> Result<(), SketchError> {
    let (width, height) = (encoder_settings.width as u32, encoder_settings.height as u32);
    let mut run = stage.deterministic(settings.fps);
    for k in 0..settings.frame_count() {
        let frame = run.capture_frame(k)?.padded(width, height);
        let time = k as f64 / settings.fps.max(1) as f64;
        sink.encode(&frame, time)
            .map_err(|e| SketchError::Encoder(e.to_string()))?;
        on_frame(k);
    }
    Ok(())
}

/// `<stem>-<seconds>s.mp4`
pub fn default_file_name(stage: &Stage, settings: &Mp4Settings) -> String {
    format!("{}-{}s.mp4", stage.sketch().file_stem(), settings.seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::CapturedFrame;
    use crate::sketches::ColumnSketch;

    #[derive(Default)]
    struct FrameLog {
        sizes: Vec<(u32, u32)>,
        times: Vec<f64>,
    }

    impl VideoSink for FrameLog {
        fn encode(&mut self, frame: &CapturedFrame, time: f64) -> anyhow::Result<()> {
            assert_eq!(frame.rgba.len(), (frame.width * frame.height * 4) as usize);
            self.sizes.push((frame.width, frame.height));
            self.times.push(time);
            Ok(())
        }

        fn finish(self: Box<Self>) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn portrait_frames_are_padded_to_even_size() {
        let mut stage = Stage::new(Box::new(ColumnSketch::default())).unwrap();
        stage.apply_control("format", "9:16").unwrap();
        let (w, h) = stage.sketch().canvas_size();
        assert_eq!((w, h), (405, 720));

        let settings = Mp4Settings { fps: 4, seconds: 1 };
        let encoder_settings =
            EncoderSettings::preset_h264_yuv420p(w as usize, h as usize, settings.fps).even_size();
        let mut log = FrameLog::default();
        let mut seen = Vec::new();

        encode_frames(&mut stage, &settings, &encoder_settings, &mut log, |k| seen.push(k)).unwrap();

        assert_eq!(seen, vec![0, 1, 2, 3]);
        assert!(log.sizes.iter().all(|s| *s == (406, 720)));
        assert_eq!(log.times, vec![0.0, 0.25, 0.5, 0.75]);
        assert!(stage.clock().is_live());
    }
}
