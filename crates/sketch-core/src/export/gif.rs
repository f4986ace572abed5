//! # GIF Export
//!
//! Renders exactly one animation loop (or `loop_count` loops) at a fixed frame rate
//! and encodes it as an endlessly repeating GIF. Each frame is handed to the encoder
//! as soon as it is drawn, so only the compressed stream is held in memory.

use super::{percent, Trigger};
use crate::errors::SketchError;
use crate::stage::Stage;
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, RgbaImage};
use std::path::Path;
use tracing::{debug, info, instrument};

#[derive(Clone, Debug, PartialEq)]
pub struct GifSettings {
    /// Playback rate of the output.
    pub fps: u32,
    /// Number of animation cycles in the file.
    pub loop_count: u32,
    /// Quantizer speed, 1 (best) to 30 (fastest).
    pub speed: i32,
}

impl Default for GifSettings {
    fn default() -> Self {
        Self {
            fps: 20,
            loop_count: 1,
            speed: 10,
        }
    }
}

impl GifSettings {
    /// `round(period * fps * loop_count)`
    pub fn frame_count(&self, period_secs: f64) -> usize {
        (period_secs * self.fps as f64 * self.loop_count as f64).round() as usize
    }

    pub fn frame_delay(&self) -> Delay {
        Delay::from_numer_denom_ms(1000, self.fps.max(1))
    }
}

/// Renders one loop of the stage's sketch into a GIF at `path`.
///
/// `progress` receives the percentage after every encoded frame. Returns the number
/// of frames written.
#[instrument(level = "info", skip(stage, trigger, progress), fields(sketch = stage.sketch().name(), fps = settings.fps))]
pub fn export_loop_gif(
    stage: &mut Stage,
    settings: &GifSettings,
    path: &Path,
    trigger: &mut Trigger,
    mut progress: impl FnMut(u32),
) -> Result<usize, SketchError> {
    let period = stage
        .sketch()
        .loop_period()
        .filter(|p| p.is_finite() && *p > 0.0)
        .ok_or_else(|| SketchError::NoLoopPeriod(stage.sketch().name().to_string()))?;
    let total = settings.frame_count(period);
    info!(period, frames = total, "exporting loop");

    let mut guard = trigger.lock("Preparing frames...");

    let delay = settings.frame_delay();
    let mut bytes = Vec::new();
    {
        let mut encoder = GifEncoder::new_with_speed(&mut bytes, settings.speed.clamp(1, 30));
        encoder.set_repeat(Repeat::Infinite)?;

        let mut run = stage.deterministic(settings.fps);
        for i in 0..total {
            let frame = run.capture_frame(i as u64)?;
            let (w, h) = (frame.width, frame.height);
            let buffer = RgbaImage::from_raw(w, h, frame.rgba)
                .ok_or_else(|| SketchError::Encoder(format!("frame {} has the wrong size", i)))?;
            encoder.encode_frame(Frame::from_parts(buffer, 0, 0, delay))?;

            let pct = percent(i + 1, total);
            guard.set_label(format!("Exporting... {}%", pct));
            progress(pct);
            debug!(frame = i, pct, "encoded frame");
        }
    }

    std::fs::write(path, &bytes)?;
    info!(bytes = bytes.len(), "gif written");
    Ok(total)
}

/// `<stem>.gif`
pub fn default_file_name(stage: &Stage) -> String {
    format!("{}.gif", stage.sketch().file_stem())
}
