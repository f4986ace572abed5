//! # Export Module
//!
//! Still, animated and recorded output of a [`Stage`](crate::stage::Stage).
//!
//! ## Responsibilities
//! - **Still**: PNG snapshot of the current frame.
//! - **GIF**: One seamless loop rendered at fixed time steps.
//! - **Video**: Fixed-step MP4 (H.264) through the FFmpeg encoder.
//! - **Recording**: Live WebM capture session with a single-session guard.
//!
//! Every exporter locks a [`Trigger`] (the control that started it) for its
//! duration and restores it afterwards, whether the export succeeded or not.

pub mod gif;
pub mod record;
pub mod still;
pub mod video;

pub use gif::{export_loop_gif, GifSettings};
pub use record::{record_live, RecordSettings, Recorder};
pub use still::save_png;
pub use video::{export_mp4, Mp4Settings};

use ndarray::ArrayView3;
use tiny_skia::Pixmap;

/// One captured canvas state (straight RGBA, row-major).
#[derive(Clone, Debug, PartialEq)]
pub struct CapturedFrame {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl CapturedFrame {
    pub fn from_pixmap(pixmap: &Pixmap) -> Self {
        let mut rgba = Vec::with_capacity(pixmap.data().len());
        for px in pixmap.pixels() {
            let c = px.demultiply();
            rgba.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        Self {
            width: pixmap.width(),
            height: pixmap.height(),
            rgba,
        }
    }

    /// View as a `(height, width, 4)` array for the video encoder.
    pub fn as_array(&self) -> Result<ArrayView3<'_, u8>, ndarray::ShapeError> {
        ArrayView3::from_shape(
            (self.height as usize, self.width as usize, 4),
            self.rgba.as_slice(),
        )
    }

    /// Grows the frame to `width` x `height` by repeating the last column and row.
    ///
    /// Sizes smaller than the frame leave it unchanged.
    pub fn padded(self, width: u32, height: u32) -> Self {
        if width <= self.width && height <= self.height {
            return self;
        }
        let (width, height) = (width.max(self.width), height.max(self.height));
        let mut rgba = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            let src_y = y.min(self.height - 1);
            let row = (src_y * self.width * 4) as usize;
            rgba.extend_from_slice(&self.rgba[row..row + (self.width * 4) as usize]);
            let last = self.pixel(self.width - 1, src_y);
            for _ in self.width..width {
                rgba.extend_from_slice(&last);
            }
        }
        Self {
            width,
            height,
            rgba,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * self.width + x) * 4) as usize;
        [
            self.rgba[i],
            self.rgba[i + 1],
            self.rgba[i + 2],
            self.rgba[i + 3],
        ]
    }
}

/// The control that launches an export: a label and an enabled flag.
#[derive(Clone, Debug, PartialEq)]
pub struct Trigger {
    idle_label: String,
    label: String,
    enabled: bool,
}

impl Trigger {
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            idle_label: label.clone(),
            label,
            enabled: true,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    /// Disables the control and shows `busy_label` until [`Trigger::restore`].
    pub fn disable(&mut self, busy_label: impl Into<String>) {
        self.enabled = false;
        self.label = busy_label.into();
    }

    /// Re-enables the control with its pre-export label.
    pub fn restore(&mut self) {
        self.enabled = true;
        self.label = self.idle_label.clone();
    }

    /// Disables the control for the lifetime of the returned guard.
    pub fn lock(&mut self, busy_label: impl Into<String>) -> TriggerGuard<'_> {
        self.disable(busy_label);
        TriggerGuard { trigger: self }
    }
}

/// Restores its [`Trigger`] when dropped.
pub struct TriggerGuard<'a> {
    trigger: &'a mut Trigger,
}

impl TriggerGuard<'_> {
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.trigger.set_label(label);
    }
}

impl Drop for TriggerGuard<'_> {
    fn drop(&mut self) {
        self.trigger.restore();
    }
}

/// Integer percentage of `done` out of `total`.
pub(crate) fn percent(done: usize, total: usize) -> u32 {
    if total == 0 {
        return 100;
    }
    ((done as f64 / total as f64) * 100.0).round() as u32
}
