//! # Stage
//!
//! Owns one sketch, its canvas and the time cursor. The stage is the render loop:
//! every `render` draws the sketch at the cursor's elapsed time.
//!
//! Exporters switch the stage into deterministic mode with [`Stage::deterministic`].
//! The returned [`DeterministicRun`] borrows the stage exclusively, so live rendering
//! and a second export cannot interleave with it, and dropping it always restores
//! the live cursor, including on early return through `?`.

use crate::controls::ControlDescriptor;
use crate::errors::SketchError;
use crate::export::CapturedFrame;
use crate::sketch::Sketch;
use crate::time::TimeCursor;
use tiny_skia::Pixmap;
use tracing::{debug, instrument};

pub struct Stage {
    sketch: Box<dyn Sketch>,
    pixmap: Pixmap,
    clock: TimeCursor,
}

impl Stage {
    pub fn new(sketch: Box<dyn Sketch>) -> Result<Self, SketchError> {
        let (w, h) = sketch.canvas_size();
        let pixmap = Pixmap::new(w, h).ok_or(SketchError::MissingCanvas(w, h))?;
        Ok(Self {
            sketch,
            pixmap,
            clock: TimeCursor::live(),
        })
    }

    pub fn sketch(&self) -> &dyn Sketch {
        self.sketch.as_ref()
    }

    pub fn clock(&self) -> TimeCursor {
        self.clock
    }

    /// Seconds on the active time cursor.
    pub fn elapsed(&self) -> f64 {
        self.clock.elapsed()
    }

    /// Canvas size of the last rendered frame.
    pub fn size(&self) -> (u32, u32) {
        (self.pixmap.width(), self.pixmap.height())
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Copies the current canvas into an export buffer entry.
    pub fn capture(&self) -> CapturedFrame {
        CapturedFrame::from_pixmap(&self.pixmap)
    }

    /// Reallocates the canvas if the sketch's size parameters changed.
    fn sync_canvas(&mut self) -> Result<(), SketchError> {
        let (w, h) = self.sketch.canvas_size();
        if (w, h) != self.size() {
            debug!(width = w, height = h, "resizing canvas");
            self.pixmap = Pixmap::new(w, h).ok_or(SketchError::MissingCanvas(w, h))?;
        }
        Ok(())
    }

    /// Draws the frame for the active time cursor.
    pub fn render(&mut self) -> Result<&Pixmap, SketchError> {
        let elapsed = self.clock.elapsed();
        self.render_at(elapsed)
    }

    /// Draws the frame for an explicit elapsed time, ignoring the cursor.
    pub fn render_at(&mut self, elapsed: f64) -> Result<&Pixmap, SketchError> {
        self.sync_canvas()?;
        self.sketch.draw(&mut self.pixmap, elapsed)?;
        Ok(&self.pixmap)
    }

    /// Routes raw widget input to the sketch's control panel.
    pub fn apply_control(&mut self, id: &str, raw: &str) -> Result<(), SketchError> {
        self.sketch.apply_control(id, raw)?;
        self.sync_canvas()
    }

    pub fn step_control(&mut self, id: &str, delta: i64) -> Result<i64, SketchError> {
        let value = self.sketch.step_control(id, delta)?;
        self.sync_canvas()?;
        Ok(value)
    }

    /// Forwards a host resize to the sketch and reallocates the canvas to match.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), SketchError> {
        self.sketch.resize(width, height);
        self.sync_canvas()
    }

    pub fn describe_controls(&self) -> Vec<ControlDescriptor> {
        self.sketch.describe_controls()
    }

    /// Suspends live time and hands out a fixed-step renderer at `fps`.
    #[instrument(level = "debug", skip(self), fields(sketch = self.sketch.name()))]
    pub fn deterministic(&mut self, fps: u32) -> DeterministicRun<'_> {
        let resume = self.clock;
        let fps = fps.max(1);
        self.clock = TimeCursor::Deterministic { frame: 0, fps };
        DeterministicRun {
            stage: self,
            resume,
            fps,
        }
    }
}

/// Fixed-frame rendering session. Restores the previous live cursor on drop.
pub struct DeterministicRun<'a> {
    stage: &'a mut Stage,
    resume: TimeCursor,
    fps: u32,
}

impl DeterministicRun<'_> {
    pub fn clock(&self) -> TimeCursor {
        self.stage.clock
    }

    /// Renders frame `index` synchronously.
    pub fn render_frame(&mut self, index: u64) -> Result<&Pixmap, SketchError> {
        self.stage.clock = TimeCursor::Deterministic {
            frame: index,
            fps: self.fps,
        };
        self.stage.render()
    }

    /// Renders frame `index` and copies it out.
    pub fn capture_frame(&mut self, index: u64) -> Result<CapturedFrame, SketchError> {
        self.render_frame(index)?;
        Ok(self.stage.capture())
    }
}

impl Drop for DeterministicRun<'_> {
    fn drop(&mut self) {
        self.stage.clock = self.resume;
        debug!("resumed live time");
    }
}
