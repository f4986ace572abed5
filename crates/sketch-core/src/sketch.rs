use crate::controls::ControlDescriptor;
use crate::errors::SketchError;
use tiny_skia::Pixmap;

/// A self-contained pattern generator: parameter record, control panel and frame synthesis.
///
/// Implementations must be pure functions of their parameters and `elapsed`; two calls
/// to [`Sketch::draw`] with the same parameters and time produce identical pixels.
pub trait Sketch: Send {
    /// Short identifier (`"flow"`, `"columns"`).
    fn name(&self) -> &'static str;

    /// Base name for exported files.
    fn file_stem(&self) -> &'static str;

    /// Canvas size in pixels. Changes only when size-related parameters change.
    fn canvas_size(&self) -> (u32, u32);

    /// Seconds until the animation repeats, if it does.
    fn loop_period(&self) -> Option<f64>;

    /// Paints the frame for `elapsed` seconds onto `pixmap`.
    ///
    /// `pixmap` always matches [`Sketch::canvas_size`].
    fn draw(&mut self, pixmap: &mut Pixmap, elapsed: f64) -> Result<(), SketchError>;

    /// Routes raw widget input to the control named `id`.
    fn apply_control(&mut self, id: &str, raw: &str) -> Result<(), SketchError>;

    /// Presses a stepper control `delta` times.
    fn step_control(&mut self, id: &str, delta: i64) -> Result<i64, SketchError>;

    fn describe_controls(&self) -> Vec<ControlDescriptor>;

    /// Host window resize. Sketches sized by their own controls ignore it.
    fn resize(&mut self, _width: u32, _height: u32) {}
}
