use crate::errors::SketchError;
use crate::stage::Stage;
use image::{ColorType, ImageFormat};
use std::path::Path;
use tracing::{info, instrument};

/// Renders the current frame and saves it as a PNG.
#[instrument(level = "info", skip(stage), fields(sketch = stage.sketch().name()))]
pub fn save_png(stage: &mut Stage, path: &Path) -> Result<(), SketchError> {
    stage.render()?;
    let frame = stage.capture();
    image::save_buffer_with_format(
        path,
        &frame.rgba,
        frame.width,
        frame.height,
        ColorType::Rgba8,
        ImageFormat::Png,
    )?;
    info!(width = frame.width, height = frame.height, "saved still");
    Ok(())
}

/// `<stem>.png`
pub fn default_file_name(stage: &Stage) -> String {
    format!("{}.png", stage.sketch().file_stem())
}
