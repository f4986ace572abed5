use thiserror::Error;

#[derive(Error, Debug)]
pub enum SketchError {
    #[error("Failed to allocate a {0}x{1} canvas")]
    MissingCanvas(u32, u32),
    #[error("Encoder backend unavailable: {0}")]
    EncoderUnavailable(String),
    #[error("No supported recording codec (tried {0})")]
    UnsupportedMimeType(String),
    #[error("Recording destination must be a local file: {0}")]
    InsecureContext(String),
    #[error("Recorder failed to start: {0}")]
    RecorderInit(String),
    #[error("Encoder error: {0}")]
    Encoder(String),
    #[error("A recording session is already active")]
    AlreadyRecording,
    #[error("Sketch '{0}' has no loop period at the current speed")]
    NoLoopPeriod(String),
    #[error("Invalid control '{id}': {reason}")]
    InvalidControl { id: String, reason: String },
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl SketchError {
    pub(crate) fn invalid_control(id: &str, reason: impl Into<String>) -> Self {
        Self::InvalidControl {
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}
