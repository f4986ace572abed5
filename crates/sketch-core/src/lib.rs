//! # Sketch Core
//!
//! `sketch-core` renders animated generative gradients frame by frame and exports them as
//! stills, seamless GIF loops and video.
//!
//! Two pattern families are provided:
//!
//! *   **Flow**: Stripes of a multi-stop gradient warped by a seeded fractal noise field,
//!     painted as a grid of flat cells.
//! *   **Columns**: Vertical columns that each carry the same five-stop gradient and slide
//!     up and down on phase-shifted sine waves.
//!
//! ## Core Features
//!
//! *   **Deterministic Time**: Exports render every frame from a frame index, never from
//!     wall-clock time, so the same parameters always produce the same pixels.
//! *   **Control Panels**: Each sketch describes its tunable parameters as serializable
//!     control descriptors and accepts raw widget input by id.
//! *   **Export**: PNG via `image`, GIF loops via `image`'s GIF encoder, MP4 and WebM through
//!     FFmpeg when the `video-rs` feature is enabled.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sketch_core::{export, SketchKind, Stage};
//! use std::path::Path;
//!
//! let sketch = "columns:sunrise".parse::<SketchKind>().unwrap().build(None);
//! let mut stage = Stage::new(sketch).unwrap();
//! stage.apply_control("speed", "1.5").unwrap();
//! export::save_png(&mut stage, Path::new("columns-gradient.png")).unwrap();
//! ```

/// Slider, color, select, stepper and number controls bound to sketch parameters.
pub mod controls;

pub mod errors;

/// Still, GIF, MP4 and live WebM export.
pub mod export;

/// Seeded fractal value noise.
pub mod noise;

/// The `Sketch` trait implemented by every pattern family.
pub mod sketch;

/// Flow and column pattern generators.
pub mod sketches;

/// Owns a sketch, its canvas and the active time cursor.
pub mod stage;

/// Live and deterministic time sources.
pub mod time;

/// Shared data structures (colors, aspect formats).
pub mod types;

/// Video encoding through FFmpeg.
pub mod video_wrapper;

pub use errors::SketchError;
pub use sketch::Sketch;
pub use sketches::SketchKind;
pub use stage::Stage;
pub use time::TimeCursor;
