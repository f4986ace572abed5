//! # Sketches Module
//!
//! The two pattern families and a small factory for hosts.
//!
//! ## Submodules
//! - `flow`: Flow-warped stripe gradient.
//! - `columns`: Sliding gradient columns with declared variants.

pub mod columns;
pub mod flow;

pub use columns::{ColumnParams, ColumnSketch, ColumnVariant, WaveOrder};
pub use flow::{FlowParams, FlowSketch, GradientType};

use crate::sketch::Sketch;
use std::fmt;
use std::str::FromStr;

/// Selects a pattern family.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SketchKind {
    Flow,
    Columns(ColumnVariant),
}

impl SketchKind {
    /// Builds a sketch with its default parameters. `size` only applies to sketches
    /// whose canvas follows the host (flow); column canvases derive their own size.
    pub fn build(self, size: Option<(u32, u32)>) -> Box<dyn Sketch> {
        match self {
            SketchKind::Flow => Box::new(FlowSketch::new(
                FlowParams::default(),
                size.unwrap_or(flow::DEFAULT_FLOW_SIZE),
            )),
            SketchKind::Columns(variant) => Box::new(ColumnSketch::from_variant(variant)),
        }
    }
}

impl fmt::Display for SketchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SketchKind::Flow => write!(f, "flow"),
            SketchKind::Columns(variant) => write!(f, "columns:{}", variant),
        }
    }
}

impl FromStr for SketchKind {
    type Err = String;

    /// Accepts `flow`, `columns`, or `columns:<variant>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            None if s == "flow" => Ok(SketchKind::Flow),
            None if s == "columns" => Ok(SketchKind::Columns(ColumnVariant::Classic)),
            Some(("columns", variant)) => Ok(SketchKind::Columns(variant.parse()?)),
            _ => Err(format!("unknown sketch '{}'", s)),
        }
    }
}
