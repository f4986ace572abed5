//! # Sliding Columns
//!
//! Partitions the canvas into equal columns, each filled with a five-stop vertical
//! gradient that slides up and down on a phase-shifted sine wave.
//!
//! ## Key Functions
//! - `column_layout`: Column rectangles for a width, count and gutter.
//! - `column_phase`: Phase offset from the distance to the center column.
//! - `column_offset`: Vertical offset `amplitude * sin(t + phase)`.
//!
//! Several artifacts share this component and differ only in their defaults; see
//! [`ColumnVariant`].

use crate::controls::{ControlDescriptor, ControlPanel};
use crate::errors::SketchError;
use crate::sketch::Sketch;
use crate::types::{AspectFormat, Color};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::fmt;
use std::str::FromStr;
use tiny_skia::{GradientStop, LinearGradient, Paint, Pixmap, Point, Rect, SpreadMode, Transform};

/// Fixed stop positions, top to bottom.
pub const GRADIENT_STOPS: [f32; 5] = [0.00, 0.22, 0.58, 0.82, 1.00];

/// Which columns lead the wave.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WaveOrder {
    /// The middle column leads; phase grows toward the edges.
    CenterFirst,
    /// The outer columns lead; phase grows toward the middle.
    OutsideFirst,
}

impl fmt::Display for WaveOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaveOrder::CenterFirst => write!(f, "center-first"),
            WaveOrder::OutsideFirst => write!(f, "outside-first"),
        }
    }
}

impl FromStr for WaveOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "center-first" => Ok(WaveOrder::CenterFirst),
            "outside-first" => Ok(WaveOrder::OutsideFirst),
            other => Err(format!("unknown wave order '{}'", other)),
        }
    }
}

/// Tunables for the sliding-column sketch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnParams {
    pub format: AspectFormat,
    /// Length of the longer canvas side in pixels.
    pub long_side: u32,

    pub column_count: u32,
    /// Gap between adjacent columns in pixels.
    pub gutter: f64,
    /// Opacity of the seam lines (0 disables them).
    pub seam_alpha: f64,

    /// Gradient colors, top to bottom.
    pub colors: [String; 5],

    /// Vertical travel in pixels.
    pub amplitude: f64,
    pub speed: f64,
    /// Phase delay per column of distance from the center.
    pub phase_step: f64,
    pub wave_order: WaveOrder,
}

impl Default for ColumnParams {
    fn default() -> Self {
        ColumnVariant::Classic.params()
    }
}

/// Declared default configurations for the column artifacts.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnVariant {
    /// Square, seven columns, violet-blue-red-white bands.
    Classic,
    /// Visible gutters without seams, cooler palette.
    Guttered,
    /// Widescreen, warm palette, edges lead.
    Sunrise,
}

impl ColumnVariant {
    pub const ALL: [ColumnVariant; 3] = [
        ColumnVariant::Classic,
        ColumnVariant::Guttered,
        ColumnVariant::Sunrise,
    ];

    pub fn params(&self) -> ColumnParams {
        let classic = ColumnParams {
            format: AspectFormat::Square,
            long_side: 720,
            column_count: 7,
            gutter: 0.0,
            seam_alpha: 0.10,
            colors: [
                "#552080".to_string(),
                "#006DD5".to_string(),
                "#FF1F2D".to_string(),
                "#FF3300".to_string(),
                "#FFFFFF".to_string(),
            ],
            amplitude: 55.0,
            speed: 0.8,
            phase_step: 0.35,
            wave_order: WaveOrder::CenterFirst,
        };

        match self {
            ColumnVariant::Classic => classic,
            ColumnVariant::Guttered => ColumnParams {
                column_count: 9,
                gutter: 6.0,
                seam_alpha: 0.0,
                colors: [
                    "#0B1D51".to_string(),
                    "#1E5AA8".to_string(),
                    "#7F3C8D".to_string(),
                    "#E0569B".to_string(),
                    "#F7D6E0".to_string(),
                ],
                amplitude: 40.0,
                ..classic
            },
            ColumnVariant::Sunrise => ColumnParams {
                format: AspectFormat::Landscape,
                long_side: 1280,
                colors: [
                    "#2B1055".to_string(),
                    "#7597DE".to_string(),
                    "#FF6F61".to_string(),
                    "#FFB347".to_string(),
                    "#FFF4E0".to_string(),
                ],
                speed: 0.6,
                phase_step: 0.25,
                wave_order: WaveOrder::OutsideFirst,
                ..classic
            },
        }
    }
}

impl fmt::Display for ColumnVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnVariant::Classic => write!(f, "classic"),
            ColumnVariant::Guttered => write!(f, "guttered"),
            ColumnVariant::Sunrise => write!(f, "sunrise"),
        }
    }
}

impl FromStr for ColumnVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ColumnVariant::ALL
            .into_iter()
            .find(|v| v.to_string() == s)
            .ok_or_else(|| format!("unknown column variant '{}'", s))
    }
}

/// Horizontal extent of one column.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ColumnRect {
    pub x: f64,
    pub width: f64,
}

impl ColumnRect {
    pub fn right(&self) -> f64 {
        self.x + self.width
    }
}

/// Splits `canvas_width` into `count` equal columns separated by `gutter`.
///
/// Each column is `(W - (n-1) * gutter) / n` wide. A gutter too wide for the canvas is
/// shrunk so every column keeps a non-negative width inside the canvas.
pub fn column_layout(canvas_width: f64, count: u32, gutter: f64) -> Vec<ColumnRect> {
    let n = count.max(1);
    let gaps = (n - 1) as f64;
    let mut gutter = gutter.max(0.0);
    if gaps > 0.0 && gutter * gaps > canvas_width {
        gutter = canvas_width / gaps;
    }
    let width = ((canvas_width - gaps * gutter) / n as f64).max(0.0);

    (0..n)
        .map(|i| ColumnRect {
            x: i as f64 * (width + gutter),
            width,
        })
        .collect()
}

/// Phase offset of column `index` out of `count`.
pub fn column_phase(index: usize, count: usize, order: WaveOrder, phase_step: f64) -> f64 {
    let center = (count.max(1) - 1) as f64 / 2.0;
    let dist = (index as f64 - center).abs();
    let rank = match order {
        WaveOrder::CenterFirst => dist,
        WaveOrder::OutsideFirst => center - dist,
    };
    rank * phase_step
}

/// Vertical offset of a column at animation time `t` (already scaled by speed).
pub fn column_offset(t: f64, amplitude: f64, phase: f64) -> f64 {
    (t + phase).sin() * amplitude
}

/// Pairs the five colors with the fixed stop positions.
pub fn gradient_stops(colors: &[Color; 5]) -> [(f32, Color); 5] {
    let mut stops = [(0.0, Color::BLACK); 5];
    for (i, stop) in stops.iter_mut().enumerate() {
        *stop = (GRADIENT_STOPS[i], colors[i]);
    }
    stops
}

fn column_panel() -> ControlPanel<ColumnParams> {
    let mut panel = ControlPanel::<ColumnParams>::new()
        .select(
            "format",
            "Format",
            &AspectFormat::OPTIONS,
            |p| p.format.to_string(),
            |p, v| {
                if let Ok(f) = v.parse() {
                    p.format = f
                }
            },
        )
        .slider(
            "long_side",
            "Long Side (px)",
            (480.0, 1600.0, 10.0),
            |p| p.long_side as f64,
            |p, v| p.long_side = v as u32,
        )
        .stepper(
            "column_count",
            "Columns",
            (5, 25),
            |p| p.column_count as i64,
            |p, v| p.column_count = v as u32,
        )
        .slider("gutter", "Gutter", (0.0, 12.0, 1.0), |p| p.gutter, |p, v| p.gutter = v)
        .slider(
            "seam_alpha",
            "Seam Alpha",
            (0.0, 0.35, 0.01),
            |p| p.seam_alpha,
            |p, v| p.seam_alpha = v,
        );

    const COLOR_CONTROLS: [(&str, &str); 5] = [
        ("color1", "Color 1 (Top)"),
        ("color2", "Color 2"),
        ("color3", "Color 3"),
        ("color4", "Color 4"),
        ("color5", "Color 5 (Bottom)"),
    ];
    for (i, (id, label)) in COLOR_CONTROLS.into_iter().enumerate() {
        panel = panel.color(
            id,
            label,
            move |p| p.colors[i].clone(),
            move |p, v| p.colors[i] = v,
        );
    }

    panel
        .slider(
            "amplitude",
            "Amplitude",
            (0.0, 140.0, 1.0),
            |p| p.amplitude,
            |p, v| p.amplitude = v,
        )
        .slider("speed", "Speed", (0.0, 3.0, 0.01), |p| p.speed, |p, v| p.speed = v)
        .slider(
            "phase_step",
            "Phase Step",
            (0.0, 1.2, 0.01),
            |p| p.phase_step,
            |p, v| p.phase_step = v,
        )
        .select(
            "wave_order",
            "Wave Order",
            &["center-first", "outside-first"],
            |p| p.wave_order.to_string(),
            |p, v| {
                if let Ok(o) = v.parse() {
                    p.wave_order = o
                }
            },
        )
}

/// The sliding-column sketch.
pub struct ColumnSketch {
    pub params: ColumnParams,
    panel: ControlPanel<ColumnParams>,
}

impl ColumnSketch {
    pub fn new(params: ColumnParams) -> Self {
        Self {
            params,
            panel: column_panel(),
        }
    }

    pub fn from_variant(variant: ColumnVariant) -> Self {
        Self::new(variant.params())
    }

    /// Animation time for `elapsed` seconds.
    pub fn time(&self, elapsed: f64) -> f64 {
        elapsed * self.params.speed
    }

    pub fn layout(&self) -> Vec<ColumnRect> {
        let (w, _) = self.canvas_size();
        column_layout(w as f64, self.params.column_count, self.params.gutter)
    }

    /// Vertical offset of every column at `elapsed` seconds.
    pub fn offsets(&self, elapsed: f64) -> Vec<f64> {
        let n = self.params.column_count.max(1) as usize;
        let t = self.time(elapsed);
        (0..n)
            .map(|i| {
                let phase = column_phase(i, n, self.params.wave_order, self.params.phase_step);
                column_offset(t, self.params.amplitude, phase)
            })
            .collect()
    }

    fn resolved_colors(&self) -> [Color; 5] {
        let mut colors = [Color::BLACK; 5];
        for (slot, hex) in colors.iter_mut().zip(&self.params.colors) {
            *slot = Color::from_hex(hex).unwrap_or(Color::BLACK);
        }
        colors
    }
}

impl Default for ColumnSketch {
    fn default() -> Self {
        Self::from_variant(ColumnVariant::Classic)
    }
}

impl Sketch for ColumnSketch {
    fn name(&self) -> &'static str {
        "columns"
    }

    fn file_stem(&self) -> &'static str {
        "columns-gradient"
    }

    fn canvas_size(&self) -> (u32, u32) {
        self.params.format.output_size(self.params.long_side.max(1))
    }

    fn loop_period(&self) -> Option<f64> {
        if self.params.speed > 0.0 {
            Some(TAU / self.params.speed)
        } else {
            None
        }
    }

    fn draw(&mut self, pixmap: &mut Pixmap, elapsed: f64) -> Result<(), SketchError> {
        pixmap.fill(tiny_skia::Color::BLACK);
        let height = pixmap.height() as f32;

        let stops = gradient_stops(&self.resolved_colors());
        let layout = self.layout();
        let offsets = self.offsets(elapsed);

        let mut paint = Paint::default();
        paint.anti_alias = true;

        for (column, y_off) in layout.iter().zip(offsets) {
            let y_off = y_off as f32;
            let shader = LinearGradient::new(
                Point::from_xy(0.0, y_off),
                Point::from_xy(0.0, height + y_off),
                stops
                    .iter()
                    .map(|(pos, c)| GradientStop::new(*pos, c.to_skia()))
                    .collect(),
                SpreadMode::Pad,
                Transform::identity(),
            );
            let (Some(shader), Some(rect)) = (
                shader,
                Rect::from_xywh(column.x as f32, 0.0, column.width as f32, height),
            ) else {
                continue;
            };
            paint.shader = shader;
            pixmap.fill_rect(rect, &paint, Transform::identity(), None);
        }

        if self.params.seam_alpha > 0.0 {
            let alpha = (255.0 * self.params.seam_alpha.clamp(0.0, 1.0)).round() as u8;
            let mut seam = Paint::default();
            seam.anti_alias = false;
            seam.set_color_rgba8(0, 0, 0, alpha);

            let gutter = layout
                .get(1)
                .map(|c| c.x - layout[0].right())
                .unwrap_or(0.0);
            for column in layout.iter().skip(1) {
                let sx = column.x - gutter * 0.5;
                if let Some(rect) = Rect::from_xywh(sx as f32, 0.0, 1.0, height) {
                    pixmap.fill_rect(rect, &seam, Transform::identity(), None);
                }
            }
        }

        Ok(())
    }

    fn apply_control(&mut self, id: &str, raw: &str) -> Result<(), SketchError> {
        self.panel.dispatch(&mut self.params, id, raw)
    }

    fn step_control(&mut self, id: &str, delta: i64) -> Result<i64, SketchError> {
        self.panel.step(&mut self.params, id, delta)
    }

    fn describe_controls(&self) -> Vec<ControlDescriptor> {
        self.panel.describe(&self.params)
    }
}
