//! # Flow Stripes
//!
//! A three-stop gradient displaced by a noise flow field, shaded by periodic stripe
//! ribs and an optional radial vignette. Rendered on a coarse grid of filled cells.
//!
//! The noise lattice is rebuilt from `seed` whenever the seed changes, so every frame
//! is a pure function of the parameters and the elapsed time.

use crate::controls::{ControlDescriptor, ControlPanel};
use crate::errors::SketchError;
use crate::noise::NoiseField;
use crate::sketch::Sketch;
use crate::types::{Color, ColorCache};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};
use std::fmt;
use std::str::FromStr;
use tiny_skia::{Paint, Pixmap, Rect, Transform};
use tracing::debug;

/// Animation time per second at speed 1 (0.01 per frame at 60 fps).
pub const FLOW_TIME_SCALE: f64 = 0.6;

/// Flow displacement in pixels per unit of flow strength.
const FLOW_DISPLACEMENT: f64 = 60.0;

/// Default canvas size when no stage size is given.
pub const DEFAULT_FLOW_SIZE: (u32, u32) = (800, 800);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradientType {
    Linear,
    Radial,
}

impl fmt::Display for GradientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradientType::Linear => write!(f, "linear"),
            GradientType::Radial => write!(f, "radial"),
        }
    }
}

impl FromStr for GradientType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(GradientType::Linear),
            "radial" => Ok(GradientType::Radial),
            other => Err(format!("unknown gradient type '{}'", other)),
        }
    }
}

/// Tunables for the flow-stripe sketch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlowParams {
    pub gradient_type: GradientType,
    pub color1: String,
    pub color2: String,
    pub color3: String,
    pub gradient_scale: f64,
    /// Degrees.
    pub angle: f64,

    pub speed: f64,
    pub seed: f64,

    /// Grid step in pixels.
    pub cell_size: f64,

    pub flow_strength: f64,
    pub flow_scale: f64,
    pub flow_turbulence: f64,

    pub stripe_count: f64,
    pub stripe_warp: f64,
    pub stripe_depth: f64,
    pub stripe_offset: f64,
    pub stripe_speed: f64,

    pub contrast: f64,
    pub vignette: f64,
}

impl Default for FlowParams {
    fn default() -> Self {
        Self {
            gradient_type: GradientType::Linear,
            color1: "#E91D2E".to_string(),
            color2: "#FE6A00".to_string(),
            color3: "#F4A800".to_string(),
            gradient_scale: 1.0,
            angle: 45.0,
            speed: 0.5,
            seed: 1234.0,
            cell_size: 10.0,
            flow_strength: 1.2,
            flow_scale: 2.2,
            flow_turbulence: 0.9,
            stripe_count: 90.0,
            stripe_warp: 0.8,
            stripe_depth: 0.55,
            stripe_offset: 10.0,
            stripe_speed: 1.2,
            contrast: 1.35,
            vignette: 0.35,
        }
    }
}

impl FlowParams {
    fn noise_seed(&self) -> u64 {
        self.seed.round() as i64 as u64
    }

    /// Effective grid step (never below 2 px).
    pub fn cell_step(&self) -> u32 {
        self.cell_size.round().max(2.0) as u32
    }
}

fn flow_panel() -> ControlPanel<FlowParams> {
    ControlPanel::<FlowParams>::new()
        .select(
            "gradient_type",
            "Gradient Type",
            &["linear", "radial"],
            |p| p.gradient_type.to_string(),
            |p, v| {
                if let Ok(t) = v.parse() {
                    p.gradient_type = t
                }
            },
        )
        .slider("angle", "Angle", (0.0, 360.0, 1.0), |p| p.angle, |p, v| p.angle = v)
        .slider(
            "gradient_scale",
            "Gradient Scale",
            (0.2, 3.0, 0.01),
            |p| p.gradient_scale,
            |p, v| p.gradient_scale = v,
        )
        .color("color1", "Color 1", |p| p.color1.clone(), |p, v| p.color1 = v)
        .color("color2", "Color 2", |p| p.color2.clone(), |p, v| p.color2 = v)
        .color("color3", "Color 3", |p| p.color3.clone(), |p, v| p.color3 = v)
        .slider("speed", "Speed", (0.0, 2.0, 0.01), |p| p.speed, |p, v| p.speed = v)
        .slider(
            "cell_size",
            "Cell Size",
            (2.0, 20.0, 1.0),
            |p| p.cell_size,
            |p, v| p.cell_size = v,
        )
        .number("seed", "Seed", |p| p.seed, |p, v| p.seed = v)
        .slider(
            "flow_strength",
            "Flow Strength",
            (0.0, 3.0, 0.01),
            |p| p.flow_strength,
            |p, v| p.flow_strength = v,
        )
        .slider(
            "flow_scale",
            "Flow Scale",
            (0.5, 6.0, 0.01),
            |p| p.flow_scale,
            |p, v| p.flow_scale = v,
        )
        .slider(
            "flow_turbulence",
            "Flow Turbulence",
            (0.1, 3.0, 0.01),
            |p| p.flow_turbulence,
            |p, v| p.flow_turbulence = v,
        )
        .slider(
            "stripe_count",
            "Stripe Count",
            (10.0, 200.0, 1.0),
            |p| p.stripe_count,
            |p, v| p.stripe_count = v,
        )
        .slider(
            "stripe_warp",
            "Stripe Warp",
            (0.0, 2.0, 0.01),
            |p| p.stripe_warp,
            |p, v| p.stripe_warp = v,
        )
        .slider(
            "stripe_depth",
            "Stripe Depth",
            (0.0, 1.0, 0.01),
            |p| p.stripe_depth,
            |p, v| p.stripe_depth = v,
        )
        .slider(
            "stripe_offset",
            "Stripe Offset",
            (0.0, 30.0, 0.1),
            |p| p.stripe_offset,
            |p, v| p.stripe_offset = v,
        )
        .slider(
            "stripe_speed",
            "Stripe Speed",
            (0.0, 3.0, 0.01),
            |p| p.stripe_speed,
            |p, v| p.stripe_speed = v,
        )
        .slider(
            "contrast",
            "Contrast",
            (0.8, 2.2, 0.01),
            |p| p.contrast,
            |p, v| p.contrast = v,
        )
        .slider(
            "vignette",
            "Vignette",
            (0.0, 0.8, 0.01),
            |p| p.vignette,
            |p, v| p.vignette = v,
        )
}

/// Per-frame constants shared by every cell.
struct FlowFrame<'a> {
    params: &'a FlowParams,
    noise: &'a NoiseField,
    stops: [Color; 3],
    width: f64,
    height: f64,
    t: f64,
}

impl FlowFrame<'_> {
    fn shade(&self, x: f64, y: f64) -> Color {
        let p = self.params;
        let u = x / self.width;
        let v = y / self.height;

        // Flow field
        let n1 = self.noise.sample(
            u * p.flow_scale,
            v * p.flow_scale,
            self.t * p.flow_turbulence,
        );
        let ang = n1 * TAU * 2.0;
        let fx = ang.cos() * p.flow_strength;
        let fy = ang.sin() * p.flow_strength;

        // Stripes + warp
        let phase =
            u * p.stripe_count + p.stripe_warp * (fx * 0.35 + fy * 0.15) + self.t * p.stripe_speed;
        let s = (phase * TAU).sin();
        let mask = (1.0 - p.stripe_depth) + p.stripe_depth * (0.5 + 0.5 * s);
        let shift = s * p.stripe_offset;

        let px = x + fx * FLOW_DISPLACEMENT + shift;
        let py = y + fy * FLOW_DISPLACEMENT;

        let mut col = self.sample_gradient(px / self.width, py / self.height);
        col = Color::BLACK.lerp(col, mask as f32);

        if p.vignette > 0.0 {
            let dx = u - 0.5;
            let dy = v - 0.5;
            let r = (dx * dx + dy * dy).sqrt();
            let vig = (1.0 - p.vignette * (r / 0.707).powf(1.8)).clamp(0.0, 1.0);
            col = Color::BLACK.lerp(col, vig as f32);
        }

        col
    }

    fn sample_gradient(&self, u: f64, v: f64) -> Color {
        let p = self.params;
        let u = u.clamp(0.0, 1.0);
        let v = v.clamp(0.0, 1.0);

        let g = match p.gradient_type {
            GradientType::Linear => {
                let a = p.angle * PI / 180.0;
                (u - 0.5) * a.cos() + (v - 0.5) * a.sin() + 0.5
            }
            GradientType::Radial => ((u - 0.5).powi(2) + (v - 0.5).powi(2)).sqrt() * p.gradient_scale,
        };
        let g = g.clamp(0.0, 1.0);

        let c = p.contrast.max(0.5);
        let g = ((g - 0.5) * c + 0.5).clamp(0.0, 1.0);

        let [c1, c2, c3] = self.stops;
        if g < 0.5 {
            c1.lerp(c2, (g * 2.0) as f32)
        } else {
            c2.lerp(c3, ((g - 0.5) * 2.0) as f32)
        }
    }
}

/// The flow-warped stripe sketch.
pub struct FlowSketch {
    pub params: FlowParams,
    size: (u32, u32),
    panel: ControlPanel<FlowParams>,
    colors: ColorCache,
    noise: NoiseField,
}

impl FlowSketch {
    pub fn new(params: FlowParams, size: (u32, u32)) -> Self {
        let noise = NoiseField::new(params.noise_seed());
        Self {
            params,
            size: (size.0.max(1), size.1.max(1)),
            panel: flow_panel(),
            colors: ColorCache::new(),
            noise,
        }
    }

    /// Number of color parses performed by the cache so far.
    pub fn color_parses(&self) -> usize {
        self.colors.parse_count()
    }

    fn refresh(&mut self) -> [Color; 3] {
        let seed = self.params.noise_seed();
        if self.noise.seed() != seed {
            debug!(seed, "reseeding noise lattice");
            self.noise = NoiseField::new(seed);
        }
        [
            self.colors.resolve(0, &self.params.color1),
            self.colors.resolve(1, &self.params.color2),
            self.colors.resolve(2, &self.params.color3),
        ]
    }
}

impl Default for FlowSketch {
    fn default() -> Self {
        Self::new(FlowParams::default(), DEFAULT_FLOW_SIZE)
    }
}

impl Sketch for FlowSketch {
    fn name(&self) -> &'static str {
        "flow"
    }

    fn file_stem(&self) -> &'static str {
        "gradient"
    }

    fn canvas_size(&self) -> (u32, u32) {
        self.size
    }

    fn loop_period(&self) -> Option<f64> {
        None
    }

    fn draw(&mut self, pixmap: &mut Pixmap, elapsed: f64) -> Result<(), SketchError> {
        let stops = self.refresh();
        pixmap.fill(tiny_skia::Color::BLACK);

        let frame = FlowFrame {
            params: &self.params,
            noise: &self.noise,
            stops,
            width: pixmap.width() as f64,
            height: pixmap.height() as f64,
            t: elapsed * FLOW_TIME_SCALE * self.params.speed,
        };

        let cs = self.params.cell_step();
        let xs: Vec<u32> = (0..pixmap.width()).step_by(cs as usize).collect();
        let ys: Vec<u32> = (0..pixmap.height()).step_by(cs as usize).collect();

        let rows: Vec<Vec<[u8; 4]>> = ys
            .par_iter()
            .map(|&y| {
                xs.iter()
                    .map(|&x| frame.shade(x as f64, y as f64).to_rgba8())
                    .collect()
            })
            .collect();

        let mut paint = Paint::default();
        paint.anti_alias = false;
        let side = (cs + 1) as f32;

        for (row, &y) in rows.iter().zip(&ys) {
            for (rgba, &x) in row.iter().zip(&xs) {
                paint.set_color_rgba8(rgba[0], rgba[1], rgba[2], rgba[3]);
                if let Some(rect) = Rect::from_xywh(x as f32, y as f32, side, side) {
                    pixmap.fill_rect(rect, &paint, Transform::identity(), None);
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

    /// The flow canvas follows the host window.
    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width.max(1), height.max(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(sketch: &mut FlowSketch, elapsed: f64) -> Vec<u8> {
        let (w, h) = sketch.canvas_size();
        let mut pixmap = Pixmap::new(w, h).unwrap();
        sketch.draw(&mut pixmap, elapsed).unwrap();
        pixmap.data().to_vec()
    }

    #[test]
    fn same_time_renders_same_pixels() {
        let mut sketch = FlowSketch::new(FlowParams::default(), (64, 48));
        let first = render(&mut sketch, 1.25);
        render(&mut sketch, 3.0);
        let again = render(&mut sketch, 1.25);
        assert_eq!(first, again);
    }

    #[test]
    fn seed_change_alters_the_frame() {
        let mut sketch = FlowSketch::new(FlowParams::default(), (64, 64));
        let before = render(&mut sketch, 0.5);
        sketch.apply_control("seed", "99").unwrap();
        let after = render(&mut sketch, 0.5);
        assert_ne!(before, after);
    }

    #[test]
    fn colors_are_parsed_once_per_change() {
        let mut sketch = FlowSketch::new(FlowParams::default(), (32, 32));
        render(&mut sketch, 0.0);
        render(&mut sketch, 0.1);
        assert_eq!(sketch.color_parses(), 3);

        sketch.apply_control("color2", "#00ff00").unwrap();
        render(&mut sketch, 0.2);
        assert_eq!(sketch.color_parses(), 4);
    }

    #[test]
    fn cell_step_has_a_floor() {
        let params = FlowParams {
            cell_size: 0.4,
            ..FlowParams::default()
        };
        assert_eq!(params.cell_step(), 2);
    }

    /// Red, green and blue stops on a 100 px square at t = 0 with no flow.
    fn still_frame<'a>(params: &'a FlowParams, noise: &'a NoiseField) -> FlowFrame<'a> {
        FlowFrame {
            params,
            noise,
            stops: [
                Color::new(1.0, 0.0, 0.0, 1.0),
                Color::new(0.0, 1.0, 0.0, 1.0),
                Color::new(0.0, 0.0, 1.0, 1.0),
            ],
            width: 100.0,
            height: 100.0,
            t: 0.0,
        }
    }

    fn flat() -> FlowParams {
        FlowParams {
            angle: 0.0,
            contrast: 1.0,
            flow_strength: 0.0,
            stripe_count: 1.0,
            stripe_offset: 0.0,
            stripe_speed: 0.0,
            stripe_depth: 0.0,
            vignette: 0.0,
            ..FlowParams::default()
        }
    }

    fn assert_rgb(color: Color, rgb: (f32, f32, f32), tolerance: f32) {
        let got = (color.r, color.g, color.b);
        assert!(
            (got.0 - rgb.0).abs() < tolerance
                && (got.1 - rgb.1).abs() < tolerance
                && (got.2 - rgb.2).abs() < tolerance,
            "{:?} != {:?}",
            got,
            rgb
        );
    }

    #[test]
    fn linear_gradient_blends_between_neighbouring_stops() {
        let params = flat();
        let noise = NoiseField::new(1);
        let frame = still_frame(&params, &noise);

        assert_rgb(frame.sample_gradient(0.0, 0.3), (1.0, 0.0, 0.0), 1e-5);
        assert_rgb(frame.sample_gradient(0.25, 0.9), (0.5, 0.5, 0.0), 1e-5);
        assert_rgb(frame.sample_gradient(0.75, 0.1), (0.0, 0.5, 0.5), 1e-5);
        // Out-of-range coordinates clamp to the edge stops.
        assert_rgb(frame.sample_gradient(1.4, 0.5), (0.0, 0.0, 1.0), 1e-5);
    }

    #[test]
    fn radial_gradient_scales_with_distance_from_center() {
        let params = FlowParams {
            gradient_type: GradientType::Radial,
            gradient_scale: 2.0,
            ..flat()
        };
        let noise = NoiseField::new(1);
        let frame = still_frame(&params, &noise);

        assert_rgb(frame.sample_gradient(0.5, 0.5), (1.0, 0.0, 0.0), 1e-5);
        // r = 0.1, g = 0.2
        assert_rgb(frame.sample_gradient(0.6, 0.5), (0.6, 0.4, 0.0), 1e-5);
        assert_rgb(frame.sample_gradient(0.5, 0.4), (0.6, 0.4, 0.0), 1e-5);
        // Corners saturate at the last stop.
        assert_rgb(frame.sample_gradient(0.0, 0.0), (0.0, 0.0, 1.0), 1e-5);
    }

    #[test]
    fn contrast_stretches_around_the_midpoint() {
        let noise = NoiseField::new(1);

        let params = FlowParams {
            contrast: 2.0,
            ..flat()
        };
        let frame = still_frame(&params, &noise);
        // g = 0.625 -> 0.75
        assert_rgb(frame.sample_gradient(0.625, 0.5), (0.0, 0.5, 0.5), 1e-5);

        // Contrast is floored at 0.5: g = 0.9 -> 0.7, not 0.54.
        let params = FlowParams {
            contrast: 0.1,
            ..flat()
        };
        let frame = still_frame(&params, &noise);
        assert_rgb(frame.sample_gradient(0.9, 0.5), (0.0, 0.6, 0.4), 1e-5);
    }

    #[test]
    fn stripe_troughs_darken_by_depth() {
        let noise = NoiseField::new(1);
        let params = FlowParams {
            stripe_depth: 0.55,
            ..flat()
        };
        let frame = still_frame(&params, &noise);

        // Crest at u = 0.25 keeps the full color.
        assert_rgb(frame.shade(25.0, 50.0), (0.5, 0.5, 0.0), 1e-5);
        // Trough at u = 0.75 keeps 1 - depth.
        assert_rgb(frame.shade(75.0, 50.0), (0.0, 0.225, 0.225), 1e-5);

        let params = flat();
        let frame = still_frame(&params, &noise);
        assert_rgb(frame.shade(75.0, 50.0), (0.0, 0.5, 0.5), 1e-5);
    }

    #[test]
    fn vignette_darkens_corners_only() {
        let noise = NoiseField::new(1);
        let params = FlowParams {
            vignette: 0.5,
            ..flat()
        };
        let frame = still_frame(&params, &noise);

        assert_rgb(frame.shade(0.0, 0.0), (0.5, 0.0, 0.0), 1e-3);
        assert_rgb(frame.shade(50.0, 50.0), (0.0, 1.0, 0.0), 1e-5);
    }

    #[test]
    fn gradient_type_round_trips_through_display() {
        for kind in [GradientType::Linear, GradientType::Radial] {
            assert_eq!(kind.to_string().parse::<GradientType>(), Ok(kind));
        }
    }
}
