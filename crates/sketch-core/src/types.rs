//! # Types Module
//!
//! Shared data types used by the sketches and exporters.
//!
//! ## Key Types
//! - `Color`: Float-based RGBA color with hex parsing and interpolation.
//! - `ColorCache`: Memoised hex-to-color parsing keyed by the last-seen string.
//! - `AspectFormat`: Output aspect ratio presets for fixed-size canvases.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Represents a RGBA color in float format (0.0 - 1.0).
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };

    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Parses `#RRGGBB` or `#RGB` (the leading `#` is optional).
    pub fn from_hex(hex: &str) -> Option<Color> {
        let hex = hex.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return None;
        }
        let (r, g, b) = match hex.len() {
            6 => {
                let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
                let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
                let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
                (r, g, b)
            }
            3 => {
                let r = u8::from_str_radix(&hex[0..1], 16).ok()?;
                let g = u8::from_str_radix(&hex[1..2], 16).ok()?;
                let b = u8::from_str_radix(&hex[2..3], 16).ok()?;
                (r * 17, g * 17, b * 17)
            }
            _ => return None,
        };

        Some(Color::new(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            1.0,
        ))
    }

    /// Per-channel linear interpolation, `t` clamped to `[0, 1]`.
    pub fn lerp(self, to: Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        Color {
            r: self.r + (to.r - self.r) * t,
            g: self.g + (to.g - self.g) * t,
            b: self.b + (to.b - self.b) * t,
            a: self.a + (to.a - self.a) * t,
        }
    }

    /// Quantises to 8-bit channels.
    pub fn to_rgba8(&self) -> [u8; 4] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    /// Converts to tiny-skia's color type.
    pub fn to_skia(&self) -> tiny_skia::Color {
        let [r, g, b, a] = self.to_rgba8();
        tiny_skia::Color::from_rgba8(r, g, b, a)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

#[derive(Clone, Debug)]
struct CacheSlot {
    source: String,
    color: Color,
}

/// Memoises parsed colors per slot so unchanged hex strings are not re-parsed every frame.
///
/// A slot is invalidated when its source string changes. Unparsable strings keep the
/// previously resolved color.
#[derive(Clone, Debug, Default)]
pub struct ColorCache {
    slots: Vec<Option<CacheSlot>>,
    parses: usize,
}

impl ColorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the color for `slot`, parsing `hex` only if it differs from the cached source.
    pub fn resolve(&mut self, slot: usize, hex: &str) -> Color {
        if self.slots.len() <= slot {
            self.slots.resize(slot + 1, None);
        }
        if let Some(cached) = &self.slots[slot] {
            if cached.source == hex {
                return cached.color;
            }
        }

        self.parses += 1;
        let previous = self.slots[slot].as_ref().map(|s| s.color);
        let color = match Color::from_hex(hex) {
            Some(c) => c,
            None => {
                warn!(slot, hex, "unparsable color, keeping previous value");
                previous.unwrap_or(Color::BLACK)
            }
        };
        self.slots[slot] = Some(CacheSlot {
            source: hex.to_string(),
            color,
        });
        color
    }

    /// Number of hex parses performed so far.
    pub fn parse_count(&self) -> usize {
        self.parses
    }
}

/// Output aspect ratio for sketches with a locked canvas size.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectFormat {
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "9:16")]
    Portrait,
}

impl AspectFormat {
    pub const OPTIONS: [&'static str; 3] = ["16:9", "1:1", "9:16"];

    /// Canvas size for a given long side length.
    pub fn output_size(&self, long_side: u32) -> (u32, u32) {
        let short = (long_side as f64 * 9.0 / 16.0).round() as u32;
        match self {
            AspectFormat::Landscape => (long_side, short),
            AspectFormat::Portrait => (short, long_side),
            AspectFormat::Square => (long_side, long_side),
        }
    }
}

impl fmt::Display for AspectFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AspectFormat::Landscape => write!(f, "16:9"),
            AspectFormat::Square => write!(f, "1:1"),
            AspectFormat::Portrait => write!(f, "9:16"),
        }
    }
}

impl FromStr for AspectFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "16:9" => Ok(AspectFormat::Landscape),
            "1:1" => Ok(AspectFormat::Square),
            "9:16" => Ok(AspectFormat::Portrait),
            other => Err(format!("unknown format '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_long_and_short_hex() {
        let c = Color::from_hex("#FF3300").unwrap();
        assert_eq!(c.to_rgba8(), [255, 51, 0, 255]);
        let short = Color::from_hex("f30").unwrap();
        assert_eq!(short.to_rgba8(), [255, 51, 0, 255]);
        assert!(Color::from_hex("#12345").is_none());
        assert!(Color::from_hex("#gg0000").is_none());
    }

    #[test]
    fn cache_reparses_only_on_change() {
        let mut cache = ColorCache::new();
        let a = cache.resolve(0, "#E91D2E");
        let b = cache.resolve(0, "#E91D2E");
        assert_eq!(a, b);
        assert_eq!(cache.parse_count(), 1);

        let c = cache.resolve(0, "#000000");
        assert_eq!(c, Color::BLACK);
        assert_eq!(cache.parse_count(), 2);

        // Broken input keeps the last good color.
        let d = cache.resolve(0, "nope");
        assert_eq!(d, Color::BLACK);
    }

    #[test]
    fn aspect_sizes() {
        assert_eq!(AspectFormat::Landscape.output_size(720), (720, 405));
        assert_eq!(AspectFormat::Portrait.output_size(720), (405, 720));
        assert_eq!(AspectFormat::Square.output_size(720), (720, 720));
    }
}
