//! # Controls Module
//!
//! Declarative control panels bound one-to-one to parameter fields.
//!
//! A `ControlPanel<P>` is a dispatch table: each control has an identifier, a widget
//! kind (slider, color picker, select, stepper, number field), a getter and a setter
//! closure over the parameter struct `P`. Hosts (the CLI, or any UI shell) drive the
//! panel by identifier with raw string input; the panel applies the same range
//! clamping and validation a widget would.

use crate::errors::SketchError;
use crate::types::Color;
use serde::Serialize;

/// Widget kind and its constraints.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlKind {
    Slider { min: f64, max: f64, step: f64 },
    Color,
    Select { options: Vec<String> },
    Stepper { min: i64, max: i64 },
    Number,
}

/// A value read from or written to a control.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ControlValue {
    Number(f64),
    Text(String),
}

impl ControlValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ControlValue::Number(n) => Some(*n),
            ControlValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ControlValue::Text(s) => Some(s),
            ControlValue::Number(_) => None,
        }
    }
}

/// Serializable description of a control, including its current value.
#[derive(Clone, Debug, Serialize)]
pub struct ControlDescriptor {
    pub id: &'static str,
    pub label: &'static str,
    #[serde(flatten)]
    pub kind: ControlKind,
    pub value: ControlValue,
}

type Getter<P> = Box<dyn Fn(&P) -> ControlValue + Send + Sync>;
type Setter<P> = Box<dyn Fn(&mut P, ControlValue) + Send + Sync>;

struct Control<P> {
    id: &'static str,
    label: &'static str,
    kind: ControlKind,
    get: Getter<P>,
    set: Setter<P>,
}

/// Ordered table of controls for one parameter struct.
pub struct ControlPanel<P> {
    controls: Vec<Control<P>>,
}

impl<P> Default for ControlPanel<P> {
    fn default() -> Self {
        Self {
            controls: Vec::new(),
        }
    }
}

impl<P: 'static> ControlPanel<P> {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(
        mut self,
        id: &'static str,
        label: &'static str,
        kind: ControlKind,
        get: Getter<P>,
        set: Setter<P>,
    ) -> Self {
        debug_assert!(
            self.controls.iter().all(|c| c.id != id),
            "duplicate control id {}",
            id
        );
        self.controls.push(Control {
            id,
            label,
            kind,
            get,
            set,
        });
        self
    }

    /// Range slider. Input is clamped to `[min, max]` and snapped to `step`.
    pub fn slider(
        self,
        id: &'static str,
        label: &'static str,
        (min, max, step): (f64, f64, f64),
        get: impl Fn(&P) -> f64 + Send + Sync + 'static,
        set: impl Fn(&mut P, f64) + Send + Sync + 'static,
    ) -> Self {
        self.push(
            id,
            label,
            ControlKind::Slider { min, max, step },
            Box::new(move |p| ControlValue::Number(get(p))),
            Box::new(move |p, v| {
                if let Some(n) = v.as_f64() {
                    set(p, n)
                }
            }),
        )
    }

    /// Hex color picker.
    pub fn color(
        self,
        id: &'static str,
        label: &'static str,
        get: impl Fn(&P) -> String + Send + Sync + 'static,
        set: impl Fn(&mut P, String) + Send + Sync + 'static,
    ) -> Self {
        self.push(
            id,
            label,
            ControlKind::Color,
            Box::new(move |p| ControlValue::Text(get(p))),
            Box::new(move |p, v| {
                if let ControlValue::Text(s) = v {
                    set(p, s)
                }
            }),
        )
    }

    /// Single choice from a fixed option list.
    pub fn select(
        self,
        id: &'static str,
        label: &'static str,
        options: &[&str],
        get: impl Fn(&P) -> String + Send + Sync + 'static,
        set: impl Fn(&mut P, &str) + Send + Sync + 'static,
    ) -> Self {
        self.push(
            id,
            label,
            ControlKind::Select {
                options: options.iter().map(|o| o.to_string()).collect(),
            },
            Box::new(move |p| ControlValue::Text(get(p))),
            Box::new(move |p, v| {
                if let Some(s) = v.as_str() {
                    set(p, s)
                }
            }),
        )
    }

    /// Integer stepper with -/+ buttons.
    pub fn stepper(
        self,
        id: &'static str,
        label: &'static str,
        (min, max): (i64, i64),
        get: impl Fn(&P) -> i64 + Send + Sync + 'static,
        set: impl Fn(&mut P, i64) + Send + Sync + 'static,
    ) -> Self {
        self.push(
            id,
            label,
            ControlKind::Stepper { min, max },
            Box::new(move |p| ControlValue::Number(get(p) as f64)),
            Box::new(move |p, v| {
                if let Some(n) = v.as_f64() {
                    set(p, n as i64)
                }
            }),
        )
    }

    /// Free numeric input. Non-numeric input becomes 0.
    pub fn number(
        self,
        id: &'static str,
        label: &'static str,
        get: impl Fn(&P) -> f64 + Send + Sync + 'static,
        set: impl Fn(&mut P, f64) + Send + Sync + 'static,
    ) -> Self {
        self.push(
            id,
            label,
            ControlKind::Number,
            Box::new(move |p| ControlValue::Number(get(p))),
            Box::new(move |p, v| {
                if let Some(n) = v.as_f64() {
                    set(p, n)
                }
            }),
        )
    }

    fn find(&self, id: &str) -> Result<&Control<P>, SketchError> {
        self.controls
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| SketchError::invalid_control(id, "unknown control"))
    }

    /// Parses `raw` for the control's kind and writes it into `params`.
    pub fn dispatch(&self, params: &mut P, id: &str, raw: &str) -> Result<(), SketchError> {
        let control = self.find(id)?;
        let raw = raw.trim();
        let value = match &control.kind {
            ControlKind::Slider { min, max, step } => {
                let v = parse_finite(id, raw)?;
                ControlValue::Number(snap(v, *min, *max, *step))
            }
            ControlKind::Stepper { min, max } => {
                let v = parse_finite(id, raw)?;
                ControlValue::Number((v.round() as i64).clamp(*min, *max) as f64)
            }
            ControlKind::Color => {
                if Color::from_hex(raw).is_none() {
                    return Err(SketchError::invalid_control(
                        id,
                        format!("'{}' is not a hex color", raw),
                    ));
                }
                ControlValue::Text(raw.to_string())
            }
            ControlKind::Select { options } => {
                if !options.iter().any(|o| o == raw) {
                    return Err(SketchError::invalid_control(
                        id,
                        format!("'{}' is not one of {:?}", raw, options),
                    ));
                }
                ControlValue::Text(raw.to_string())
            }
            ControlKind::Number => {
                let v = raw.parse::<f64>().ok().filter(|v| v.is_finite());
                ControlValue::Number(v.unwrap_or(0.0))
            }
        };
        (control.set)(params, value);
        Ok(())
    }

    /// Presses a stepper button `delta` times (negative for "-"). Returns the new value.
    pub fn step(&self, params: &mut P, id: &str, delta: i64) -> Result<i64, SketchError> {
        let control = self.find(id)?;
        let ControlKind::Stepper { min, max } = control.kind else {
            return Err(SketchError::invalid_control(id, "not a stepper"));
        };
        let current = (control.get)(params).as_f64().unwrap_or(0.0) as i64;
        let next = current.saturating_add(delta).clamp(min, max);
        (control.set)(params, ControlValue::Number(next as f64));
        Ok(next)
    }

    pub fn describe(&self, params: &P) -> Vec<ControlDescriptor> {
        self.controls
            .iter()
            .map(|c| ControlDescriptor {
                id: c.id,
                label: c.label,
                kind: c.kind.clone(),
                value: (c.get)(params),
            })
            .collect()
    }
}

fn parse_finite(id: &str, raw: &str) -> Result<f64, SketchError> {
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(SketchError::invalid_control(
            id,
            format!("'{}' is not a number", raw),
        )),
    }
}

fn snap(v: f64, min: f64, max: f64, step: f64) -> f64 {
    let v = v.clamp(min, max);
    if step <= 0.0 {
        return v;
    }
    let steps = ((v - min) / step).round();
    // Trim float noise like 0.35000000000000003.
    let snapped = ((min + steps * step) * 1e9).round() / 1e9;
    snapped.clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Knobs {
        level: f64,
        count: i64,
        tint: String,
        mode: String,
        seed: f64,
    }

    fn panel() -> ControlPanel<Knobs> {
        ControlPanel::<Knobs>::new()
            .slider("level", "Level", (0.0, 2.0, 0.01), |k| k.level, |k, v| k.level = v)
            .stepper("count", "Count", (5, 25), |k| k.count, |k, v| k.count = v)
            .color("tint", "Tint", |k| k.tint.clone(), |k, v| k.tint = v)
            .select("mode", "Mode", &["a", "b"], |k| k.mode.clone(), |k, v| {
                k.mode = v.to_string()
            })
            .number("seed", "Seed", |k| k.seed, |k, v| k.seed = v)
    }

    #[test]
    fn slider_clamps_and_snaps() {
        let p = panel();
        let mut k = Knobs::default();
        p.dispatch(&mut k, "level", "5").unwrap();
        assert_eq!(k.level, 2.0);
        p.dispatch(&mut k, "level", "0.3549").unwrap();
        assert_eq!(k.level, 0.35);
        assert!(p.dispatch(&mut k, "level", "abc").is_err());
    }

    #[test]
    fn stepper_buttons_stay_in_range() {
        let p = panel();
        let mut k = Knobs {
            count: 7,
            ..Default::default()
        };
        assert_eq!(p.step(&mut k, "count", 1).unwrap(), 8);
        assert_eq!(p.step(&mut k, "count", -100).unwrap(), 5);
        assert!(p.step(&mut k, "level", 1).is_err());
    }

    #[test]
    fn color_and_select_are_validated() {
        let p = panel();
        let mut k = Knobs::default();
        p.dispatch(&mut k, "tint", "#abcdef").unwrap();
        assert_eq!(k.tint, "#abcdef");
        assert!(p.dispatch(&mut k, "tint", "#zzz").is_err());
        assert!(p.dispatch(&mut k, "mode", "c").is_err());
        p.dispatch(&mut k, "mode", "b").unwrap();
        assert_eq!(k.mode, "b");
    }

    #[test]
    fn number_falls_back_to_zero() {
        let p = panel();
        let mut k = Knobs {
            seed: 42.0,
            ..Default::default()
        };
        p.dispatch(&mut k, "seed", "not-a-number").unwrap();
        assert_eq!(k.seed, 0.0);
    }

    #[test]
    fn unknown_id_is_rejected() {
        let p = panel();
        let mut k = Knobs::default();
        match p.dispatch(&mut k, "missing", "1") {
            Err(SketchError::InvalidControl { id, .. }) => assert_eq!(id, "missing"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn descriptors_serialize_flat() {
        let p = panel();
        let k = Knobs {
            level: 0.5,
            ..Default::default()
        };
        let json = serde_json::to_value(p.describe(&k)).unwrap();
        assert_eq!(
            json[0],
            serde_json::json!({
                "id": "level",
                "label": "Level",
                "type": "slider",
                "min": 0.0,
                "max": 2.0,
                "step": 0.01,
                "value": 0.5,
            })
        );
        assert_eq!(json[3]["options"], serde_json::json!(["a", "b"]));
    }
}
