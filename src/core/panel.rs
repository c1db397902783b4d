//! Live parameter editor.
//!
//! The panel is a controlled component: it never owns the parameter set. It
//! reads the current set, and every edit produces a fresh set that is handed
//! to the owner through [`PanelHandler::on_change`]. Values are snapped and
//! clamped here, before they reach the engine.

use crate::error::ParamError;
use crate::params::{Color, ParamValue, ParameterSet, SceneKind};
use crate::schema::{self, ParamDomain, ParamSpec, SectionSpec};

/// Receives the panel's edits.
pub trait PanelHandler {
    fn on_change(&mut self, params: ParameterSet);

    /// Called after the reset value has been delivered through `on_change`.
    fn on_reset(&mut self) {}
}

impl<F> PanelHandler for F
where
    F: FnMut(ParameterSet),
{
    fn on_change(&mut self, params: ParameterSet) {
        self(params)
    }
}

pub fn format_float(v: f32, step: f32) -> String {
    let d = schema::decimals_for_step(step);
    // Keep it stable for typical numeric params; do not trim aggressively.
    match d {
        0 => format!("{v:.0}"),
        1 => format!("{v:.1}"),
        2 => format!("{v:.2}"),
        3 => format!("{v:.3}"),
        4 => format!("{v:.4}"),
        _ => format!("{v:.6}"),
    }
}

/// Display text for a value under its spec.
pub fn format_value(spec: &ParamSpec, value: ParamValue) -> String {
    match (spec.domain, value) {
        (ParamDomain::Range { step, .. }, ParamValue::Float(v)) => format_float(v, step),
        (_, ParamValue::Count(n)) => n.to_string(),
        (_, ParamValue::Color(c)) => c.to_hex(),
        (ParamDomain::Color, ParamValue::Float(v)) => v.to_string(),
    }
}

/// One editable field as the panel shows it.
#[derive(Debug, Clone, PartialEq)]
pub struct Control {
    pub spec: ParamSpec,
    pub value: ParamValue,
    pub text: String,
}

pub struct ConfigPanel<'a> {
    params: &'a ParameterSet,
}

impl<'a> ConfigPanel<'a> {
    pub fn new(params: &'a ParameterSet) -> Self {
        Self { params }
    }

    pub fn kind(&self) -> SceneKind {
        self.params.kind()
    }

    pub fn controls(&self) -> Vec<Control> {
        schema::specs(self.kind())
            .into_iter()
            .filter_map(|spec| {
                let value = self.params.get(spec.key)?;
                let text = format_value(&spec, value);
                Some(Control { spec, value, text })
            })
            .collect()
    }

    /// Controls grouped by section, in panel order; empty sections are skipped.
    pub fn sections(&self) -> Vec<(SectionSpec, Vec<Control>)> {
        let controls = self.controls();
        schema::sections_ordered()
            .into_iter()
            .filter_map(|section| {
                let in_section: Vec<Control> = controls
                    .iter()
                    .filter(|c| c.spec.section == section.section)
                    .cloned()
                    .collect();
                (!in_section.is_empty()).then_some((section, in_section))
            })
            .collect()
    }

    fn spec_for(&self, key: &str) -> Result<ParamSpec, ParamError> {
        schema::spec(self.kind(), key).ok_or_else(|| ParamError::UnknownKey {
            key: key.to_string(),
            kind: self.kind().label(),
        })
    }

    /// Snap `value` into the field's domain and emit the edited set.
    pub fn set<H: PanelHandler + ?Sized>(
        &self,
        key: &str,
        value: ParamValue,
        handler: &mut H,
    ) -> Result<ParameterSet, ParamError> {
        let spec = self.spec_for(key)?;
        let accepted = match (spec.domain, value) {
            (ParamDomain::Color, ParamValue::Color(_)) => true,
            (ParamDomain::Range { .. }, ParamValue::Float(_) | ParamValue::Count(_)) => true,
            _ => false,
        };
        if !accepted {
            let expected = match spec.domain {
                ParamDomain::Color => "color",
                ParamDomain::Range { .. } => "number",
            };
            return Err(ParamError::TypeMismatch {
                key: key.to_string(),
                expected,
            });
        }
        let next = self.params.with(key, spec.constrain(value))?;
        tracing::debug!(kind = %self.kind(), key, value = %next.get(key).unwrap_or(value), "panel edit");
        handler.on_change(next.clone());
        Ok(next)
    }

    /// Parse text typed into a field, then behave like [`ConfigPanel::set`].
    pub fn set_from_text<H: PanelHandler + ?Sized>(
        &self,
        key: &str,
        raw: &str,
        handler: &mut H,
    ) -> Result<ParameterSet, ParamError> {
        let spec = self.spec_for(key)?;
        let parse_err = || ParamError::Parse {
            key: key.to_string(),
            raw: raw.to_string(),
        };
        let value = match spec.domain {
            ParamDomain::Color => ParamValue::Color(Color::from_hex(raw).map_err(|_| parse_err())?),
            ParamDomain::Range { .. } => {
                let v: f32 = raw.trim().parse().map_err(|_| parse_err())?;
                if !v.is_finite() {
                    return Err(parse_err());
                }
                ParamValue::Float(v)
            }
        };
        self.set(key, value, handler)
    }

    /// Emit the documented default for this kind, then signal the reset.
    pub fn reset<H: PanelHandler + ?Sized>(&self, handler: &mut H) -> ParameterSet {
        let defaults = ParameterSet::default_for(self.kind());
        tracing::debug!(kind = %self.kind(), "panel reset");
        handler.on_change(defaults.clone());
        handler.on_reset();
        defaults
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        changes: Vec<ParameterSet>,
        resets: usize,
        order: Vec<&'static str>,
    }

    impl PanelHandler for Recorder {
        fn on_change(&mut self, params: ParameterSet) {
            self.changes.push(params);
            self.order.push("change");
        }

        fn on_reset(&mut self) {
            self.resets += 1;
            self.order.push("reset");
        }
    }

    #[test]
    fn controls_cover_every_field() {
        for kind in SceneKind::ALL {
            let params = ParameterSet::default_for(kind);
            let panel = ConfigPanel::new(&params);
            assert_eq!(panel.controls().len(), params.keys().len());
            let grouped: usize = panel.sections().iter().map(|(_, c)| c.len()).sum();
            assert_eq!(grouped, params.keys().len());
        }
    }

    #[test]
    fn labels_use_step_precision() {
        let params = ParameterSet::default_for(SceneKind::ShaderField);
        let panel = ConfigPanel::new(&params);
        let controls = panel.controls();
        let text = |key: &str| {
            controls
                .iter()
                .find(|c| c.spec.key == key)
                .map(|c| c.text.clone())
                .unwrap()
        };
        assert_eq!(text("complexity"), "40");
        assert_eq!(text("timeSpeed"), "1.0");
        assert_eq!(text("scaleFactor"), "0.15");
    }

    #[test]
    fn set_snaps_clamps_and_emits_once() {
        let params = ParameterSet::default_for(SceneKind::NucleusOrbit);
        let panel = ConfigPanel::new(&params);
        let mut rec = Recorder::default();

        let next = panel
            .set("orbitRadius", ParamValue::Float(9.73), &mut rec)
            .unwrap();
        assert_eq!(next.get("orbitRadius"), Some(ParamValue::Float(5.0)));
        assert_eq!(rec.changes.len(), 1);

        for (key, value) in params.fields() {
            if key != "orbitRadius" {
                assert_eq!(next.get(key), Some(value));
            }
        }

        let next = panel
            .set("electrodeCount", ParamValue::Float(7.6), &mut rec)
            .unwrap();
        assert_eq!(next.get("electrodeCount"), Some(ParamValue::Count(8)));
    }

    #[test]
    fn errors_call_nothing() {
        let params = ParameterSet::default_for(SceneKind::WireframeNetwork);
        let panel = ConfigPanel::new(&params);
        let mut rec = Recorder::default();
        assert!(matches!(
            panel.set("bogus", ParamValue::Float(1.0), &mut rec),
            Err(ParamError::UnknownKey { .. })
        ));
        assert!(matches!(
            panel.set("nodeColor", ParamValue::Float(1.0), &mut rec),
            Err(ParamError::TypeMismatch { .. })
        ));
        assert!(matches!(
            panel.set_from_text("nodeCount", "lots", &mut rec),
            Err(ParamError::Parse { .. })
        ));
        assert!(matches!(
            panel.set_from_text("nodeSize", "NaN", &mut rec),
            Err(ParamError::Parse { .. })
        ));
        assert!(rec.changes.is_empty());
    }

    #[test]
    fn text_entry_parses_numbers_and_colors() {
        let params = ParameterSet::default_for(SceneKind::WireframeNetwork);
        let panel = ConfigPanel::new(&params);
        let mut seen = Vec::new();
        let mut handler = |p: ParameterSet| seen.push(p);

        let next = panel.set_from_text("lineColor2", "#123456", &mut handler).unwrap();
        assert_eq!(
            next.get("lineColor2"),
            Some(ParamValue::Color(Color::rgb(0x12, 0x34, 0x56)))
        );
        let next = panel.set_from_text("nodeCount", " 300 ", &mut handler).unwrap();
        assert_eq!(next.get("nodeCount"), Some(ParamValue::Count(120)));
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn reset_emits_defaults_then_signals() {
        let edited = ParameterSet::default_for(SceneKind::ShaderField)
            .with("opacity", ParamValue::Float(0.1))
            .unwrap();
        let panel = ConfigPanel::new(&edited);
        let mut rec = Recorder::default();
        let defaults = panel.reset(&mut rec);
        assert_eq!(defaults, ParameterSet::default_for(SceneKind::ShaderField));
        assert_eq!(rec.changes, vec![defaults]);
        assert_eq!(rec.resets, 1);
        assert_eq!(rec.order, vec!["change", "reset"]);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn reset_then_serialize_matches_documented_default() {
        for kind in SceneKind::ALL {
            let edited = ParameterSet::default_for(kind);
            let mut rec = Recorder::default();
            let defaults = ConfigPanel::new(&edited).reset(&mut rec);
            assert_eq!(
                defaults.to_pretty_json(),
                ParameterSet::default_for(kind).to_pretty_json()
            );
        }
    }
}
