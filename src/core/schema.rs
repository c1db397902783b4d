//! Declared domains for every parameter key.
//!
//! The control panel reads these tables to build bounded controls; the frame
//! updater uses them to sanitize values that slipped past the panel.

use crate::params::{
    NetworkParams, NucleusParams, ParamValue, ParameterSet, PointCloudParams, SceneKind,
    ShaderParams,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamSection {
    Structure,
    Motion,
    Appearance,
    Animation,
    Pattern,
    ColorShifts,
    ColorChannels,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParamDomain {
    /// Numeric control; values outside `[min, max]` are unreachable.
    Range { min: f32, max: f32, step: f32 },
    /// Color picker.
    Color,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParamSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub section: ParamSection,
    pub description: &'static str,
    pub units: Option<&'static str>,
    pub domain: ParamDomain,
    pub default: ParamValue,
    /// Changes element cardinality or spatial layout.
    pub structural: bool,
}

impl ParamSpec {
    /// Snap a raw numeric value onto this control's grid and clamp it into
    /// range. Non-finite input falls back to the default.
    pub fn snap(&self, raw: f32) -> f32 {
        let ParamDomain::Range { min, max, step } = self.domain else {
            return raw;
        };
        let fallback = self.default.as_f32().unwrap_or(min);
        if !raw.is_finite() {
            return fallback;
        }
        let v = raw.clamp(min, max);
        let snapped = if step > 0.0 {
            min + ((v - min) / step).round() * step
        } else {
            v
        };
        // Strip float fuzz (0.30000001) at the step's precision.
        let scale = 10f32.powi(decimals_for_step(step) as i32);
        ((snapped * scale).round() / scale).clamp(min, max)
    }

    /// Clamp a value of any variant into this spec's domain.
    pub fn constrain(&self, value: ParamValue) -> ParamValue {
        match (self.domain, value) {
            (ParamDomain::Range { .. }, ParamValue::Float(v)) => ParamValue::Float(self.snap(v)),
            (ParamDomain::Range { min, max, .. }, ParamValue::Count(n)) => {
                let lo = min.max(0.0).round() as u32;
                let hi = max.max(0.0).round() as u32;
                ParamValue::Count(n.clamp(lo, hi.max(lo)))
            }
            _ => value,
        }
    }
}

pub(crate) fn decimals_for_step(step: f32) -> usize {
    if step >= 1.0 {
        0
    } else if step >= 0.1 {
        1
    } else if step >= 0.01 {
        2
    } else if step >= 0.001 {
        3
    } else if step >= 0.0001 {
        4
    } else {
        6
    }
}

#[derive(Clone, Debug)]
pub struct SectionSpec {
    pub section: ParamSection,
    pub title: &'static str,
    pub blurb: &'static str,
}

pub fn sections_ordered() -> Vec<SectionSpec> {
    vec![
        SectionSpec {
            section: ParamSection::Structure,
            title: "Structure",
            blurb: "Counts and distances. Changing these rebuilds the layout.",
        },
        SectionSpec {
            section: ParamSection::Motion,
            title: "Motion",
            blurb: "Rotation, orbit and pulse speeds.",
        },
        SectionSpec {
            section: ParamSection::Appearance,
            title: "Appearance",
            blurb: "Colors, sizes and opacity.",
        },
        SectionSpec {
            section: ParamSection::Animation,
            title: "Animation",
            blurb: "Shader clock and overall strength.",
        },
        SectionSpec {
            section: ParamSection::Pattern,
            title: "Pattern",
            blurb: "Shape of the procedural wave field.",
        },
        SectionSpec {
            section: ParamSection::ColorShifts,
            title: "Color Shifts",
            blurb: "Per-channel phase offsets of the palette.",
        },
        SectionSpec {
            section: ParamSection::ColorChannels,
            title: "Color Channels",
            blurb: "Per-channel gain and final opacity.",
        },
    ]
}

fn range(min: f32, max: f32, step: f32) -> ParamDomain {
    ParamDomain::Range { min, max, step }
}

/// All specs for a scene kind, in panel order.
pub fn specs(kind: SceneKind) -> Vec<ParamSpec> {
    match kind {
        SceneKind::PointCloud => point_cloud_specs(),
        SceneKind::ShaderField => shader_specs(),
        SceneKind::NucleusOrbit => nucleus_specs(),
        SceneKind::WireframeNetwork => network_specs(),
    }
}

pub fn spec(kind: SceneKind, key: &str) -> Option<ParamSpec> {
    specs(kind).into_iter().find(|s| s.key == key)
}

fn point_cloud_specs() -> Vec<ParamSpec> {
    let d = PointCloudParams::default();
    vec![
        ParamSpec {
            key: "particlesPerYear",
            label: "Particles per year",
            section: ParamSection::Structure,
            description: "Particles added to the shell for every year of biological age.",
            units: None,
            domain: range(1.0, 200.0, 1.0),
            default: ParamValue::Count(d.particles_per_year),
            structural: true,
        },
        ParamSpec {
            key: "innerRadius",
            label: "Inner radius",
            section: ParamSection::Structure,
            description: "Inner radius of the particle shell.",
            units: Some("world units"),
            domain: range(0.0, 10.0, 0.1),
            default: ParamValue::Float(d.inner_radius),
            structural: true,
        },
        ParamSpec {
            key: "outerRadius",
            label: "Outer radius",
            section: ParamSection::Structure,
            description: "Outer radius of the particle shell.",
            units: Some("world units"),
            domain: range(0.1, 12.0, 0.1),
            default: ParamValue::Float(d.outer_radius),
            structural: true,
        },
        ParamSpec {
            key: "pointSize",
            label: "Point size",
            section: ParamSection::Appearance,
            description: "Rendered size of each particle.",
            units: Some("world units"),
            domain: range(0.01, 0.5, 0.01),
            default: ParamValue::Float(d.point_size),
            structural: false,
        },
        ParamSpec {
            key: "color",
            label: "Color",
            section: ParamSection::Appearance,
            description: "Particle color.",
            units: None,
            domain: ParamDomain::Color,
            default: ParamValue::Color(d.color),
            structural: false,
        },
        ParamSpec {
            key: "opacity",
            label: "Opacity",
            section: ParamSection::Appearance,
            description: "Opacity of revealed particles.",
            units: None,
            domain: range(0.0, 1.0, 0.05),
            default: ParamValue::Float(d.opacity),
            structural: false,
        },
        ParamSpec {
            key: "rotationSpeed",
            label: "Rotation speed",
            section: ParamSection::Motion,
            description: "Spin around the vertical axis.",
            units: Some("rad/s"),
            domain: range(0.0, 2.0, 0.01),
            default: ParamValue::Float(d.rotation_speed),
            structural: false,
        },
        ParamSpec {
            key: "wobbleFrequency",
            label: "Wobble frequency",
            section: ParamSection::Motion,
            description: "Frequency of the tilt oscillation.",
            units: Some("rad/s"),
            domain: range(0.0, 3.0, 0.05),
            default: ParamValue::Float(d.wobble_frequency),
            structural: false,
        },
        ParamSpec {
            key: "wobbleAmplitude",
            label: "Wobble amplitude",
            section: ParamSection::Motion,
            description: "Maximum tilt of the shell.",
            units: Some("rad"),
            domain: range(0.0, 1.0, 0.01),
            default: ParamValue::Float(d.wobble_amplitude),
            structural: false,
        },
        ParamSpec {
            key: "countDuration",
            label: "Count duration",
            section: ParamSection::Motion,
            description: "Time for the age counter to count up to the biological age.",
            units: Some("s"),
            domain: range(0.5, 10.0, 0.5),
            default: ParamValue::Float(d.count_duration),
            structural: false,
        },
    ]
}

fn shader_specs() -> Vec<ParamSpec> {
    let d = ShaderParams::default();
    let float = |key, label, section, description, domain, default| ParamSpec {
        key,
        label,
        section,
        description,
        units: None,
        domain,
        default: ParamValue::Float(default),
        structural: false,
    };
    vec![
        float(
            "timeSpeed",
            "Time Speed",
            ParamSection::Animation,
            "Multiplier on the shader clock.",
            range(0.0, 2.0, 0.1),
            d.time_speed,
        ),
        float(
            "intensity",
            "Intensity",
            ParamSection::Animation,
            "Contrast of the palette sweep.",
            range(0.1, 3.0, 0.1),
            d.intensity,
        ),
        float(
            "complexity",
            "Complexity",
            ParamSection::Animation,
            "Spatial frequency of the wave field.",
            range(10.0, 100.0, 5.0),
            d.complexity,
        ),
        float(
            "mixFactor",
            "Mix Factor",
            ParamSection::Pattern,
            "Blend between the plane waves and the radial ripple.",
            range(0.0, 1.0, 0.05),
            d.mix_factor,
        ),
        float(
            "scaleFactor",
            "Scale Factor",
            ParamSection::Pattern,
            "Zoom of the field coordinates.",
            range(0.05, 0.5, 0.05),
            d.scale_factor,
        ),
        float(
            "waveAmplitude",
            "Wave Amplitude",
            ParamSection::Pattern,
            "Ring density of the radial ripple.",
            range(5.0, 50.0, 1.0),
            d.wave_amplitude,
        ),
        float(
            "colorShiftR",
            "Red Shift",
            ParamSection::ColorShifts,
            "Phase offset of the red channel.",
            range(0.0, 10.0, 0.5),
            d.color_shift_r,
        ),
        float(
            "colorShiftG",
            "Green Shift",
            ParamSection::ColorShifts,
            "Phase offset of the green channel.",
            range(0.0, 10.0, 0.5),
            d.color_shift_g,
        ),
        float(
            "colorShiftB",
            "Blue Shift",
            ParamSection::ColorShifts,
            "Phase offset of the blue channel.",
            range(0.0, 10.0, 0.5),
            d.color_shift_b,
        ),
        float(
            "redChannel",
            "Red Channel",
            ParamSection::ColorChannels,
            "Gain of the red channel.",
            range(0.0, 1.0, 0.05),
            d.red_channel,
        ),
        float(
            "greenChannel",
            "Green Channel",
            ParamSection::ColorChannels,
            "Gain of the green channel.",
            range(0.0, 1.0, 0.05),
            d.green_channel,
        ),
        float(
            "blueChannel",
            "Blue Channel",
            ParamSection::ColorChannels,
            "Gain of the blue channel.",
            range(0.0, 1.0, 0.05),
            d.blue_channel,
        ),
        float(
            "opacity",
            "Opacity",
            ParamSection::ColorChannels,
            "Alpha of every fragment.",
            range(0.0, 1.0, 0.05),
            d.opacity,
        ),
    ]
}

fn nucleus_specs() -> Vec<ParamSpec> {
    let d = NucleusParams::default();
    vec![
        ParamSpec {
            key: "electrodeCount",
            label: "Electrodes",
            section: ParamSection::Structure,
            description: "Number of electrodes orbiting the nucleus.",
            units: None,
            domain: range(1.0, 24.0, 1.0),
            default: ParamValue::Count(d.electrode_count),
            structural: true,
        },
        ParamSpec {
            key: "orbitRadius",
            label: "Orbit radius",
            section: ParamSection::Structure,
            description: "Base orbit radius; each electrode is jittered around it.",
            units: Some("world units"),
            domain: range(0.5, 5.0, 0.1),
            default: ParamValue::Float(d.orbit_radius),
            structural: true,
        },
        ParamSpec {
            key: "orbitJitter",
            label: "Orbit jitter",
            section: ParamSection::Structure,
            description: "Width of the band orbit radii are drawn from.",
            units: Some("world units"),
            domain: range(0.0, 2.0, 0.1),
            default: ParamValue::Float(d.orbit_jitter),
            structural: true,
        },
        ParamSpec {
            key: "nucleusColor",
            label: "Nucleus color",
            section: ParamSection::Appearance,
            description: "Color of the central nucleus.",
            units: None,
            domain: ParamDomain::Color,
            default: ParamValue::Color(d.nucleus_color),
            structural: false,
        },
        ParamSpec {
            key: "electrodeColor",
            label: "Electrode color",
            section: ParamSection::Appearance,
            description: "Color of the orbiting electrodes.",
            units: None,
            domain: ParamDomain::Color,
            default: ParamValue::Color(d.electrode_color),
            structural: false,
        },
        ParamSpec {
            key: "electricityColor",
            label: "Electricity color",
            section: ParamSection::Appearance,
            description: "Color of the arcs and sparks.",
            units: None,
            domain: ParamDomain::Color,
            default: ParamValue::Color(d.electricity_color),
            structural: false,
        },
        ParamSpec {
            key: "animationSpeed",
            label: "Animation speed",
            section: ParamSection::Motion,
            description: "Global speed multiplier for orbits, sparks and flicker.",
            units: None,
            domain: range(0.1, 3.0, 0.1),
            default: ParamValue::Float(d.animation_speed),
            structural: false,
        },
        ParamSpec {
            key: "electrodeSize",
            label: "Electrode size",
            section: ParamSection::Appearance,
            description: "Radius of each electrode.",
            units: Some("world units"),
            domain: range(0.02, 0.3, 0.01),
            default: ParamValue::Float(d.electrode_size),
            structural: false,
        },
        ParamSpec {
            key: "nucleusSize",
            label: "Nucleus size",
            section: ParamSection::Appearance,
            description: "Resting radius of the nucleus.",
            units: Some("world units"),
            domain: range(0.1, 1.5, 0.05),
            default: ParamValue::Float(d.nucleus_size),
            structural: false,
        },
        ParamSpec {
            key: "electricityIntensity",
            label: "Electricity intensity",
            section: ParamSection::Appearance,
            description: "Brightness of the arcs.",
            units: None,
            domain: range(0.0, 3.0, 0.1),
            default: ParamValue::Float(d.electricity_intensity),
            structural: false,
        },
        ParamSpec {
            key: "rotationSpeed",
            label: "Rotation speed",
            section: ParamSection::Motion,
            description: "Spin of the whole ensemble.",
            units: Some("rad/s"),
            domain: range(0.0, 2.0, 0.05),
            default: ParamValue::Float(d.rotation_speed),
            structural: false,
        },
        ParamSpec {
            key: "pulseIntensity",
            label: "Pulse intensity",
            section: ParamSection::Motion,
            description: "Strength of the nucleus heartbeat.",
            units: None,
            domain: range(0.0, 3.0, 0.1),
            default: ParamValue::Float(d.pulse_intensity),
            structural: false,
        },
        ParamSpec {
            key: "orbitSpeed",
            label: "Orbit speed",
            section: ParamSection::Motion,
            description: "Base angular speed of the electrodes.",
            units: Some("rad/s"),
            domain: range(0.0, 2.0, 0.05),
            default: ParamValue::Float(d.orbit_speed),
            structural: false,
        },
        ParamSpec {
            key: "sparkCycle",
            label: "Spark cycle",
            section: ParamSection::Motion,
            description: "Seconds for a spark to travel from the nucleus to its electrode.",
            units: Some("s"),
            domain: range(0.2, 5.0, 0.1),
            default: ParamValue::Float(d.spark_cycle),
            structural: false,
        },
    ]
}

fn network_specs() -> Vec<ParamSpec> {
    let d = NetworkParams::default();
    vec![
        ParamSpec {
            key: "nodeCount",
            label: "Nodes",
            section: ParamSection::Structure,
            description: "Number of nodes on the sphere.",
            units: None,
            domain: range(2.0, 120.0, 1.0),
            default: ParamValue::Count(d.node_count),
            structural: true,
        },
        ParamSpec {
            key: "sphereRadius",
            label: "Sphere radius",
            section: ParamSection::Structure,
            description: "Radius of the sphere nodes are placed on.",
            units: Some("world units"),
            domain: range(0.5, 6.0, 0.1),
            default: ParamValue::Float(d.sphere_radius),
            structural: true,
        },
        ParamSpec {
            key: "connectionDistance",
            label: "Connection distance",
            section: ParamSection::Structure,
            description: "Nodes closer than this are connected by an edge.",
            units: Some("world units"),
            domain: range(0.0, 6.0, 0.1),
            default: ParamValue::Float(d.connection_distance),
            structural: true,
        },
        ParamSpec {
            key: "randomPlacement",
            label: "Random placement",
            section: ParamSection::Structure,
            description: "0 places nodes on an even spiral, 1 places them at random.",
            units: None,
            domain: range(0.0, 1.0, 1.0),
            default: ParamValue::Count(d.random_placement),
            structural: true,
        },
        ParamSpec {
            key: "nodeColor",
            label: "Node color",
            section: ParamSection::Appearance,
            description: "Color of the nodes.",
            units: None,
            domain: ParamDomain::Color,
            default: ParamValue::Color(d.node_color),
            structural: false,
        },
        ParamSpec {
            key: "lineColor1",
            label: "Line color 1",
            section: ParamSection::Appearance,
            description: "Edge color for short connections.",
            units: None,
            domain: ParamDomain::Color,
            default: ParamValue::Color(d.line_color1),
            structural: false,
        },
        ParamSpec {
            key: "lineColor2",
            label: "Line color 2",
            section: ParamSection::Appearance,
            description: "Edge color for connections near the distance limit.",
            units: None,
            domain: ParamDomain::Color,
            default: ParamValue::Color(d.line_color2),
            structural: false,
        },
        ParamSpec {
            key: "nodeSize",
            label: "Node size",
            section: ParamSection::Appearance,
            description: "Radius of each node.",
            units: Some("world units"),
            domain: range(0.02, 0.3, 0.01),
            default: ParamValue::Float(d.node_size),
            structural: false,
        },
        ParamSpec {
            key: "rotationSpeed",
            label: "Rotation speed",
            section: ParamSection::Motion,
            description: "Spin of the sphere.",
            units: Some("rad/s"),
            domain: range(0.0, 2.0, 0.05),
            default: ParamValue::Float(d.rotation_speed),
            structural: false,
        },
        ParamSpec {
            key: "pulseCount",
            label: "Pulses",
            section: ParamSection::Structure,
            description: "Number of pulses traveling along edges.",
            units: None,
            domain: range(1.0, 64.0, 1.0),
            default: ParamValue::Count(d.pulse_count),
            structural: true,
        },
        ParamSpec {
            key: "pulseCycle",
            label: "Pulse cycle",
            section: ParamSection::Motion,
            description: "Seconds for a pulse to cross its edge.",
            units: Some("s"),
            domain: range(0.2, 10.0, 0.1),
            default: ParamValue::Float(d.pulse_cycle),
            structural: false,
        },
        ParamSpec {
            key: "pulseFrequency",
            label: "Pulse frequency",
            section: ParamSection::Motion,
            description: "Frequency of the node glow.",
            units: Some("rad/s"),
            domain: range(0.0, 5.0, 0.1),
            default: ParamValue::Float(d.pulse_frequency),
            structural: false,
        },
        ParamSpec {
            key: "pulseIntensity",
            label: "Pulse intensity",
            section: ParamSection::Motion,
            description: "Depth of the node glow.",
            units: None,
            domain: range(0.0, 3.0, 0.1),
            default: ParamValue::Float(d.pulse_intensity),
            structural: false,
        },
    ]
}

/// Clamp every field of `params` into its declared domain.
pub fn sanitize(params: &ParameterSet) -> ParameterSet {
    let mut out = params.clone();
    for spec in specs(params.kind()) {
        let Some(current) = out.get(spec.key) else {
            continue;
        };
        let constrained = spec.constrain(current);
        if constrained != current {
            if let Ok(next) = out.with(spec.key, constrained) {
                out = next;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_key_has_exactly_one_spec() {
        for kind in SceneKind::ALL {
            let set = ParameterSet::default_for(kind);
            let specs = specs(kind);
            assert_eq!(specs.len(), set.keys().len(), "{kind}");
            for key in set.keys() {
                assert_eq!(specs.iter().filter(|s| s.key == *key).count(), 1, "{kind}: {key}");
            }
        }
    }

    #[test]
    fn defaults_match_and_lie_in_domain() {
        for kind in SceneKind::ALL {
            let set = ParameterSet::default_for(kind);
            for spec in specs(kind) {
                assert_eq!(set.get(spec.key), Some(spec.default), "{kind}: {}", spec.key);
                assert_eq!(spec.constrain(spec.default), spec.default, "{kind}: {}", spec.key);
            }
        }
    }

    #[test]
    fn snap_rounds_to_step_and_clamps() {
        let spec = spec(SceneKind::ShaderField, "mixFactor").unwrap();
        assert_eq!(spec.snap(0.33), 0.35);
        assert_eq!(spec.snap(-4.0), 0.0);
        assert_eq!(spec.snap(9.0), 1.0);
        assert_eq!(spec.snap(f32::NAN), 0.5);

        let complexity = super::spec(SceneKind::ShaderField, "complexity").unwrap();
        assert_eq!(complexity.snap(42.0), 40.0);
        assert_eq!(complexity.snap(43.0), 45.0);
    }

    #[test]
    fn sanitize_replaces_nan_and_clamps_counts() {
        let broken = ParameterSet::default_for(SceneKind::NucleusOrbit)
            .with("orbitRadius", ParamValue::Float(f32::NAN))
            .unwrap()
            .with("electrodeCount", ParamValue::Count(0))
            .unwrap()
            .with("rotationSpeed", ParamValue::Float(f32::INFINITY))
            .unwrap();
        let clean = sanitize(&broken);
        assert_eq!(clean.get("orbitRadius"), Some(ParamValue::Float(2.5)));
        assert_eq!(clean.get("electrodeCount"), Some(ParamValue::Count(1)));
        assert_eq!(clean.get("rotationSpeed"), Some(ParamValue::Float(0.5)));
    }

    #[test]
    fn structural_flags_drive_structural_eq() {
        let base = ParameterSet::default_for(SceneKind::WireframeNetwork);
        let recolored = base
            .with("lineColor1", ParamValue::Color(crate::params::Color::WHITE))
            .unwrap();
        assert!(base.structural_eq(&recolored));
        let denser = base.with("nodeCount", ParamValue::Count(40)).unwrap();
        assert!(!base.structural_eq(&denser));
    }
}
