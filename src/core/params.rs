//! Parameter sets: the plain-data configuration of each scene kind.
//!
//! A [`ParameterSet`] is a tagged enum holding one flat struct per scene kind.
//! Every field is a float, an integer count, or a `#rrggbb` color, and every
//! key has a declared domain in [`crate::schema`]. The engine never mutates a
//! parameter set in place; edits produce a fresh copy via [`ParameterSet::with`].

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ParamError;

/// The interchangeable visual styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum SceneKind {
    PointCloud,
    ShaderField,
    NucleusOrbit,
    WireframeNetwork,
}

impl SceneKind {
    pub const ALL: [SceneKind; 4] = [
        SceneKind::PointCloud,
        SceneKind::ShaderField,
        SceneKind::NucleusOrbit,
        SceneKind::WireframeNetwork,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SceneKind::PointCloud => "point-cloud",
            SceneKind::ShaderField => "shader-field",
            SceneKind::NucleusOrbit => "nucleus-orbit",
            SceneKind::WireframeNetwork => "wireframe-network",
        }
    }
}

impl fmt::Display for SceneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SceneKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "point-cloud" | "points" | "cloud" => Ok(SceneKind::PointCloud),
            "shader-field" | "shader" => Ok(SceneKind::ShaderField),
            "nucleus-orbit" | "nucleus" | "orbit" => Ok(SceneKind::NucleusOrbit),
            "wireframe-network" | "network" | "wireframe" => Ok(SceneKind::WireframeNetwork),
            other => Err(format!("unknown scene kind: {other}")),
        }
    }
}

/// An sRGB color, serialized as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(0xff, 0xff, 0xff);
    pub const CYAN: Color = Color::rgb(0x00, 0xff, 0xff);
    pub const MAGENTA: Color = Color::rgb(0xff, 0x00, 0xff);
    pub const YELLOW: Color = Color::rgb(0xff, 0xff, 0x00);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` or the short `#rgb` form.
    pub fn from_hex(s: &str) -> Result<Self, ParamError> {
        let bad = || ParamError::InvalidColor(s.to_string());
        let hex = s.trim().strip_prefix('#').ok_or_else(bad)?;
        let nibble = |c: u8| (c as char).to_digit(16).map(|d| d as u8).ok_or_else(bad);
        let bytes = hex.as_bytes();
        match bytes.len() {
            6 => {
                let byte = |i: usize| -> Result<u8, ParamError> {
                    Ok(nibble(bytes[i])? << 4 | nibble(bytes[i + 1])?)
                };
                Ok(Color::rgb(byte(0)?, byte(2)?, byte(4)?))
            }
            3 => {
                let short = |i: usize| -> Result<u8, ParamError> {
                    let n = nibble(bytes[i])?;
                    Ok(n << 4 | n)
                };
                Ok(Color::rgb(short(0)?, short(1)?, short(2)?))
            }
            _ => Err(bad()),
        }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Normalized RGBA with the given alpha (clamped to `[0, 1]`).
    pub fn with_alpha(self, alpha: f32) -> [f32; 4] {
        let a = if alpha.is_finite() { alpha.clamp(0.0, 1.0) } else { 0.0 };
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            a,
        ]
    }

    /// Linear blend toward `other` by `t` in `[0, 1]`.
    pub fn lerp(self, other: Color, t: f32) -> Color {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Color::rgb(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        c.to_hex()
    }
}

impl TryFrom<String> for Color {
    type Error = ParamError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Color::from_hex(&s)
    }
}

/// A single parameter value in the flat key/value view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Float(f32),
    Count(u32),
    Color(Color),
}

impl ParamValue {
    pub fn as_f32(self) -> Option<f32> {
        match self {
            ParamValue::Float(v) => Some(v),
            ParamValue::Count(n) => Some(n as f32),
            ParamValue::Color(_) => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Count(n) => write!(f, "{n}"),
            ParamValue::Color(c) => write!(f, "{c}"),
        }
    }
}

/// Conversion between concrete field types and [`ParamValue`].
pub(crate) trait ParamField: Sized {
    const TYPE_NAME: &'static str;
    fn to_value(&self) -> ParamValue;
    fn from_value(value: ParamValue) -> Option<Self>;
}

impl ParamField for f32 {
    const TYPE_NAME: &'static str = "float";

    fn to_value(&self) -> ParamValue {
        ParamValue::Float(*self)
    }

    fn from_value(value: ParamValue) -> Option<Self> {
        value.as_f32()
    }
}

impl ParamField for u32 {
    const TYPE_NAME: &'static str = "count";

    fn to_value(&self) -> ParamValue {
        ParamValue::Count(*self)
    }

    fn from_value(value: ParamValue) -> Option<Self> {
        match value {
            ParamValue::Count(n) => Some(n),
            // Sliders report numbers; accept whole, non-negative floats.
            ParamValue::Float(v) if v.is_finite() && v >= 0.0 => Some(v.round() as u32),
            _ => None,
        }
    }
}

impl ParamField for Color {
    const TYPE_NAME: &'static str = "color";

    fn to_value(&self) -> ParamValue {
        ParamValue::Color(*self)
    }

    fn from_value(value: ParamValue) -> Option<Self> {
        match value {
            ParamValue::Color(c) => Some(c),
            _ => None,
        }
    }
}

fn assign<T: ParamField>(slot: &mut T, key: &str, value: ParamValue) -> Result<(), ParamError> {
    *slot = T::from_value(value).ok_or_else(|| ParamError::TypeMismatch {
        key: key.to_string(),
        expected: T::TYPE_NAME,
    })?;
    Ok(())
}

macro_rules! param_access {
    ($ty:ty, $kind:expr, { $($field:ident => $key:literal),* $(,)? }) => {
        impl $ty {
            /// Serialized keys, in declaration order.
            pub const KEYS: &'static [&'static str] = &[$($key),*];

            pub fn get(&self, key: &str) -> Option<ParamValue> {
                match key {
                    $($key => Some(ParamField::to_value(&self.$field)),)*
                    _ => None,
                }
            }

            pub fn set(&mut self, key: &str, value: ParamValue) -> Result<(), ParamError> {
                match key {
                    $($key => assign(&mut self.$field, key, value),)*
                    _ => Err(ParamError::UnknownKey {
                        key: key.to_string(),
                        kind: $kind.label(),
                    }),
                }
            }
        }
    };
}

/// Year-by-year particle shell.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct PointCloudParams {
    pub particles_per_year: u32,
    pub inner_radius: f32,
    pub outer_radius: f32,
    pub point_size: f32,
    pub color: Color,
    pub opacity: f32,
    /// Radians per second around the vertical axis.
    pub rotation_speed: f32,
    pub wobble_frequency: f32,
    pub wobble_amplitude: f32,
    /// Seconds the age counter takes to reach the biological age.
    pub count_duration: f32,
}

impl Default for PointCloudParams {
    fn default() -> Self {
        Self {
            particles_per_year: 50,
            inner_radius: 2.0,
            outer_radius: 6.0,
            point_size: 0.05,
            color: Color::CYAN,
            opacity: 0.8,
            rotation_speed: 0.12,
            wobble_frequency: 0.3,
            wobble_amplitude: 0.1,
            count_duration: 3.0,
        }
    }
}

param_access!(PointCloudParams, SceneKind::PointCloud, {
    particles_per_year => "particlesPerYear",
    inner_radius => "innerRadius",
    outer_radius => "outerRadius",
    point_size => "pointSize",
    color => "color",
    opacity => "opacity",
    rotation_speed => "rotationSpeed",
    wobble_frequency => "wobbleFrequency",
    wobble_amplitude => "wobbleAmplitude",
    count_duration => "countDuration",
});

/// Full-screen fragment shader uniforms.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct ShaderParams {
    pub time_speed: f32,
    pub intensity: f32,
    pub complexity: f32,
    pub mix_factor: f32,
    pub scale_factor: f32,
    pub wave_amplitude: f32,
    pub color_shift_r: f32,
    pub color_shift_g: f32,
    pub color_shift_b: f32,
    pub red_channel: f32,
    pub green_channel: f32,
    pub blue_channel: f32,
    pub opacity: f32,
}

impl Default for ShaderParams {
    fn default() -> Self {
        Self {
            time_speed: 1.0,
            intensity: 1.0,
            complexity: 40.0,
            mix_factor: 0.5,
            scale_factor: 0.15,
            wave_amplitude: 20.0,
            color_shift_r: 0.0,
            color_shift_g: 2.0,
            color_shift_b: 4.0,
            red_channel: 0.3,
            green_channel: 0.6,
            blue_channel: 1.0,
            opacity: 0.6,
        }
    }
}

param_access!(ShaderParams, SceneKind::ShaderField, {
    time_speed => "timeSpeed",
    intensity => "intensity",
    complexity => "complexity",
    mix_factor => "mixFactor",
    scale_factor => "scaleFactor",
    wave_amplitude => "waveAmplitude",
    color_shift_r => "colorShiftR",
    color_shift_g => "colorShiftG",
    color_shift_b => "colorShiftB",
    red_channel => "redChannel",
    green_channel => "greenChannel",
    blue_channel => "blueChannel",
    opacity => "opacity",
});

/// Nucleus with orbiting electrodes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct NucleusParams {
    pub electrode_count: u32,
    pub orbit_radius: f32,
    /// Full width of the band orbit radii are jittered in.
    pub orbit_jitter: f32,
    pub nucleus_color: Color,
    pub electrode_color: Color,
    pub electricity_color: Color,
    pub animation_speed: f32,
    pub electrode_size: f32,
    pub nucleus_size: f32,
    pub electricity_intensity: f32,
    pub rotation_speed: f32,
    pub pulse_intensity: f32,
    pub orbit_speed: f32,
    /// Seconds for one spark to travel nucleus -> electrode.
    pub spark_cycle: f32,
}

impl Default for NucleusParams {
    fn default() -> Self {
        Self {
            electrode_count: 6,
            orbit_radius: 2.5,
            orbit_jitter: 0.8,
            nucleus_color: Color::WHITE,
            electrode_color: Color::CYAN,
            electricity_color: Color::YELLOW,
            animation_speed: 1.0,
            electrode_size: 0.08,
            nucleus_size: 0.4,
            electricity_intensity: 1.0,
            rotation_speed: 0.5,
            pulse_intensity: 1.0,
            orbit_speed: 0.3,
            spark_cycle: 1.2,
        }
    }
}

param_access!(NucleusParams, SceneKind::NucleusOrbit, {
    electrode_count => "electrodeCount",
    orbit_radius => "orbitRadius",
    orbit_jitter => "orbitJitter",
    nucleus_color => "nucleusColor",
    electrode_color => "electrodeColor",
    electricity_color => "electricityColor",
    animation_speed => "animationSpeed",
    electrode_size => "electrodeSize",
    nucleus_size => "nucleusSize",
    electricity_intensity => "electricityIntensity",
    rotation_speed => "rotationSpeed",
    pulse_intensity => "pulseIntensity",
    orbit_speed => "orbitSpeed",
    spark_cycle => "sparkCycle",
});

/// Wireframe graph on a sphere with pulses traveling along its edges.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct NetworkParams {
    pub node_count: u32,
    pub sphere_radius: f32,
    pub connection_distance: f32,
    /// 0 = even golden-angle spiral, 1 = uniform random placement.
    pub random_placement: u32,
    pub node_color: Color,
    pub line_color1: Color,
    pub line_color2: Color,
    pub node_size: f32,
    pub rotation_speed: f32,
    pub pulse_count: u32,
    pub pulse_cycle: f32,
    pub pulse_frequency: f32,
    pub pulse_intensity: f32,
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self {
            node_count: 24,
            sphere_radius: 3.0,
            connection_distance: 2.5,
            random_placement: 0,
            node_color: Color::WHITE,
            line_color1: Color::CYAN,
            line_color2: Color::MAGENTA,
            node_size: 0.08,
            rotation_speed: 0.2,
            pulse_count: 8,
            pulse_cycle: 2.0,
            pulse_frequency: 1.5,
            pulse_intensity: 1.0,
        }
    }
}

param_access!(NetworkParams, SceneKind::WireframeNetwork, {
    node_count => "nodeCount",
    sphere_radius => "sphereRadius",
    connection_distance => "connectionDistance",
    random_placement => "randomPlacement",
    node_color => "nodeColor",
    line_color1 => "lineColor1",
    line_color2 => "lineColor2",
    node_size => "nodeSize",
    rotation_speed => "rotationSpeed",
    pulse_count => "pulseCount",
    pulse_cycle => "pulseCycle",
    pulse_frequency => "pulseFrequency",
    pulse_intensity => "pulseIntensity",
});

/// The configuration of one scene instance.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "kebab-case"))]
pub enum ParameterSet {
    PointCloud(PointCloudParams),
    ShaderField(ShaderParams),
    NucleusOrbit(NucleusParams),
    WireframeNetwork(NetworkParams),
}

impl Default for ParameterSet {
    fn default() -> Self {
        ParameterSet::default_for(SceneKind::NucleusOrbit)
    }
}

impl ParameterSet {
    /// The canonical default for a scene kind.
    pub fn default_for(kind: SceneKind) -> Self {
        match kind {
            SceneKind::PointCloud => ParameterSet::PointCloud(PointCloudParams::default()),
            SceneKind::ShaderField => ParameterSet::ShaderField(ShaderParams::default()),
            SceneKind::NucleusOrbit => ParameterSet::NucleusOrbit(NucleusParams::default()),
            SceneKind::WireframeNetwork => {
                ParameterSet::WireframeNetwork(NetworkParams::default())
            }
        }
    }

    pub fn kind(&self) -> SceneKind {
        match self {
            ParameterSet::PointCloud(_) => SceneKind::PointCloud,
            ParameterSet::ShaderField(_) => SceneKind::ShaderField,
            ParameterSet::NucleusOrbit(_) => SceneKind::NucleusOrbit,
            ParameterSet::WireframeNetwork(_) => SceneKind::WireframeNetwork,
        }
    }

    pub fn keys(&self) -> &'static [&'static str] {
        match self {
            ParameterSet::PointCloud(_) => PointCloudParams::KEYS,
            ParameterSet::ShaderField(_) => ShaderParams::KEYS,
            ParameterSet::NucleusOrbit(_) => NucleusParams::KEYS,
            ParameterSet::WireframeNetwork(_) => NetworkParams::KEYS,
        }
    }

    pub fn get(&self, key: &str) -> Option<ParamValue> {
        match self {
            ParameterSet::PointCloud(p) => p.get(key),
            ParameterSet::ShaderField(p) => p.get(key),
            ParameterSet::NucleusOrbit(p) => p.get(key),
            ParameterSet::WireframeNetwork(p) => p.get(key),
        }
    }

    /// A copy of `self` with one field replaced.
    pub fn with(&self, key: &str, value: ParamValue) -> Result<ParameterSet, ParamError> {
        let mut next = self.clone();
        match &mut next {
            ParameterSet::PointCloud(p) => p.set(key, value)?,
            ParameterSet::ShaderField(p) => p.set(key, value)?,
            ParameterSet::NucleusOrbit(p) => p.set(key, value)?,
            ParameterSet::WireframeNetwork(p) => p.set(key, value)?,
        }
        Ok(next)
    }

    /// All fields as `(key, value)` pairs, in declaration order.
    pub fn fields(&self) -> Vec<(&'static str, ParamValue)> {
        self.keys()
            .iter()
            .filter_map(|&k| self.get(k).map(|v| (k, v)))
            .collect()
    }

    /// Clamp every field into its declared domain, replacing non-finite floats
    /// with the default.
    pub fn sanitized(&self) -> ParameterSet {
        crate::schema::sanitize(self)
    }

    /// True when every structural field matches `other`.
    pub fn structural_eq(&self, other: &ParameterSet) -> bool {
        if self.kind() != other.kind() {
            return false;
        }
        crate::schema::specs(self.kind())
            .iter()
            .filter(|s| s.structural)
            .all(|s| self.get(s.key) == other.get(s.key))
    }

    /// Pretty-printed JSON, for display next to the control panel.
    #[cfg(feature = "serde")]
    pub fn to_pretty_json(&self) -> String {
        // Plain data with string keys; serialization cannot fail.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<ParameterSet, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Highest age the scenes build for. A point cloud holds
/// `MAX_AGE * particlesPerYear` particles at most.
pub const MAX_AGE: u32 = 150;

/// The two ages supplied by the surrounding page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct AgeInputs {
    pub biological_age: u32,
    pub chronological_age: u32,
}

impl AgeInputs {
    /// Ages are clamped into `1..=MAX_AGE`.
    pub fn new(biological_age: u32, chronological_age: u32) -> Self {
        Self {
            biological_age: biological_age.clamp(1, MAX_AGE),
            chronological_age: chronological_age.clamp(1, MAX_AGE),
        }
    }

    /// The age the counter and the layout use, clamped like [`AgeInputs::new`]
    /// for values written to the fields directly.
    pub fn counted_age(&self) -> u32 {
        self.biological_age.clamp(1, MAX_AGE)
    }
}

impl Default for AgeInputs {
    fn default() -> Self {
        Self::new(1, 1)
    }
}
