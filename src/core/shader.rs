//! Procedural plasma field.
//!
//! [`shade`] is the CPU port of [`PLASMA_SHADER`]; both compute the same
//! function of `(pixel, uniforms)`. Output alpha is always the `opacity`
//! uniform.

use glam::Vec2;
use std::f32::consts::PI;

use crate::camera::Viewport;
use crate::params::ShaderParams;

/// Uniform block of the shader field (must match `Uniforms` in the WGSL).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "gpu", derive(bytemuck::Pod, bytemuck::Zeroable))]
pub struct ShaderUniforms {
    pub time: f32,
    pub resolution_x: f32,
    pub resolution_y: f32,
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

impl ShaderUniforms {
    /// `time` is the shader clock, already scaled by `timeSpeed`.
    pub fn new(params: &ShaderParams, time: f32, viewport: Viewport) -> Self {
        Self {
            time,
            resolution_x: viewport.width as f32,
            resolution_y: viewport.height as f32,
            time_speed: params.time_speed,
            intensity: params.intensity,
            complexity: params.complexity,
            mix_factor: params.mix_factor,
            scale_factor: params.scale_factor,
            wave_amplitude: params.wave_amplitude,
            color_shift_r: params.color_shift_r,
            color_shift_g: params.color_shift_g,
            color_shift_b: params.color_shift_b,
            red_channel: params.red_channel,
            green_channel: params.green_channel,
            blue_channel: params.blue_channel,
            opacity: params.opacity,
        }
    }
}

fn mix(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Color of the pixel whose top-left corner is at `pixel` (sampled at its
/// center). Channels are in `[0, 1]`.
pub fn shade(pixel: Vec2, u: &ShaderUniforms) -> [f32; 4] {
    let res = Vec2::new(u.resolution_x.max(1.0), u.resolution_y.max(1.0));
    let frag = pixel + Vec2::splat(0.5);
    let p = (frag - 0.5 * res) / res.y * (u.complexity * u.scale_factor);
    let t = u.time;

    let plane = ((p.x + t).sin() + (p.y + t * 0.5).sin() + (p.x + p.y + t * 0.7).sin()) / 3.0;
    let ripple = (p.length() * u.wave_amplitude * 0.1 - t).sin();
    let v = mix(plane, ripple, u.mix_factor.clamp(0.0, 1.0));
    let phase = v * PI * u.intensity;

    let channel = |shift: f32, gain: f32| (gain * (0.5 + 0.5 * (phase + shift).sin())).clamp(0.0, 1.0);
    [
        channel(u.color_shift_r, u.red_channel),
        channel(u.color_shift_g, u.green_channel),
        channel(u.color_shift_b, u.blue_channel),
        u.opacity.clamp(0.0, 1.0),
    ]
}

/// Full-screen triangle plus the plasma fragment stage.
pub const PLASMA_SHADER: &str = r#"
struct Uniforms {
    time: f32,
    resolution_x: f32,
    resolution_y: f32,
    time_speed: f32,
    intensity: f32,
    complexity: f32,
    mix_factor: f32,
    scale_factor: f32,
    wave_amplitude: f32,
    color_shift_r: f32,
    color_shift_g: f32,
    color_shift_b: f32,
    red_channel: f32,
    green_channel: f32,
    blue_channel: f32,
    opacity: f32,
}

@group(0) @binding(0) var<uniform> u: Uniforms;

const PI: f32 = 3.14159265359;

@vertex
fn vs_main(@builtin(vertex_index) vi: u32) -> @builtin(position) vec4<f32> {
    let x = f32((vi << 1u) & 2u) * 2.0 - 1.0;
    let y = f32(vi & 2u) * 2.0 - 1.0;
    return vec4<f32>(x, y, 0.0, 1.0);
}

fn channel(phase: f32, shift: f32, gain: f32) -> f32 {
    return clamp(gain * (0.5 + 0.5 * sin(phase + shift)), 0.0, 1.0);
}

@fragment
fn fs_main(@builtin(position) frag: vec4<f32>) -> @location(0) vec4<f32> {
    let res = vec2<f32>(max(u.resolution_x, 1.0), max(u.resolution_y, 1.0));
    let p = (frag.xy - 0.5 * res) / res.y * (u.complexity * u.scale_factor);
    let t = u.time;

    let plane = (sin(p.x + t) + sin(p.y + t * 0.5) + sin(p.x + p.y + t * 0.7)) / 3.0;
    let ripple = sin(length(p) * u.wave_amplitude * 0.1 - t);
    let v = mix(plane, ripple, clamp(u.mix_factor, 0.0, 1.0));
    let phase = v * PI * u.intensity;

    return vec4<f32>(
        channel(phase, u.color_shift_r, u.red_channel),
        channel(phase, u.color_shift_g, u.green_channel),
        channel(phase, u.color_shift_b, u.blue_channel),
        clamp(u.opacity, 0.0, 1.0),
    );
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn uniforms(time: f32) -> ShaderUniforms {
        ShaderUniforms::new(&ShaderParams::default(), time, Viewport::new(64, 48))
    }

    #[test]
    fn alpha_is_exactly_opacity() {
        for time in [0.0, 1.0, 17.5] {
            let u = uniforms(time);
            for y in (0..48).step_by(7) {
                for x in (0..64).step_by(5) {
                    let c = shade(Vec2::new(x as f32, y as f32), &u);
                    assert_eq!(c[3], 0.6);
                    assert!(c[..3].iter().all(|v| (0.0..=1.0).contains(v)));
                }
            }
        }
    }

    #[test]
    fn shading_is_deterministic() {
        let u = uniforms(2.25);
        let a = shade(Vec2::new(10.0, 20.0), &u);
        let b = shade(Vec2::new(10.0, 20.0), &u);
        assert_eq!(a, b);
    }

    #[test]
    fn channel_gain_bounds_each_channel() {
        let params = ShaderParams {
            red_channel: 0.0,
            ..ShaderParams::default()
        };
        let u = ShaderUniforms::new(&params, 0.5, Viewport::new(32, 32));
        for x in 0..32 {
            let c = shade(Vec2::new(x as f32, 7.0), &u);
            assert_eq!(c[0], 0.0);
            assert!(c[1] <= 0.6 + 1e-6);
        }
    }

    #[test]
    fn wgsl_declares_every_uniform() {
        for field in [
            "time_speed",
            "intensity",
            "complexity",
            "mix_factor",
            "scale_factor",
            "wave_amplitude",
            "color_shift_r",
            "color_shift_g",
            "color_shift_b",
            "red_channel",
            "green_channel",
            "blue_channel",
            "opacity",
        ] {
            assert!(PLASMA_SHADER.contains(&format!("{field}: f32")), "{field}");
        }
        assert_eq!(std::mem::size_of::<ShaderUniforms>(), 64);
    }
}
