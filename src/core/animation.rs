//! Per-frame animated state.
//!
//! [`advance`] is a pure transition: the previous state, the static layout,
//! the parameters, the elapsed time and the ages fully determine the next
//! state. Calling it twice with the same arguments yields the same value.

use glam::Vec3;
use std::f32::consts::TAU;

use crate::generator::{NetworkLayout, NucleusLayout, PointCloudLayout, SceneLayout};
use crate::params::{
    AgeInputs, NetworkParams, NucleusParams, ParameterSet, PointCloudParams, ShaderParams,
};

/// Count-up duration for scene kinds without a `countDuration` parameter.
pub const DEFAULT_COUNT_DURATION: f64 = 3.0;

/// The age counter always starts here.
pub const COUNT_START: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgeCounter {
    pub target: u32,
    /// Elapsed time at which the current count started.
    pub started_at: f64,
    /// Count duration taken when the count started; later edits do not apply.
    pub duration: f64,
    pub display: u32,
}

impl AgeCounter {
    fn start(target: u32, elapsed: f64, duration: f64) -> Self {
        Self {
            target,
            started_at: elapsed,
            duration,
            display: counting_display(0.0, COUNT_START, target, duration),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointCloudState {
    /// Particles of the years counted so far.
    pub revealed: usize,
    pub opacity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShaderState {
    /// Shader clock; advances by `timeSpeed` per second.
    pub time: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElectrodeState {
    pub angle: f32,
    pub position: Vec3,
    pub spark_progress: f32,
    pub spark_intensity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NucleusState {
    pub scale: f32,
    pub glow: f32,
    pub electrodes: Vec<ElectrodeState>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseState {
    pub progress: f32,
    pub position: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkState {
    pub node_intensity: Vec<f32>,
    pub edge_opacity: Vec<f32>,
    pub pulses: Vec<PulseState>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum KindState {
    PointCloud(PointCloudState),
    ShaderField(ShaderState),
    NucleusOrbit(NucleusState),
    WireframeNetwork(NetworkState),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimatedState {
    pub elapsed: f64,
    pub rotation_x: f32,
    pub rotation_y: f32,
    pub age: AgeCounter,
    pub detail: KindState,
}

fn clamp01(v: f32) -> f32 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Repeating ramp in `[0, 1)`: `((elapsed - start) / cycle) mod 1`.
pub fn sawtooth(elapsed: f64, start: f64, cycle: f64) -> f32 {
    if cycle.is_nan() || cycle <= 0.0 || !elapsed.is_finite() || !start.is_finite() {
        return 0.0;
    }
    let p = ((elapsed - start) / cycle).rem_euclid(1.0) as f32;
    // rem_euclid can round up to exactly 1.0 in f32.
    if p >= 1.0 {
        0.0
    } else {
        p
    }
}

/// Counter value `t` seconds into a count from `start` to `target`.
pub fn counting_display(t: f64, start: u32, target: u32, duration: f64) -> u32 {
    if target <= start || duration.is_nan() || duration <= 0.0 {
        return target;
    }
    if t.is_nan() || t <= 0.0 {
        return start;
    }
    let steps = (target - start) as f64;
    let n = (t * steps / duration + 1e-9).floor();
    if n >= steps {
        target
    } else {
        start + n as u32
    }
}

/// Seconds the age counter takes to reach its target.
pub fn count_duration(params: &ParameterSet) -> f64 {
    match params {
        ParameterSet::PointCloud(p) => p.count_duration as f64,
        _ => DEFAULT_COUNT_DURATION,
    }
}

/// Advance to `elapsed` seconds.
pub fn advance(
    prev: Option<&AnimatedState>,
    layout: &SceneLayout,
    params: &ParameterSet,
    elapsed: f64,
    ages: AgeInputs,
) -> AnimatedState {
    let params = if params.kind() == layout.kind() {
        params.sanitized()
    } else {
        // Mid-switch between kinds: animate the layout with its own defaults.
        ParameterSet::default_for(layout.kind())
    };
    // Monotonic: a late or non-finite timestamp holds the previous frame's time.
    let elapsed = match prev {
        Some(p) if !elapsed.is_finite() || elapsed < p.elapsed => p.elapsed,
        None if !elapsed.is_finite() => 0.0,
        _ => elapsed,
    };
    let dt = prev.map_or(0.0, |p| elapsed - p.elapsed) as f32;

    let target = ages.counted_age();
    let age = match prev {
        Some(p) if p.age.target == target => AgeCounter {
            display: counting_display(elapsed - p.age.started_at, COUNT_START, target, p.age.duration)
                .max(p.age.display),
            ..p.age
        },
        _ => AgeCounter::start(target, elapsed, count_duration(&params)),
    };

    let prev_rot_y = prev.map_or(0.0, |p| p.rotation_y);
    let t = elapsed as f32;

    let (rotation_x, spin, detail) = match (layout, &params) {
        (SceneLayout::PointCloud(l), ParameterSet::PointCloud(p)) => (
            (t * p.wobble_frequency).sin() * p.wobble_amplitude,
            p.rotation_speed,
            KindState::PointCloud(point_cloud(l, p, age.display)),
        ),
        (SceneLayout::NucleusOrbit(l), ParameterSet::NucleusOrbit(p)) => {
            let prev_electrodes = match prev.map(|s| &s.detail) {
                Some(KindState::NucleusOrbit(n)) if n.electrodes.len() == l.electrodes.len() => {
                    Some(n.electrodes.as_slice())
                }
                _ => None,
            };
            (
                0.0,
                p.rotation_speed * p.animation_speed,
                KindState::NucleusOrbit(nucleus(l, p, elapsed, dt, prev_electrodes)),
            )
        }
        (SceneLayout::WireframeNetwork(l), ParameterSet::WireframeNetwork(p)) => (
            0.0,
            p.rotation_speed,
            KindState::WireframeNetwork(network(l, p, elapsed)),
        ),
        (_, ParameterSet::ShaderField(p)) => {
            let prev_time = match prev.map(|s| &s.detail) {
                Some(KindState::ShaderField(s)) => s.time,
                _ => 0.0,
            };
            (0.0, 0.0, KindState::ShaderField(shader(p, prev_time, dt)))
        }
        // Unreachable after the kind check above; keep the previous pose.
        _ => (
            prev.map_or(0.0, |p| p.rotation_x),
            0.0,
            prev.map_or(KindState::ShaderField(ShaderState { time: 0.0 }), |p| {
                p.detail.clone()
            }),
        ),
    };

    AnimatedState {
        elapsed,
        rotation_x,
        rotation_y: (prev_rot_y + spin.max(0.0) * dt).rem_euclid(TAU),
        age,
        detail,
    }
}

impl AnimatedState {
    /// Take the counter value from an external count (the scene's timer) so
    /// the revealed particles follow the overlay.
    pub fn sync_age(&mut self, layout: &SceneLayout, display: u32) {
        let display = display.min(self.age.target);
        self.age.display = display;
        if let (KindState::PointCloud(s), SceneLayout::PointCloud(l)) = (&mut self.detail, layout) {
            s.revealed = l.revealed_for(display);
        }
    }
}

fn point_cloud(layout: &PointCloudLayout, p: &PointCloudParams, display: u32) -> PointCloudState {
    PointCloudState {
        revealed: layout.revealed_for(display),
        opacity: clamp01(p.opacity),
    }
}

fn shader(p: &ShaderParams, prev_time: f32, dt: f32) -> ShaderState {
    ShaderState {
        time: prev_time + p.time_speed.max(0.0) * dt,
    }
}

fn nucleus(
    layout: &NucleusLayout,
    p: &NucleusParams,
    elapsed: f64,
    dt: f32,
    prev: Option<&[ElectrodeState]>,
) -> NucleusState {
    let speed = p.animation_speed.max(0.0);
    let t = elapsed as f32 * speed;
    let count = layout.electrodes.len().max(1) as f64;
    let cycle = p.spark_cycle.max(0.0) as f64;

    let electrodes = layout
        .electrodes
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let angle = match prev {
                Some(prev) => prev[i].angle + e.orbit_speed * speed * dt,
                None => e.angular_offset + e.orbit_speed * t,
            }
            .rem_euclid(TAU);
            let phase = i as f64 / count * cycle;
            ElectrodeState {
                angle,
                position: Vec3::new(
                    angle.cos() * e.orbit_radius,
                    e.vertical_offset,
                    angle.sin() * e.orbit_radius,
                ),
                spark_progress: sawtooth(elapsed * speed as f64, phase, cycle),
                spark_intensity: clamp01(
                    p.electricity_intensity * (0.5 + 0.5 * (t * 8.0 + e.angular_offset).sin()),
                ),
            }
        })
        .collect();

    let beat = (t * 2.0).sin();
    NucleusState {
        scale: (p.nucleus_size * (1.0 + 0.15 * p.pulse_intensity * beat)).max(0.0),
        glow: clamp01(0.6 + 0.4 * p.pulse_intensity * (t * 3.0).sin()),
        electrodes,
    }
}

fn network(layout: &NetworkLayout, p: &NetworkParams, elapsed: f64) -> NetworkState {
    let t = elapsed as f32;
    let node_intensity = (0..layout.nodes.len())
        .map(|i| {
            let wave = (t * p.pulse_frequency + i as f32 * 0.5).sin();
            clamp01(0.5 + 0.5 * p.pulse_intensity * wave)
        })
        .collect();

    let reach = layout.connection_distance;
    let edge_opacity = (0..layout.edges.len())
        .map(|k| {
            let closeness = if reach > 0.0 {
                1.0 - layout.edge_length(k) / reach
            } else {
                0.0
            };
            clamp01(0.2 + 0.8 * closeness)
        })
        .collect();

    let cycle = p.pulse_cycle.max(0.0) as f64;
    let pulses = layout
        .pulses
        .iter()
        .map(|route| {
            let progress = sawtooth(elapsed, route.start_time as f64, cycle);
            let (a, b) = layout.edges[route.edge];
            PulseState {
                progress,
                position: layout.nodes[a].lerp(layout.nodes[b], progress),
            }
        })
        .collect();

    NetworkState {
        node_intensity,
        edge_opacity,
        pulses,
    }
}
