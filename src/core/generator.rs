//! Static scene layouts.
//!
//! A layout is derived once per regeneration from the ages, the parameter set
//! and a random source, then reused by every frame until the next
//! regeneration. Nothing here reads the clock.

use glam::Vec3;
use std::f32::consts::TAU;

use crate::params::{
    AgeInputs, NetworkParams, NucleusParams, ParameterSet, PointCloudParams, SceneKind,
};
use crate::prng::Prng;

/// Vertical offsets of electrodes are drawn from `[-BAND, BAND]`.
pub const ELECTRODE_VERTICAL_BAND: f32 = 0.3;

const GOLDEN_ANGLE: f32 = 2.399_963_2;

#[derive(Debug, Clone, PartialEq)]
pub struct PointCloudLayout {
    pub positions: Vec<Vec3>,
    pub particles_per_year: usize,
}

impl PointCloudLayout {
    /// Particles belonging to the first `age` years.
    pub fn revealed_for(&self, age: u32) -> usize {
        (age as usize)
            .saturating_mul(self.particles_per_year)
            .min(self.positions.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Electrode {
    pub orbit_radius: f32,
    /// Radians per second before the global speed multiplier.
    pub orbit_speed: f32,
    pub angular_offset: f32,
    pub vertical_offset: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NucleusLayout {
    pub electrodes: Vec<Electrode>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseRoute {
    /// Index into [`NetworkLayout::edges`].
    pub edge: usize,
    /// Phase offset in seconds, in `[0, pulseCycle)`.
    pub start_time: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkLayout {
    pub nodes: Vec<Vec3>,
    /// Undirected edges with `a < b`.
    pub edges: Vec<(usize, usize)>,
    pub pulses: Vec<PulseRoute>,
    pub connection_distance: f32,
}

impl NetworkLayout {
    pub fn edge_length(&self, edge: usize) -> f32 {
        let (a, b) = self.edges[edge];
        self.nodes[a].distance(self.nodes[b])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SceneLayout {
    PointCloud(PointCloudLayout),
    /// The shader field has no geometry.
    ShaderField,
    NucleusOrbit(NucleusLayout),
    WireframeNetwork(NetworkLayout),
}

impl SceneLayout {
    pub fn kind(&self) -> SceneKind {
        match self {
            SceneLayout::PointCloud(_) => SceneKind::PointCloud,
            SceneLayout::ShaderField => SceneKind::ShaderField,
            SceneLayout::NucleusOrbit(_) => SceneKind::NucleusOrbit,
            SceneLayout::WireframeNetwork(_) => SceneKind::WireframeNetwork,
        }
    }

    /// Number of drawable elements; each frame draws exactly this many primitives.
    pub fn cardinality(&self) -> usize {
        match self {
            SceneLayout::PointCloud(l) => l.positions.len(),
            SceneLayout::ShaderField => 1,
            // The nucleus itself plus, per electrode, the sphere, its arc and its spark.
            SceneLayout::NucleusOrbit(l) => 1 + 3 * l.electrodes.len(),
            SceneLayout::WireframeNetwork(l) => l.nodes.len() + l.edges.len() + l.pulses.len(),
        }
    }
}

/// Derive a layout. Pure for a given `rng` state.
pub fn generate(ages: AgeInputs, params: &ParameterSet, rng: &mut Prng) -> SceneLayout {
    match params {
        ParameterSet::PointCloud(p) => SceneLayout::PointCloud(point_cloud(ages, p, rng)),
        ParameterSet::ShaderField(_) => SceneLayout::ShaderField,
        ParameterSet::NucleusOrbit(p) => SceneLayout::NucleusOrbit(nucleus(p, rng)),
        ParameterSet::WireframeNetwork(p) => SceneLayout::WireframeNetwork(network(p, rng)),
    }
}

fn non_negative(v: f32) -> f32 {
    if v.is_finite() {
        v.max(0.0)
    } else {
        0.0
    }
}

/// Uniform direction on the unit sphere: polar angle `acos(2u - 1)`.
fn random_direction(rng: &mut Prng) -> Vec3 {
    let theta = rng.gen_range_f32(0.0, TAU);
    let phi = (2.0 * rng.next_f32_01() - 1.0).clamp(-1.0, 1.0).acos();
    Vec3::new(phi.sin() * theta.cos(), phi.sin() * theta.sin(), phi.cos())
}

fn point_cloud(ages: AgeInputs, p: &PointCloudParams, rng: &mut Prng) -> PointCloudLayout {
    let per_year = p.particles_per_year.max(1) as usize;
    let count = ages.counted_age() as usize * per_year;

    let (mut lo, mut hi) = (non_negative(p.inner_radius), non_negative(p.outer_radius));
    if lo > hi {
        std::mem::swap(&mut lo, &mut hi);
    }

    let positions = (0..count)
        .map(|_| {
            let r = rng.gen_range_f32(lo, hi);
            random_direction(rng) * r
        })
        .collect();

    PointCloudLayout {
        positions,
        particles_per_year: per_year,
    }
}

fn nucleus(p: &NucleusParams, rng: &mut Prng) -> NucleusLayout {
    let count = p.electrode_count.max(1);
    let half_band = non_negative(p.orbit_jitter) * 0.5;
    let base = non_negative(p.orbit_radius);
    let speed = non_negative(p.orbit_speed);

    let electrodes = (0..count)
        .map(|i| Electrode {
            orbit_radius: (base + rng.gen_range_f32(-half_band, half_band)).max(0.0),
            orbit_speed: speed * rng.gen_range_f32(0.8, 1.2),
            angular_offset: i as f32 / count as f32 * TAU,
            vertical_offset: rng.gen_range_f32(-ELECTRODE_VERTICAL_BAND, ELECTRODE_VERTICAL_BAND),
        })
        .collect();

    NucleusLayout { electrodes }
}

/// Evenly spread points on a sphere (Fibonacci spiral).
fn spiral_points(n: usize, radius: f32) -> Vec<Vec3> {
    (0..n)
        .map(|i| {
            let y = 1.0 - (i as f32 + 0.5) / n as f32 * 2.0;
            let ring = (1.0 - y * y).max(0.0).sqrt();
            let theta = GOLDEN_ANGLE * i as f32;
            Vec3::new(theta.cos() * ring, y, theta.sin() * ring) * radius
        })
        .collect()
}

fn network(p: &NetworkParams, rng: &mut Prng) -> NetworkLayout {
    let n = p.node_count.max(1) as usize;
    let radius = non_negative(p.sphere_radius);
    let max_dist = non_negative(p.connection_distance);

    let nodes = if p.random_placement == 0 {
        spiral_points(n, radius)
    } else {
        (0..n).map(|_| random_direction(rng) * radius).collect()
    };

    let mut edges = Vec::new();
    for i in 0..n {
        for j in (i + 1)..n {
            if nodes[i].distance(nodes[j]) < max_dist {
                edges.push((i, j));
            }
        }
    }

    let cycle = non_negative(p.pulse_cycle);
    let pulses = if edges.is_empty() {
        Vec::new()
    } else {
        (0..p.pulse_count.max(1))
            .map(|_| PulseRoute {
                edge: rng.gen_range_usize(0, edges.len()),
                start_time: rng.gen_range_f32(0.0, cycle),
            })
            .collect()
    };

    NetworkLayout {
        nodes,
        edges,
        pulses,
        connection_distance: max_dist,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamValue;

    fn rng() -> Prng {
        Prng::new(42)
    }

    fn angle_between(a: Vec3, b: Vec3) -> f32 {
        a.normalize_or_zero()
            .dot(b.normalize_or_zero())
            .clamp(-1.0, 1.0)
            .acos()
    }

    #[test]
    fn point_cloud_has_one_shell_per_year() {
        let params = ParameterSet::default_for(SceneKind::PointCloud);
        let layout = generate(AgeInputs::new(35, 40), &params, &mut rng());
        let SceneLayout::PointCloud(cloud) = &layout else {
            panic!("wrong layout kind");
        };
        assert_eq!(cloud.positions.len(), 35 * 50);
        assert_eq!(layout.cardinality(), 35 * 50);
        assert_eq!(cloud.revealed_for(10), 500);
        assert_eq!(cloud.revealed_for(99), 35 * 50);
        for p in &cloud.positions {
            let r = p.length();
            assert!((2.0 - 1e-4..=6.0 + 1e-4).contains(&r), "radius {r}");
        }
    }

    #[test]
    fn huge_ages_are_capped() {
        let params = ParameterSet::default_for(SceneKind::PointCloud);
        let ages = AgeInputs {
            biological_age: u32::MAX,
            chronological_age: 40,
        };
        let layout = generate(ages, &params, &mut rng());
        assert_eq!(layout.cardinality(), crate::params::MAX_AGE as usize * 50);
    }

    #[test]
    fn inverted_radii_are_swapped() {
        let params = ParameterSet::default_for(SceneKind::PointCloud)
            .with("innerRadius", ParamValue::Float(5.0))
            .unwrap()
            .with("outerRadius", ParamValue::Float(1.0))
            .unwrap();
        let SceneLayout::PointCloud(cloud) = generate(AgeInputs::new(2, 2), &params, &mut rng())
        else {
            panic!("wrong layout kind");
        };
        assert!(cloud
            .positions
            .iter()
            .all(|p| (1.0 - 1e-4..=5.0 + 1e-4).contains(&p.length())));
    }

    #[test]
    fn nucleus_electrodes_follow_their_bands() {
        let params = ParameterSet::default_for(SceneKind::NucleusOrbit);
        let SceneLayout::NucleusOrbit(layout) =
            generate(AgeInputs::new(40, 40), &params, &mut rng())
        else {
            panic!("wrong layout kind");
        };
        assert_eq!(layout.electrodes.len(), 6);
        for (i, e) in layout.electrodes.iter().enumerate() {
            assert!((2.1 - 1e-4..=2.9 + 1e-4).contains(&e.orbit_radius), "radius {}", e.orbit_radius);
            assert!((0.24 - 1e-4..=0.36 + 1e-4).contains(&e.orbit_speed), "speed {}", e.orbit_speed);
            assert!(e.vertical_offset.abs() <= ELECTRODE_VERTICAL_BAND + 1e-6);
            let expected = i as f32 * TAU / 6.0;
            assert!((e.angular_offset - expected).abs() < 1e-5);
        }
    }

    #[test]
    fn zero_counts_clamp_to_one() {
        let params = ParameterSet::default_for(SceneKind::NucleusOrbit)
            .with("electrodeCount", ParamValue::Count(0))
            .unwrap();
        let SceneLayout::NucleusOrbit(layout) = generate(AgeInputs::default(), &params, &mut rng())
        else {
            panic!("wrong layout kind");
        };
        assert_eq!(layout.electrodes.len(), 1);
    }

    #[test]
    fn zero_connection_distance_yields_no_edges_or_pulses() {
        let params = ParameterSet::default_for(SceneKind::WireframeNetwork)
            .with("connectionDistance", ParamValue::Float(0.0))
            .unwrap();
        let layout = generate(AgeInputs::default(), &params, &mut rng());
        let SceneLayout::WireframeNetwork(net) = &layout else {
            panic!("wrong layout kind");
        };
        assert_eq!(net.nodes.len(), 24);
        assert!(net.edges.is_empty());
        assert!(net.pulses.is_empty());
        assert_eq!(layout.cardinality(), 24);
    }

    #[test]
    fn network_edges_respect_distance_and_ordering() {
        for placement in [0, 1] {
            let params = ParameterSet::default_for(SceneKind::WireframeNetwork)
                .with("randomPlacement", ParamValue::Count(placement))
                .unwrap();
            let SceneLayout::WireframeNetwork(net) =
                generate(AgeInputs::default(), &params, &mut rng())
            else {
                panic!("wrong layout kind");
            };
            assert!(!net.edges.is_empty());
            for (k, &(a, b)) in net.edges.iter().enumerate() {
                assert!(a < b);
                assert!(net.edge_length(k) < 2.5);
            }
            for node in &net.nodes {
                assert!((node.length() - 3.0).abs() < 1e-3);
            }
            assert_eq!(net.pulses.len(), 8);
            for pulse in &net.pulses {
                assert!(pulse.edge < net.edges.len());
                assert!((0.0..2.0).contains(&pulse.start_time));
            }
        }
    }

    #[test]
    fn spiral_spreads_nodes_apart() {
        let nodes = spiral_points(24, 1.0);
        let min_angle = (0..nodes.len())
            .flat_map(|i| ((i + 1)..nodes.len()).map(move |j| (i, j)))
            .map(|(i, j)| angle_between(nodes[i], nodes[j]))
            .fold(f32::MAX, f32::min);
        assert!(min_angle > 0.3, "min angle {min_angle}");
    }

    #[test]
    fn fixed_seed_reproduces_layout() {
        let params = ParameterSet::default_for(SceneKind::WireframeNetwork);
        let a = generate(AgeInputs::default(), &params, &mut Prng::new(9));
        let b = generate(AgeInputs::default(), &params, &mut Prng::new(9));
        assert_eq!(a, b);
    }
}
