//! Draw lists and render backends.
//!
//! Every tick the [`RenderAdapter`] turns the animated state, the layout and
//! the parameters into one [`Frame`]: a flat list of primitives in world space
//! plus the camera. Backends only ever see frames.

use glam::{EulerRot, Mat4, Vec3};

use crate::animation::{AnimatedState, KindState};
use crate::camera::{CameraConfig, CameraTransform, Viewport};
use crate::error::RenderError;
use crate::generator::SceneLayout;
use crate::params::ParameterSet;
use crate::raster::Framebuffer;
use crate::shader::ShaderUniforms;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawPrimitive {
    Point {
        position: Vec3,
        size: f32,
        color: [f32; 4],
    },
    Sphere {
        center: Vec3,
        radius: f32,
        color: [f32; 4],
    },
    Line {
        from: Vec3,
        to: Vec3,
        color: [f32; 4],
    },
    FullscreenQuad {
        uniforms: ShaderUniforms,
    },
}

impl DrawPrimitive {
    pub fn alpha(&self) -> f32 {
        match self {
            DrawPrimitive::Point { color, .. }
            | DrawPrimitive::Sphere { color, .. }
            | DrawPrimitive::Line { color, .. } => color[3],
            DrawPrimitive::FullscreenQuad { uniforms } => uniforms.opacity,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub camera: CameraTransform,
    pub clear: [f32; 4],
    pub primitives: Vec<DrawPrimitive>,
    pub elapsed: f64,
}

impl Frame {
    pub fn viewport(&self) -> Viewport {
        self.camera.viewport
    }
}

pub trait RenderBackend {
    fn name(&self) -> &'static str;

    /// Draw one frame. Must not block on I/O.
    fn submit(&mut self, frame: &Frame) -> Result<(), RenderError>;

    /// Pixels of the last submitted frame, for backends that produce any.
    fn framebuffer(&self) -> Option<&Framebuffer> {
        None
    }

    /// The viewport changed; the next frame arrives at `width` x `height`.
    fn resize(&mut self, _width: u32, _height: u32) {}
}

/// Keeps the submitted frames' count and the last frame. Used by tests and
/// headless hosts that only inspect draw lists.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub submitted: u64,
    pub last: Option<Frame>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderBackend for RecordingBackend {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn submit(&mut self, frame: &Frame) -> Result<(), RenderError> {
        self.submitted += 1;
        self.last = Some(frame.clone());
        Ok(())
    }
}

/// Model rotation for a frame: tilt around X, spin around Y.
pub fn model_matrix(state: &AnimatedState) -> Mat4 {
    Mat4::from_euler(EulerRot::XYZ, state.rotation_x, state.rotation_y, 0.0)
}

/// Build the draw list for one frame. One primitive per layout element.
pub fn build_frame(
    state: &AnimatedState,
    layout: &SceneLayout,
    params: &ParameterSet,
    camera: CameraTransform,
) -> Frame {
    let params = params.sanitized();
    let model = model_matrix(state);
    let mut primitives = Vec::with_capacity(layout.cardinality());

    match (layout, &state.detail, &params) {
        (SceneLayout::PointCloud(l), KindState::PointCloud(s), ParameterSet::PointCloud(p)) => {
            for (i, pos) in l.positions.iter().enumerate() {
                let alpha = if i < s.revealed { s.opacity } else { 0.0 };
                primitives.push(DrawPrimitive::Point {
                    position: model.transform_point3(*pos),
                    size: p.point_size,
                    color: p.color.with_alpha(alpha),
                });
            }
        }
        (SceneLayout::ShaderField, KindState::ShaderField(s), ParameterSet::ShaderField(p)) => {
            primitives.push(DrawPrimitive::FullscreenQuad {
                uniforms: ShaderUniforms::new(p, s.time, camera.viewport),
            });
        }
        (SceneLayout::NucleusOrbit(_), KindState::NucleusOrbit(s), ParameterSet::NucleusOrbit(p)) => {
            let center = model.transform_point3(Vec3::ZERO);
            primitives.push(DrawPrimitive::Sphere {
                center,
                radius: s.scale,
                color: p.nucleus_color.with_alpha(s.glow),
            });
            for e in &s.electrodes {
                let pos = model.transform_point3(e.position);
                primitives.push(DrawPrimitive::Sphere {
                    center: pos,
                    radius: p.electrode_size,
                    color: p.electrode_color.with_alpha(1.0),
                });
                primitives.push(DrawPrimitive::Line {
                    from: center,
                    to: pos,
                    color: p
                        .electricity_color
                        .with_alpha(0.35 * e.spark_intensity),
                });
                primitives.push(DrawPrimitive::Point {
                    position: center.lerp(pos, e.spark_progress),
                    size: p.electrode_size * 0.6,
                    color: p.electricity_color.with_alpha(e.spark_intensity),
                });
            }
        }
        (
            SceneLayout::WireframeNetwork(l),
            KindState::WireframeNetwork(s),
            ParameterSet::WireframeNetwork(p),
        ) => {
            for (node, intensity) in l.nodes.iter().zip(&s.node_intensity) {
                primitives.push(DrawPrimitive::Sphere {
                    center: model.transform_point3(*node),
                    radius: p.node_size,
                    color: p.node_color.with_alpha(*intensity),
                });
            }
            for (k, (&(a, b), opacity)) in l.edges.iter().zip(&s.edge_opacity).enumerate() {
                let t = if l.connection_distance > 0.0 {
                    l.edge_length(k) / l.connection_distance
                } else {
                    0.0
                };
                primitives.push(DrawPrimitive::Line {
                    from: model.transform_point3(l.nodes[a]),
                    to: model.transform_point3(l.nodes[b]),
                    color: p.line_color1.lerp(p.line_color2, t).with_alpha(*opacity),
                });
            }
            for pulse in &s.pulses {
                primitives.push(DrawPrimitive::Point {
                    position: model.transform_point3(pulse.position),
                    size: p.node_size * 0.75,
                    color: p.line_color1.with_alpha(1.0),
                });
            }
        }
        _ => {
            tracing::warn!(
                layout = %layout.kind(),
                params = %params.kind(),
                "animated state does not match layout; drawing nothing"
            );
        }
    }

    Frame {
        camera,
        clear: [0.0, 0.0, 0.0, 0.0],
        primitives,
        elapsed: state.elapsed,
    }
}

/// Builds frames and hands them to a backend.
pub struct RenderAdapter {
    backend: Box<dyn RenderBackend>,
    camera: CameraConfig,
    viewport: Viewport,
    last_frame: Option<Frame>,
    frames: u64,
}

impl RenderAdapter {
    pub fn new(backend: Box<dyn RenderBackend>, viewport: Viewport) -> Self {
        Self {
            backend,
            camera: CameraConfig::default(),
            viewport,
            last_frame: None,
            frames: 0,
        }
    }

    pub fn recording(viewport: Viewport) -> Self {
        Self::new(Box::new(RecordingBackend::new()), viewport)
    }

    pub fn with_camera(mut self, camera: CameraConfig) -> Self {
        self.camera = camera;
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn camera(&self) -> CameraTransform {
        CameraTransform::new(self.camera, self.viewport)
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.backend.resize(viewport.width, viewport.height);
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.last_frame.as_ref()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn framebuffer(&self) -> Option<&Framebuffer> {
        self.backend.framebuffer()
    }

    pub fn draw(
        &mut self,
        state: &AnimatedState,
        layout: &SceneLayout,
        params: &ParameterSet,
    ) -> Result<&Frame, RenderError> {
        let frame = build_frame(state, layout, params, self.camera());
        self.backend.submit(&frame)?;
        self.frames += 1;
        Ok(self.last_frame.insert(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::advance;
    use crate::generator::generate;
    use crate::params::{AgeInputs, SceneKind};
    use crate::prng::Prng;

    fn frames_for(kind: SceneKind, ages: AgeInputs, times: &[f64]) -> Vec<(usize, Frame)> {
        let params = ParameterSet::default_for(kind);
        let layout = generate(ages, &params, &mut Prng::new(11));
        let mut adapter = RenderAdapter::recording(Viewport::new(320, 240));
        let mut prev: Option<AnimatedState> = None;
        let mut out = Vec::new();
        for &t in times {
            let state = advance(prev.as_ref(), &layout, &params, t, ages);
            let frame = adapter.draw(&state, &layout, &params).unwrap().clone();
            out.push((layout.cardinality(), frame));
            prev = Some(state);
        }
        out
    }

    #[test]
    fn primitive_count_matches_layout_every_frame() {
        for kind in SceneKind::ALL {
            for (cardinality, frame) in frames_for(kind, AgeInputs::new(12, 30), &[0.0, 0.4, 1.7, 5.0]) {
                assert_eq!(frame.primitives.len(), cardinality, "{kind}");
                assert!(frame.primitives.iter().all(|p| (0.0..=1.0).contains(&p.alpha())));
            }
        }
    }

    #[test]
    fn unrevealed_particles_are_transparent_not_dropped() {
        let frames = frames_for(SceneKind::PointCloud, AgeInputs::new(10, 30), &[0.0, 1.5, 3.0]);
        let visible = |f: &Frame| f.primitives.iter().filter(|p| p.alpha() > 0.0).count();
        assert_eq!(visible(&frames[0].1), 50);
        assert!(visible(&frames[1].1) > 50 && visible(&frames[1].1) < 500);
        assert_eq!(visible(&frames[2].1), 500);
        assert!(frames.iter().all(|(_, f)| f.primitives.len() == 500));
    }

    #[test]
    fn shader_quad_carries_opacity() {
        let frames = frames_for(SceneKind::ShaderField, AgeInputs::default(), &[0.0, 2.0]);
        for (_, frame) in frames {
            let [DrawPrimitive::FullscreenQuad { uniforms }] = frame.primitives.as_slice() else {
                panic!("expected one quad");
            };
            assert_eq!(uniforms.opacity, 0.6);
            assert_eq!(uniforms.resolution_x, 320.0);
        }
    }
}
