//! Parametric real-time visualization of a biological age.
//!
//! Two ages and a small parameter set become a continuously animated scene:
//! a point cloud, a shader field, an orbiting nucleus or a wireframe network.
//! [`host::VisualizationHost`] is the usual entry point.

#[path = "core/params.rs"]
pub mod params;

#[path = "core/schema.rs"]
pub mod schema;

#[path = "core/error.rs"]
pub mod error;

#[path = "core/prng.rs"]
pub mod prng;

#[path = "core/generator.rs"]
pub mod generator;

#[path = "core/time.rs"]
pub mod time;

#[path = "core/clock.rs"]
pub mod clock;

#[path = "core/timers.rs"]
pub mod timers;

#[path = "core/animation.rs"]
pub mod animation;

#[path = "core/camera.rs"]
pub mod camera;

#[path = "core/picking.rs"]
pub mod picking;

#[path = "core/input.rs"]
pub mod input;

#[path = "core/shader.rs"]
pub mod shader;

#[path = "core/render.rs"]
pub mod render;

#[path = "core/raster.rs"]
pub mod raster;

#[cfg(feature = "gpu")]
#[path = "core/gpu.rs"]
pub mod gpu;

#[path = "core/panel.rs"]
pub mod panel;

#[path = "core/scene.rs"]
pub mod scene;

#[path = "core/host.rs"]
pub mod host;

pub use error::{ParamError, RenderError};
pub use host::{AgeOverlay, HostConfig, VisualizationHost};
pub use params::{AgeInputs, Color, ParamValue, ParameterSet, SceneKind};
pub use scene::{RegenerationTrigger, SceneOptions};
