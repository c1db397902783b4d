//! The visualization host: one display region composed of the parameter
//! panel, a mounted scene and a renderer.
//!
//! The host owns the authoritative [`ParameterSet`]. Panel edits come back as
//! fresh copies, are stored here, and reach the scene on the next frame.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use glam::Vec2;

use crate::camera::{CameraConfig, Viewport};
use crate::clock::{AnimationClock, FrameTime};
use crate::error::{ParamError, RenderError};
use crate::input::{PointerEvent, PointerHub};
use crate::panel::{ConfigPanel, PanelHandler};
use crate::params::{AgeInputs, ParamValue, ParameterSet, SceneKind};
use crate::raster::Framebuffer;
use crate::render::{Frame, RenderAdapter, RenderBackend};
use crate::scene::{SceneCallbacks, SceneInstance, SceneOptions};
use crate::time::Duration;
use crate::timers::Scheduler;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HostConfig {
    pub ages: AgeInputs,
    pub viewport: Viewport,
    pub camera: CameraConfig,
    pub options: SceneOptions,
}

/// Text shown over the scene: the counting age and the chronological age.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeOverlay {
    pub display: u32,
    pub chronological: u32,
}

impl AgeOverlay {
    pub fn caption(&self) -> String {
        format!("vs {} chronological", self.chronological)
    }
}

impl fmt::Display for AgeOverlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.display, self.caption())
    }
}

type UserClick = Rc<RefCell<Option<Box<dyn FnMut()>>>>;

/// Collects what the panel emits during one host operation.
#[derive(Default)]
struct Emitted {
    params: Option<ParameterSet>,
    reset: bool,
}

impl PanelHandler for Emitted {
    fn on_change(&mut self, params: ParameterSet) {
        self.params = Some(params);
    }

    fn on_reset(&mut self) {
        self.reset = true;
    }
}

pub struct VisualizationHost {
    params: ParameterSet,
    ages: AgeInputs,
    options: SceneOptions,
    clock: AnimationClock,
    scheduler: Scheduler,
    hub: PointerHub,
    renderer: RenderAdapter,
    on_click: UserClick,
    clicks: Rc<Cell<u64>>,
    scene: Option<SceneInstance>,
}

impl VisualizationHost {
    /// Mount `params` (or the default of `kind` when absent) into a new host.
    pub fn new(
        kind: SceneKind,
        params: Option<ParameterSet>,
        config: HostConfig,
        backend: Box<dyn RenderBackend>,
    ) -> Self {
        let params = match params {
            Some(p) if p.kind() == kind => p.sanitized(),
            _ => ParameterSet::default_for(kind),
        };
        let renderer = RenderAdapter::new(backend, config.viewport).with_camera(config.camera);
        let mut host = Self {
            params,
            ages: config.ages,
            options: config.options,
            clock: AnimationClock::new(),
            scheduler: Scheduler::new(),
            hub: PointerHub::new(),
            renderer,
            on_click: Rc::new(RefCell::new(None)),
            clicks: Rc::new(Cell::new(0)),
            scene: None,
        };
        host.mount();
        host
    }

    /// A host that records frames instead of rasterizing them.
    pub fn headless(kind: SceneKind, config: HostConfig) -> Self {
        let renderer = Box::new(crate::render::RecordingBackend::new());
        Self::new(kind, None, config, renderer)
    }

    fn mount(&mut self) {
        // Release the old subscription and timer before the new ones exist.
        self.scene = None;
        let clicks = Rc::clone(&self.clicks);
        let user = Rc::clone(&self.on_click);
        let callbacks = SceneCallbacks::new().on_click(move || {
            clicks.set(clicks.get() + 1);
            if let Ok(mut f) = user.try_borrow_mut() {
                if let Some(f) = f.as_mut() {
                    f();
                }
            }
        });
        self.scene = Some(SceneInstance::mount(
            self.params.clone(),
            self.ages,
            &self.hub,
            &self.scheduler,
            self.options,
            callbacks,
        ));
    }

    /// Remount after [`VisualizationHost::unmount`]. No-op while mounted.
    pub fn remount(&mut self) {
        if self.scene.is_none() {
            self.mount();
        }
    }

    /// Drop the scene: its pointer listener and counting timer go with it.
    pub fn unmount(&mut self) {
        self.scene = None;
    }

    pub fn is_mounted(&self) -> bool {
        self.scene.is_some()
    }

    pub fn scene(&self) -> Option<&SceneInstance> {
        self.scene.as_ref()
    }

    pub fn kind(&self) -> SceneKind {
        self.params.kind()
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn ages(&self) -> AgeInputs {
        self.ages
    }

    pub fn panel(&self) -> ConfigPanel<'_> {
        ConfigPanel::new(&self.params)
    }

    pub fn pointer_hub(&self) -> &PointerHub {
        &self.hub
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn renderer(&self) -> &RenderAdapter {
        &self.renderer
    }

    pub fn framebuffer(&self) -> Option<&Framebuffer> {
        self.renderer.framebuffer()
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.renderer.last_frame()
    }

    /// Zero-argument callback run on every click that hits the scene.
    pub fn on_click(&mut self, f: impl FnMut() + 'static) {
        *self.on_click.borrow_mut() = Some(Box::new(f));
    }

    pub fn clicks(&self) -> u64 {
        self.clicks.get()
    }

    fn apply(&mut self, params: ParameterSet) {
        if let Some(scene) = self.scene.as_mut() {
            scene.update_params(params.clone());
        }
        self.params = params;
    }

    /// Edit one field through the panel.
    pub fn edit(&mut self, key: &str, value: ParamValue) -> Result<(), ParamError> {
        let mut emitted = Emitted::default();
        self.panel().set(key, value, &mut emitted)?;
        if let Some(params) = emitted.params {
            self.apply(params);
        }
        Ok(())
    }

    /// Edit one field from typed text (`0.5`, `#ff00ff`).
    pub fn edit_text(&mut self, key: &str, raw: &str) -> Result<(), ParamError> {
        let mut emitted = Emitted::default();
        self.panel().set_from_text(key, raw, &mut emitted)?;
        if let Some(params) = emitted.params {
            self.apply(params);
        }
        Ok(())
    }

    /// Restore the documented defaults of the current kind.
    pub fn reset(&mut self) {
        let mut emitted = Emitted::default();
        self.panel().reset(&mut emitted);
        if let Some(params) = emitted.params {
            self.apply(params);
        }
        if emitted.reset {
            tracing::info!(kind = %self.kind(), "parameters reset");
        }
    }

    /// Replace the whole parameter set. Out-of-domain values are clamped.
    pub fn set_params(&mut self, params: ParameterSet) {
        self.apply(params.sanitized());
    }

    /// Switch to another scene kind with its default parameters.
    pub fn set_kind(&mut self, kind: SceneKind) {
        if kind == self.kind() {
            return;
        }
        self.params = ParameterSet::default_for(kind);
        if self.scene.is_some() {
            self.mount();
        }
    }

    pub fn set_ages(&mut self, ages: AgeInputs) {
        self.ages = ages;
        if let Some(scene) = self.scene.as_mut() {
            scene.set_ages(ages);
        }
    }

    pub fn resize(&mut self, viewport: Viewport) {
        self.renderer.resize(viewport);
    }

    #[cfg(feature = "serde")]
    pub fn config_json(&self) -> String {
        self.params.to_pretty_json()
    }

    pub fn overlay(&self) -> AgeOverlay {
        let display = self
            .scene
            .as_ref()
            .map_or(self.ages.biological_age, SceneInstance::age_display);
        AgeOverlay {
            display,
            chronological: self.ages.chronological_age,
        }
    }

    /// Run one frame at wall-clock time.
    pub fn tick(&mut self) -> Result<&Frame, RenderError> {
        let time = self.clock.tick();
        self.frame(time)
    }

    /// Run one frame `dt` after the previous one.
    pub fn tick_by(&mut self, dt: Duration) -> Result<&Frame, RenderError> {
        let time = self.clock.advance(dt);
        self.frame(time)
    }

    fn frame(&mut self, time: FrameTime) -> Result<&Frame, RenderError> {
        self.scheduler.advance_to(time.elapsed);
        let Some(scene) = self.scene.as_mut() else {
            return Err(RenderError::Unavailable("no scene mounted".into()));
        };
        scene.tick(time.elapsed, self.renderer.camera());
        scene
            .draw(&mut self.renderer)?
            .ok_or_else(|| RenderError::Unavailable("scene has not ticked".into()))
    }

    /// Press the pointer at `position` (pixels, origin top-left).
    pub fn pointer_down(&self, position: Vec2) -> PointerEvent {
        self.hub.press(position)
    }
}

impl fmt::Debug for VisualizationHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisualizationHost")
            .field("kind", &self.kind())
            .field("ages", &self.ages)
            .field("backend", &self.renderer.backend_name())
            .field("scene", &self.scene)
            .finish_non_exhaustive()
    }
}
