//! Scene kinds and mounted scene instances.
//!
//! [`SceneKind`] dispatches the four per-kind operations (generate, advance,
//! draw, pickables). A [`SceneInstance`] is one mounted scene: it caches the
//! layout, decides when to regenerate it, and owns the pointer subscription
//! and the counting timer of that mount. Both are released when the instance
//! is dropped.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use glam::Vec3;

use crate::animation::{self, AnimatedState, KindState, COUNT_START};
use crate::camera::CameraTransform;
use crate::error::RenderError;
use crate::generator::{self, SceneLayout};
use crate::input::{ListenerGuard, PointerEvent, PointerHub, PointerKind};
use crate::params::{AgeInputs, ParameterSet, SceneKind};
use crate::picking::{self, HitElementId, PickShape, PickTarget};
use crate::prng::{Prng, SeedPolicy};
use crate::render::{model_matrix, Frame, RenderAdapter};
use crate::timers::{CountingAnimation, Scheduler};

/// Distance of the shader field's pick surface from the camera.
pub const SURFACE_DISTANCE: f32 = 10.0;

impl SceneKind {
    /// Build a layout for this kind. Parameters of another kind are ignored in
    /// favour of this kind's defaults.
    pub fn generate(self, ages: AgeInputs, params: &ParameterSet, rng: &mut Prng) -> SceneLayout {
        if params.kind() == self {
            generator::generate(ages, params, rng)
        } else {
            generator::generate(ages, &ParameterSet::default_for(self), rng)
        }
    }

    pub fn advance(
        self,
        prev: Option<&AnimatedState>,
        layout: &SceneLayout,
        params: &ParameterSet,
        elapsed: f64,
        ages: AgeInputs,
    ) -> AnimatedState {
        animation::advance(prev, layout, params, elapsed, ages)
    }

    pub fn draw<'a>(
        self,
        adapter: &'a mut RenderAdapter,
        state: &AnimatedState,
        layout: &SceneLayout,
        params: &ParameterSet,
    ) -> Result<&'a Frame, RenderError> {
        adapter.draw(state, layout, params)
    }

    /// Bounding spheres (or the viewport surface) that can be clicked this frame.
    pub fn pickables(
        self,
        state: &AnimatedState,
        layout: &SceneLayout,
        params: &ParameterSet,
    ) -> Vec<PickTarget> {
        let params = if params.kind() == self {
            params.sanitized()
        } else {
            ParameterSet::default_for(self)
        };
        let model = model_matrix(state);

        match (layout, &state.detail, &params) {
            (SceneLayout::PointCloud(l), KindState::PointCloud(s), ParameterSet::PointCloud(p)) => l
                .positions
                .iter()
                .take(s.revealed)
                .enumerate()
                .map(|(i, pos)| {
                    PickTarget::sphere(
                        HitElementId::Particle(i),
                        model.transform_point3(*pos),
                        p.point_size,
                    )
                })
                .collect(),
            (SceneLayout::ShaderField, _, _) => vec![PickTarget {
                id: HitElementId::Surface,
                shape: PickShape::Viewport {
                    distance: SURFACE_DISTANCE,
                },
            }],
            (SceneLayout::NucleusOrbit(_), KindState::NucleusOrbit(s), ParameterSet::NucleusOrbit(p)) => {
                let mut targets = Vec::with_capacity(s.electrodes.len() + 1);
                targets.push(PickTarget::sphere(
                    HitElementId::Nucleus,
                    model.transform_point3(Vec3::ZERO),
                    s.scale,
                ));
                targets.extend(s.electrodes.iter().enumerate().map(|(i, e)| {
                    PickTarget::sphere(
                        HitElementId::Electrode(i),
                        model.transform_point3(e.position),
                        p.electrode_size,
                    )
                }));
                targets
            }
            (
                SceneLayout::WireframeNetwork(l),
                KindState::WireframeNetwork(_),
                ParameterSet::WireframeNetwork(p),
            ) => l
                .nodes
                .iter()
                .enumerate()
                .map(|(i, node)| {
                    PickTarget::sphere(HitElementId::Node(i), model.transform_point3(*node), p.node_size)
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// When a parameter edit rebuilds the cached layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegenerationTrigger {
    /// Any field change reshuffles the layout.
    #[default]
    AnyChange,
    /// Only changes to structural fields (counts, radii, distances, placement).
    StructuralOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SceneOptions {
    pub seed: SeedPolicy,
    pub trigger: RegenerationTrigger,
}

/// Callbacks a mounted scene reports through.
#[derive(Default)]
pub struct SceneCallbacks {
    on_click: Option<Box<dyn FnMut()>>,
    on_age_display: Option<Box<dyn FnMut(u32)>>,
}

impl SceneCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called once per pointer-down that hits the scene.
    pub fn on_click(mut self, f: impl FnMut() + 'static) -> Self {
        self.on_click = Some(Box::new(f));
        self
    }

    /// Called with every value of the counting overlay.
    pub fn on_age_display(mut self, f: impl FnMut(u32) + 'static) -> Self {
        self.on_age_display = Some(Box::new(f));
        self
    }
}

/// What the pointer listener needs to hit-test, refreshed every tick.
#[derive(Default)]
struct PickContext {
    camera: Option<CameraTransform>,
    targets: Vec<PickTarget>,
    last_sequence: Option<u64>,
    clicks: u64,
}

type ClickFn = Rc<RefCell<Option<Box<dyn FnMut()>>>>;
type DisplayFn = Rc<RefCell<Option<Box<dyn FnMut(u32)>>>>;

fn handle_pointer(ctx: &RefCell<PickContext>, on_click: &ClickFn, event: &PointerEvent) {
    if event.kind != PointerKind::Down {
        return;
    }
    let hit = {
        let mut ctx = ctx.borrow_mut();
        if ctx.last_sequence == Some(event.sequence) {
            return;
        }
        ctx.last_sequence = Some(event.sequence);
        let Some(camera) = ctx.camera else {
            return;
        };
        let hit = picking::pick(event.position, &camera, &ctx.targets);
        if hit.is_some() {
            ctx.clicks += 1;
        }
        hit
    };
    let Some(hit) = hit else {
        return;
    };
    tracing::debug!(id = ?hit.id, sequence = event.sequence, "scene clicked");
    if let Ok(mut f) = on_click.try_borrow_mut() {
        if let Some(f) = f.as_mut() {
            f();
        }
    }
}

/// One mounted scene.
pub struct SceneInstance {
    kind: SceneKind,
    params: ParameterSet,
    ages: AgeInputs,
    options: SceneOptions,
    layout: SceneLayout,
    regenerations: u64,
    state: Option<AnimatedState>,
    scheduler: Scheduler,
    pick: Rc<RefCell<PickContext>>,
    age_display: Rc<Cell<u32>>,
    on_age_display: DisplayFn,
    counter: Option<CountingAnimation>,
    _listener: ListenerGuard,
}

impl SceneInstance {
    pub fn mount(
        params: ParameterSet,
        ages: AgeInputs,
        hub: &PointerHub,
        scheduler: &Scheduler,
        options: SceneOptions,
        callbacks: SceneCallbacks,
    ) -> Self {
        let kind = params.kind();
        let layout = kind.generate(ages, &params, &mut options.seed.rng());

        let pick = Rc::new(RefCell::new(PickContext::default()));
        let on_click: ClickFn = Rc::new(RefCell::new(callbacks.on_click));
        let listener = {
            let pick = Rc::clone(&pick);
            hub.subscribe(move |event| handle_pointer(&pick, &on_click, event))
        };

        let mut instance = Self {
            kind,
            params,
            ages,
            options,
            layout,
            regenerations: 1,
            state: None,
            scheduler: scheduler.clone(),
            pick,
            age_display: Rc::new(Cell::new(COUNT_START)),
            on_age_display: Rc::new(RefCell::new(callbacks.on_age_display)),
            counter: None,
            _listener: listener,
        };
        instance.restart_counter();
        tracing::info!(
            kind = %kind,
            biological = ages.biological_age,
            elements = instance.layout.cardinality(),
            "scene mounted"
        );
        instance
    }

    pub fn kind(&self) -> SceneKind {
        self.kind
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn ages(&self) -> AgeInputs {
        self.ages
    }

    pub fn options(&self) -> SceneOptions {
        self.options
    }

    pub fn layout(&self) -> &SceneLayout {
        &self.layout
    }

    /// Number of layouts built since mount, the initial one included.
    pub fn regenerations(&self) -> u64 {
        self.regenerations
    }

    /// The state of the last tick, if the scene has ticked yet.
    pub fn state(&self) -> Option<&AnimatedState> {
        self.state.as_ref()
    }

    /// Current value of the counting overlay.
    pub fn age_display(&self) -> u32 {
        self.age_display.get()
    }

    pub fn is_counting(&self) -> bool {
        self.counter.as_ref().is_some_and(CountingAnimation::is_running)
    }

    /// Clicks that hit the scene since mount.
    pub fn clicks(&self) -> u64 {
        self.pick.borrow().clicks
    }

    /// Pick targets of the last tick.
    pub fn pick_targets(&self) -> Vec<PickTarget> {
        self.pick.borrow().targets.clone()
    }

    fn regenerate(&mut self) {
        self.layout = self
            .kind
            .generate(self.ages, &self.params, &mut self.options.seed.rng());
        self.regenerations += 1;
        tracing::debug!(
            kind = %self.kind,
            elements = self.layout.cardinality(),
            regenerations = self.regenerations,
            "layout regenerated"
        );
    }

    fn restart_counter(&mut self) {
        // Cancel first so the old timer can never emit after the new one starts.
        self.counter = None;
        let display = Rc::clone(&self.age_display);
        let sink = Rc::clone(&self.on_age_display);
        let target = self.ages.counted_age();
        let duration = animation::count_duration(&self.params.sanitized());
        self.counter = Some(CountingAnimation::start(
            &self.scheduler,
            COUNT_START,
            target,
            duration,
            move |value| {
                display.set(value);
                if let Ok(mut f) = sink.try_borrow_mut() {
                    if let Some(f) = f.as_mut() {
                        f(value);
                    }
                }
            },
        ));
    }

    /// Take a fresh parameter set. Switching kind rebuilds everything;
    /// otherwise the layout follows the regeneration trigger and the animation
    /// carries on from the last frame.
    pub fn update_params(&mut self, params: ParameterSet) {
        if params == self.params {
            return;
        }
        if params.kind() != self.kind {
            self.kind = params.kind();
            self.params = params;
            self.state = None;
            self.regenerate();
            return;
        }
        let rebuild = match self.options.trigger {
            RegenerationTrigger::AnyChange => true,
            RegenerationTrigger::StructuralOnly => !params.structural_eq(&self.params),
        };
        self.params = params;
        if rebuild {
            self.regenerate();
        }
    }

    /// Take new ages. The counter restarts only when the target age changes.
    pub fn set_ages(&mut self, ages: AgeInputs) {
        if ages == self.ages {
            return;
        }
        let target_changed = ages.biological_age != self.ages.biological_age;
        self.ages = ages;
        if target_changed {
            self.regenerate();
            self.restart_counter();
        }
    }

    /// Advance to `elapsed` seconds and refresh the pick targets for `camera`.
    /// The age shown and the particles revealed follow the counting timer.
    pub fn tick(&mut self, elapsed: f64, camera: CameraTransform) -> &AnimatedState {
        let mut next = self
            .kind
            .advance(self.state.as_ref(), &self.layout, &self.params, elapsed, self.ages);
        next.sync_age(&self.layout, self.age_display.get());
        let targets = self.kind.pickables(&next, &self.layout, &self.params);
        {
            let mut pick = self.pick.borrow_mut();
            pick.camera = Some(camera);
            pick.targets = targets;
        }
        self.state.insert(next)
    }

    /// Draw the last ticked state. Nothing to draw before the first tick.
    pub fn draw<'a>(&self, adapter: &'a mut RenderAdapter) -> Result<Option<&'a Frame>, RenderError> {
        match &self.state {
            Some(state) => self.kind.draw(adapter, state, &self.layout, &self.params).map(Some),
            None => Ok(None),
        }
    }
}

impl Drop for SceneInstance {
    fn drop(&mut self) {
        self.counter = None;
        tracing::info!(kind = %self.kind, "scene unmounted");
    }
}

impl std::fmt::Debug for SceneInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneInstance")
            .field("kind", &self.kind)
            .field("ages", &self.ages)
            .field("options", &self.options)
            .field("regenerations", &self.regenerations)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{CameraConfig, Viewport};
    use crate::params::ParamValue;

    fn camera() -> CameraTransform {
        CameraTransform::new(CameraConfig::default(), Viewport::new(800, 600))
    }

    fn fixed() -> SceneOptions {
        SceneOptions {
            seed: SeedPolicy::Fixed(42),
            trigger: RegenerationTrigger::AnyChange,
        }
    }

    fn mount(kind: SceneKind, options: SceneOptions) -> (PointerHub, Scheduler, SceneInstance) {
        let hub = PointerHub::new();
        let scheduler = Scheduler::new();
        let scene = SceneInstance::mount(
            ParameterSet::default_for(kind),
            AgeInputs::new(35, 40),
            &hub,
            &scheduler,
            options,
            SceneCallbacks::new(),
        );
        (hub, scheduler, scene)
    }

    #[test]
    fn pickables_follow_revealed_particles() {
        let (_hub, scheduler, mut scene) = mount(SceneKind::PointCloud, fixed());
        scene.tick(0.0, camera());
        assert_eq!(scene.pick_targets().len(), 50);
        scheduler.advance_to(10.0);
        scene.tick(10.0, camera());
        assert_eq!(scene.pick_targets().len(), 35 * 50);
    }

    #[test]
    fn nucleus_and_shader_pickables() {
        let (_hub, _sched, mut scene) = mount(SceneKind::NucleusOrbit, fixed());
        scene.tick(0.0, camera());
        let targets = scene.pick_targets();
        assert_eq!(targets.len(), 7);
        assert_eq!(targets[0].id, HitElementId::Nucleus);

        let (_hub, _sched, mut scene) = mount(SceneKind::ShaderField, fixed());
        scene.tick(0.0, camera());
        assert_eq!(
            scene.pick_targets()[0].shape,
            PickShape::Viewport {
                distance: SURFACE_DISTANCE
            }
        );
    }

    #[test]
    fn cosmetic_edits_respect_the_trigger() {
        let (_hub, _sched, mut any) = mount(SceneKind::WireframeNetwork, fixed());
        let (_hub2, _sched2, mut structural) = mount(
            SceneKind::WireframeNetwork,
            SceneOptions {
                trigger: RegenerationTrigger::StructuralOnly,
                ..fixed()
            },
        );
        let recolored = any
            .params()
            .with("nodeColor", ParamValue::Color(crate::params::Color::YELLOW))
            .unwrap();
        any.update_params(recolored.clone());
        structural.update_params(recolored.clone());
        assert_eq!(any.regenerations(), 2);
        assert_eq!(structural.regenerations(), 1);

        let denser = recolored.with("nodeCount", ParamValue::Count(60)).unwrap();
        structural.update_params(denser);
        assert_eq!(structural.regenerations(), 2);
        let SceneLayout::WireframeNetwork(net) = structural.layout() else {
            panic!("wrong layout kind");
        };
        assert_eq!(net.nodes.len(), 60);
    }

    #[test]
    fn switching_kind_restarts_animation() {
        let (_hub, _sched, mut scene) = mount(SceneKind::PointCloud, fixed());
        scene.tick(0.5, camera());
        scene.update_params(ParameterSet::default_for(SceneKind::NucleusOrbit));
        assert_eq!(scene.kind(), SceneKind::NucleusOrbit);
        assert!(scene.state().is_none());
        let state = scene.tick(0.6, camera());
        assert!(matches!(state.detail, KindState::NucleusOrbit(_)));
    }

    #[test]
    fn kind_switch_keeps_the_finished_count() {
        let (_hub, scheduler, mut scene) = mount(SceneKind::NucleusOrbit, fixed());
        scheduler.advance_to(5.0);
        scene.tick(5.0, camera());
        assert_eq!(scene.age_display(), 35);

        scene.update_params(ParameterSet::default_for(SceneKind::PointCloud));
        scheduler.advance_to(5.5);
        let state = scene.tick(5.5, camera());
        assert_eq!(state.age.display, 35);
        let KindState::PointCloud(cloud) = &state.detail else {
            panic!("wrong state kind");
        };
        assert_eq!(cloud.revealed, 35 * 50);
        assert_eq!(scene.age_display(), 35);
        assert!(!scene.is_counting());
    }

    #[test]
    fn count_duration_edit_mid_count_stays_monotonic() {
        let (_hub, scheduler, mut scene) = mount(SceneKind::PointCloud, fixed());
        let mut shown = Vec::new();
        for f in 0..=240 {
            let t = f as f64 / 60.0;
            if f == 60 || f == 200 {
                let slower = scene
                    .params()
                    .with("countDuration", ParamValue::Float(10.0))
                    .unwrap();
                scene.update_params(slower);
            }
            scheduler.advance_to(t);
            let display = scene.tick(t, camera()).age.display;
            assert_eq!(display, scene.age_display());
            shown.push(display);
        }
        assert!(shown.windows(2).all(|w| w[1] >= w[0]));
        // The count keeps the duration it started with.
        assert_eq!(shown[180], 35);
        assert_eq!(shown.last(), Some(&35));
    }

    #[test]
    fn counter_runs_on_the_scheduler() {
        let (_hub, scheduler, mut scene) = mount(SceneKind::PointCloud, fixed());
        assert_eq!(scene.age_display(), 1);
        assert!(scene.is_counting());
        scheduler.advance_to(1.5);
        assert_eq!(scene.age_display(), 18);
        scheduler.advance_to(3.0);
        assert_eq!(scene.age_display(), 35);
        assert!(!scene.is_counting());

        // Same target: no restart.
        scene.set_ages(AgeInputs::new(35, 50));
        assert_eq!(scene.age_display(), 35);

        scene.set_ages(AgeInputs::new(1, 50));
        assert_eq!(scene.age_display(), 1);
        assert!(!scene.is_counting());
    }

    #[test]
    fn dropping_the_instance_releases_listener_and_timer() {
        let (hub, scheduler, scene) = mount(SceneKind::PointCloud, fixed());
        assert_eq!(hub.listener_count(), 1);
        assert_eq!(scheduler.active(), 1);
        drop(scene);
        assert_eq!(hub.listener_count(), 0);
        assert_eq!(scheduler.active(), 0);
    }

    #[test]
    fn fixed_seed_reproduces_layouts() {
        let (_h1, _s1, a) = mount(SceneKind::NucleusOrbit, fixed());
        let (_h2, _s2, b) = mount(SceneKind::NucleusOrbit, fixed());
        assert_eq!(a.layout(), b.layout());
    }
}
