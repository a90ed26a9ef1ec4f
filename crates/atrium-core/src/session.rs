//! Per-frame orchestration for one viewer
//!
//! Order within a frame: orbit/intro advance, constraints, hit testing,
//! click resolution. Constraints only run while the user controls the
//! camera. With frame skipping enabled, every other auto-rotate frame skips
//! the hit test.

use glam::Vec2;
use rand::rngs::StdRng;
use tracing::info;

use crate::asset_path::{Variant, ViewerMode};
use crate::bounds::Bounds;
use crate::config::{HighlightConfig, ModeConfig, ViewerConfig};
use crate::constraints::{ConstraintEngine, SensitivityBand};
use crate::highlight::{
    ClickOutcome, HitTestHighlighter, HoverChange, NavigateIntent, OverlayHost, RayScope, Raycaster,
};
use crate::orbit::{ControlInput, ControlSettings, OrbitController, OrbitMode};
use crate::ray::{CameraPose, Ray};
use crate::stage::StageLayout;
use crate::units::UnitRegistry;

/// Pointer state for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerFrame {
    /// Current position in normalized device coordinates, +y up
    pub ndc: Option<Vec2>,
    pub moved: bool,
    pub down: bool,
    pub up: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInput {
    pub now_ms: f64,
    /// Seconds since the previous frame
    pub dt: f32,
    pub pointer: PointerFrame,
    pub controls: ControlInput,
    /// Viewport size in pixels
    pub viewport: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameOutput {
    pub pose: CameraPose,
    pub hover: HoverChange,
    pub navigate: Option<NavigateIntent>,
    pub reset_triggered: bool,
    pub band: Option<SensitivityBand>,
    /// Hit testing was skipped to save work this frame
    pub skipped: bool,
}

pub struct ModelSession<P, O> {
    mode: ModeConfig,
    min_distance: f32,
    fov_y: f32,
    orbit: OrbitController,
    constraints: Option<ConstraintEngine>,
    highlighter: HitTestHighlighter<P, O>,
    variant: Variant,
    frame: u64,
    hover_armed: bool,
    last_ndc: Vec2,
    last_pose: Option<CameraPose>,
    active: bool,
}

impl<P, O> ModelSession<P, O>
where
    P: Clone + Eq + std::hash::Hash,
{
    pub fn new(config: &ViewerConfig, mode: ViewerMode) -> Self {
        let mode_config = config.mode(mode).clone();
        let settings = ControlSettings::from(&config.controls);
        Self::with_parts(mode_config, settings, &config.highlight)
    }

    pub fn with_parts(mode: ModeConfig, settings: ControlSettings, highlight: &HighlightConfig) -> Self {
        Self {
            orbit: OrbitController::new(settings, &mode),
            min_distance: settings.min_distance,
            fov_y: settings.fov_y,
            mode,
            constraints: None,
            highlighter: HitTestHighlighter::new(highlight),
            variant: Variant::default(),
            frame: 0,
            hover_armed: false,
            last_ndc: Vec2::ZERO,
            last_pose: None,
            active: true,
        }
    }

    pub fn orbit(&self) -> &OrbitController {
        &self.orbit
    }

    pub fn highlighter(&self) -> &HitTestHighlighter<P, O> {
        &self.highlighter
    }

    pub fn constraints(&self) -> Option<&ConstraintEngine> {
        self.constraints.as_ref()
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// A model has been handed over with `begin_model`
    pub fn has_model(&self) -> bool {
        self.constraints.is_some()
    }

    /// Host-initiated reset, same as a double-click
    pub fn request_reset(&mut self, now_ms: f64) {
        if self.active && self.has_model() {
            self.orbit.request_reset(now_ms);
        }
    }

    /// Hand a freshly placed model to the camera, constraints and highlighter
    #[allow(clippy::too_many_arguments)]
    pub fn begin_model<H>(
        &mut self,
        bounds: &Bounds,
        stage: &StageLayout,
        registry: UnitRegistry<P>,
        variant: Variant,
        now_ms: f64,
        rng: StdRng,
        host: &mut H,
    ) where
        H: OverlayHost<P, Overlay = O>,
    {
        if !self.active {
            return;
        }
        self.variant = variant;
        self.constraints = Some(ConstraintEngine::new(
            &self.mode.constraints,
            bounds,
            stage.ground.y,
            self.min_distance,
            rng,
        ));
        let units = registry.units().count();
        self.highlighter.set_registry(registry, host);
        self.orbit.begin_session(bounds, now_ms);
        self.last_pose = None;
        info!(units, %variant, "Model session started");
    }

    /// Advance one frame; `None` once torn down
    pub fn tick<R, H>(&mut self, input: &FrameInput, raycaster: &mut R, host: &mut H) -> Option<FrameOutput>
    where
        R: Raycaster<P>,
        H: OverlayHost<P, Overlay = O>,
    {
        if !self.active {
            return None;
        }
        self.frame = self.frame.wrapping_add(1);
        let now = input.now_ms;
        let pointer = input.pointer;
        if let Some(ndc) = pointer.ndc {
            self.last_ndc = ndc;
        }
        if pointer.moved {
            self.hover_armed = true;
        }
        if pointer.down {
            self.hover_armed = true;
            self.highlighter.pointer_down(now, self.last_ndc);
        }

        let pose = self.orbit.tick(now, input.dt, &input.controls, input.viewport.y);
        let skipped = self.mode.frame_skip && self.orbit.mode() == OrbitMode::AutoRotating && self.frame % 2 == 1;

        // Intro, auto-rotate and reset own the target outright
        let mut band = None;
        if !skipped && self.orbit.mode() == OrbitMode::UserControlled && !self.orbit.is_resetting() {
            if let Some(constraints) = self.constraints.as_mut() {
                let report = constraints.apply(&mut self.orbit, |ray| {
                    raycaster.cast(ray, RayScope::Scene).map(|hit| hit.distance)
                });
                band = report.band;
            }
        }
        let pose = if band.is_some() { self.orbit.pose() } else { pose };

        let aspect = if input.viewport.y > 0.0 {
            input.viewport.x / input.viewport.y
        } else {
            1.0
        };
        let pointer_ray = pointer
            .ndc
            .and_then(|ndc| Ray::from_ndc(&pose, self.fov_y, aspect, ndc));

        let camera_moved = self.last_pose.is_some_and(|last| last != pose);
        self.last_pose = Some(pose);
        let mut hover = HoverChange::Unchanged;
        if self.mode.hit_testing
            && self.hover_armed
            && !skipped
            && (pointer.moved || input.controls.is_interaction() || camera_moved)
        {
            hover = self.highlighter.hover(
                now,
                pointer_ray.as_ref(),
                self.orbit.is_idle_auto_rotating(),
                raycaster,
                host,
            );
        }

        let mut reset_triggered = false;
        if pointer.up && self.highlighter.pointer_up(now, self.last_ndc) == ClickOutcome::DoubleClick {
            self.orbit.request_reset(now);
            reset_triggered = true;
        }

        let click_ray = if self.mode.hit_testing { pointer_ray } else { None };
        let navigate = self
            .highlighter
            .poll_click(now, click_ray.as_ref(), raycaster, self.variant);

        Some(FrameOutput {
            pose: self.orbit.pose(),
            hover,
            navigate,
            reset_triggered,
            band,
            skipped,
        })
    }

    /// Stop for good, removing overlays through `host`
    pub fn teardown<H>(&mut self, host: &mut H)
    where
        H: OverlayHost<P, Overlay = O>,
    {
        if !self.active {
            return;
        }
        self.active = false;
        self.highlighter.teardown(host);
        self.constraints = None;
        info!("Model session torn down");
    }
}
