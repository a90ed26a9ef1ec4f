//! Camera orbit: damped manual controls, scripted intro, auto-rotate, reset
//!
//! All angles use y-up spherical coordinates around the orbit target:
//! `theta = atan2(x, z)` about +Y and `phi` measured from +Y.

use std::f32::consts::TAU;

use glam::{Vec2, Vec3};
use tracing::debug;

use crate::bounds::{Bounds, Sphere};
use crate::config::{ControlsConfig, IntroProfile, ModeConfig};
use crate::ray::CameraPose;
use crate::timing::{ease_in_out_quad, ease_out_cubic, Tween};

const MIN_PHI: f32 = 1e-6;
const SETTLED: f32 = 1e-10;

/// Tunables of the damped controls; the sensitivity fields change every frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlSettings {
    pub rotate_speed: f32,
    pub pan_speed: f32,
    pub zoom_speed: f32,
    /// Fraction of the pending motion applied per 60 Hz frame
    pub damping: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar: f32,
    pub max_polar: f32,
    /// Vertical field of view in radians
    pub fov_y: f32,
}

impl From<&ControlsConfig> for ControlSettings {
    fn from(c: &ControlsConfig) -> Self {
        Self {
            rotate_speed: c.rotate_speed,
            pan_speed: c.pan_speed,
            zoom_speed: c.zoom_speed,
            damping: c.damping,
            min_distance: c.min_distance,
            max_distance: c.max_distance,
            min_polar: c.min_polar,
            max_polar: c.max_polar,
            fov_y: c.fov_degrees.to_radians(),
        }
    }
}

/// Pointer input gathered over one frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControlInput {
    /// Rotate drag in pixels
    pub rotate: Vec2,
    /// Pan drag in pixels, +y down
    pub pan: Vec2,
    /// Wheel notches, positive towards the target
    pub zoom: f32,
    /// Finger distance ratio, current over previous
    pub pinch: Option<f32>,
    /// Pointer-down, wheel or touch-start happened this frame
    pub started: bool,
}

impl ControlInput {
    pub fn is_interaction(&self) -> bool {
        self.started
            || self.rotate != Vec2::ZERO
            || self.pan != Vec2::ZERO
            || self.zoom != 0.0
            || self.pinch.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Spherical {
    radius: f32,
    theta: f32,
    phi: f32,
}

impl Spherical {
    fn from_offset(offset: Vec3) -> Self {
        let radius = offset.length();
        if radius == 0.0 {
            return Self {
                radius,
                theta: 0.0,
                phi: 0.0,
            };
        }
        Self {
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    fn to_offset(self) -> Vec3 {
        let (sin_phi, cos_phi) = self.phi.sin_cos();
        let (sin_theta, cos_theta) = self.theta.sin_cos();
        Vec3::new(
            self.radius * sin_phi * sin_theta,
            self.radius * cos_phi,
            self.radius * sin_phi * cos_theta,
        )
    }
}

/// Orbit/pan/zoom with inertia
///
/// Rotation and pan accumulate into pending deltas that are applied and
/// decayed each frame. The per-frame factor is `1 - (1 - damping)^(dt * 60)`,
/// so the total motion from a drag does not depend on the frame rate.
#[derive(Debug, Clone)]
pub struct DampedOrbitControls {
    pub settings: ControlSettings,
    spherical_delta: Vec2,
    pan_offset: Vec3,
}

impl DampedOrbitControls {
    pub fn new(settings: ControlSettings) -> Self {
        Self {
            settings,
            spherical_delta: Vec2::ZERO,
            pan_offset: Vec3::ZERO,
        }
    }

    /// Drop pending inertia
    pub fn stop(&mut self) {
        self.spherical_delta = Vec2::ZERO;
        self.pan_offset = Vec3::ZERO;
    }

    pub fn is_settled(&self) -> bool {
        self.spherical_delta.length_squared() < SETTLED && self.pan_offset.length_squared() < SETTLED
    }

    pub fn update(&mut self, pose: &mut CameraPose, input: &ControlInput, viewport_height: f32, dt: f32) {
        let s = self.settings;
        let h = viewport_height.max(1.0);
        let mut offset = pose.position - pose.target;

        self.spherical_delta -= input.rotate * (TAU / h * s.rotate_speed);

        if input.pan != Vec2::ZERO {
            let target_distance = offset.length() * (s.fov_y * 0.5).tan();
            let forward = (-offset).normalize_or_zero();
            let right = forward.cross(Vec3::Y).normalize_or_zero();
            let up = right.cross(forward);
            let pan = input.pan * s.pan_speed;
            self.pan_offset += -right * (2.0 * pan.x * target_distance / h);
            self.pan_offset += up * (2.0 * pan.y * target_distance / h);
        }

        let mut scale = 1.0;
        if input.zoom != 0.0 {
            scale *= 0.95_f32.powf(s.zoom_speed * input.zoom);
        }
        if let Some(ratio) = input.pinch.filter(|r| *r > 0.0) {
            scale /= ratio.powf(s.zoom_speed);
        }

        let damping = s.damping.clamp(0.0, 1.0);
        let frames = (dt * 60.0).clamp(0.0, 6.0);
        let decay = (1.0 - damping).powf(frames);
        let apply = 1.0 - decay;

        let mut sph = Spherical::from_offset(offset);
        sph.theta += self.spherical_delta.x * apply;
        sph.phi += self.spherical_delta.y * apply;
        sph.phi = sph
            .phi
            .clamp(s.min_polar, s.max_polar.max(s.min_polar))
            .clamp(MIN_PHI, std::f32::consts::PI - MIN_PHI);
        sph.radius = (sph.radius * scale).clamp(s.min_distance, s.max_distance.max(s.min_distance));

        pose.target += self.pan_offset * apply;
        offset = sph.to_offset();
        pose.position = pose.target + offset;

        self.spherical_delta *= decay;
        self.pan_offset *= decay;
        if self.is_settled() {
            self.stop();
        }
    }
}

/// Which behaviour currently drives the camera
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrbitMode {
    IntroAnimating,
    AutoRotating,
    UserControlled,
}

/// Constant-speed sweep around the model center
#[derive(Debug, Clone, Copy, PartialEq)]
struct AutoRotate {
    start_ms: f64,
    start_angle: f32,
    radius: f32,
    height: f32,
    center: Vec3,
}

impl AutoRotate {
    fn from_pose(pose: &CameraPose, center: Vec3, now_ms: f64) -> Self {
        let offset = pose.position - center;
        Self {
            start_ms: now_ms,
            start_angle: offset.x.atan2(offset.z),
            radius: Vec2::new(offset.x, offset.z).length(),
            height: pose.position.y,
            center,
        }
    }

    fn pose(&self, now_ms: f64, speed: f32) -> CameraPose {
        let elapsed = (now_ms - self.start_ms).max(0.0);
        let angle = (self.start_angle as f64 + elapsed * speed as f64).rem_euclid(TAU as f64) as f32;
        let (sin, cos) = angle.sin_cos();
        CameraPose {
            position: Vec3::new(
                self.center.x + self.radius * sin,
                self.height,
                self.center.z + self.radius * cos,
            ),
            target: self.center,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ResetAnimation {
    tween: Tween,
    from: CameraPose,
    resume_auto_rotate: bool,
}

/// Pose of an intro profile at linear progress `t`
pub fn intro_pose(profile: &IntroProfile, sphere: &Sphere, t: f32) -> CameraPose {
    let c = sphere.center;
    let r = sphere.radius;
    match *profile {
        IntroProfile::Sweep {
            radius_factor,
            height_factor,
            start_angle,
            end_angle,
            ..
        } => {
            let angle = start_angle + (end_angle - start_angle) * ease_in_out_quad(t);
            let radius = radius_factor * r;
            let (sin, cos) = angle.sin_cos();
            CameraPose {
                position: Vec3::new(c.x + radius * sin, c.y + height_factor * r, c.z + radius * cos),
                target: c,
            }
        }
        IntroProfile::Dolly {
            start_height,
            start_distance,
            end_height,
            end_distance,
            ..
        } => {
            let from = Vec3::new(0.0, start_height * r, start_distance * r);
            let to = Vec3::new(0.0, end_height * r, end_distance * r);
            CameraPose {
                position: c + from.lerp(to, ease_out_cubic(t)),
                target: c,
            }
        }
    }
}

/// Owns the camera pose for one viewer
pub struct OrbitController {
    controls: DampedOrbitControls,
    intro_profile: IntroProfile,
    auto_rotate: bool,
    auto_rotate_speed: f32,
    reset_duration_ms: f64,
    pose: CameraPose,
    initial: CameraPose,
    sphere: Sphere,
    mode: OrbitMode,
    interacted: bool,
    intro: Option<Tween>,
    sweep: Option<AutoRotate>,
    reset: Option<ResetAnimation>,
}

impl OrbitController {
    pub fn new(settings: ControlSettings, mode: &ModeConfig) -> Self {
        let sphere = Sphere {
            center: Vec3::ZERO,
            radius: mode.target_diagonal * 0.5,
        };
        let initial = intro_pose(&mode.intro, &sphere, 1.0);
        Self {
            controls: DampedOrbitControls::new(settings),
            intro_profile: mode.intro,
            auto_rotate: mode.auto_rotate,
            auto_rotate_speed: mode.auto_rotate_speed,
            reset_duration_ms: mode.reset_duration_ms,
            pose: initial,
            initial,
            sphere,
            mode: OrbitMode::UserControlled,
            interacted: false,
            intro: None,
            sweep: None,
            reset: None,
        }
    }

    pub fn pose(&self) -> CameraPose {
        self.pose
    }

    /// Pose restored by [`OrbitController::request_reset`]
    pub fn initial(&self) -> CameraPose {
        self.initial
    }

    pub fn mode(&self) -> OrbitMode {
        self.mode
    }

    pub fn has_interacted(&self) -> bool {
        self.interacted
    }

    pub fn is_resetting(&self) -> bool {
        self.reset.is_some()
    }

    /// Auto-rotating with no user input since the session began or was reset
    pub fn is_idle_auto_rotating(&self) -> bool {
        self.mode == OrbitMode::AutoRotating && !self.interacted
    }

    pub fn settings(&self) -> &ControlSettings {
        &self.controls.settings
    }

    pub fn settings_mut(&mut self) -> &mut ControlSettings {
        &mut self.controls.settings
    }

    /// Move the orbit target, keeping the camera where it is
    pub fn set_target(&mut self, target: Vec3) {
        self.pose.target = target;
    }

    /// Start the intro for a freshly placed model
    pub fn begin_session(&mut self, bounds: &Bounds, now_ms: f64) {
        self.sphere = bounds.sphere;
        self.initial = intro_pose(&self.intro_profile, &self.sphere, 1.0);
        self.pose = intro_pose(&self.intro_profile, &self.sphere, 0.0);
        self.controls.stop();
        self.interacted = false;
        self.sweep = None;
        self.reset = None;
        self.intro = Some(Tween::new(now_ms, self.intro_profile.duration_ms()));
        self.mode = OrbitMode::IntroAnimating;
        debug!(radius = self.sphere.radius, "Orbit session started");
    }

    /// Pointer-down, wheel or touch-start: hand the camera to the user
    pub fn notify_interaction(&mut self) {
        if !self.interacted {
            debug!(mode = ?self.mode, "User took control of the camera");
        }
        self.interacted = true;
        self.intro = None;
        self.sweep = None;
        self.reset = None;
        self.mode = OrbitMode::UserControlled;
    }

    /// Animate back to the stored initial pose
    pub fn request_reset(&mut self, now_ms: f64) {
        self.intro = None;
        self.sweep = None;
        self.controls.stop();
        self.interacted = true;
        self.mode = OrbitMode::UserControlled;
        self.reset = Some(ResetAnimation {
            tween: Tween::new(now_ms, self.reset_duration_ms),
            from: self.pose,
            resume_auto_rotate: self.auto_rotate,
        });
        debug!("Camera reset requested");
    }

    /// Advance one frame and return the new pose
    pub fn tick(&mut self, now_ms: f64, dt: f32, input: &ControlInput, viewport_height: f32) -> CameraPose {
        if input.is_interaction() {
            self.notify_interaction();
        }

        match self.mode {
            OrbitMode::IntroAnimating => self.advance_intro(now_ms),
            OrbitMode::AutoRotating => {
                let sweep = *self
                    .sweep
                    .get_or_insert_with(|| AutoRotate::from_pose(&self.pose, self.sphere.center, now_ms));
                self.pose = sweep.pose(now_ms, self.auto_rotate_speed);
            }
            OrbitMode::UserControlled => {
                if self.reset.is_some() {
                    self.advance_reset(now_ms);
                } else {
                    self.controls.update(&mut self.pose, input, viewport_height, dt);
                }
            }
        }
        self.pose
    }

    fn advance_intro(&mut self, now_ms: f64) {
        let Some(tween) = self.intro else {
            self.mode = OrbitMode::UserControlled;
            return;
        };
        let t = tween.progress(now_ms);
        self.pose = intro_pose(&self.intro_profile, &self.sphere, t);
        if t >= 1.0 {
            self.intro = None;
            self.initial = self.pose;
            self.enter_idle(now_ms);
        }
    }

    fn advance_reset(&mut self, now_ms: f64) {
        let Some(reset) = self.reset else {
            return;
        };
        let t = reset.tween.progress(now_ms);
        self.pose = reset.from.lerp(&self.initial, ease_out_cubic(t));
        if t >= 1.0 {
            self.pose = self.initial;
            self.reset = None;
            if reset.resume_auto_rotate {
                self.interacted = false;
            }
            self.enter_idle(now_ms);
            debug!(mode = ?self.mode, "Camera reset finished");
        }
    }

    fn enter_idle(&mut self, now_ms: f64) {
        if self.auto_rotate && !self.interacted {
            self.sweep = Some(AutoRotate::from_pose(&self.pose, self.sphere.center, now_ms));
            self.mode = OrbitMode::AutoRotating;
        } else {
            self.mode = OrbitMode::UserControlled;
        }
    }
}
