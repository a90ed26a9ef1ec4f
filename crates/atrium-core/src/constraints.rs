//! Pan/zoom constraints
//!
//! Keeps the orbit target inside an envelope around the model and retunes
//! the damped controls by how close the camera is to the model.

use glam::Vec3;
use rand::rngs::StdRng;
use rand::Rng;

use crate::bounds::Bounds;
use crate::config::{ConstraintConfig, FloorRule};
use crate::orbit::{ControlSettings, OrbitController};
use crate::ray::{CameraPose, Ray};

/// Camera distance bucket relative to the model size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensitivityBand {
    Far,
    Mid,
    Close,
    VeryClose,
    Minimum,
}

impl SensitivityBand {
    pub fn classify(distance_to_model: f32, model_size: f32) -> Self {
        if distance_to_model > model_size * 0.85 {
            SensitivityBand::Far
        } else if distance_to_model > model_size * 0.45 {
            SensitivityBand::Mid
        } else if distance_to_model > model_size * 0.25 {
            SensitivityBand::Close
        } else if distance_to_model > model_size * 0.15 {
            SensitivityBand::VeryClose
        } else {
            SensitivityBand::Minimum
        }
    }

    fn index(self) -> usize {
        match self {
            SensitivityBand::Far => 0,
            SensitivityBand::Mid => 1,
            SensitivityBand::Close => 2,
            SensitivityBand::VeryClose => 3,
            SensitivityBand::Minimum => 4,
        }
    }

    pub fn sensitivity(self, small_model: bool) -> Sensitivity {
        if small_model {
            SMALL_MODEL_CURVE[self.index()]
        } else {
            LARGE_MODEL_CURVE[self.index()]
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sensitivity {
    pub rotate: f32,
    pub damping: f32,
    pub pan: f32,
    pub zoom: f32,
}

impl Sensitivity {
    const fn new(rotate: f32, damping: f32, pan: f32, zoom: f32) -> Self {
        Self {
            rotate,
            damping,
            pan,
            zoom,
        }
    }

    pub fn apply_to(&self, settings: &mut ControlSettings) {
        settings.rotate_speed = self.rotate;
        settings.damping = self.damping;
        settings.pan_speed = self.pan;
        settings.zoom_speed = self.zoom;
    }
}

const SMALL_MODEL_CURVE: [Sensitivity; 5] = [
    Sensitivity::new(1.0, 0.04, 2.5, 2.2),
    Sensitivity::new(0.8, 0.06, 2.0, 2.0),
    Sensitivity::new(0.65, 0.1, 1.7, 1.8),
    Sensitivity::new(0.5, 0.2, 1.3, 1.6),
    Sensitivity::new(0.4, 0.25, 1.1, 1.4),
];

const LARGE_MODEL_CURVE: [Sensitivity; 5] = [
    Sensitivity::new(0.9, 0.05, 2.0, 1.8),
    Sensitivity::new(0.65, 0.07, 1.5, 1.6),
    Sensitivity::new(0.55, 0.12, 1.2, 1.4),
    Sensitivity::new(0.4, 0.25, 0.9, 1.2),
    Sensitivity::new(0.3, 0.35, 0.7, 1.0),
];

/// What one constraint pass did
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstraintReport {
    pub band: Option<SensitivityBand>,
    pub probed: bool,
    pub retargeted: bool,
    pub clamped: bool,
}

/// Constraint state for one model session
pub struct ConstraintEngine {
    config: ConstraintConfig,
    center: Vec3,
    model_size: f32,
    small: bool,
    pan_radius: f32,
    floor_y: f32,
    min_distance: f32,
    rng: StdRng,
}

impl ConstraintEngine {
    pub fn new(config: &ConstraintConfig, bounds: &Bounds, ground_y: f32, min_distance: f32, rng: StdRng) -> Self {
        let small = bounds.source_diagonal < config.small_model_diagonal;
        let factor = if small {
            6.0
        } else if bounds.source_diagonal < config.medium_model_diagonal {
            3.0
        } else {
            2.0
        };
        let min_radius = if small { 12.0 } else { 8.0 };
        let floor_y = match config.floor {
            FloorRule::GroundPlane => ground_y,
            FloorRule::Fixed { small: y, .. } if small => y,
            FloorRule::Fixed { large, .. } => large,
        };
        Self {
            config: config.clone(),
            center: bounds.center,
            model_size: bounds.max_extent,
            small,
            pan_radius: (bounds.source_diagonal * factor).max(min_radius),
            floor_y,
            min_distance,
            rng,
        }
    }

    pub fn is_small_model(&self) -> bool {
        self.small
    }

    pub fn pan_radius(&self) -> f32 {
        self.pan_radius
    }

    pub fn floor_y(&self) -> f32 {
        self.floor_y
    }

    pub fn band(&self, pose: &CameraPose) -> SensitivityBand {
        SensitivityBand::classify(pose.position.distance(self.center), self.model_size)
    }

    /// Sensitivity for the current camera distance
    pub fn sensitivity(&self, pose: &CameraPose) -> Sensitivity {
        self.band(pose).sensitivity(self.small)
    }

    /// Pull the pivot ahead of the camera when it gets very close
    pub fn close_pivot_pull(&self, pose: &CameraPose) -> Option<Vec3> {
        let close_threshold = self.model_size * 0.25;
        let distance = pose.distance();
        let factor = if self.small { 0.4 } else { 0.3 };
        if distance >= close_threshold * factor {
            return None;
        }
        let reach = distance.max(if self.small { 0.4 } else { 0.6 });
        let pivot = pose.position + pose.forward() * reach;
        Some(pose.target.lerp(pivot, if self.small { 0.08 } else { 0.06 }))
    }

    /// Keep the target within the pan radius of the model center
    pub fn clamp_pan(&self, target: Vec3) -> Vec3 {
        let delta = target - self.center;
        if delta.length() <= self.pan_radius {
            return target;
        }
        let allowed = self.center + delta.normalize_or_zero() * self.pan_radius;
        if self.small {
            target.lerp(allowed, 0.1)
        } else {
            allowed
        }
    }

    pub fn clamp_floor(&self, target: Vec3) -> Vec3 {
        Vec3::new(target.x, target.y.max(self.floor_y), target.z)
    }

    /// Whether to cast a forward probe this frame
    pub fn should_probe(&mut self, pose: &CameraPose) -> bool {
        if !self.config.retarget || pose.distance() <= self.min_distance * 1.2 {
            return false;
        }
        self.rng.gen_bool(self.config.retarget_probability.clamp(0.0, 1.0))
    }

    /// New target after a forward probe hit geometry `hit_distance` away
    pub fn retarget(&self, pose: &CameraPose, hit_distance: f32) -> Option<Vec3> {
        let target_distance = pose.distance();
        let close_to_wall = hit_distance < 2.0;
        if !(close_to_wall || hit_distance < target_distance * 0.8) {
            return None;
        }
        let new_distance = (hit_distance * 0.8).min(target_distance);
        let pivot = pose.position + pose.forward() * new_distance;
        Some(pose.target.lerp(pivot, if close_to_wall { 0.04 } else { 0.07 }))
    }

    /// Run every enabled constraint against the orbit controller
    ///
    /// `probe` casts a ray against the scene and returns the hit distance.
    pub fn apply(
        &mut self,
        orbit: &mut OrbitController,
        probe: impl FnOnce(&Ray) -> Option<f32>,
    ) -> ConstraintReport {
        let mut report = ConstraintReport {
            band: None,
            probed: false,
            retargeted: false,
            clamped: false,
        };

        let pose = orbit.pose();
        if self.config.adaptive_sensitivity {
            let band = self.band(&pose);
            band.sensitivity(self.small).apply_to(orbit.settings_mut());
            report.band = Some(band);
        }
        if self.config.close_pivot_pull {
            if let Some(target) = self.close_pivot_pull(&pose) {
                orbit.set_target(target);
            }
        }

        let pose = orbit.pose();
        if self.should_probe(&pose) {
            report.probed = true;
            let ray = Ray::new(pose.position, pose.forward());
            if let Some(target) = probe(&ray).and_then(|hit| self.retarget(&pose, hit)) {
                orbit.set_target(target);
                report.retargeted = true;
            }
        }

        let mut target = orbit.pose().target;
        if self.config.pan_clamp {
            target = self.clamp_pan(target);
        }
        target = self.clamp_floor(target);
        if target != orbit.pose().target {
            orbit.set_target(target);
            report.clamped = true;
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::{analyze, Aabb, SceneGeometry};
    use crate::config::{ControlsConfig, ModeConfig};
    use glam::Mat4;
    use rand::SeedableRng;

    fn bounds(half: f32) -> Bounds {
        let mut g = SceneGeometry::default();
        g.push(Aabb::new(Vec3::splat(-half), Vec3::splat(half)), Mat4::IDENTITY);
        analyze(&g, 15.0, 0.0).unwrap().bounds
    }

    fn engine(config: &ConstraintConfig, bounds: &Bounds) -> ConstraintEngine {
        ConstraintEngine::new(config, bounds, -5.0, 0.5, StdRng::seed_from_u64(7))
    }

    #[test]
    fn test_band_thresholds() {
        assert_eq!(SensitivityBand::classify(9.0, 10.0), SensitivityBand::Far);
        assert_eq!(SensitivityBand::classify(8.5, 10.0), SensitivityBand::Mid);
        assert_eq!(SensitivityBand::classify(3.0, 10.0), SensitivityBand::Close);
        assert_eq!(SensitivityBand::classify(2.0, 10.0), SensitivityBand::VeryClose);
        assert_eq!(SensitivityBand::classify(1.0, 10.0), SensitivityBand::Minimum);
        assert_eq!(SensitivityBand::Far.sensitivity(true).zoom, 2.2);
        assert_eq!(SensitivityBand::Minimum.sensitivity(false).damping, 0.35);
    }

    #[test]
    fn test_small_and_large_models() {
        let config = ConstraintConfig::default();
        // Source diagonal 2 * sqrt(3) * half
        let small = engine(&config, &bounds(1.0));
        assert!(small.is_small_model());
        assert!((small.pan_radius() - 6.0 * 2.0 * 3f32.sqrt()).abs() < 1e-3);

        let medium = engine(&config, &bounds(2.5));
        assert!(!medium.is_small_model());
        assert!((medium.pan_radius() - 3.0 * 2.0 * 3f32.sqrt() * 2.5).abs() < 1e-3);

        let large = engine(&config, &bounds(50.0));
        assert!((large.pan_radius() - 2.0 * 2.0 * 3f32.sqrt() * 50.0).abs() < 1e-1);
    }

    #[test]
    fn test_pan_radius_has_minimum() {
        let mut g = SceneGeometry::default();
        g.push(Aabb::new(Vec3::ZERO, Vec3::splat(0.5)), Mat4::IDENTITY);
        let tiny = analyze(&g, 15.0, 0.0).unwrap().bounds;
        assert_eq!(engine(&ConstraintConfig::default(), &tiny).pan_radius(), 12.0);
    }

    #[test]
    fn test_pan_clamp_large_is_instant_small_is_smooth() {
        let config = ConstraintConfig::default();
        let large = engine(&config, &bounds(2.5));
        let far = Vec3::new(1000.0, 0.0, 0.0);
        let clamped = large.clamp_pan(far);
        assert!((clamped.length() - large.pan_radius()).abs() < 1e-2);

        let small = engine(&config, &bounds(1.0));
        let step = small.clamp_pan(far);
        assert!(step.x < far.x && step.x > small.pan_radius());
        let inside = Vec3::new(1.0, 0.0, 0.0);
        assert_eq!(small.clamp_pan(inside), inside);
    }

    #[test]
    fn test_floor_rules() {
        let ground = engine(&ConstraintConfig::default(), &bounds(1.0));
        assert_eq!(ground.clamp_floor(Vec3::new(0.0, -9.0, 0.0)).y, -5.0);

        let building = ModeConfig::building_defaults().constraints;
        assert_eq!(engine(&building, &bounds(1.0)).floor_y(), 20.0);
        assert_eq!(engine(&building, &bounds(50.0)).floor_y(), -18.45);
    }

    #[test]
    fn test_retarget_rule() {
        let e = engine(&ConstraintConfig::default(), &bounds(2.5));
        let pose = CameraPose::new(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO);
        // Geometry behind the target is ignored
        assert_eq!(e.retarget(&pose, 12.0), None);
        // Closer geometry pulls the target forward gently
        let t = e.retarget(&pose, 5.0).unwrap();
        let pivot_z = 10.0 - 4.0;
        assert!((t.z - pivot_z * 0.07).abs() < 1e-4);
        // Near a wall the pull is slower
        let t = e.retarget(&pose, 1.0).unwrap();
        assert!((t.z - (10.0 - 0.8) * 0.04).abs() < 1e-4);
    }

    #[test]
    fn test_probe_sampling_is_seeded_and_rare() {
        let mut e = engine(&ConstraintConfig::default(), &bounds(2.5));
        let pose = CameraPose::new(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO);
        let hits = (0..10_000).filter(|_| e.should_probe(&pose)).count();
        assert!(hits > 100 && hits < 300, "{hits}");

        let close = CameraPose::new(Vec3::new(0.0, 0.0, 0.55), Vec3::ZERO);
        assert!((0..1000).all(|_| !e.should_probe(&close)));

        let disabled = ConstraintConfig {
            retarget: false,
            ..ConstraintConfig::default()
        };
        let mut off = engine(&disabled, &bounds(2.5));
        assert!((0..1000).all(|_| !off.should_probe(&pose)));
    }

    #[test]
    fn test_close_pivot_pull() {
        let e = engine(&ConstraintConfig::default(), &bounds(2.5));
        // Model size is 15 / sqrt(3); threshold is a quarter of that times 0.3
        let near = CameraPose::new(Vec3::new(0.0, 0.0, 0.5), Vec3::new(0.0, 0.0, 0.2));
        let pulled = e.close_pivot_pull(&near).unwrap();
        assert!(pulled.z < 0.2);
        let far = CameraPose::new(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO);
        assert_eq!(e.close_pivot_pull(&far), None);
    }

    #[test]
    fn test_apply_updates_controls_and_clamps() {
        let b = bounds(2.5);
        let mut orbit = OrbitController::new(
            ControlSettings::from(&ControlsConfig::default()),
            &ModeConfig::unit_defaults(),
        );
        orbit.begin_session(&b, 0.0);
        let mut e = engine(&ConstraintConfig::default(), &b);
        orbit.set_target(Vec3::new(500.0, -50.0, 0.0));
        let report = e.apply(&mut orbit, |_| None);
        assert!(report.clamped);
        assert!(report.band.is_some());
        let target = orbit.pose().target;
        assert!(target.y >= -5.0);
        assert!((target - b.center).length() <= e.pan_radius() + 1e-3);
        let expected = report.band.unwrap().sensitivity(false);
        assert_eq!(orbit.settings().rotate_speed, expected.rotate);
    }
}
