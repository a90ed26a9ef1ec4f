//! Picking rays

use glam::{Vec2, Vec3};

use crate::bounds::Aabb;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length
    pub dir: Vec3,
}

/// Position and look-at target of the camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub target: Vec3,
}

impl CameraPose {
    pub fn new(position: Vec3, target: Vec3) -> Self {
        Self { position, target }
    }

    pub fn distance(&self) -> f32 {
        self.position.distance(self.target)
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or_zero()
    }

    pub fn lerp(&self, other: &CameraPose, t: f32) -> CameraPose {
        CameraPose {
            position: self.position.lerp(other.position, t),
            target: self.target.lerp(other.target, t),
        }
    }
}

impl Ray {
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self {
            origin,
            dir: dir.normalize_or_zero(),
        }
    }

    /// Ray from a perspective camera through normalized device coordinates
    ///
    /// `ndc` is in -1..1 with +y up. Returns `None` when the pose is degenerate.
    pub fn from_ndc(pose: &CameraPose, fov_y: f32, aspect: f32, ndc: Vec2) -> Option<Ray> {
        let forward = (pose.target - pose.position).try_normalize()?;
        let right = forward.cross(Vec3::Y).try_normalize()?;
        let up = right.cross(forward);
        let half_h = (fov_y * 0.5).tan();
        let half_w = half_h * aspect;
        let dir = forward + right * (ndc.x * half_w) + up * (ndc.y * half_h);
        Some(Ray::new(pose.position, dir))
    }

    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.dir * distance
    }

    /// Distance along the ray to the box, zero when starting inside
    pub fn intersect_aabb(&self, aabb: &Aabb) -> Option<f32> {
        let inv = self.dir.recip();
        let t1 = (aabb.min - self.origin) * inv;
        let t2 = (aabb.max - self.origin) * inv;
        let t_near = t1.min(t2).max_element();
        let t_far = t1.max(t2).min_element();
        if t_far < 0.0 || t_near > t_far || t_near.is_nan() || t_far.is_nan() {
            return None;
        }
        Some(t_near.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_ray_points_at_target() {
        let pose = CameraPose::new(Vec3::new(0.0, 2.0, 10.0), Vec3::new(0.0, 2.0, 0.0));
        let ray = Ray::from_ndc(&pose, 55f32.to_radians(), 16.0 / 9.0, Vec2::ZERO).unwrap();
        assert!((ray.dir - Vec3::NEG_Z).length() < 1e-6);
    }

    #[test]
    fn test_corner_ray_spans_fov() {
        let pose = CameraPose::new(Vec3::ZERO, Vec3::NEG_Z);
        let fov = 90f32.to_radians();
        let ray = Ray::from_ndc(&pose, fov, 1.0, Vec2::new(0.0, 1.0)).unwrap();
        // Top edge of a 90 degree frustum is 45 degrees up
        assert!((ray.dir.y - ray.dir.z.abs()).abs() < 1e-5);
        let ray = Ray::from_ndc(&pose, fov, 2.0, Vec2::new(1.0, 0.0)).unwrap();
        assert!(ray.dir.x > 0.0);
    }

    #[test]
    fn test_straight_down_pose_is_degenerate() {
        let pose = CameraPose::new(Vec3::Y, Vec3::ZERO);
        assert!(Ray::from_ndc(&pose, 1.0, 1.0, Vec2::ZERO).is_none());
    }

    #[test]
    fn test_aabb_intersection() {
        let aabb = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
        assert!((ray.intersect_aabb(&aabb).unwrap() - 4.0).abs() < 1e-6);
        let away = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::Z);
        assert_eq!(away.intersect_aabb(&aabb), None);
        let inside = Ray::new(Vec3::ZERO, Vec3::X);
        assert_eq!(inside.intersect_aabb(&aabb), Some(0.0));
        let miss = Ray::new(Vec3::new(3.0, 0.0, 5.0), Vec3::NEG_Z);
        assert_eq!(miss.intersect_aabb(&aabb), None);
    }
}
