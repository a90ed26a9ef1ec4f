//! Ground plane and key light placement derived from model bounds

use glam::Vec3;

use crate::bounds::Bounds;
use crate::config::{GroundRule, StageConfig};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundPlane {
    pub y: f32,
    /// Side length of the square plane
    pub size: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyLight {
    pub position: Vec3,
    pub target: Vec3,
    /// Half-size of the shadow frustum
    pub shadow_extent: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageLayout {
    pub ground: GroundPlane,
    pub light: KeyLight,
}

impl StageLayout {
    pub fn new(bounds: &Bounds, config: &StageConfig) -> Self {
        let ground = match config.ground {
            GroundRule::FitModel { size_factor, offset } => {
                let size = bounds.aabb.size();
                GroundPlane {
                    y: bounds.aabb.min.y - offset,
                    size: size.x.max(size.z) * size_factor,
                }
            }
            GroundRule::Fixed { size, y } => GroundPlane { y, size },
        };

        let r = bounds.sphere.radius;
        let center = bounds.sphere.center;
        let light = KeyLight {
            position: center + Vec3::from_array(config.light_offset) * r,
            target: center,
            shadow_extent: (2.0 * r).max(config.min_shadow_extent),
        };
        Self { ground, light }
    }
}
