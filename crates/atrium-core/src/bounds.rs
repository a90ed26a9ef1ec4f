//! Bounds analysis
//!
//! A loaded model is reduced to a flat list of primitive boxes in model-root
//! space. [`analyze`] centers it at the origin, applies the unit yaw
//! override and a uniform scale, then recomputes the box from the placed
//! corners so downstream framing never works from a stale pre-transform box.

use glam::{Mat4, Quat, Vec3};

use crate::error::LoadError;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Box that contains nothing; extending it with a point yields that point
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut aabb = Self::EMPTY;
        for p in points {
            aabb.extend(p);
        }
        aabb
    }

    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    pub fn extend(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn diagonal(&self) -> f32 {
        self.size().length()
    }

    /// Largest side length
    pub fn max_extent(&self) -> f32 {
        self.size().max_element()
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// Box around all eight corners after `transform`
    pub fn transformed(&self, transform: &Mat4) -> Aabb {
        if self.is_empty() {
            return *self;
        }
        Aabb::from_points(self.corners().iter().map(|c| transform.transform_point3(*c)))
    }

    /// Sphere through the box corners
    pub fn bounding_sphere(&self) -> Sphere {
        Sphere {
            center: self.center(),
            radius: self.diagonal() * 0.5,
        }
    }

    /// Whether `point` lies inside or on the box
    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

/// Local-space box of one primitive and its transform to model-root space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrimitiveBox {
    pub local: Aabb,
    pub transform: Mat4,
}

/// Geometry graph flattened to primitive boxes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneGeometry {
    pub primitives: Vec<PrimitiveBox>,
}

impl SceneGeometry {
    pub fn push(&mut self, local: Aabb, transform: Mat4) {
        if !local.is_empty() {
            self.primitives.push(PrimitiveBox { local, transform });
        }
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Box of every primitive after `root` is applied
    pub fn aabb(&self, root: &Mat4) -> Aabb {
        self.primitives.iter().fold(Aabb::EMPTY, |acc, p| {
            acc.union(&p.local.transformed(&(*root * p.transform)))
        })
    }
}

/// Transform applied to the model root
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub translation: Vec3,
    /// Radians about +Y
    pub yaw: f32,
    pub scale: f32,
}

impl Placement {
    pub const IDENTITY: Placement = Placement {
        translation: Vec3::ZERO,
        yaw: 0.0,
        scale: 1.0,
    };

    pub fn rotation(&self) -> Quat {
        Quat::from_rotation_y(self.yaw)
    }

    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(Vec3::splat(self.scale), self.rotation(), self.translation)
    }
}

/// Derived attributes of a placed model, immutable for its lifetime
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub aabb: Aabb,
    pub center: Vec3,
    pub sphere: Sphere,
    pub diagonal: f32,
    pub max_extent: f32,
    /// Diagonal before scaling, used to classify small models
    pub source_diagonal: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Analysis {
    pub placement: Placement,
    pub bounds: Bounds,
}

/// Center, rotate and scale `geometry` so its diagonal equals `target_diagonal`
pub fn analyze(geometry: &SceneGeometry, target_diagonal: f32, yaw: f32) -> Result<Analysis, LoadError> {
    if geometry.is_empty() {
        return Err(LoadError::Decode("model contains no geometry".to_string()));
    }
    let source = geometry.aabb(&Mat4::IDENTITY);
    let source_diagonal = source.diagonal();
    if !source_diagonal.is_finite() {
        return Err(LoadError::Decode("model bounds are not finite".to_string()));
    }
    let scale = if source_diagonal > f32::EPSILON {
        target_diagonal / source_diagonal
    } else {
        1.0
    };

    let rotation = Quat::from_rotation_y(yaw);
    let placement = Placement {
        translation: rotation * (-scale * source.center()),
        yaw,
        scale,
    };

    let aabb = geometry.aabb(&placement.to_mat4());
    let sphere = aabb.bounding_sphere();
    tracing::debug!(
        source_diagonal,
        scale,
        yaw,
        diagonal = aabb.diagonal(),
        "Model placed"
    );
    Ok(Analysis {
        placement,
        bounds: Bounds {
            aabb,
            center: aabb.center(),
            sphere,
            diagonal: aabb.diagonal(),
            max_extent: aabb.max_extent(),
            source_diagonal,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn offset_scene() -> SceneGeometry {
        let mut g = SceneGeometry::default();
        g.push(
            Aabb::new(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 3.0, 1.0)),
            Mat4::from_translation(Vec3::new(100.0, 0.0, 50.0)),
        );
        g.push(
            Aabb::new(Vec3::ZERO, Vec3::ONE),
            Mat4::from_scale_rotation_translation(
                Vec3::splat(2.0),
                Quat::IDENTITY,
                Vec3::new(104.0, 1.0, 50.0),
            ),
        );
        g
    }

    #[test]
    fn test_analyze_centers_and_scales() {
        let analysis = analyze(&offset_scene(), 15.0, 0.0).unwrap();
        let b = analysis.bounds;
        assert!(b.center.length() < 1e-4, "center {:?}", b.center);
        assert!((b.diagonal - 15.0).abs() < 1e-3);
        assert!((b.sphere.radius - 7.5).abs() < 1e-3);
        // 7 x 3 x 3 before scaling
        assert!((b.source_diagonal - 67.0_f32.sqrt()).abs() < 1e-4);
    }

    #[test]
    fn test_analyze_is_bit_identical_across_calls() {
        let g = offset_scene();
        let a = analyze(&g, 15.0, PI).unwrap();
        let b = analyze(&g, 15.0, PI).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            a.bounds.center.to_array().map(f32::to_bits),
            b.bounds.center.to_array().map(f32::to_bits)
        );
        assert_eq!(a.bounds.sphere.radius.to_bits(), b.bounds.sphere.radius.to_bits());
    }

    #[test]
    fn test_yaw_half_turn_keeps_box_centered() {
        let a = analyze(&offset_scene(), 15.0, PI).unwrap();
        assert!(a.bounds.center.length() < 1e-3);
        assert!((a.bounds.diagonal - 15.0).abs() < 1e-2);
        // The primitive that sat at +x now sits at -x
        let placed = a.placement.to_mat4().transform_point3(Vec3::new(106.0, 1.0, 50.0));
        assert!(placed.x < 0.0);
    }

    #[test]
    fn test_reanalysis_of_placed_geometry_is_near_identity() {
        let g = offset_scene();
        let first = analyze(&g, 15.0, 0.0).unwrap();
        let mut placed = SceneGeometry::default();
        let root = first.placement.to_mat4();
        for p in &g.primitives {
            placed.push(p.local, root * p.transform);
        }
        let second = analyze(&placed, 15.0, 0.0).unwrap();
        assert!((second.placement.scale - 1.0).abs() < 1e-4);
        assert!(second.placement.translation.length() < 1e-3);
    }

    #[test]
    fn test_empty_and_degenerate_geometry() {
        assert!(matches!(
            analyze(&SceneGeometry::default(), 15.0, 0.0),
            Err(LoadError::Decode(_))
        ));

        let mut point = SceneGeometry::default();
        point.push(
            Aabb::new(Vec3::splat(2.0), Vec3::splat(2.0)),
            Mat4::IDENTITY,
        );
        let a = analyze(&point, 15.0, 0.0).unwrap();
        assert_eq!(a.placement.scale, 1.0);
        assert_eq!(a.bounds.diagonal, 0.0);
    }

    #[test]
    fn test_transformed_box_covers_rotated_corners() {
        let unit = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let rotated = unit.transformed(&Mat4::from_rotation_y(PI / 4.0));
        let half = 2.0_f32.sqrt();
        assert!((rotated.max.x - half).abs() < 1e-5);
        assert!((rotated.max.y - 1.0).abs() < 1e-5);
        assert!(Aabb::EMPTY.is_empty());
        assert!(Aabb::EMPTY.transformed(&Mat4::IDENTITY).is_empty());
    }
}
