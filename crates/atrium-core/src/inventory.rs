//! Load-time scene inventory
//!
//! The first pass walks the loaded scene once and records, per primitive,
//! which unit it belongs to and which materials need converting. The engine
//! then applies the conversions from this table in a second pass, so the
//! traversal itself never mutates anything.

use std::collections::HashSet;
use std::hash::Hash;

use tracing::debug;

use crate::units::{UnitNaming, UnitRegistry};

/// Shading model of a material as authored in the asset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialKind {
    /// Flat shading that ignores scene lights
    Unlit,
    Lit,
}

/// Parameters unlit materials are converted with
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialConversion {
    pub perceptual_roughness: f32,
    pub metallic: f32,
}

pub const LIT_CONVERSION: MaterialConversion = MaterialConversion {
    perceptual_roughness: 0.7,
    metallic: 0.0,
};

/// What the first pass learns about one primitive
#[derive(Debug, Clone)]
pub struct PrimitiveInfo<P, M> {
    pub primitive: P,
    /// Candidate names, most specific first (own name, then parent node)
    pub names: Vec<String>,
    pub material: Option<(M, MaterialKind)>,
}

#[derive(Debug, Clone)]
pub struct SceneInventory<P, M> {
    pub registry: UnitRegistry<P>,
    /// Unlit materials to convert, each listed once
    pub conversions: Vec<M>,
    pub primitive_count: usize,
}

impl<P, M> SceneInventory<P, M>
where
    P: Clone + Eq + Hash,
    M: Clone + Eq + Hash,
{
    /// First pass: build the table from the primitives of a loaded scene
    pub fn collect(items: impl IntoIterator<Item = PrimitiveInfo<P, M>>, naming: &UnitNaming) -> Self {
        let mut registry = UnitRegistry::new();
        let mut conversions = Vec::new();
        let mut seen = HashSet::new();
        let mut primitive_count = 0;

        for item in items {
            primitive_count += 1;
            if let Some(unit) = item.names.iter().find_map(|name| naming.resolve(name)) {
                registry.register(unit, item.primitive.clone());
            }
            if let Some((material, MaterialKind::Unlit)) = item.material {
                if seen.insert(material.clone()) {
                    conversions.push(material);
                }
            }
        }

        debug!(
            primitives = primitive_count,
            unit_primitives = registry.len(),
            conversions = conversions.len(),
            "Scene inventory collected"
        );
        Self {
            registry,
            conversions,
            primitive_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HighlightConfig;

    fn info(id: u32, names: &[&str], material: Option<(u8, MaterialKind)>) -> PrimitiveInfo<u32, u8> {
        PrimitiveInfo {
            primitive: id,
            names: names.iter().map(|n| n.to_string()).collect(),
            material,
        }
    }

    #[test]
    fn test_collect_uses_parent_name_when_own_name_fails() {
        let naming = UnitNaming::from_config(&HighlightConfig::default());
        let inventory = SceneInventory::collect(
            vec![
                info(1, &["Mesh.004", "23_4"], Some((0, MaterialKind::Lit))),
                info(2, &["23_5"], Some((1, MaterialKind::Unlit))),
                info(3, &["Site_ground"], Some((1, MaterialKind::Unlit))),
                info(4, &["Cars", "7_1"], None),
            ],
            &naming,
        );
        assert_eq!(inventory.registry.primitives(23), &[1, 2]);
        // Parent carries the unit name even if the primitive's own name is excluded
        assert_eq!(inventory.registry.unit_of(&4), Some(7));
        assert_eq!(inventory.registry.unit_of(&3), None);
        assert_eq!(inventory.conversions, vec![1]);
        assert_eq!(inventory.primitive_count, 4);
    }

    #[test]
    fn test_lit_conversion_constants() {
        assert_eq!(LIT_CONVERSION.perceptual_roughness, 0.7);
        assert_eq!(LIT_CONVERSION.metallic, 0.0);
    }
}
