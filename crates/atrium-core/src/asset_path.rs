//! Model requests and the asset path convention
//!
//! Unit models live at `{base}/Unit_{NN}/{Variant}.{ext}`; the two building
//! models have their own file names. The fallback policy used by the loader
//! is expressed here as an ordered list of candidate requests.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::AssetConfig;
use crate::error::LoadError;

/// Alternate configuration of the same model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// With mezzanine
    #[default]
    With,
    /// Without mezzanine
    Without,
    /// With mezzanine and furniture
    Furniture,
}

impl Variant {
    /// File stem used by the unit asset convention
    pub fn file_stem(self) -> &'static str {
        match self {
            Variant::With => "Mezzanine",
            Variant::Without => "Without_Mezzanine",
            Variant::Furniture => "Furniture",
        }
    }

    /// Variant tried when this one fails for a unit
    pub fn alternate(self) -> Variant {
        match self {
            Variant::Furniture | Variant::Without => Variant::With,
            Variant::With => Variant::Without,
        }
    }

    /// Route/query slug
    pub fn slug(self) -> &'static str {
        match self {
            Variant::With => "with",
            Variant::Without => "without",
            Variant::Furniture => "furniture",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "with" | "mezzanine" => Ok(Variant::With),
            "without" | "without_mezzanine" => Ok(Variant::Without),
            "furniture" => Ok(Variant::Furniture),
            other => Err(format!("unknown variant '{other}'")),
        }
    }
}

/// Which viewer is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewerMode {
    /// A single unit, one of 1..=67
    #[default]
    Unit,
    /// The whole building with hoverable units
    Building,
}

impl FromStr for ViewerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unit" | "individual" => Ok(ViewerMode::Unit),
            "building" | "estate" => Ok(ViewerMode::Building),
            other => Err(format!("unknown viewer mode '{other}'")),
        }
    }
}

/// What the caller wants displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ModelRequest {
    Unit { unit: u32, variant: Variant },
    Building { variant: Variant },
}

impl ModelRequest {
    pub fn variant(&self) -> Variant {
        match *self {
            ModelRequest::Unit { variant, .. } | ModelRequest::Building { variant } => variant,
        }
    }

    pub fn mode(&self) -> ViewerMode {
        match self {
            ModelRequest::Unit { .. } => ViewerMode::Unit,
            ModelRequest::Building { .. } => ViewerMode::Building,
        }
    }

    pub fn unit(&self) -> Option<u32> {
        match *self {
            ModelRequest::Unit { unit, .. } => Some(unit),
            ModelRequest::Building { .. } => None,
        }
    }

    /// Same request with a different variant
    pub fn with_variant(self, variant: Variant) -> Self {
        match self {
            ModelRequest::Unit { unit, .. } => ModelRequest::Unit { unit, variant },
            ModelRequest::Building { .. } => ModelRequest::Building { variant },
        }
    }
}

impl fmt::Display for ModelRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelRequest::Unit { unit, variant } => write!(f, "unit {unit} ({variant})"),
            ModelRequest::Building { variant } => write!(f, "building ({variant})"),
        }
    }
}

/// Resolves requests to asset paths and fallback candidates
#[derive(Debug, Clone)]
pub struct AssetCatalog {
    base_path: String,
    extension: String,
    building_with: String,
    building_without: String,
    unit_min: u32,
    unit_max: u32,
    default_unit: u32,
}

impl AssetCatalog {
    pub fn new(config: &AssetConfig) -> Self {
        Self {
            base_path: config.base_path.trim_end_matches('/').to_string(),
            extension: config.extension.trim_start_matches('.').to_string(),
            building_with: config.building_with.clone(),
            building_without: config.building_without.clone(),
            unit_min: config.unit_min,
            unit_max: config.unit_max,
            default_unit: config.default_unit,
        }
    }

    pub fn default_unit(&self) -> u32 {
        self.default_unit
    }

    /// Check a unit number against the configured range
    pub fn check_unit(&self, unit: u32) -> Result<u32, LoadError> {
        if (self.unit_min..=self.unit_max).contains(&unit) {
            Ok(unit)
        } else {
            Err(LoadError::InvalidUnit {
                unit,
                min: self.unit_min,
                max: self.unit_max,
            })
        }
    }

    /// Replace an out-of-range unit with the default unit
    pub fn normalize(&self, request: ModelRequest) -> ModelRequest {
        match request {
            ModelRequest::Unit { unit, variant } => match self.check_unit(unit) {
                Ok(unit) => ModelRequest::Unit { unit, variant },
                Err(err) => {
                    tracing::warn!(error = %err, default = self.default_unit, "Substituting default unit");
                    ModelRequest::Unit {
                        unit: self.default_unit,
                        variant,
                    }
                }
            },
            building => building,
        }
    }

    /// Path for a unit/variant pair; out-of-range units map to the default unit
    pub fn compute_asset_path(&self, unit: u32, variant: Variant) -> String {
        let unit = self.check_unit(unit).unwrap_or(self.default_unit);
        format!(
            "{}/Unit_{:02}/{}.{}",
            self.base_path,
            unit,
            variant.file_stem(),
            self.extension
        )
    }

    pub fn path_for(&self, request: &ModelRequest) -> String {
        match *request {
            ModelRequest::Unit { unit, variant } => self.compute_asset_path(unit, variant),
            ModelRequest::Building { variant } => {
                let file = match variant {
                    Variant::Without => &self.building_without,
                    Variant::With | Variant::Furniture => &self.building_with,
                };
                format!("{}/{}", self.base_path, file)
            }
        }
    }

    /// Last-resort request when every other candidate has been tried
    pub fn ultimate_default(&self) -> ModelRequest {
        ModelRequest::Unit {
            unit: self.default_unit,
            variant: Variant::With,
        }
    }

    /// Fallback candidates after `attempted` failed, in preference order
    ///
    /// For units: the default unit with the same variant, then the alternate
    /// variant of the same unit, then the ultimate default. Candidates whose
    /// path equals the attempted one are dropped so the chain can never
    /// retry the path it just failed on.
    pub fn fallback_candidates(&self, attempted: &ModelRequest) -> Vec<ModelRequest> {
        let attempted_path = self.path_for(attempted);
        let candidates = match *attempted {
            ModelRequest::Unit { unit, variant } => vec![
                ModelRequest::Unit {
                    unit: self.default_unit,
                    variant,
                },
                ModelRequest::Unit {
                    unit,
                    variant: variant.alternate(),
                },
                self.ultimate_default(),
            ],
            ModelRequest::Building { variant } => {
                let other = match variant {
                    Variant::Without => Variant::With,
                    Variant::With | Variant::Furniture => Variant::Without,
                };
                vec![ModelRequest::Building { variant: other }]
            }
        };

        let mut out: Vec<ModelRequest> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let path = self.path_for(&candidate);
            if path != attempted_path && !out.iter().any(|c| self.path_for(c) == path) {
                out.push(candidate);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> AssetCatalog {
        AssetCatalog::new(&AssetConfig::default())
    }

    #[test]
    fn test_unit_paths_are_zero_padded() {
        let c = catalog();
        assert_eq!(
            c.compute_asset_path(5, Variant::Without),
            "/assets/Unit_05/Without_Mezzanine.glb"
        );
        assert_eq!(
            c.compute_asset_path(23, Variant::Furniture),
            "/assets/Unit_23/Furniture.glb"
        );
        assert_eq!(
            c.compute_asset_path(1, Variant::With),
            "/assets/Unit_01/Mezzanine.glb"
        );
    }

    #[test]
    fn test_path_is_deterministic_over_range() {
        let c = catalog();
        for unit in 1..=67 {
            for variant in [Variant::With, Variant::Without, Variant::Furniture] {
                let a = c.compute_asset_path(unit, variant);
                let b = c.compute_asset_path(unit, variant);
                assert_eq!(a, b);
                assert!(a.contains(&format!("Unit_{:02}", unit)));
            }
        }
    }

    #[test]
    fn test_out_of_range_units_use_default() {
        let c = catalog();
        for unit in [0, 68, 500] {
            assert_eq!(
                c.compute_asset_path(unit, Variant::Without),
                "/assets/Unit_01/Without_Mezzanine.glb"
            );
        }
        assert_eq!(
            c.normalize(ModelRequest::Unit { unit: 99, variant: Variant::Furniture }),
            ModelRequest::Unit { unit: 1, variant: Variant::Furniture }
        );
        assert!(matches!(
            c.check_unit(99),
            Err(LoadError::InvalidUnit { unit: 99, .. })
        ));
    }

    #[test]
    fn test_building_paths() {
        let c = catalog();
        assert_eq!(
            c.path_for(&ModelRequest::Building { variant: Variant::Without }),
            "/assets/Without_Mezzanine_final.glb"
        );
        assert_eq!(
            c.path_for(&ModelRequest::Building { variant: Variant::With }),
            "/assets/Mezzanine_new_estate_huge.glb"
        );
    }

    #[test]
    fn test_fallbacks_for_non_default_unit() {
        let c = catalog();
        let candidates =
            c.fallback_candidates(&ModelRequest::Unit { unit: 5, variant: Variant::Without });
        assert_eq!(
            candidates,
            vec![
                ModelRequest::Unit { unit: 1, variant: Variant::Without },
                ModelRequest::Unit { unit: 5, variant: Variant::With },
                ModelRequest::Unit { unit: 1, variant: Variant::With },
            ]
        );
    }

    #[test]
    fn test_fallbacks_for_default_unit_skip_identical_paths() {
        let c = catalog();
        let candidates =
            c.fallback_candidates(&ModelRequest::Unit { unit: 1, variant: Variant::Without });
        // Unit 1 same variant is the attempted path itself; the alternate
        // variant and the ultimate default coincide.
        assert_eq!(
            candidates,
            vec![ModelRequest::Unit { unit: 1, variant: Variant::With }]
        );

        let from_default =
            c.fallback_candidates(&ModelRequest::Unit { unit: 1, variant: Variant::With });
        assert_eq!(
            from_default,
            vec![ModelRequest::Unit { unit: 1, variant: Variant::Without }]
        );
    }

    #[test]
    fn test_building_fallback_is_other_variant() {
        let c = catalog();
        assert_eq!(
            c.fallback_candidates(&ModelRequest::Building { variant: Variant::Without }),
            vec![ModelRequest::Building { variant: Variant::With }]
        );
    }

    #[test]
    fn test_variant_parsing() {
        assert_eq!("without".parse::<Variant>().unwrap(), Variant::Without);
        assert_eq!("Mezzanine".parse::<Variant>().unwrap(), Variant::With);
        assert_eq!(" furniture ".parse::<Variant>().unwrap(), Variant::Furniture);
        assert!("attic".parse::<Variant>().is_err());
        assert_eq!(Variant::Furniture.alternate(), Variant::With);
        assert_eq!(Variant::With.alternate(), Variant::Without);
    }

    #[test]
    fn test_custom_base_path() {
        let config = AssetConfig {
            base_path: "https://cdn.example.com/models/".to_string(),
            extension: ".gltf".to_string(),
            ..AssetConfig::default()
        };
        let c = AssetCatalog::new(&config);
        assert_eq!(
            c.compute_asset_path(12, Variant::With),
            "https://cdn.example.com/models/Unit_12/Mezzanine.gltf"
        );
    }
}
