//! Viewer configuration
//!
//! Missing sections and fields fall back to serde defaults, so an absent or
//! partial TOML file yields the stock behaviour of the two viewers.

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::path::Path;
use tracing::info;

use crate::asset_path::ViewerMode;
use crate::error::ConfigError;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default)]
    pub assets: AssetConfig,
    /// Settings for the single-unit viewer
    #[serde(default = "ModeConfig::unit_defaults")]
    pub unit: ModeConfig,
    /// Settings for the whole-building viewer
    #[serde(default = "ModeConfig::building_defaults")]
    pub building: ModeConfig,
    #[serde(default)]
    pub controls: ControlsConfig,
    #[serde(default)]
    pub highlight: HighlightConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            assets: AssetConfig::default(),
            unit: ModeConfig::unit_defaults(),
            building: ModeConfig::building_defaults(),
            controls: ControlsConfig::default(),
            highlight: HighlightConfig::default(),
        }
    }
}

impl ViewerConfig {
    /// Parse from TOML content and validate
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: ViewerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config = Self::from_toml(&content)?;
            info!(path = %path.display(), "Loaded configuration");
            Ok(config)
        } else {
            info!(
                path = %path.display(),
                "Configuration file not found, using defaults"
            );
            Ok(Self::default())
        }
    }

    /// Per-mode settings
    pub fn mode(&self, mode: ViewerMode) -> &ModeConfig {
        match mode {
            ViewerMode::Unit => &self.unit,
            ViewerMode::Building => &self.building,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let a = &self.assets;
        if a.unit_min == 0 || a.unit_min > a.unit_max {
            return Err(ConfigError::Invalid(format!(
                "unit range {}..={} is empty",
                a.unit_min, a.unit_max
            )));
        }
        if !(a.unit_min..=a.unit_max).contains(&a.default_unit) {
            return Err(ConfigError::Invalid(format!(
                "default unit {} outside {}..={}",
                a.default_unit, a.unit_min, a.unit_max
            )));
        }
        let h = &self.highlight;
        if h.unit_min > h.unit_max {
            return Err(ConfigError::Invalid(format!(
                "highlight unit range {}..={} is empty",
                h.unit_min, h.unit_max
            )));
        }
        if self.controls.min_distance > self.controls.max_distance {
            return Err(ConfigError::Invalid(
                "controls.min_distance exceeds controls.max_distance".to_string(),
            ));
        }
        Ok(())
    }
}

/// Asset locations and the load retry policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    #[serde(default = "default_base_path")]
    pub base_path: String,
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Whole-building model with the mezzanine
    #[serde(default = "default_building_with")]
    pub building_with: String,
    /// Whole-building model without the mezzanine
    #[serde(default = "default_building_without")]
    pub building_without: String,
    #[serde(default = "default_unit_min")]
    pub unit_min: u32,
    #[serde(default = "default_unit_max")]
    pub unit_max: u32,
    /// Substituted for out-of-range unit numbers and used by the fallback chain
    #[serde(default = "default_unit_min")]
    pub default_unit: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: f64,
    /// Delay before the first load of a viewer
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: f64,
    #[serde(default = "default_failure_message")]
    pub failure_message: String,
    #[serde(default = "default_yaw_overrides", rename = "yaw_override")]
    pub yaw_overrides: Vec<YawOverride>,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            extension: default_extension(),
            building_with: default_building_with(),
            building_without: default_building_without(),
            unit_min: default_unit_min(),
            unit_max: default_unit_max(),
            default_unit: default_unit_min(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            initial_delay_ms: default_initial_delay_ms(),
            failure_message: default_failure_message(),
            yaw_overrides: default_yaw_overrides(),
        }
    }
}

/// Fixed yaw correction for a range of units
///
/// The values compensate for how individual unit assets were authored and
/// are calibrated against the asset set, not derived.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YawOverride {
    pub first: u32,
    pub last: u32,
    /// Radians about +Y
    pub yaw: f32,
}

impl AssetConfig {
    /// Yaw correction for a unit, zero when no override matches
    pub fn yaw_for_unit(&self, unit: u32) -> f32 {
        self.yaw_overrides
            .iter()
            .find(|o| (o.first..=o.last).contains(&unit))
            .map(|o| o.yaw)
            .unwrap_or(0.0)
    }
}

/// Per-viewer behaviour
///
/// A `[unit]` or `[building]` table replaces that mode's stock settings as a
/// whole, so it must name every field without a default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeConfig {
    /// Bounding diagonal the model is scaled to
    pub target_diagonal: f32,
    pub intro: IntroProfile,
    #[serde(default = "default_true")]
    pub auto_rotate: bool,
    /// Auto-rotate angular speed in rad/ms
    pub auto_rotate_speed: f32,
    #[serde(default = "default_reset_duration_ms")]
    pub reset_duration_ms: f64,
    pub stage: StageConfig,
    pub constraints: ConstraintConfig,
    /// Minimum spacing between accepted model switches
    pub switch_throttle_ms: f64,
    /// Whether pointer hover/click resolves units in this viewer
    pub hit_testing: bool,
    /// Skip every other frame's expensive work while auto-rotating
    #[serde(default)]
    pub frame_skip: bool,
}

impl ModeConfig {
    pub fn unit_defaults() -> Self {
        Self {
            target_diagonal: 15.0,
            intro: IntroProfile::Sweep {
                radius_factor: 2.2,
                height_factor: 0.7,
                start_angle: -PI / 4.0,
                end_angle: 0.0,
                duration_ms: 1500.0,
            },
            auto_rotate: true,
            auto_rotate_speed: 0.00012,
            reset_duration_ms: default_reset_duration_ms(),
            stage: StageConfig {
                ground: GroundRule::FitModel {
                    size_factor: 3.0,
                    offset: 0.01,
                },
                light_offset: [1.5, 2.0, 1.5],
                min_shadow_extent: 5.0,
            },
            constraints: ConstraintConfig {
                floor: FloorRule::GroundPlane,
                ..ConstraintConfig::default()
            },
            switch_throttle_ms: 500.0,
            hit_testing: false,
            frame_skip: false,
        }
    }

    pub fn building_defaults() -> Self {
        Self {
            target_diagonal: 12.0 * 1.8,
            intro: IntroProfile::Dolly {
                start_height: 0.8,
                start_distance: 1.5,
                end_height: 0.5,
                end_distance: 1.6,
                duration_ms: 1000.0,
            },
            auto_rotate: true,
            auto_rotate_speed: 0.00006,
            reset_duration_ms: default_reset_duration_ms(),
            stage: StageConfig {
                ground: GroundRule::Fixed { size: 200.0, y: -0.1 },
                light_offset: [2.5, 1.5, 2.5],
                min_shadow_extent: 5.0,
            },
            constraints: ConstraintConfig {
                floor: FloorRule::Fixed {
                    small: 20.0,
                    large: -18.45,
                },
                ..ConstraintConfig::default()
            },
            switch_throttle_ms: 800.0,
            hit_testing: true,
            frame_skip: true,
        }
    }
}

/// Scripted camera move played when a model becomes ready
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntroProfile {
    /// Orbit from `start_angle` to `end_angle` at a fixed radius and height
    /// derived from the bounding sphere, easing in and out.
    Sweep {
        radius_factor: f32,
        height_factor: f32,
        start_angle: f32,
        end_angle: f32,
        duration_ms: f64,
    },
    /// Move straight between two framed positions in front of the model,
    /// easing out. Heights and distances are multiples of the sphere radius.
    Dolly {
        start_height: f32,
        start_distance: f32,
        end_height: f32,
        end_distance: f32,
        duration_ms: f64,
    },
}

impl IntroProfile {
    pub fn duration_ms(&self) -> f64 {
        match *self {
            IntroProfile::Sweep { duration_ms, .. } | IntroProfile::Dolly { duration_ms, .. } => {
                duration_ms
            }
        }
    }
}

/// Ground plane and key light placement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    pub ground: GroundRule,
    /// Key light offset from the model center, in sphere radii per axis
    pub light_offset: [f32; 3],
    pub min_shadow_extent: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GroundRule {
    /// Square sized from the model footprint, just below its lowest point
    FitModel { size_factor: f32, offset: f32 },
    /// Fixed square at a fixed height
    Fixed { size: f32, y: f32 },
}

/// Which orbit-target constraints run, and their scene-specific limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintConfig {
    #[serde(default = "default_true")]
    pub adaptive_sensitivity: bool,
    #[serde(default = "default_true")]
    pub pan_clamp: bool,
    #[serde(default = "default_true")]
    pub retarget: bool,
    #[serde(default = "default_true")]
    pub close_pivot_pull: bool,
    #[serde(default)]
    pub floor: FloorRule,
    /// Source diagonal below which a model counts as small
    #[serde(default = "default_small_model_diagonal")]
    pub small_model_diagonal: f32,
    /// Source diagonal below which a large model still gets a looser pan clamp
    #[serde(default = "default_medium_model_diagonal")]
    pub medium_model_diagonal: f32,
    /// Chance per frame of probing forward for a closer pivot
    #[serde(default = "default_retarget_probability")]
    pub retarget_probability: f64,
}

impl Default for ConstraintConfig {
    fn default() -> Self {
        Self {
            adaptive_sensitivity: true,
            pan_clamp: true,
            retarget: true,
            close_pivot_pull: true,
            floor: FloorRule::default(),
            small_model_diagonal: default_small_model_diagonal(),
            medium_model_diagonal: default_medium_model_diagonal(),
            retarget_probability: default_retarget_probability(),
        }
    }
}

/// Lowest allowed orbit-target height
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FloorRule {
    /// The ground plane height
    #[default]
    GroundPlane,
    /// Fixed heights for small and large models
    Fixed { small: f32, large: f32 },
}

/// Base settings for the damped orbit controls and the projection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlsConfig {
    #[serde(default = "default_fov_degrees")]
    pub fov_degrees: f32,
    #[serde(default = "default_near")]
    pub near: f32,
    #[serde(default = "default_far")]
    pub far: f32,
    #[serde(default = "default_min_distance")]
    pub min_distance: f32,
    #[serde(default = "default_max_distance")]
    pub max_distance: f32,
    #[serde(default)]
    pub min_polar: f32,
    #[serde(default = "default_max_polar")]
    pub max_polar: f32,
    #[serde(default = "default_rotate_speed")]
    pub rotate_speed: f32,
    #[serde(default = "default_pan_speed")]
    pub pan_speed: f32,
    #[serde(default = "default_zoom_speed")]
    pub zoom_speed: f32,
    #[serde(default = "default_damping")]
    pub damping: f32,
    #[serde(default = "default_resize_debounce_ms")]
    pub resize_debounce_ms: f64,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            fov_degrees: default_fov_degrees(),
            near: default_near(),
            far: default_far(),
            min_distance: default_min_distance(),
            max_distance: default_max_distance(),
            min_polar: 0.0,
            max_polar: default_max_polar(),
            rotate_speed: default_rotate_speed(),
            pan_speed: default_pan_speed(),
            zoom_speed: default_zoom_speed(),
            damping: default_damping(),
            resize_debounce_ms: default_resize_debounce_ms(),
        }
    }
}

/// Unit naming, hover/click timing, and the overlay look
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighlightConfig {
    #[serde(default = "default_unit_min")]
    pub unit_min: u32,
    #[serde(default = "default_highlight_unit_max")]
    pub unit_max: u32,
    /// Name fragments that mark decorative, non-addressable objects
    #[serde(default = "default_exclusions")]
    pub exclusions: Vec<String>,
    #[serde(default = "default_hover_debounce_ms")]
    pub hover_debounce_ms: f64,
    /// Hover debounce while the camera is still auto-rotating untouched
    #[serde(default = "default_auto_rotate_debounce_ms")]
    pub auto_rotate_debounce_ms: f64,
    #[serde(default = "default_click_max_duration_ms")]
    pub click_max_duration_ms: f64,
    /// Max pointer travel between down and up, in normalized device coordinates
    #[serde(default = "default_click_max_ndc_distance")]
    pub click_max_ndc_distance: f32,
    #[serde(default = "default_click_debounce_ms")]
    pub click_debounce_ms: f64,
    #[serde(default = "default_highlight_color")]
    pub color: u32,
    #[serde(default = "default_highlight_emissive")]
    pub emissive: u32,
    #[serde(default = "default_emissive_strength")]
    pub emissive_strength: f32,
    #[serde(default = "default_highlight_opacity")]
    pub opacity: f32,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            unit_min: default_unit_min(),
            unit_max: default_highlight_unit_max(),
            exclusions: default_exclusions(),
            hover_debounce_ms: default_hover_debounce_ms(),
            auto_rotate_debounce_ms: default_auto_rotate_debounce_ms(),
            click_max_duration_ms: default_click_max_duration_ms(),
            click_max_ndc_distance: default_click_max_ndc_distance(),
            click_debounce_ms: default_click_debounce_ms(),
            color: default_highlight_color(),
            emissive: default_highlight_emissive(),
            emissive_strength: default_emissive_strength(),
            opacity: default_highlight_opacity(),
        }
    }
}

/// Split a 0xRRGGBB value into sRGB channels in 0..1
pub fn rgb_channels(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}

fn default_true() -> bool {
    true
}

fn default_base_path() -> String {
    "/assets".to_string()
}

fn default_extension() -> String {
    "glb".to_string()
}

fn default_building_with() -> String {
    "Mezzanine_new_estate_huge.glb".to_string()
}

fn default_building_without() -> String {
    "Without_Mezzanine_final.glb".to_string()
}

fn default_unit_min() -> u32 {
    1
}

fn default_unit_max() -> u32 {
    67
}

fn default_highlight_unit_max() -> u32 {
    69
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay_ms() -> f64 {
    500.0
}

fn default_initial_delay_ms() -> f64 {
    100.0
}

fn default_failure_message() -> String {
    "Failed to load model after multiple attempts. Please try a different unit or variant."
        .to_string()
}

fn default_yaw_overrides() -> Vec<YawOverride> {
    vec![
        YawOverride { first: 9, last: 16, yaw: PI },
        YawOverride { first: 27, last: 27, yaw: PI },
        YawOverride { first: 28, last: 36, yaw: PI * 2.0 },
        YawOverride { first: 46, last: 46, yaw: PI },
        YawOverride { first: 47, last: 54, yaw: PI * 2.0 },
    ]
}

fn default_reset_duration_ms() -> f64 {
    1000.0
}

fn default_small_model_diagonal() -> f32 {
    5.0
}

fn default_medium_model_diagonal() -> f32 {
    10.0
}

fn default_retarget_probability() -> f64 {
    0.02
}

fn default_fov_degrees() -> f32 {
    55.0
}

fn default_near() -> f32 {
    0.1
}

fn default_far() -> f32 {
    1000.0
}

fn default_min_distance() -> f32 {
    0.5
}

fn default_max_distance() -> f32 {
    20.0
}

fn default_max_polar() -> f32 {
    PI / 2.2
}

fn default_rotate_speed() -> f32 {
    0.7
}

fn default_pan_speed() -> f32 {
    1.8
}

fn default_zoom_speed() -> f32 {
    1.8
}

fn default_damping() -> f32 {
    0.05
}

fn default_resize_debounce_ms() -> f64 {
    100.0
}

fn default_exclusions() -> Vec<String> {
    vec!["Cars".to_string(), "human".to_string(), "Site".to_string()]
}

fn default_hover_debounce_ms() -> f64 {
    100.0
}

fn default_auto_rotate_debounce_ms() -> f64 {
    200.0
}

fn default_click_max_duration_ms() -> f64 {
    200.0
}

fn default_click_max_ndc_distance() -> f32 {
    0.05
}

fn default_click_debounce_ms() -> f64 {
    300.0
}

fn default_highlight_color() -> u32 {
    0xFFD600
}

fn default_highlight_emissive() -> u32 {
    0xFFC107
}

fn default_emissive_strength() -> f32 {
    0.35
}

fn default_highlight_opacity() -> f32 {
    0.45
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = ViewerConfig::from_toml("").unwrap();
        assert_eq!(config.assets.base_path, "/assets");
        assert_eq!(config.assets.max_retries, 2);
        assert_eq!(config.unit.target_diagonal, 15.0);
        assert!(config.building.hit_testing);
        assert!(!config.unit.hit_testing);
        assert_eq!(config.highlight.exclusions, vec!["Cars", "human", "Site"]);
    }

    #[test]
    fn test_partial_override() {
        let toml = r#"
            [assets]
            base_path = "/cdn/models"
            max_retries = 4

            [highlight]
            hover_debounce_ms = 50.0
        "#;
        let config = ViewerConfig::from_toml(toml).unwrap();
        assert_eq!(config.assets.base_path, "/cdn/models");
        assert_eq!(config.assets.max_retries, 4);
        assert_eq!(config.assets.unit_max, 67);
        assert_eq!(config.highlight.hover_debounce_ms, 50.0);
        assert_eq!(config.highlight.click_debounce_ms, 300.0);
    }

    #[test]
    fn test_mode_section_with_tagged_enums() {
        let toml = r#"
            [unit]
            target_diagonal = 10.0
            auto_rotate_speed = 0.0002
            switch_throttle_ms = 250.0
            hit_testing = true

            [unit.intro]
            kind = "dolly"
            start_height = 1.0
            start_distance = 2.0
            end_height = 0.5
            end_distance = 1.5
            duration_ms = 800.0

            [unit.stage]
            light_offset = [1.0, 1.0, 1.0]
            min_shadow_extent = 3.0
            ground = { kind = "fixed", size = 50.0, y = 0.0 }

            [unit.constraints]
            retarget = false
            floor = { kind = "fixed", small = 1.0, large = -2.0 }
        "#;
        let config = ViewerConfig::from_toml(toml).unwrap();
        assert!(matches!(config.unit.intro, IntroProfile::Dolly { .. }));
        assert_eq!(config.unit.intro.duration_ms(), 800.0);
        assert!(!config.unit.constraints.retarget);
        assert!(config.unit.constraints.pan_clamp);
        assert_eq!(
            config.unit.constraints.floor,
            FloorRule::Fixed { small: 1.0, large: -2.0 }
        );
        // Untouched mode keeps its stock settings
        assert_eq!(config.building.switch_throttle_ms, 800.0);
    }

    #[test]
    fn test_yaw_overrides() {
        let assets = AssetConfig::default();
        assert_eq!(assets.yaw_for_unit(5), 0.0);
        assert_eq!(assets.yaw_for_unit(9), PI);
        assert_eq!(assets.yaw_for_unit(16), PI);
        assert_eq!(assets.yaw_for_unit(27), PI);
        assert_eq!(assets.yaw_for_unit(30), PI * 2.0);
        assert_eq!(assets.yaw_for_unit(46), PI);
        assert_eq!(assets.yaw_for_unit(55), 0.0);
    }

    #[test]
    fn test_validation_rejects_bad_default_unit() {
        let toml = r#"
            [assets]
            default_unit = 80
        "#;
        assert!(matches!(
            ViewerConfig::from_toml(toml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = ViewerConfig::load(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.controls.fov_degrees, 55.0);
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("atrium.toml");
        std::fs::write(&path, "[controls]\nfov_degrees = 40.0\n").unwrap();
        let config = ViewerConfig::load(&path).unwrap();
        assert_eq!(config.controls.fov_degrees, 40.0);
        assert_eq!(config.controls.max_distance, 20.0);
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.toml");
        std::fs::write(&path, "[controls\n").unwrap();
        assert!(matches!(
            ViewerConfig::load(&path),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_rgb_channels() {
        let [r, g, b] = rgb_channels(0xFFD600);
        assert_eq!(r, 1.0);
        assert!((g - 214.0 / 255.0).abs() < 1e-6);
        assert_eq!(b, 0.0);
    }
}
