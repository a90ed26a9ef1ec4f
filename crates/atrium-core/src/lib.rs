//! Atrium Core - Viewport interaction and asset-loading controller
//!
//! Engine-independent logic for the Atrium building viewer:
//! - Asset path convention, load retry/fallback and generation tracking
//! - Bounds analysis and stage layout for a loaded model
//! - Camera orbit with intro, auto-rotate, damped controls and reset
//! - Pan/zoom constraints and adaptive control sensitivity
//! - Unit naming, hover highlighting and click-to-navigate

pub mod asset_path;
pub mod bounds;
pub mod config;
pub mod constraints;
pub mod error;
pub mod highlight;
pub mod inventory;
pub mod loader;
pub mod orbit;
pub mod ray;
pub mod session;
pub mod stage;
pub mod timing;
pub mod units;

pub use asset_path::{AssetCatalog, ModelRequest, Variant, ViewerMode};
pub use bounds::{analyze, Aabb, Analysis, Bounds, Placement, SceneGeometry, Sphere};
pub use config::{rgb_channels, ViewerConfig};
pub use constraints::{ConstraintEngine, Sensitivity, SensitivityBand};
pub use error::{ConfigError, LoadError};
pub use highlight::{
    ClickOutcome, HitTestHighlighter, HoverChange, NavigateIntent, OverlayHost, RayHit, RayScope, Raycaster,
};
pub use inventory::{MaterialKind, PrimitiveInfo, SceneInventory, LIT_CONVERSION};
pub use loader::{
    AssetLoadController, Generation, LoadAttempt, LoadOutcome, LoadPhase, LoadTicket, ModelSwitchGate, ViewerStatus,
};
pub use orbit::{ControlInput, ControlSettings, OrbitController, OrbitMode};
pub use ray::{CameraPose, Ray};
pub use session::{FrameInput, FrameOutput, ModelSession, PointerFrame};
pub use stage::StageLayout;
pub use timing::Debouncer;
pub use units::{UnitId, UnitNaming, UnitRegistry};
