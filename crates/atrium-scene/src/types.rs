//! Resources and messages shared by the scene plugins

use atrium_core::{
    AssetLoadController, ModelRequest, ModelSession, ModelSwitchGate, NavigateIntent, ViewerConfig, ViewerMode,
    ViewerStatus,
};
use bevy::prelude::*;
use tracing::info;

/// Configuration the app was launched with
#[derive(Debug, Clone, Resource)]
pub struct ViewerSettings(pub ViewerConfig);

/// Model shown first, queued once at startup
#[derive(Debug, Clone, Copy, Resource)]
pub struct LaunchRequest(pub ModelRequest);

/// All mutable viewer state for one viewport
///
/// Overlay and primitive handles are plain entities, so dropping the
/// session never touches the world; [`crate::models::teardown_session`]
/// despawns what it owns first.
#[derive(Resource)]
pub struct ViewerSession {
    pub loader: AssetLoadController,
    pub gate: ModelSwitchGate,
    pub model: ModelSession<Entity, Entity>,
    /// Changes when the native binary follows a navigate intent
    pub mode: ViewerMode,
    active: bool,
}

impl ViewerSession {
    pub fn new(config: &ViewerConfig, mode: ViewerMode) -> Self {
        Self {
            loader: AssetLoadController::new(&config.assets),
            gate: ModelSwitchGate::new(config.mode(mode).switch_throttle_ms),
            model: ModelSession::new(config, mode),
            mode,
            active: true,
        }
    }

    /// Replace the per-mode parts; the loader keeps its generation counter
    pub fn switch_mode(&mut self, config: &ViewerConfig, mode: ViewerMode) {
        info!(from = ?self.mode, to = ?mode, "Switching viewer mode");
        self.gate = ModelSwitchGate::new(config.mode(mode).switch_throttle_ms);
        self.model = ModelSession::new(config, mode);
        self.mode = mode;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn deactivate(&mut self) {
        self.active = false;
    }
}

/// Host asks for a different model
#[derive(Message, Debug, Clone, Copy)]
pub struct ModelRequested(pub ModelRequest);

/// Host asks for the camera to return to its initial pose
#[derive(Message, Debug, Clone, Copy, Default)]
pub struct ResetRequested;

/// Host is closing the viewport
#[derive(Message, Debug, Clone, Copy, Default)]
pub struct CloseRequested;

/// Loading flag, progress or error changed
#[derive(Message, Debug, Clone, PartialEq)]
pub struct ViewerStatusChanged(pub ViewerStatus);

/// A unit was clicked
#[derive(Message, Debug, Clone, Copy)]
pub struct NavigateRequested(pub NavigateIntent);

/// Milliseconds since startup, the clock every core timer runs on
pub fn now_ms(time: &Time) -> f64 {
    time.elapsed_secs_f64() * 1000.0
}
