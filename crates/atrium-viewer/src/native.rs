//! Desktop stand-in for the host page
//!
//! There is no router outside the browser, so a clicked unit is opened in
//! the same window and status changes go to the log.

use atrium_core::ModelRequest;
use atrium_scene::{ModelRequested, NavigateRequested, ViewerStatusChanged};
use bevy::prelude::*;

pub struct NativeHostPlugin;

impl Plugin for NativeHostPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, (follow_navigation, log_status));
    }
}

fn follow_navigation(mut intents: MessageReader<NavigateRequested>, mut models: MessageWriter<ModelRequested>) {
    for NavigateRequested(intent) in intents.read() {
        tracing::info!(route = %intent.route(), "Opening unit");
        models.write(ModelRequested(ModelRequest::Unit {
            unit: intent.unit,
            variant: intent.variant,
        }));
    }
}

fn log_status(mut changes: MessageReader<ViewerStatusChanged>) {
    for ViewerStatusChanged(status) in changes.read() {
        match &status.error {
            Some(error) => tracing::error!(%error, "Viewer error"),
            None if status.loading => tracing::debug!(progress = status.progress, "Loading"),
            None => tracing::debug!("Ready"),
        }
    }
}
