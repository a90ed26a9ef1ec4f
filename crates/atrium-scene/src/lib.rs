//! Atrium Scene - Bevy binding of the viewer core
//!
//! This crate wires the engine-independent controllers from `atrium-core`
//! into a live Bevy world: glTF loading through the `AssetServer`, camera
//! and stage entities, pointer input and mesh ray casting. The host app
//! inserts [`ViewerSettings`], [`LaunchRequest`] and a [`ViewerSession`],
//! then talks to the viewer through the messages in [`types`].

pub mod camera;
pub mod models;
pub mod picking;
pub mod stage;
pub mod types;

use bevy::prelude::*;

/// Plugin that sets up the viewer scene
pub struct AtriumScenePlugin;

impl Plugin for AtriumScenePlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<ModelRequested>()
            .add_message::<ResetRequested>()
            .add_message::<CloseRequested>()
            .add_message::<ViewerStatusChanged>()
            .add_message::<NavigateRequested>()
            .add_plugins(camera::CameraPlugin)
            .add_plugins(stage::StagePlugin)
            .add_plugins(picking::HighlightPlugin)
            .add_plugins(models::ModelsPlugin);
    }
}

// Re-export commonly used types
pub use types::*;
pub use camera::MainCamera;
