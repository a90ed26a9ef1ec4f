//! Bevy application setup

use atrium_core::{ModelRequest, ViewerConfig};
use atrium_scene::{AtriumScenePlugin, LaunchRequest, ViewerSession, ViewerSettings};
use bevy::prelude::*;

/// Run the viewer until its window closes
pub fn run(config: ViewerConfig, launch: ModelRequest) -> AppExit {
    tracing::info!(%launch, "Starting viewer");
    let session = ViewerSession::new(&config, launch.mode());

    let mut app = App::new();
    app.insert_resource(ClearColor(Color::srgb(0.93, 0.94, 0.96)))
        .add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "Atrium".to_string(),
                        canvas: Some("#viewer-canvas".to_string()),
                        fit_canvas_to_parent: true,
                        prevent_default_event_handling: false,
                        ..default()
                    }),
                    ..default()
                })
                .set(AssetPlugin {
                    // Model paths are site-absolute, served next to the page
                    file_path: "".to_string(),
                    // The asset host has no .meta files
                    meta_check: bevy::asset::AssetMetaCheck::Never,
                    ..default()
                }),
        )
        .insert_resource(ViewerSettings(config))
        .insert_resource(LaunchRequest(launch))
        .insert_resource(session)
        .add_plugins(AtriumScenePlugin);

    #[cfg(target_arch = "wasm32")]
    app.add_plugins(crate::bridge::HostBridgePlugin);
    #[cfg(not(target_arch = "wasm32"))]
    app.add_plugins(crate::native::NativeHostPlugin);

    app.run()
}
