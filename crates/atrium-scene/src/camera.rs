//! Main camera and viewport tracking

use atrium_core::timing::Debouncer;
use atrium_core::CameraPose;
use bevy::prelude::*;
use bevy::window::{PrimaryWindow, WindowResized};
use tracing::debug;

use crate::types::{now_ms, ViewerSettings};

/// Marker component for the main camera
#[derive(Component)]
pub struct MainCamera;

/// Viewport size used for pointer rays and pan scaling
///
/// Resize bursts are coalesced; `size` changes once the window has been
/// quiet for the configured debounce period.
#[derive(Debug, Resource)]
pub struct Viewport {
    pub size: Vec2,
    resize: Debouncer<Vec2>,
}

impl Viewport {
    pub fn new(size: Vec2, debounce_ms: f64) -> Self {
        Self {
            size,
            resize: Debouncer::new(debounce_ms),
        }
    }
}

/// Plugin for the camera and viewport
pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_camera)
            .add_systems(Update, track_viewport);
    }
}

fn spawn_camera(
    mut commands: Commands,
    settings: Res<ViewerSettings>,
    windows: Query<&Window, With<PrimaryWindow>>,
) {
    let controls = &settings.0.controls;
    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            fov: controls.fov_degrees.to_radians(),
            near: controls.near,
            far: controls.far,
            ..default()
        }),
        Transform::from_xyz(0.0, 10.0, 30.0).looking_at(Vec3::ZERO, Vec3::Y),
        MainCamera,
    ));

    let size = windows
        .single()
        .map(|w| Vec2::new(w.width(), w.height()))
        .unwrap_or(Vec2::ZERO);
    commands.insert_resource(Viewport::new(size, controls.resize_debounce_ms));
}

fn track_viewport(
    time: Res<Time>,
    mut resized: MessageReader<WindowResized>,
    mut viewport: ResMut<Viewport>,
) {
    let now = now_ms(&time);
    for event in resized.read() {
        viewport.resize.push(Vec2::new(event.width, event.height), now);
    }
    if let Some(size) = viewport.resize.poll(now) {
        debug!(width = size.x, height = size.y, "Viewport resized");
        viewport.size = size;
    }
}

/// Camera transform for an orbit pose, y up
pub fn pose_transform(pose: &CameraPose) -> Transform {
    Transform::from_translation(pose.position).looking_at(pose.target, Vec3::Y)
}
