//! Pointer input, mesh ray casting and unit highlight overlays
//!
//! Binds the engine-free hit testing of `atrium-core` to the Bevy world:
//! rays go through `MeshRayCast`, overlays are child entities sharing one
//! translucent material, and the per-frame session tick drives the camera.

use atrium_core::{
    rgb_channels, ControlInput, FrameInput, OverlayHost, PointerFrame, Ray, RayHit, RayScope, Raycaster, UnitId,
};
use bevy::ecs::system::SystemParam;
use bevy::input::mouse::{MouseMotion, MouseScrollUnit, MouseWheel};
use bevy::prelude::*;
use bevy::window::{CursorMoved, PrimaryWindow};
use bevy_picking::mesh_picking::ray_cast::{MeshRayCast, MeshRayCastSettings};

use crate::camera::{pose_transform, MainCamera, Viewport};
use crate::types::{now_ms, NavigateRequested, ResetRequested, ViewerSession, ViewerSettings};

/// Pixels per wheel notch for pixel-precise scrolling (touchpads)
const PIXELS_PER_NOTCH: f32 = 100.0;

/// Primitive registered to a unit of the displayed model
#[derive(Component, Debug, Clone, Copy)]
pub struct UnitPrimitive {
    pub unit: UnitId,
}

/// Transient highlight duplicate of a unit primitive
#[derive(Component)]
pub struct HighlightOverlay;

/// Shared material of every highlight overlay
#[derive(Resource, Clone)]
pub struct HighlightMaterial(pub Handle<StandardMaterial>);

pub struct HighlightPlugin;

impl Plugin for HighlightPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_highlight_material)
            .add_systems(Update, (handle_reset_requests, tick_session).chain());
    }
}

fn setup_highlight_material(
    mut commands: Commands,
    settings: Res<ViewerSettings>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let highlight = &settings.0.highlight;
    let [r, g, b] = rgb_channels(highlight.color);
    let [er, eg, eb] = rgb_channels(highlight.emissive);
    let emissive = Color::srgb(er, eg, eb).to_linear();
    let strength = highlight.emissive_strength;

    let material = materials.add(StandardMaterial {
        base_color: Color::srgba(r, g, b, highlight.opacity),
        emissive: LinearRgba::rgb(emissive.red * strength, emissive.green * strength, emissive.blue * strength),
        alpha_mode: AlphaMode::Blend,
        // Pulls the overlay towards the camera so it wins against its original
        depth_bias: 10.0,
        ..default()
    });
    commands.insert_resource(HighlightMaterial(material));
}

/// Nearest-hit ray casting over the live meshes
#[derive(SystemParam)]
pub struct SceneRays<'w, 's> {
    ray_cast: MeshRayCast<'w, 's>,
    units: Query<'w, 's, (), With<UnitPrimitive>>,
    overlays: Query<'w, 's, (), With<HighlightOverlay>>,
}

impl Raycaster<Entity> for SceneRays<'_, '_> {
    fn cast(&mut self, ray: &Ray, scope: RayScope) -> Option<RayHit<Entity>> {
        let direction = Dir3::new(ray.dir).ok()?;
        let units = &self.units;
        let overlays = &self.overlays;
        let filter = |entity: Entity| match scope {
            RayScope::Units => units.contains(entity),
            RayScope::Scene => !overlays.contains(entity),
        };
        let settings = MeshRayCastSettings::default().with_filter(&filter);
        self.ray_cast
            .cast_ray(Ray3d::new(ray.origin, direction), &settings)
            .first()
            .map(|(entity, hit)| RayHit {
                primitive: *entity,
                distance: hit.distance,
            })
    }
}

/// Spawns overlays as children of the primitive they cover
pub struct OverlayCommands<'a, 'w, 's> {
    pub commands: &'a mut Commands<'w, 's>,
    pub material: Handle<StandardMaterial>,
}

impl OverlayHost<Entity> for OverlayCommands<'_, '_, '_> {
    type Overlay = Entity;

    fn spawn_overlay(&mut self, primitive: &Entity) -> Option<Entity> {
        let primitive = *primitive;
        let overlay = self
            .commands
            .spawn((
                HighlightOverlay,
                MeshMaterial3d(self.material.clone()),
                Transform::IDENTITY,
                ChildOf(primitive),
            ))
            .id();
        // The mesh is shared with the original, never copied
        self.commands.queue(move |world: &mut World| {
            let Some(mesh) = world.get::<Mesh3d>(primitive).cloned() else {
                return;
            };
            if let Ok(mut entity) = world.get_entity_mut(overlay) {
                entity.insert(mesh);
            }
        });
        Some(overlay)
    }

    fn despawn_overlay(&mut self, overlay: Entity) {
        self.commands.entity(overlay).try_despawn();
    }
}

/// Mouse, wheel and touch state for one frame
#[derive(SystemParam)]
pub struct PointerInput<'w, 's> {
    windows: Query<'w, 's, &'static Window, With<PrimaryWindow>>,
    buttons: Res<'w, ButtonInput<MouseButton>>,
    touches: Res<'w, Touches>,
    motion: MessageReader<'w, 's, MouseMotion>,
    wheel: MessageReader<'w, 's, MouseWheel>,
    cursor_moved: MessageReader<'w, 's, CursorMoved>,
}

impl PointerInput<'_, '_> {
    fn window_size(&self) -> Option<Vec2> {
        let window = self.windows.single().ok()?;
        Some(Vec2::new(window.width(), window.height()))
    }

    /// Drain this frame's messages into the core's input structs
    fn collect(&mut self) -> (PointerFrame, ControlInput) {
        let motion: Vec2 = self.motion.read().map(|m| m.delta).sum();
        let zoom: f32 = self
            .wheel
            .read()
            .map(|w| match w.unit {
                MouseScrollUnit::Line => w.y,
                MouseScrollUnit::Pixel => w.y / PIXELS_PER_NOTCH,
            })
            .sum();
        let mut moved = self.cursor_moved.read().count() > 0;

        let mut controls = ControlInput {
            zoom,
            ..default()
        };
        if self.buttons.pressed(MouseButton::Left) {
            controls.rotate = motion;
        } else if self.buttons.pressed(MouseButton::Right) || self.buttons.pressed(MouseButton::Middle) {
            controls.pan = motion;
        }

        let touches: Vec<_> = self.touches.iter().collect();
        match touches.as_slice() {
            [one] => {
                controls.rotate += one.delta();
                moved |= one.delta() != Vec2::ZERO;
            }
            [a, b] => {
                let current = a.position().distance(b.position());
                let previous = (a.position() - a.delta()).distance(b.position() - b.delta());
                if previous > 0.0 && current != previous {
                    controls.pinch = Some(current / previous);
                }
                controls.pan += (a.delta() + b.delta()) * 0.5;
            }
            _ => {}
        }

        let down = self.buttons.just_pressed(MouseButton::Left) || self.touches.any_just_pressed();
        let up = self.buttons.just_released(MouseButton::Left) || self.touches.any_just_released();
        controls.started = down
            || self.buttons.just_pressed(MouseButton::Right)
            || self.buttons.just_pressed(MouseButton::Middle)
            || zoom != 0.0;

        let position = self
            .windows
            .single()
            .ok()
            .and_then(|w| w.cursor_position())
            .or_else(|| touches.first().map(|t| t.position()));
        let ndc = position.zip(self.window_size()).and_then(|(p, size)| to_ndc(p, size));

        let pointer = PointerFrame { ndc, moved, down, up };
        (pointer, controls)
    }
}

/// Logical window coordinates (origin top-left) to normalized device coordinates
pub fn to_ndc(position: Vec2, size: Vec2) -> Option<Vec2> {
    if size.x <= 0.0 || size.y <= 0.0 {
        return None;
    }
    Some(Vec2::new(
        position.x / size.x * 2.0 - 1.0,
        1.0 - position.y / size.y * 2.0,
    ))
}

fn handle_reset_requests(
    time: Res<Time>,
    mut requests: MessageReader<ResetRequested>,
    mut session: ResMut<ViewerSession>,
) {
    if requests.read().count() > 0 {
        session.model.request_reset(now_ms(&time));
    }
}

fn tick_session(
    mut commands: Commands,
    time: Res<Time>,
    mut session: ResMut<ViewerSession>,
    viewport: Res<Viewport>,
    highlight: Res<HighlightMaterial>,
    mut input: PointerInput,
    mut rays: SceneRays,
    mut camera: Query<&mut Transform, With<MainCamera>>,
    mut navigate: MessageWriter<NavigateRequested>,
) {
    let (pointer, controls) = input.collect();
    if !session.is_active() || !session.model.has_model() {
        return;
    }

    let size = if viewport.size.min_element() > 0.0 {
        viewport.size
    } else {
        input.window_size().unwrap_or(Vec2::ONE)
    };
    let frame = FrameInput {
        now_ms: now_ms(&time),
        dt: time.delta_secs(),
        pointer,
        controls,
        viewport: size,
    };

    let mut host = OverlayCommands {
        commands: &mut commands,
        material: highlight.0.clone(),
    };
    let Some(output) = session.model.tick(&frame, &mut rays, &mut host) else {
        return;
    };

    if let Ok(mut transform) = camera.single_mut() {
        *transform = pose_transform(&output.pose);
    }
    if let Some(intent) = output.navigate {
        navigate.write(NavigateRequested(intent));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_ndc_corners_and_center() {
        let size = Vec2::new(800.0, 600.0);
        assert_eq!(to_ndc(Vec2::new(400.0, 300.0), size), Some(Vec2::ZERO));
        assert_eq!(to_ndc(Vec2::ZERO, size), Some(Vec2::new(-1.0, 1.0)));
        assert_eq!(to_ndc(size, size), Some(Vec2::new(1.0, -1.0)));
    }

    #[test]
    fn test_to_ndc_rejects_empty_viewport() {
        assert_eq!(to_ndc(Vec2::new(1.0, 1.0), Vec2::new(0.0, 600.0)), None);
    }
}
