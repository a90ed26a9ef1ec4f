//! Lights and ground plane, re-fitted whenever a model is placed

use atrium_core::StageLayout;
use bevy::light::CascadeShadowConfigBuilder;
use bevy::prelude::*;

/// Marker for the ground plane receiving the model's shadow
#[derive(Component)]
pub struct StageGround;

/// Marker for the shadow-casting key light
#[derive(Component)]
pub struct KeyLight;

/// A model was placed; the stage follows its bounds
#[derive(Message, Debug, Clone, Copy)]
pub struct StageChanged(pub StageLayout);

pub struct StagePlugin;

impl Plugin for StagePlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<StageChanged>()
            .add_systems(Startup, setup_stage)
            .add_systems(Update, apply_stage_layout);
    }
}

fn setup_stage(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    // Key light, re-aimed at each model
    commands.spawn((
        DirectionalLight {
            illuminance: 6000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(15.0, 20.0, 15.0).looking_at(Vec3::ZERO, Vec3::Y),
        KeyLight,
    ));

    // Shadowless fill from the opposite side in place of ambient light
    commands.spawn((
        DirectionalLight {
            illuminance: 2500.0,
            shadows_enabled: false,
            color: Color::srgb(0.9, 0.95, 1.0),
            ..default()
        },
        Transform::from_xyz(-10.0, 8.0, -12.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    // Unit-sized plane scaled to the layout; hidden until the first model
    commands.spawn((
        Mesh3d(meshes.add(Plane3d::default().mesh().size(1.0, 1.0))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.86, 0.86, 0.84),
            perceptual_roughness: 1.0,
            ..default()
        })),
        Transform::default(),
        Visibility::Hidden,
        StageGround,
    ));
}

fn apply_stage_layout(
    mut commands: Commands,
    mut changes: MessageReader<StageChanged>,
    mut ground: Query<(&mut Transform, &mut Visibility), (With<StageGround>, Without<KeyLight>)>,
    mut light: Query<(Entity, &mut Transform), (With<KeyLight>, Without<StageGround>)>,
) {
    let Some(StageChanged(layout)) = changes.read().last().copied() else {
        return;
    };

    if let Ok((mut transform, mut visibility)) = ground.single_mut() {
        *transform = Transform::from_xyz(0.0, layout.ground.y, 0.0)
            .with_scale(Vec3::new(layout.ground.size, 1.0, layout.ground.size));
        *visibility = Visibility::Inherited;
    }

    if let Ok((entity, mut transform)) = light.single_mut() {
        *transform = Transform::from_translation(layout.light.position).looking_at(layout.light.target, Vec3::Y);
        let extent = layout.light.shadow_extent;
        commands.entity(entity).insert(
            CascadeShadowConfigBuilder {
                first_cascade_far_bound: extent,
                maximum_distance: extent * 4.0,
                ..default()
            }
            .build(),
        );
    }
}
