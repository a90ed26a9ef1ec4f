//! Model loading, placement and swap
//!
//! A request goes through the core `AssetLoadController`, which hands out
//! tickets once their delay has passed. Each ticket loads a glTF through the
//! `AssetServer`, spawns its scene hidden and, once the instance is ready,
//! measures it, registers its units, converts unlit materials and swaps it
//! in for the previous model. Results for superseded generations are
//! dropped together with their entities.

use atrium_core::{
    analyze, Aabb, LoadError, LoadOutcome, LoadTicket, MaterialKind, ModelRequest, PrimitiveInfo, SceneGeometry,
    SceneInventory, StageLayout, UnitNaming, LIT_CONVERSION,
};
use bevy::asset::{AssetLoadError, LoadState, RecursiveDependencyLoadState};
use bevy::ecs::system::SystemParam;
use bevy::gltf::Gltf;
use bevy::prelude::*;
use bevy::scene::SceneInstance;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::picking::{HighlightMaterial, OverlayCommands, UnitPrimitive};
use crate::stage::StageChanged;
use crate::types::{
    now_ms, CloseRequested, LaunchRequest, ModelRequested, ViewerSession, ViewerSettings, ViewerStatusChanged,
};

/// Root of the model currently on screen
#[derive(Component, Debug)]
pub struct ModelRoot {
    pub generation: u64,
}

/// Root of a model still being prepared, kept hidden
#[derive(Component, Debug)]
pub struct PendingModel {
    pub generation: u64,
}

/// The load currently being fetched or spawned
#[derive(Debug)]
struct PendingLoad {
    ticket: LoadTicket,
    gltf: Handle<Gltf>,
    root: Option<Entity>,
}

/// Entities and handles owned by the loader
#[derive(Resource, Default)]
pub struct ModelAssets {
    pending: Option<PendingLoad>,
    displayed: Option<Entity>,
}

impl ModelAssets {
    /// Drop the pending load, despawning its hidden scene if one exists
    fn discard_pending(&mut self, commands: &mut Commands) {
        if let Some(pending) = self.pending.take() {
            if let Some(root) = pending.root {
                commands.entity(root).try_despawn();
            }
            debug!(generation = pending.ticket.generation, "Pending model released");
        }
    }
}

pub struct ModelsPlugin;

impl Plugin for ModelsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ModelAssets>()
            .add_systems(Startup, queue_launch_request)
            .add_systems(
                Update,
                (
                    handle_model_requests,
                    start_due_loads,
                    poll_pending_load,
                    finalize_pending_model,
                    teardown_session,
                )
                    .chain(),
            );
    }
}

/// Map an engine load failure onto the controller's taxonomy
pub fn map_load_error(error: &AssetLoadError) -> LoadError {
    match error {
        AssetLoadError::AssetReaderError(e) => LoadError::Transport(e.to_string()),
        AssetLoadError::MissingAssetLoaderForExtension(e) => LoadError::Initialization(e.to_string()),
        other => LoadError::Decode(other.to_string()),
    }
}

/// Local bounding box of a mesh from its vertex positions
pub fn mesh_aabb(mesh: &Mesh) -> Option<Aabb> {
    let positions = mesh.attribute(Mesh::ATTRIBUTE_POSITION)?.as_float3()?;
    let aabb = Aabb::from_points(positions.iter().map(|p| Vec3::from_array(*p)));
    (!aabb.is_empty()).then_some(aabb)
}

fn publish_status(session: &ViewerSession, status: &mut MessageWriter<ViewerStatusChanged>) {
    status.write(ViewerStatusChanged(session.loader.status()));
}

fn queue_launch_request(
    time: Res<Time>,
    launch: Res<LaunchRequest>,
    mut session: ResMut<ViewerSession>,
    mut status: MessageWriter<ViewerStatusChanged>,
) {
    let request = launch.0;
    session.gate.set_active(request);
    if session.loader.request(request, now_ms(&time)).is_some() {
        publish_status(&session, &mut status);
    }
}

fn handle_model_requests(
    mut commands: Commands,
    time: Res<Time>,
    settings: Res<ViewerSettings>,
    highlight: Res<HighlightMaterial>,
    mut requests: MessageReader<ModelRequested>,
    mut session: ResMut<ViewerSession>,
    mut status: MessageWriter<ViewerStatusChanged>,
) {
    let now = now_ms(&time);
    for ModelRequested(request) in requests.read().copied() {
        if !session.is_active() {
            continue;
        }
        if request.mode() != session.mode {
            let mut host = OverlayCommands {
                commands: &mut commands,
                material: highlight.0.clone(),
            };
            session.model.teardown(&mut host);
            session.switch_mode(&settings.0, request.mode());
        }
        if !session.gate.admit(request, now) {
            continue;
        }
        if session.loader.request(request, now).is_some() {
            publish_status(&session, &mut status);
        }
    }
}

fn start_due_loads(
    mut commands: Commands,
    time: Res<Time>,
    asset_server: Res<AssetServer>,
    mut session: ResMut<ViewerSession>,
    mut assets: ResMut<ModelAssets>,
) {
    let Some(ticket) = session.loader.poll_due(now_ms(&time)) else {
        return;
    };
    assets.discard_pending(&mut commands);
    let gltf = asset_server.load::<Gltf>(ticket.path.trim_start_matches('/').to_string());
    assets.pending = Some(PendingLoad {
        ticket,
        gltf,
        root: None,
    });
}

/// Engine access needed to resolve a pending load
#[derive(SystemParam)]
struct LoadProgress<'w> {
    asset_server: Res<'w, AssetServer>,
    gltfs: Res<'w, Assets<Gltf>>,
}

impl LoadProgress<'_> {
    /// `Ok(Some)` once the glTF and everything it references has settled
    ///
    /// A failed dependency such as a missing texture is logged and the
    /// model is shown without it.
    fn scene(&self, handle: &Handle<Gltf>) -> Result<Option<Handle<Scene>>, LoadError> {
        let Some((state, _, recursive)) = self.asset_server.get_load_states(handle.id()) else {
            return Ok(None);
        };
        match state {
            LoadState::Failed(error) => return Err(map_load_error(&error)),
            LoadState::Loaded => {}
            _ => return Ok(None),
        }
        match recursive {
            RecursiveDependencyLoadState::Loaded => {}
            RecursiveDependencyLoadState::Failed(error) => {
                warn!(error = %error, "Model dependency failed to load");
            }
            _ => return Ok(None),
        }
        let gltf = self
            .gltfs
            .get(handle)
            .ok_or_else(|| LoadError::Decode("glTF asset missing after load".to_string()))?;
        gltf.default_scene
            .clone()
            .or_else(|| gltf.scenes.first().cloned())
            .map(Some)
            .ok_or_else(|| LoadError::Decode("model contains no scenes".to_string()))
    }
}

fn poll_pending_load(
    mut commands: Commands,
    time: Res<Time>,
    progress: LoadProgress,
    mut session: ResMut<ViewerSession>,
    mut assets: ResMut<ModelAssets>,
    mut status: MessageWriter<ViewerStatusChanged>,
) {
    let Some(pending) = assets.pending.as_ref() else {
        return;
    };
    let generation = pending.ticket.generation;
    if session.loader.in_flight().map(|t| t.generation) != Some(generation) {
        debug!(generation, "Dropping superseded load");
        assets.discard_pending(&mut commands);
        return;
    }
    if pending.root.is_some() {
        return;
    }
    let gltf = pending.gltf.clone();

    match progress.scene(&gltf) {
        Ok(None) => {}
        Ok(Some(scene)) => {
            let root = commands
                .spawn((
                    SceneRoot(scene),
                    Transform::default(),
                    Visibility::Hidden,
                    PendingModel { generation },
                ))
                .id();
            if let Some(pending) = assets.pending.as_mut() {
                pending.root = Some(root);
            }
        }
        Err(error) => {
            assets.discard_pending(&mut commands);
            let outcome = session.loader.on_failure(generation, error, now_ms(&time));
            if !matches!(outcome, LoadOutcome::Discarded(_)) {
                publish_status(&session, &mut status);
            }
        }
    }
}

/// Read access to a spawned scene's hierarchy
#[derive(SystemParam)]
struct SceneTree<'w, 's> {
    scene_spawner: Res<'w, SceneSpawner>,
    instances: Query<'w, 's, &'static SceneInstance>,
    children: Query<'w, 's, &'static Children>,
    nodes: Query<'w, 's, (&'static Transform, Option<&'static ChildOf>, Option<&'static Name>)>,
    primitives: Query<'w, 's, (&'static Mesh3d, Option<&'static MeshMaterial3d<StandardMaterial>>)>,
}

impl SceneTree<'_, '_> {
    fn is_ready(&self, root: Entity) -> bool {
        self.instances
            .get(root)
            .is_ok_and(|instance| self.scene_spawner.instance_is_ready(**instance))
    }

    /// Transform of `entity` relative to `root`, composed from local transforms
    ///
    /// Global transforms of a freshly spawned scene are not propagated yet.
    fn relative_matrix(&self, entity: Entity, root: Entity) -> Mat4 {
        let mut matrix = Mat4::IDENTITY;
        let mut current = entity;
        while current != root {
            let Ok((transform, parent, _)) = self.nodes.get(current) else {
                break;
            };
            let local = Mat4::from_scale_rotation_translation(transform.scale, transform.rotation, transform.translation);
            matrix = local * matrix;
            match parent {
                Some(parent) => current = parent.parent(),
                None => break,
            }
        }
        matrix
    }

    /// Own name first, then the parent node's
    fn names(&self, entity: Entity) -> Vec<String> {
        let Ok((_, parent, name)) = self.nodes.get(entity) else {
            return Vec::new();
        };
        let parent_name = parent
            .and_then(|p| self.nodes.get(p.parent()).ok())
            .and_then(|(_, _, name)| name);
        name.into_iter()
            .chain(parent_name)
            .map(|n| n.as_str().to_string())
            .collect()
    }
}

type Inventory = SceneInventory<Entity, AssetId<StandardMaterial>>;

/// First pass over a ready scene: geometry for the bounds, units and materials
fn survey(
    tree: &SceneTree,
    root: Entity,
    meshes: &Assets<Mesh>,
    materials: &Assets<StandardMaterial>,
    naming: &UnitNaming,
) -> (SceneGeometry, Inventory) {
    let mut geometry = SceneGeometry::default();
    let mut items = Vec::new();
    for entity in tree.children.iter_descendants(root) {
        let Ok((mesh, material)) = tree.primitives.get(entity) else {
            continue;
        };
        if let Some(local) = meshes.get(&mesh.0).and_then(mesh_aabb) {
            geometry.push(local, tree.relative_matrix(entity, root));
        }
        let material = material.and_then(|m| {
            let kind = if materials.get(&m.0)?.unlit {
                MaterialKind::Unlit
            } else {
                MaterialKind::Lit
            };
            Some((m.0.id(), kind))
        });
        items.push(PrimitiveInfo {
            primitive: entity,
            names: tree.names(entity),
            material,
        });
    }
    (geometry, SceneInventory::collect(items, naming))
}

#[allow(clippy::too_many_arguments)]
fn finalize_pending_model(
    mut commands: Commands,
    time: Res<Time>,
    settings: Res<ViewerSettings>,
    highlight: Res<HighlightMaterial>,
    tree: SceneTree,
    meshes: Res<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut session: ResMut<ViewerSession>,
    mut assets: ResMut<ModelAssets>,
    mut status: MessageWriter<ViewerStatusChanged>,
    mut stage: MessageWriter<StageChanged>,
) {
    let Some(root) = assets.pending.as_ref().and_then(|p| p.root) else {
        return;
    };
    if !tree.is_ready(root) {
        return;
    }
    let Some(pending) = assets.pending.take() else {
        return;
    };
    let now = now_ms(&time);
    let generation = pending.ticket.generation;
    let config = &settings.0;
    let mode = config.mode(session.mode).clone();

    let naming = UnitNaming::from_config(&config.highlight);
    let (geometry, inventory) = survey(&tree, root, &meshes, &materials, &naming);
    let yaw = match pending.ticket.request {
        ModelRequest::Unit { unit, .. } => config.assets.yaw_for_unit(unit),
        ModelRequest::Building { .. } => 0.0,
    };

    let analysis = match analyze(&geometry, mode.target_diagonal, yaw) {
        Ok(analysis) => analysis,
        Err(error) => {
            commands.entity(root).try_despawn();
            let outcome = session.loader.on_failure(generation, error, now);
            if !matches!(outcome, LoadOutcome::Discarded(_)) {
                publish_status(&session, &mut status);
            }
            return;
        }
    };

    let ticket = match session.loader.on_success(generation) {
        LoadOutcome::Apply(ticket) => ticket,
        _ => {
            commands.entity(root).try_despawn();
            return;
        }
    };

    // Second pass: materials are converted once, here, never per frame
    for id in &inventory.conversions {
        if let Some(material) = materials.get_mut(*id) {
            material.unlit = false;
            material.perceptual_roughness = LIT_CONVERSION.perceptual_roughness;
            material.metallic = LIT_CONVERSION.metallic;
        }
    }
    for unit in inventory.registry.units() {
        for primitive in inventory.registry.primitives(unit) {
            commands.entity(*primitive).insert(UnitPrimitive { unit });
        }
    }

    let placement = analysis.placement;
    commands.entity(root).remove::<PendingModel>().insert((
        Transform {
            translation: placement.translation,
            rotation: placement.rotation(),
            scale: Vec3::splat(placement.scale),
        },
        Visibility::Inherited,
        ModelRoot { generation },
    ));

    let layout = StageLayout::new(&analysis.bounds, &mode.stage);
    stage.write(StageChanged(layout));

    let units = inventory.registry.units().count();
    let mut host = OverlayCommands {
        commands: &mut commands,
        material: highlight.0.clone(),
    };
    session.model.begin_model(
        &analysis.bounds,
        &layout,
        inventory.registry,
        ticket.request.variant(),
        now,
        StdRng::from_entropy(),
        &mut host,
    );

    if let Some(previous) = assets.displayed.replace(root) {
        commands.entity(previous).try_despawn();
    }
    info!(
        generation,
        path = %ticket.path,
        units,
        primitives = inventory.primitive_count,
        converted = inventory.conversions.len(),
        scale = placement.scale,
        "Model placed"
    );
    publish_status(&session, &mut status);
}

/// Host close or app exit: stop timers, release the model and overlays
fn teardown_session(
    mut commands: Commands,
    mut close: MessageReader<CloseRequested>,
    mut exit: MessageReader<AppExit>,
    highlight: Res<HighlightMaterial>,
    mut session: ResMut<ViewerSession>,
    mut assets: ResMut<ModelAssets>,
    mut status: MessageWriter<ViewerStatusChanged>,
) {
    let closing = close.read().count() > 0;
    let exiting = exit.read().count() > 0;
    if !(closing || exiting) || !session.is_active() {
        return;
    }

    session.loader.teardown();
    let mut host = OverlayCommands {
        commands: &mut commands,
        material: highlight.0.clone(),
    };
    session.model.teardown(&mut host);
    assets.discard_pending(&mut commands);
    if let Some(root) = assets.displayed.take() {
        commands.entity(root).try_despawn();
    }
    session.deactivate();
    if closing {
        publish_status(&session, &mut status);
    }
    info!(exiting, "Viewer session closed");
}
