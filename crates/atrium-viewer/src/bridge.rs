//! Host page bridge
//!
//! Status and navigation leave the viewer as `CustomEvent`s on `window`;
//! commands come back the same way. Event listeners run outside the Bevy
//! schedule, so they only push into a shared queue drained each frame.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use atrium_scene::{
    CloseRequested, LaunchRequest, ModelRequested, NavigateRequested, ResetRequested, ViewerSession,
    ViewerStatusChanged,
};
use bevy::prelude::*;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CustomEvent, CustomEventInit};

use crate::params::{HostCommand, LaunchParams};

pub const STATUS_EVENT: &str = "atrium:status";
pub const NAVIGATE_EVENT: &str = "atrium:navigate";
pub const COMMAND_EVENT: &str = "atrium:command";

/// Plugin for the page event bridge
pub struct HostBridgePlugin;

impl Plugin for HostBridgePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CommandQueue>()
            .add_systems(Startup, listen_for_commands)
            .add_systems(Update, (apply_host_commands, dispatch_status, dispatch_navigation));
    }
}

/// Commands received from the page, oldest first
#[derive(Resource, Default, Clone)]
pub struct CommandQueue(Arc<Mutex<VecDeque<String>>>);

/// Launch parameters from the page URL query
pub fn launch_params() -> LaunchParams {
    let Some(window) = web_sys::window() else {
        return LaunchParams::default();
    };
    let Ok(href) = window.location().href() else {
        return LaunchParams::default();
    };
    let Ok(url) = web_sys::Url::new(&href) else {
        return LaunchParams::default();
    };
    let query = url.search_params();
    let values: Vec<(&str, String)> = ["mode", "unit", "variant"]
        .into_iter()
        .filter_map(|key| query.get(key).map(|value| (key, value)))
        .collect();
    LaunchParams::from_pairs(values.iter().map(|(key, value)| (*key, value.as_str())))
}

fn listen_for_commands(queue: Res<CommandQueue>) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let queue = queue.0.clone();
    let listener = Closure::<dyn FnMut(CustomEvent)>::new(move |event: CustomEvent| {
        let Some(command) = event.detail().as_string() else {
            tracing::warn!("Ignoring {} without a string detail", COMMAND_EVENT);
            return;
        };
        if let Ok(mut queue) = queue.lock() {
            queue.push_back(command);
        }
    });
    if let Err(e) = window.add_event_listener_with_callback(COMMAND_EVENT, listener.as_ref().unchecked_ref()) {
        tracing::warn!("Failed to listen for host commands: {:?}", e);
        return;
    }
    // The listener lives as long as the page
    listener.forget();
}

fn apply_host_commands(
    queue: Res<CommandQueue>,
    launch: Res<LaunchRequest>,
    session: Res<ViewerSession>,
    mut models: MessageWriter<ModelRequested>,
    mut resets: MessageWriter<ResetRequested>,
    mut closes: MessageWriter<CloseRequested>,
) {
    let commands: Vec<String> = match queue.0.try_lock() {
        Ok(mut queue) => queue.drain(..).collect(),
        Err(_) => return,
    };
    for raw in commands {
        let command = match raw.parse::<HostCommand>() {
            Ok(command) => command,
            Err(e) => {
                tracing::warn!(command = %raw, "Ignoring host command: {}", e);
                continue;
            }
        };
        tracing::debug!(?command, "Host command");
        let current = session.gate.active().unwrap_or(launch.0);
        match command {
            HostCommand::Reset => {
                resets.write(ResetRequested);
            }
            HostCommand::Close => {
                closes.write(CloseRequested);
            }
            other => {
                if let Some(request) = other.model_request(current) {
                    models.write(ModelRequested(request));
                }
            }
        }
    }
}

fn dispatch_status(mut changes: MessageReader<ViewerStatusChanged>) {
    for ViewerStatusChanged(status) in changes.read() {
        match serde_json::to_string(status) {
            Ok(json) => dispatch(STATUS_EVENT, &json),
            Err(e) => tracing::warn!("Failed to encode status: {}", e),
        }
    }
}

fn dispatch_navigation(mut intents: MessageReader<NavigateRequested>) {
    for NavigateRequested(intent) in intents.read() {
        let detail = serde_json::json!({
            "variant": intent.variant,
            "unit": intent.unit,
            "route": intent.route(),
        });
        dispatch(NAVIGATE_EVENT, &detail.to_string());
    }
}

/// Fire `name` on `window` with the parsed JSON as its detail
fn dispatch(name: &str, json: &str) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let detail = js_sys::JSON::parse(json).unwrap_or_else(|_| JsValue::from_str(json));
    let init = CustomEventInit::new();
    init.set_detail(&detail);
    match CustomEvent::new_with_event_init_dict(name, &init) {
        Ok(event) => {
            if let Err(e) = window.dispatch_event(&event) {
                tracing::warn!("Failed to dispatch {}: {:?}", name, e);
            }
        }
        Err(e) => tracing::warn!("Failed to create {}: {:?}", name, e),
    }
}
