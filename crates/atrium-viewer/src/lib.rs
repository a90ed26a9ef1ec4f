//! Atrium Viewer - Interactive building and unit viewer
//!
//! Runs in the browser as a wasm module driven by the host page, or on the
//! desktop through the `atrium` binary.

pub mod app;
pub mod params;

#[cfg(target_arch = "wasm32")]
mod bridge;
#[cfg(not(target_arch = "wasm32"))]
mod native;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// WASM entry point
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn main() {
    // Set up panic hook for better error messages
    console_error_panic_hook::set_once();

    // Initialize logging with filtering to reduce noise
    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(tracing::Level::WARN)
            .build(),
    );

    // No filesystem in the browser; the page only picks the model
    let config = atrium_core::ViewerConfig::default();
    let launch = bridge::launch_params().request(config.assets.default_unit);
    app::run(config, launch);
}
