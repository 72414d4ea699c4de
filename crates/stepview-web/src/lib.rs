//! Stepview Web - WebGPU-powered 3D scene viewer
//!
//! This crate provides the browser-based viewer using Bevy and WebGPU. It
//! polls the scene server, reconciles each snapshot into Bevy entities and
//! exposes visibility and step controls through egui.

pub mod app;
pub mod network;
pub mod scene;
pub mod surface;
pub mod ui;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Entry point for WASM module
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn main() {
    // Set panic hook for better error messages
    console_error_panic_hook::set_once();

    // Initialize logging with filtering to reduce wgpu noise
    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(tracing::Level::WARN)
            .build(),
    );

    app::run(network::ViewerConfig::from_browser());
}
