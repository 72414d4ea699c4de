//! Stepview Server - scene store, REST API and push client
//!
//! The `stepview` binary hosts the API and the built web viewer. The
//! [`client::ViewerClient`] pushes scene content from other Rust programs.

pub mod api;
pub mod client;
pub mod config;
pub mod demo;
pub mod server;
pub mod state;
