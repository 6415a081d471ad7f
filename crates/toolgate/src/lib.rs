//! toolgate server assembly.
//!
//! Wires the provider registry, the JSON-RPC endpoint and the OAuth flow
//! into one axum router.

pub mod app;
pub mod config;

pub use app::{build_router, serve, StartupError};
pub use config::{AppConfig, Cli};
