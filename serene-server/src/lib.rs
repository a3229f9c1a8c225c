//! `serene-server` exposes the Serene Space answer pipeline over HTTP.
//! Ingestion finishes before the listener binds, so a listening server is ready.

pub mod config;
pub mod server;
pub mod telemetry;

pub use config::ServerConfig;
pub use server::{AppState, app_router, build_state, run_server};
pub use telemetry::{LogFormat, init_telemetry};
