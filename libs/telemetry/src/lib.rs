//! Logging setup shared by the SSO engine binaries: an env-filtered
//! `tracing` subscriber with text or JSON output and optional OTLP span export.

mod config;
mod tracing_init;

use anyhow::Result;

pub use config::{TelemetryConfig, TelemetryProtocol};
pub use tracing_init::init_tracing;

/// Installs the subscriber configured from the environment (`RUST_LOG`,
/// `LOG_FORMAT`, `ENABLE_OTEL`, `OTEL_EXPORTER_OTLP_*`).
pub fn install(service_name: &str, service_version: &str) -> Result<()> {
    init_tracing(&TelemetryConfig::from_env(service_name, service_version))
}
