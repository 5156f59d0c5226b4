use std::sync::OnceLock;

use anyhow::Result;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{KeyValue, global};
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::{Resource, propagation::TraceContextPropagator, trace::SdkTracerProvider};
use tracing::info;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::layer::Layer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{TelemetryConfig, TelemetryProtocol};

static INIT: OnceLock<()> = OnceLock::new();

/// Installs the global subscriber once; later calls are no-ops.
pub fn init_tracing(cfg: &TelemetryConfig) -> Result<()> {
    if INIT.get().is_some() {
        return Ok(());
    }

    let fmt_layer = if cfg.json_logs {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.default_filter));

    match cfg.otlp_endpoint.as_deref() {
        Some(endpoint) => {
            let exporter = build_span_exporter(endpoint, cfg.protocol)?;
            let provider = SdkTracerProvider::builder()
                .with_resource(build_resource(cfg))
                .with_batch_exporter(exporter)
                .build();
            let tracer = provider.tracer(cfg.service_name.clone());
            global::set_tracer_provider(provider);
            global::set_text_map_propagator(TraceContextPropagator::new());

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .with(OpenTelemetryLayer::new(tracer))
                .try_init()
                .ok();
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()
                .ok();
        }
    }

    INIT.set(()).ok();
    info!(
        service = %cfg.service_name,
        version = %cfg.service_version,
        otlp = cfg.exporter_enabled(),
        json = cfg.json_logs,
        "telemetry initialised"
    );
    Ok(())
}

fn build_span_exporter(endpoint: &str, protocol: TelemetryProtocol) -> Result<SpanExporter> {
    let exporter = match protocol {
        TelemetryProtocol::Grpc => SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .build()?,
        TelemetryProtocol::HttpProtobuf => SpanExporter::builder()
            .with_http()
            .with_endpoint(endpoint)
            .build()?,
    };
    Ok(exporter)
}

fn build_resource(cfg: &TelemetryConfig) -> Resource {
    Resource::builder_empty()
        .with_service_name(cfg.service_name.clone())
        .with_attributes([KeyValue::new("service.version", cfg.service_version.clone())])
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_without_exporter_is_a_no_op() {
        let config = TelemetryConfig::new("sso-reconciler", "0.1.0");
        init_tracing(&config).expect("first init");
        init_tracing(&config).expect("second init");
        assert!(INIT.get().is_some());
    }
}
