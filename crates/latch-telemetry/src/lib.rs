//! Structured logging init, plus optional OpenTelemetry wiring for policy
//! decision counters (behind the `otel` feature).

#![deny(unsafe_code)]
#![warn(missing_docs)]

#[cfg(feature = "otel")]
pub mod policy_observer;

use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

/// Errors raised while wiring up telemetry backends.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The OpenTelemetry exporter pipeline failed to initialize.
    #[error("otel setup failed: {0}")]
    Otel(String),
}

/// Initialize structured JSON logging with an env filter. Honors
/// `RUST_LOG`, e.g. `"info,latch_server=debug"`; defaults to `"info"`.
pub fn init_json_logging() {
    let fmt_layer = fmt::layer().json().with_current_span(true).with_span_list(true);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = Registry::default().with(filter).with(fmt_layer);
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Initialize an OTLP trace exporter (behind the `otel` feature). Does not
/// install a tracing-subscriber layer; callers compose that separately.
///
/// # Errors
///
/// Returns an error if the exporter pipeline cannot be built.
#[cfg(feature = "otel")]
pub fn init_otel(service_name: &str) -> Result<(), TelemetryError> {
    use opentelemetry::KeyValue;
    use opentelemetry_sdk::trace as sdktrace;
    use opentelemetry_sdk::{runtime, Resource};

    let resource = Resource::new(vec![KeyValue::new("service.name", service_name.to_owned())]);
    let _tracer_provider = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(opentelemetry_otlp::new_exporter().http())
        .with_trace_config(sdktrace::config().with_resource(resource))
        .install_batch(runtime::Tokio)
        .map_err(|e| TelemetryError::Otel(e.to_string()))?;
    Ok(())
}
