//! Tracing setup: log format selection and optional OpenTelemetry export

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "cascade=info";

/// Install the global subscriber
///
/// # Environment Variables
///
/// - `RUST_LOG`: filter directives (default: `cascade=info`)
/// - `CASCADE_LOG_FORMAT`: `json` for structured output, anything else for pretty
/// - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (e.g., http://localhost:4317)
/// - `OTEL_SERVICE_NAME`: service name (default: cascade-daemon)
///
/// The returned guard flushes buffered log lines when dropped.
pub fn init_tracing() -> Result<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))?;
    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(otel_layer()?);

    match std::env::var("CASCADE_LOG_FORMAT").as_deref() {
        Ok("json") => registry
            .with(fmt::layer().json().with_writer(writer))
            .try_init()?,
        _ => registry
            .with(fmt::layer().pretty().with_writer(writer))
            .try_init()?,
    }

    if let Ok(endpoint) = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        if cfg!(feature = "telemetry") {
            tracing::info!(endpoint = %endpoint, "OpenTelemetry export enabled");
        } else {
            tracing::warn!("OpenTelemetry endpoint set but feature 'telemetry' not enabled");
            tracing::warn!("Rebuild with: cargo build --features telemetry");
        }
    }

    Ok(guard)
}

#[cfg(not(feature = "telemetry"))]
fn otel_layer() -> Result<Option<tracing_subscriber::layer::Identity>> {
    Ok(None)
}

#[cfg(feature = "telemetry")]
fn otel_layer<S>(
) -> Result<Option<tracing_opentelemetry::OpenTelemetryLayer<S, opentelemetry_sdk::trace::Tracer>>>
where
    S: tracing::Subscriber + for<'span> tracing_subscriber::registry::LookupSpan<'span>,
{
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry_otlp::WithExportConfig;

    let Ok(endpoint) = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") else {
        return Ok(None);
    };
    let service_name =
        std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "cascade-daemon".to_string());

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;
    let provider = opentelemetry_sdk::trace::TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .build();
    let tracer = provider.tracer(service_name);
    opentelemetry::global::set_tracer_provider(provider);

    Ok(Some(tracing_opentelemetry::layer().with_tracer(tracer)))
}

/// Flush spans still buffered in the exporter
pub fn shutdown() {
    #[cfg(feature = "telemetry")]
    opentelemetry::global::shutdown_tracer_provider();
}
