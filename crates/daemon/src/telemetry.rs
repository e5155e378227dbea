//! OpenTelemetry export for worker traces

use anyhow::Result;
use tracing_subscriber::{Layer, Registry};

pub const DEFAULT_SERVICE_NAME: &str = "dynaq-worker";

/// Layer added to the subscriber chain when trace export is on
pub type TelemetryLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Outcome of the exporter setup, logged once the subscriber is installed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryStatus {
    Disabled,
    Enabled {
        endpoint: String,
        service_name: String,
    },
    FeatureMissing {
        endpoint: String,
    },
    Failed(String),
}

impl TelemetryStatus {
    pub fn log(&self) {
        match self {
            TelemetryStatus::Disabled => {
                tracing::debug!("OTEL_EXPORTER_OTLP_ENDPOINT not set, trace export disabled");
            }
            TelemetryStatus::Enabled {
                endpoint,
                service_name,
            } => {
                tracing::info!(
                    service_name = %service_name,
                    endpoint = %endpoint,
                    "OpenTelemetry export enabled"
                );
            }
            TelemetryStatus::FeatureMissing { endpoint } => {
                tracing::warn!(
                    endpoint = %endpoint,
                    "Trace export requested but the 'telemetry' feature is disabled"
                );
            }
            TelemetryStatus::Failed(error) => {
                tracing::warn!(
                    error = %error,
                    "Failed to initialize OpenTelemetry (continuing without it)"
                );
            }
        }
    }
}

/// Build the OTLP layer from `OTEL_EXPORTER_OTLP_ENDPOINT` / `OTEL_SERVICE_NAME`
///
/// Runs before logging is installed, so nothing is logged here; the caller
/// logs the returned status afterwards.
pub fn init_telemetry() -> (Option<TelemetryLayer>, TelemetryStatus) {
    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok();
    let service_name = std::env::var("OTEL_SERVICE_NAME").ok();
    match telemetry_layer(endpoint, service_name) {
        Ok(result) => result,
        Err(e) => (None, TelemetryStatus::Failed(e.to_string())),
    }
}

fn telemetry_layer(
    endpoint: Option<String>,
    service_name: Option<String>,
) -> Result<(Option<TelemetryLayer>, TelemetryStatus)> {
    let endpoint = match endpoint.filter(|e| !e.trim().is_empty()) {
        Some(endpoint) => endpoint,
        None => return Ok((None, TelemetryStatus::Disabled)),
    };
    let service_name = service_name.unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string());

    #[cfg(feature = "telemetry")]
    {
        let layer = otlp_layer(&endpoint, &service_name)?;
        Ok((
            Some(layer),
            TelemetryStatus::Enabled {
                endpoint,
                service_name,
            },
        ))
    }

    #[cfg(not(feature = "telemetry"))]
    {
        let _ = service_name;
        Ok((None, TelemetryStatus::FeatureMissing { endpoint }))
    }
}

#[cfg(feature = "telemetry")]
fn otlp_layer(endpoint: &str, service_name: &str) -> Result<TelemetryLayer> {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::trace::TracerProvider;
    use opentelemetry_sdk::Resource;

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .with_resource(Resource::new(vec![KeyValue::new(
            "service.name",
            service_name.to_string(),
        )]))
        .build();
    let tracer = provider.tracer(service_name.to_string());
    opentelemetry::global::set_tracer_provider(provider);

    Ok(Box::new(tracing_opentelemetry::layer().with_tracer(tracer)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::{fmt, EnvFilter};

    #[test]
    fn test_no_endpoint_disables_export() {
        let (layer, status) = telemetry_layer(None, None).unwrap();
        assert!(layer.is_none());
        assert_eq!(status, TelemetryStatus::Disabled);

        let (layer, status) = telemetry_layer(Some("  ".to_string()), None).unwrap();
        assert!(layer.is_none());
        assert_eq!(status, TelemetryStatus::Disabled);
    }

    #[cfg(not(feature = "telemetry"))]
    #[test]
    fn test_endpoint_without_feature_is_reported() {
        let (layer, status) =
            telemetry_layer(Some("http://localhost:4317".to_string()), None).unwrap();
        assert!(layer.is_none());
        assert_eq!(
            status,
            TelemetryStatus::FeatureMissing {
                endpoint: "http://localhost:4317".to_string()
            }
        );
    }

    #[test]
    fn test_layer_slot_composes_with_logging_chain() {
        // same chain order the worker installs, scoped to this thread
        let (layer, _) = telemetry_layer(None, None).unwrap();
        let subscriber = tracing_subscriber::registry()
            .with(layer)
            .with(EnvFilter::new("info"))
            .with(fmt::layer().with_test_writer());

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("subscriber with telemetry slot");
        });
    }
}
