// Logging setup
//
// Structured logging via tracing-subscriber. Console output is human-readable by default;
// LOG_FORMAT=json switches to one JSON object per line for log shippers.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither RUST_LOG nor LOG_LEVEL is set
pub const DEFAULT_LOG_FILTER: &str = "promptgate_gateway=debug,promptgate_core=debug,tower_http=debug";

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Configuration for logging
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup log line
    pub service_name: String,
    /// Service version
    pub service_version: Option<String>,
    /// Log filter (e.g., "info", "promptgate_core=trace")
    pub log_filter: Option<String>,
    pub format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "promptgate".to_string(),
            service_version: None,
            log_filter: None,
            format: LogFormat::Pretty,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `SERVICE_NAME`: Service name (default: "promptgate")
    /// - `RUST_LOG` or `LOG_LEVEL`: Log filter
    /// - `LOG_FORMAT`: "json" for JSON lines, anything else for pretty output
    pub fn from_env() -> Self {
        Self {
            service_name: std::env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "promptgate".to_string()),
            service_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            log_filter: std::env::var("RUST_LOG")
                .ok()
                .or_else(|| std::env::var("LOG_LEVEL").ok()),
            format: match std::env::var("LOG_FORMAT") {
                Ok(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        }
    }

    fn filter(&self) -> EnvFilter {
        self.log_filter
            .as_ref()
            .and_then(|f| EnvFilter::try_new(f).ok())
            .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
    }
}

/// Install the global subscriber. Call once, early in `main`.
pub fn init_telemetry(config: &TelemetryConfig) {
    let (pretty_layer, json_layer) = match config.format {
        LogFormat::Pretty => (Some(tracing_subscriber::fmt::layer().with_target(true)), None),
        LogFormat::Json => (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true),
            ),
        ),
    };

    tracing_subscriber::registry()
        .with(config.filter())
        .with(pretty_layer)
        .with(json_layer)
        .init();

    tracing::debug!(
        service = %config.service_name,
        version = config.service_version.as_deref().unwrap_or("unknown"),
        format = ?config.format,
        "Logging initialized"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "promptgate");
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.log_filter.is_none());
    }

    #[test]
    fn test_invalid_filter_falls_back_to_default() {
        let config = TelemetryConfig {
            log_filter: Some("[[not a filter".to_string()),
            ..Default::default()
        };
        assert_eq!(config.filter().to_string(), EnvFilter::new(DEFAULT_LOG_FILTER).to_string());
    }
}
