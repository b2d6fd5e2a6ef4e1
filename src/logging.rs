use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::errors::HistoryError;

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub loki_enabled: bool,
    pub loki_url: Option<String>,
    pub service_name: String,
    pub environment: String,
    pub log_level: String,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self {
            loki_enabled: std::env::var("LOKI_ENABLED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            loki_url: std::env::var("LOKI_URL").ok(),
            service_name: std::env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "sensor-history".to_string()),
            environment: std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            log_level: std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info".to_string()),
        }
    }

    pub fn validate(&self) -> Result<(), HistoryError> {
        if self.loki_enabled && self.loki_url.is_none() {
            return Err(HistoryError::Config(
                "LOKI_ENABLED is true but LOKI_URL is not set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Install the global tracing subscriber for the embedding service.
///
/// Ships logs to Loki when enabled (requires the `loki` feature and a running
/// tokio runtime), otherwise logs to the console only.
pub fn init_logging(config: &LoggingConfig) -> Result<(), HistoryError> {
    config.validate()?;

    #[cfg(feature = "loki")]
    {
        if config.loki_enabled {
            if let Some(loki_url) = config.loki_url.as_deref() {
                return init_with_loki(config, loki_url);
            }
        }
    }

    let filter = tracing_subscriber::EnvFilter::try_new(&config.log_level)
        .map_err(|e| HistoryError::Config(format!("RUST_LOG: {}", e)))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| HistoryError::Config(e.to_string()))?;

    tracing::info!("Console logging initialized for {}", config.service_name);
    Ok(())
}

#[cfg(feature = "loki")]
fn init_with_loki(config: &LoggingConfig, loki_url: &str) -> Result<(), HistoryError> {
    let url = url::Url::parse(loki_url)
        .map_err(|e| HistoryError::Config(format!("LOKI_URL: {}", e)))?;

    let (loki_layer, task) = tracing_loki::builder()
        .label("service", &config.service_name)
        .and_then(|b| b.label("environment", &config.environment))
        .and_then(|b| b.build_url(url))
        .map_err(|e| HistoryError::Config(format!("loki: {}", e)))?;

    // Background task that ships batched logs to Loki
    tokio::spawn(task);

    let filter = tracing_subscriber::EnvFilter::try_new(&config.log_level)
        .map_err(|e| HistoryError::Config(format!("RUST_LOG: {}", e)))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(loki_layer)
        .try_init()
        .map_err(|e| HistoryError::Config(e.to_string()))?;

    tracing::info!("Loki logging initialized at {}", loki_url);
    Ok(())
}
