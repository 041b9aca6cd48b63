//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all application settings.
//! Configuration is loaded from a TOML file; secrets come only from the
//! environment (`PAYMENT_PROCESSOR_KEY`, and one variable per listing
//! credential).
//!
//! # Example
//!
//! ```no_run
//! use arbfill::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use super::fees::FeesConfig;
use super::logging::LoggingConfig;
use super::service::{
    validate_services, AlertsConfig, QueueConfig, RefundConfig, SlaSettings, SourceConfig,
};
use crate::application::RouterConfig;
use crate::error::{ConfigError, Result};
use crate::port::outbound::secret::Secret;

/// Environment variable holding the payment processor API key.
pub const PAYMENT_PROCESSOR_KEY_ENV: &str = "PAYMENT_PROCESSOR_KEY";

/// Main application configuration.
///
/// Every section is optional; an empty file yields the documented defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Path to SQLite database file.
    ///
    /// Defaults to "arbfill.db" in the current directory.
    #[serde(default = "default_database_path")]
    pub database: String,

    /// Path to the TOML listing catalog.
    #[serde(default = "default_catalog_path")]
    pub catalog: String,

    /// Logging and tracing configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Fee rates used for every profit breakdown.
    #[serde(default)]
    pub fees: FeesConfig,

    /// Automated source call settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Manual queue settings.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Payment processor settings.
    #[serde(default)]
    pub refund: RefundConfig,

    /// Manual task SLA.
    #[serde(default)]
    pub sla: SlaSettings,

    /// Alert sinks.
    #[serde(default)]
    pub alerts: AlertsConfig,
}

fn default_database_path() -> String {
    "arbfill.db".to_string()
}

fn default_catalog_path() -> String {
    "listings.toml".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: default_database_path(),
            catalog: default_catalog_path(),
            logging: LoggingConfig::default(),
            fees: FeesConfig::default(),
            source: SourceConfig::default(),
            queue: QueueConfig::default(),
            refund: RefundConfig::default(),
            sla: SlaSettings::default(),
            alerts: AlertsConfig::default(),
        }
    }
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML content is malformed or validation fails.
    #[allow(clippy::result_large_err)]
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The TOML content is malformed
    /// - Validation fails
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Load `path` if it exists, otherwise use the defaults.
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`] when the file exists.
    #[allow(clippy::result_large_err)]
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate configuration values.
    ///
    /// Rejects rates outside `[0, 1]`, zero timeouts, zero attempt counts,
    /// and a non-positive SLA threshold.
    #[allow(clippy::result_large_err)]
    pub fn validate(&self) -> Result<()> {
        if self.database.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "database" }.into());
        }
        self.fees.validate()?;
        validate_services(&self.source, &self.queue, &self.refund, &self.sla)?;
        if let Some(url) = &self.alerts.webhook_url {
            url::Url::parse(url).map_err(|e| ConfigError::InvalidValue {
                field: "alerts.webhook_url",
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    /// Router tuning derived from the source, queue, and refund sections.
    #[must_use]
    pub fn router(&self) -> RouterConfig {
        RouterConfig {
            source_max_attempts: self.source.max_attempts,
            source_retry_backoff: Duration::from_millis(self.source.retry_backoff_ms),
            enqueue_attempts: self.queue.enqueue_attempts,
            enqueue_backoff: Duration::from_millis(self.queue.retry_backoff_ms),
            refund: self.refund.policy(),
        }
    }

    /// Payment processor key from the environment.
    #[must_use]
    pub fn payment_processor_key() -> Option<Secret> {
        std::env::var(PAYMENT_PROCESSOR_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .map(Secret::new)
    }

    /// Initialize logging with the configured settings.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}
