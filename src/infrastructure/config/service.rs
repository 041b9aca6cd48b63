//! Service configuration for sources, the manual queue, refunds, SLA, and alerts.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::application::{RefundPolicy, SlaConfig};
use crate::domain::SourcePlatform;
use crate::error::ConfigError;

/// `[source]` section: automated source calls.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Per-call deadline (default: 30s).
    #[serde(default = "default_source_timeout_ms")]
    pub timeout_ms: u64,
    /// Connection establishment deadline (default: 5s).
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Attempts per call. Only unreachable sources are retried (default: 1).
    #[serde(default = "default_one")]
    pub max_attempts: u32,
    #[serde(default = "default_source_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Per-platform deadline overrides.
    #[serde(default = "default_platform_timeouts")]
    pub timeouts_ms: BTreeMap<SourcePlatform, u64>,
}

const fn default_source_timeout_ms() -> u64 {
    30_000
}

const fn default_connect_timeout_ms() -> u64 {
    5_000
}

const fn default_one() -> u32 {
    1
}

const fn default_source_retry_backoff_ms() -> u64 {
    1_000
}

fn default_platform_timeouts() -> BTreeMap<SourcePlatform, u64> {
    // Spaces cold-start slowly.
    BTreeMap::from([(SourcePlatform::HuggingFace, 60_000)])
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_source_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            max_attempts: default_one(),
            retry_backoff_ms: default_source_retry_backoff_ms(),
            timeouts_ms: default_platform_timeouts(),
        }
    }
}

impl SourceConfig {
    /// Deadline for calls to `platform`.
    #[must_use]
    pub fn timeout_for(&self, platform: SourcePlatform) -> Duration {
        Duration::from_millis(
            self.timeouts_ms
                .get(&platform)
                .copied()
                .unwrap_or(self.timeout_ms),
        )
    }

    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        positive("source.timeout_ms", self.timeout_ms)?;
        positive("source.connect_timeout_ms", self.connect_timeout_ms)?;
        positive("source.max_attempts", u64::from(self.max_attempts))?;
        for timeout in self.timeouts_ms.values() {
            positive("source.timeouts_ms", *timeout)?;
        }
        Ok(())
    }
}

/// `[queue]` section: the manual fulfillment log.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Append-only JSONL log.
    #[serde(default = "default_queue_path")]
    pub path: String,
    #[serde(default = "default_enqueue_attempts")]
    pub enqueue_attempts: u32,
    #[serde(default = "default_queue_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_queue_path() -> String {
    "data/manual_fulfillment_queue.jsonl".to_string()
}

const fn default_enqueue_attempts() -> u32 {
    3
}

const fn default_queue_retry_backoff_ms() -> u64 {
    200
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            path: default_queue_path(),
            enqueue_attempts: default_enqueue_attempts(),
            retry_backoff_ms: default_queue_retry_backoff_ms(),
        }
    }
}

/// `[refund]` section: the payment processor.
///
/// The API key is read from `PAYMENT_PROCESSOR_KEY`, never from this file.
#[derive(Debug, Clone, Deserialize)]
pub struct RefundConfig {
    #[serde(default = "default_refund_api_url")]
    pub api_url: String,
    #[serde(default = "default_refund_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_refund_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_refund_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_refund_api_url() -> String {
    "https://api.stripe.com/v1".to_string()
}

const fn default_refund_timeout_ms() -> u64 {
    10_000
}

const fn default_refund_attempts() -> u32 {
    3
}

const fn default_refund_backoff_ms() -> u64 {
    500
}

impl Default for RefundConfig {
    fn default() -> Self {
        Self {
            api_url: default_refund_api_url(),
            timeout_ms: default_refund_timeout_ms(),
            max_attempts: default_refund_attempts(),
            backoff_ms: default_refund_backoff_ms(),
        }
    }
}

impl RefundConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    #[must_use]
    pub fn policy(&self) -> RefundPolicy {
        RefundPolicy {
            max_attempts: self.max_attempts,
            backoff: Duration::from_millis(self.backoff_ms),
        }
    }
}

/// `[sla]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SlaSettings {
    #[serde(default = "default_threshold_hours")]
    pub threshold_hours: i64,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Refund breached tasks instead of only alerting.
    #[serde(default)]
    pub auto_refund: bool,
}

const fn default_threshold_hours() -> i64 {
    72
}

const fn default_interval_secs() -> u64 {
    300
}

impl Default for SlaSettings {
    fn default() -> Self {
        Self {
            threshold_hours: default_threshold_hours(),
            interval_secs: default_interval_secs(),
            auto_refund: false,
        }
    }
}

impl SlaSettings {
    #[must_use]
    pub fn monitor_config(&self) -> SlaConfig {
        SlaConfig {
            threshold: chrono::Duration::hours(self.threshold_hours),
            interval: Duration::from_secs(self.interval_secs),
            auto_refund: self.auto_refund,
        }
    }
}

/// `[alerts]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertsConfig {
    /// JSON webhook that receives every event.
    #[serde(default)]
    pub webhook_url: Option<String>,
}

pub(crate) fn validate_services(
    source: &SourceConfig,
    queue: &QueueConfig,
    refund: &RefundConfig,
    sla: &SlaSettings,
) -> Result<(), ConfigError> {
    source.validate()?;

    if queue.path.trim().is_empty() {
        return Err(ConfigError::MissingField {
            field: "queue.path",
        });
    }
    positive("queue.enqueue_attempts", u64::from(queue.enqueue_attempts))?;

    if refund.api_url.trim().is_empty() {
        return Err(ConfigError::MissingField {
            field: "refund.api_url",
        });
    }
    positive("refund.timeout_ms", refund.timeout_ms)?;
    positive("refund.max_attempts", u64::from(refund.max_attempts))?;

    if sla.threshold_hours <= 0 {
        return Err(ConfigError::InvalidValue {
            field: "sla.threshold_hours",
            reason: "must be greater than 0".to_string(),
        });
    }
    positive("sla.interval_secs", sla.interval_secs)?;
    Ok(())
}

fn positive(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            field,
            reason: "must be greater than 0".to_string(),
        });
    }
    Ok(())
}
