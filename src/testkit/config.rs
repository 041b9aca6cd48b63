//! Canonical test configurations.
//!
//! Single source of truth for config structs used across tests.
//! Avoids each test module defining its own slightly-different defaults.

use std::time::Duration;

use crate::application::{RefundPolicy, RouterConfig, SlaConfig};

/// Router config with zero delays - no waiting in tests.
pub fn router() -> RouterConfig {
    RouterConfig {
        source_max_attempts: 1,
        source_retry_backoff: Duration::ZERO,
        enqueue_attempts: 3,
        enqueue_backoff: Duration::ZERO,
        refund: refund_policy(),
    }
}

/// Three refund attempts, no backoff.
pub fn refund_policy() -> RefundPolicy {
    RefundPolicy {
        max_attempts: 3,
        backoff: Duration::ZERO,
    }
}

/// SLA config with the given threshold in hours.
pub fn sla(threshold_hours: i64, auto_refund: bool) -> SlaConfig {
    SlaConfig {
        threshold: chrono::Duration::hours(threshold_hours),
        interval: Duration::from_millis(10),
        auto_refund,
    }
}
