//! Notifier port for event notifications.
//!
//! This module defines the trait for sending notifications about
//! fulfillment events such as queued manual tasks, refunds, and SLA breaches.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::{Cents, ManualTask, ProfitBreakdown, SourcePlatform, TaskNumber, TransactionId};

/// Events that can trigger notifications.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// A transaction was handed to the human queue.
    TaskQueued(TaskEvent),
    /// A transaction reached `COMPLETED` with a stamped breakdown.
    TransactionCompleted(CompletionEvent),
    /// Fulfillment failed; a refund follows.
    FulfillmentFailed {
        transaction_id: TransactionId,
        code: String,
        reason: String,
    },
    /// The buyer was refunded in full.
    RefundIssued {
        transaction_id: TransactionId,
        amount: Cents,
        refund_id: String,
    },
    /// The refund errored. Buyer money is at risk; an operator must act.
    RefundFailed {
        transaction_id: TransactionId,
        amount: Cents,
        reason: String,
    },
    /// A manual task is older than the SLA threshold.
    SlaBreached(SlaEvent),
}

impl Event {
    /// The serialized `event` tag.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::TaskQueued(_) => "task_queued",
            Self::TransactionCompleted(_) => "transaction_completed",
            Self::FulfillmentFailed { .. } => "fulfillment_failed",
            Self::RefundIssued { .. } => "refund_issued",
            Self::RefundFailed { .. } => "refund_failed",
            Self::SlaBreached(_) => "sla_breached",
        }
    }
}

/// Manual task event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskEvent {
    pub task_number: TaskNumber,
    pub transaction_id: TransactionId,
    pub platform: SourcePlatform,
    pub service_name: String,
    pub source_url: String,
    pub buyer_paid: Cents,
}

impl From<&ManualTask> for TaskEvent {
    fn from(task: &ManualTask) -> Self {
        Self {
            task_number: task.task_number,
            transaction_id: task.transaction_id,
            platform: task.platform,
            service_name: task.service_name.clone(),
            source_url: task.source_url.clone(),
            buyer_paid: task.buyer_paid,
        }
    }
}

/// Completion event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionEvent {
    pub transaction_id: TransactionId,
    pub platform: SourcePlatform,
    pub buyer_paid: Cents,
    pub net_profit: Cents,
    pub margin_percent: Decimal,
}

impl CompletionEvent {
    #[must_use]
    pub fn new(transaction_id: TransactionId, profit: &ProfitBreakdown) -> Self {
        Self {
            transaction_id,
            platform: profit.platform,
            buyer_paid: profit.buyer_paid,
            net_profit: profit.net_profit,
            margin_percent: profit.margin_percent,
        }
    }
}

/// SLA breach event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlaEvent {
    pub task_number: TaskNumber,
    pub transaction_id: TransactionId,
    pub platform: SourcePlatform,
    pub age_hours: i64,
    pub threshold_hours: i64,
}

/// Trait for notification handlers.
///
/// Implement this trait to receive events from the system.
/// Notifications are fire-and-forget.
///
/// # Implementation Notes
///
/// - Implementations must be thread-safe (`Send + Sync`)
/// - The `notify` method should not block or perform slow I/O synchronously
/// - Spawn an async task for slow operations such as HTTP calls
pub trait Notifier: Send + Sync {
    /// Handle an event. Must return quickly.
    fn notify(&self, event: Event);
}

/// Registry of notifiers (composite pattern).
///
/// Broadcasts events to all registered notifiers.
#[derive(Default)]
pub struct NotifierRegistry {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { notifiers: vec![] }
    }

    /// Register a notifier.
    pub fn register(&mut self, notifier: Box<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    /// Number of registered notifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

impl Notifier for NotifierRegistry {
    fn notify(&self, event: Event) {
        for notifier in &self.notifiers {
            notifier.notify(event.clone());
        }
    }
}

/// A no-op notifier for tests or when alerts are disabled.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: Event) {}
}

/// A logging notifier that logs events via tracing.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: Event) {
        use tracing::{error, info, warn};
        match event {
            Event::TaskQueued(e) => {
                info!(
                    task = %e.task_number,
                    transaction_id = %e.transaction_id,
                    platform = %e.platform,
                    url = %e.source_url,
                    "Manual task queued"
                );
            }
            Event::TransactionCompleted(e) => {
                info!(
                    transaction_id = %e.transaction_id,
                    platform = %e.platform,
                    net_profit = e.net_profit,
                    margin = %e.margin_percent,
                    "Transaction completed"
                );
            }
            Event::FulfillmentFailed {
                transaction_id,
                code,
                reason,
            } => {
                warn!(transaction_id = %transaction_id, code = %code, reason = %reason, "Fulfillment failed");
            }
            Event::RefundIssued {
                transaction_id,
                amount,
                refund_id,
            } => {
                info!(transaction_id = %transaction_id, amount, refund_id = %refund_id, "Refund issued");
            }
            Event::RefundFailed {
                transaction_id,
                amount,
                reason,
            } => {
                error!(transaction_id = %transaction_id, amount, reason = %reason, "Refund failed, operator action required");
            }
            Event::SlaBreached(e) => {
                warn!(
                    task = %e.task_number,
                    transaction_id = %e.transaction_id,
                    platform = %e.platform,
                    age_hours = e.age_hours,
                    threshold_hours = e.threshold_hours,
                    "Manual task breached SLA"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    struct Counting(Arc<AtomicUsize>);

    impl Notifier for Counting {
        fn notify(&self, _event: Event) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn refund_event() -> Event {
        Event::RefundIssued {
            transaction_id: TransactionId::new(),
            amount: 1500,
            refund_id: "re_1".into(),
        }
    }

    #[test]
    fn registry_broadcasts_to_all() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut registry = NotifierRegistry::new();
        registry.register(Box::new(Counting(count.clone())));
        registry.register(Box::new(Counting(count.clone())));
        registry.register(Box::new(NullNotifier));
        assert_eq!(registry.len(), 3);

        registry.notify(refund_event());
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn events_serialize_with_tag() {
        let json = serde_json::to_value(refund_event()).unwrap();
        assert_eq!(json["event"], "refund_issued");
        assert_eq!(refund_event().name(), "refund_issued");
        assert_eq!(json["amount"], 1500);
    }

    #[test]
    fn log_notifier_handles_every_event() {
        LogNotifier.notify(refund_event());
        LogNotifier.notify(Event::FulfillmentFailed {
            transaction_id: TransactionId::new(),
            code: "SOURCE_TIMEOUT".into(),
            reason: "timed out".into(),
        });
    }
}
