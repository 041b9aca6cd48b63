//! SLA monitor for the manual queue.
//!
//! Periodically scans pending manual tasks whose sale is still
//! `AWAITING_MANUAL` and flags each one older than the threshold exactly once.
//! Flagging appends an escalation record to the queue, so a restart does not
//! re-alert. A pending task whose sale already ended is closed to match.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use super::router::FulfillmentRouter;
use crate::domain::{
    ManualTask, TaskNumber, TaskStatus, Transaction, TransactionId, TransactionState,
};
use crate::error::QueueError;
use crate::port::outbound::notifier::{Event, Notifier, SlaEvent};
use crate::port::outbound::queue::ManualQueueStore;
use crate::port::outbound::store::TransactionStore;

/// SLA monitor configuration.
#[derive(Debug, Clone)]
pub struct SlaConfig {
    /// Age at which a pending task is breached.
    pub threshold: chrono::Duration,
    /// How often to sweep.
    pub interval: Duration,
    /// Refund breached tasks automatically instead of only alerting.
    pub auto_refund: bool,
}

impl Default for SlaConfig {
    fn default() -> Self {
        Self {
            threshold: chrono::Duration::hours(72),
            interval: Duration::from_secs(300),
            auto_refund: false,
        }
    }
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Pending tasks whose sale is awaiting an operator.
    pub checked: usize,
    /// Tasks flagged in this sweep.
    pub breached: Vec<TaskNumber>,
    /// Transactions refunded because of a breach.
    pub refunded: Vec<TransactionId>,
    /// Stale tasks closed because their sale had already completed or failed.
    pub closed: Vec<TaskNumber>,
}

/// Watches manual tasks for SLA breaches.
pub struct SlaMonitor {
    queue: Arc<dyn ManualQueueStore>,
    store: Arc<dyn TransactionStore>,
    notifier: Arc<dyn Notifier>,
    router: Option<Arc<FulfillmentRouter>>,
    config: SlaConfig,
}

impl SlaMonitor {
    #[must_use]
    pub fn new(
        queue: Arc<dyn ManualQueueStore>,
        store: Arc<dyn TransactionStore>,
        notifier: Arc<dyn Notifier>,
        config: SlaConfig,
    ) -> Self {
        Self {
            queue,
            store,
            notifier,
            router: None,
            config,
        }
    }

    /// Attach the router used for automatic refunds.
    #[must_use]
    pub fn with_router(mut self, router: Arc<FulfillmentRouter>) -> Self {
        self.router = Some(router);
        self
    }

    #[must_use]
    pub const fn config(&self) -> &SlaConfig {
        &self.config
    }

    /// Sweep with the current wall clock.
    pub async fn sweep(&self) -> Result<SweepReport, QueueError> {
        self.sweep_at(Utc::now()).await
    }

    /// Sweep as if the time were `now`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the queue cannot be listed. Per-task failures
    /// are logged and the sweep moves on.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Result<SweepReport, QueueError> {
        let pending = self.queue.list(Some(TaskStatus::Pending)).await?;
        let mut report = SweepReport::default();

        for task in pending {
            match self.store.get(task.transaction_id).await {
                Ok(Some(tx)) if tx.state == TransactionState::AwaitingManual => {}
                Ok(Some(tx)) => {
                    if self.close_stale(&task, &tx, now).await {
                        report.closed.push(task.task_number);
                    }
                    continue;
                }
                Ok(None) => {
                    warn!(
                        task = %task.task_number,
                        transaction_id = %task.transaction_id,
                        "Queued task has no transaction"
                    );
                    continue;
                }
                Err(e) => {
                    error!(task = %task.task_number, error = %e, "Failed to load transaction for task");
                    continue;
                }
            }
            report.checked += 1;

            if task.is_escalated() || !task.is_breached(now, self.config.threshold) {
                continue;
            }

            let task = match self.queue.escalate(task.task_number, now).await {
                Ok(task) => task,
                Err(e) => {
                    error!(task = %task.task_number, error = %e, "Failed to record SLA escalation");
                    continue;
                }
            };
            let age_hours = task.age(now).num_hours();
            warn!(
                task = %task.task_number,
                transaction_id = %task.transaction_id,
                age_hours,
                "Manual task breached SLA"
            );
            self.notifier.notify(Event::SlaBreached(SlaEvent {
                task_number: task.task_number,
                transaction_id: task.transaction_id,
                platform: task.platform,
                age_hours,
                threshold_hours: self.config.threshold.num_hours(),
            }));
            report.breached.push(task.task_number);

            if self.config.auto_refund {
                if let Some(id) = self.auto_refund(task.task_number, task.transaction_id).await {
                    report.refunded.push(id);
                }
            }
        }

        if !report.breached.is_empty() || !report.closed.is_empty() {
            info!(
                checked = report.checked,
                breached = report.breached.len(),
                refunded = report.refunded.len(),
                closed = report.closed.len(),
                "SLA sweep complete"
            );
        } else {
            debug!(checked = report.checked, "SLA sweep complete");
        }
        Ok(report)
    }

    /// Bring a pending task in line with a sale that moved on without it.
    /// Sales still in flight are left alone.
    async fn close_stale(&self, task: &ManualTask, tx: &Transaction, now: DateTime<Utc>) -> bool {
        let closed = match (tx.state, &tx.output) {
            (TransactionState::Completed, Some(delivery)) => {
                self.queue.complete(task.task_number, delivery.clone()).await
            }
            (
                TransactionState::Failed
                | TransactionState::RefundPending
                | TransactionState::Refunded
                | TransactionState::RefundFailed,
                _,
            ) => self.queue.cancel(task.task_number, now).await,
            _ => return false,
        };
        match closed {
            Ok(task) => {
                info!(
                    task = %task.task_number,
                    status = %task.status,
                    state = %tx.state,
                    "Closed stale manual task"
                );
                true
            }
            Err(e) => {
                error!(task = %task.task_number, error = %e, "Failed to close stale manual task");
                false
            }
        }
    }

    async fn auto_refund(&self, number: TaskNumber, id: TransactionId) -> Option<TransactionId> {
        let Some(router) = &self.router else {
            warn!(task = %number, "Auto-refund enabled but no router attached");
            return None;
        };
        let reason = format!(
            "manual task {number} exceeded SLA of {}h",
            self.config.threshold.num_hours()
        );
        match router.refund(id, reason).await {
            Ok(tx) => Some(tx.id),
            Err(e) => {
                error!(task = %number, transaction_id = %id, error = %e, "SLA auto-refund failed");
                None
            }
        }
    }

    /// Sweep on an interval until `shutdown` resolves.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            threshold_hours = self.config.threshold.num_hours(),
            auto_refund = self.config.auto_refund,
            "SLA monitor started"
        );
        let mut ticker = tokio::time::interval(self.config.interval);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep().await {
                        error!(error = %e, "SLA sweep failed");
                    }
                }
                () = &mut shutdown => {
                    info!("SLA monitor stopped");
                    return;
                }
            }
        }
    }
}
