//! Manual fulfillment queue port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{DeliveryRecord, ManualTask, TaskDraft, TaskNumber, TaskStatus, TransactionId};
use crate::error::QueueError;

/// Durable ordered store of human fulfillment tasks.
///
/// Contract:
/// - task numbers are assigned in enqueue order, strictly increasing, and
///   never reused, including across restarts
/// - `list` returns tasks in task-number order, which is enqueue order
/// - a task leaves `pending` once: `complete` rejects a second call with
///   [`QueueError::TaskAlreadyCompleted`] and a cancelled task with
///   [`QueueError::TaskCancelled`], leaving the first delivery untouched
#[async_trait]
pub trait ManualQueueStore: Send + Sync {
    /// Append a task. A transaction that already has a task gets that task back.
    async fn enqueue(&self, draft: TaskDraft) -> Result<ManualTask, QueueError>;

    /// Tasks in enqueue order, optionally filtered by status.
    async fn list(&self, status: Option<TaskStatus>) -> Result<Vec<ManualTask>, QueueError>;

    /// A single task.
    async fn get(&self, number: TaskNumber) -> Result<ManualTask, QueueError>;

    /// The task queued for a transaction, if any.
    async fn find_by_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Option<ManualTask>, QueueError>;

    /// Record the delivery and mark the task completed.
    async fn complete(
        &self,
        number: TaskNumber,
        delivery: DeliveryRecord,
    ) -> Result<ManualTask, QueueError>;

    /// Withdraw a pending task whose sale was refunded. Cancelling an already
    /// cancelled task returns it unchanged; a completed task is rejected with
    /// [`QueueError::TaskAlreadyCompleted`].
    async fn cancel(&self, number: TaskNumber, at: DateTime<Utc>)
        -> Result<ManualTask, QueueError>;

    /// Flag a pending task as past its SLA. Flagging twice keeps the first
    /// timestamp.
    async fn escalate(&self, number: TaskNumber, at: DateTime<Utc>)
        -> Result<ManualTask, QueueError>;
}
