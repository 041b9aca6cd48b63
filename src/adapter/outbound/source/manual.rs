//! Manual source adapter: no network call, only a queue entry.

use std::sync::Arc;

use tracing::info;

use crate::domain::{ArbitrageListing, ManualTask, TaskDraft, Transaction};
use crate::error::QueueError;
use crate::port::outbound::queue::ManualQueueStore;

/// Hands a transaction to the human work queue.
///
/// Succeeds unless the queue store itself is unavailable.
#[derive(Clone)]
pub struct ManualSource {
    queue: Arc<dyn ManualQueueStore>,
}

impl ManualSource {
    #[must_use]
    pub fn new(queue: Arc<dyn ManualQueueStore>) -> Self {
        Self { queue }
    }

    /// Snapshot the sale and append it to the queue.
    pub async fn enqueue(
        &self,
        tx: &Transaction,
        listing: &ArbitrageListing,
    ) -> Result<ManualTask, QueueError> {
        let task = self.queue.enqueue(TaskDraft::snapshot(tx, listing)).await?;
        info!(
            task = %task.task_number,
            transaction_id = %tx.id,
            platform = %task.platform,
            "Queued for manual fulfillment"
        );
        Ok(task)
    }
}
