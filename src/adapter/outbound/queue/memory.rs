//! In-memory queue store for tests and embedding.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::ledger::{Enqueue, QueueLedger};
use crate::domain::{DeliveryRecord, ManualTask, TaskDraft, TaskNumber, TaskStatus, TransactionId};
use crate::error::QueueError;
use crate::port::outbound::queue::ManualQueueStore;

/// Volatile [`ManualQueueStore`]. Same contract as the file log, minus
/// durability.
#[derive(Default)]
pub struct MemoryQueueStore {
    ledger: Mutex<QueueLedger>,
}

impl MemoryQueueStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ManualQueueStore for MemoryQueueStore {
    async fn enqueue(&self, draft: TaskDraft) -> Result<ManualTask, QueueError> {
        let mut ledger = self.ledger.lock();
        match ledger.prepare_enqueue(draft, Utc::now()) {
            Enqueue::Existing(task) => Ok(task),
            Enqueue::New(task) => {
                ledger.commit(task.clone());
                Ok(task)
            }
        }
    }

    async fn list(&self, status: Option<TaskStatus>) -> Result<Vec<ManualTask>, QueueError> {
        Ok(self.ledger.lock().list(status))
    }

    async fn get(&self, number: TaskNumber) -> Result<ManualTask, QueueError> {
        self.ledger.lock().get(number)
    }

    async fn find_by_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Option<ManualTask>, QueueError> {
        Ok(self.ledger.lock().find_by_transaction(id))
    }

    async fn complete(
        &self,
        number: TaskNumber,
        delivery: DeliveryRecord,
    ) -> Result<ManualTask, QueueError> {
        let mut ledger = self.ledger.lock();
        let task = ledger.prepare_complete(number, delivery)?;
        ledger.commit(task.clone());
        Ok(task)
    }

    async fn cancel(&self, number: TaskNumber, at: DateTime<Utc>) -> Result<ManualTask, QueueError> {
        let mut ledger = self.ledger.lock();
        match ledger.prepare_cancel(number, at)? {
            Some(task) => {
                ledger.commit(task.clone());
                Ok(task)
            }
            None => ledger.get(number),
        }
    }

    async fn escalate(
        &self,
        number: TaskNumber,
        at: DateTime<Utc>,
    ) -> Result<ManualTask, QueueError> {
        let mut ledger = self.ledger.lock();
        match ledger.prepare_escalate(number, at)? {
            Some(task) => {
                ledger.commit(task.clone());
                Ok(task)
            }
            None => ledger.get(number),
        }
    }
}
