//! In-memory view of the queue shared by the queue backends.
//!
//! Mutations are split into `prepare_*` (validate and build the next task
//! snapshot) and [`QueueLedger::commit`] so a durable backend can persist the
//! snapshot before it becomes visible.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::domain::{DeliveryRecord, ManualTask, TaskDraft, TaskNumber, TaskStatus, TransactionId};
use crate::error::QueueError;

/// Result of preparing an enqueue.
#[derive(Debug)]
pub enum Enqueue {
    /// The transaction already has a task.
    Existing(ManualTask),
    /// A new task to persist and commit.
    New(ManualTask),
}

#[derive(Debug, Default)]
pub struct QueueLedger {
    tasks: BTreeMap<TaskNumber, ManualTask>,
    last: Option<TaskNumber>,
}

impl QueueLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a record log. The last record per task number wins.
    pub fn replay(records: impl IntoIterator<Item = ManualTask>) -> Self {
        let mut ledger = Self::new();
        for record in records {
            ledger.commit(record);
        }
        ledger
    }

    /// Next number to hand out: one past the highest ever seen.
    #[must_use]
    pub fn next_number(&self) -> TaskNumber {
        self.last.map_or(TaskNumber::FIRST, TaskNumber::next)
    }

    pub fn prepare_enqueue(&self, draft: TaskDraft, at: DateTime<Utc>) -> Enqueue {
        match self.find_by_transaction(draft.transaction_id) {
            Some(existing) => Enqueue::Existing(existing),
            None => Enqueue::New(ManualTask::from_draft(self.next_number(), draft, at)),
        }
    }

    pub fn prepare_complete(
        &self,
        number: TaskNumber,
        delivery: DeliveryRecord,
    ) -> Result<ManualTask, QueueError> {
        let mut task = self.get(number)?;
        match task.status {
            TaskStatus::Pending => {}
            TaskStatus::Completed => return Err(QueueError::TaskAlreadyCompleted(number)),
            TaskStatus::Cancelled => return Err(QueueError::TaskCancelled(number)),
        }
        task.status = TaskStatus::Completed;
        task.completed_at = Some(delivery.delivered_at);
        task.delivery = Some(delivery);
        Ok(task)
    }

    /// `None` when the task is already cancelled.
    pub fn prepare_cancel(
        &self,
        number: TaskNumber,
        at: DateTime<Utc>,
    ) -> Result<Option<ManualTask>, QueueError> {
        let mut task = self.get(number)?;
        match task.status {
            TaskStatus::Pending => {
                task.status = TaskStatus::Cancelled;
                task.cancelled_at = Some(at);
                Ok(Some(task))
            }
            TaskStatus::Cancelled => Ok(None),
            TaskStatus::Completed => Err(QueueError::TaskAlreadyCompleted(number)),
        }
    }

    /// `None` when there is nothing to record (already flagged or done).
    pub fn prepare_escalate(
        &self,
        number: TaskNumber,
        at: DateTime<Utc>,
    ) -> Result<Option<ManualTask>, QueueError> {
        let mut task = self.get(number)?;
        if !task.is_pending() || task.is_escalated() {
            return Ok(None);
        }
        task.escalated_at = Some(at);
        Ok(Some(task))
    }

    pub fn commit(&mut self, task: ManualTask) {
        let number = task.task_number;
        if self.last.map_or(true, |last| number > last) {
            self.last = Some(number);
        }
        self.tasks.insert(number, task);
    }

    pub fn get(&self, number: TaskNumber) -> Result<ManualTask, QueueError> {
        self.tasks
            .get(&number)
            .cloned()
            .ok_or(QueueError::TaskNotFound(number))
    }

    #[must_use]
    pub fn find_by_transaction(&self, id: TransactionId) -> Option<ManualTask> {
        self.tasks.values().find(|t| t.transaction_id == id).cloned()
    }

    /// Task-number order. Numbers are handed out in enqueue order, so this is
    /// FIFO even if the wall clock stepped back between two enqueues.
    #[must_use]
    pub fn list(&self, status: Option<TaskStatus>) -> Vec<ManualTask> {
        self.tasks
            .values()
            .filter(|t| status.map_or(true, |s| t.status == s))
            .cloned()
            .collect()
    }
}
