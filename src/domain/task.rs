//! Manual fulfillment tasks: one entry in the human work queue.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::delivery::DeliveryRecord;
use super::id::{ListingId, TaskNumber, TransactionId};
use super::listing::ArbitrageListing;
use super::money::{format_cents, Cents};
use super::platform::SourcePlatform;
use super::transaction::Transaction;

/// Queue status of a task. A task leaves `pending` exactly once, either
/// `completed` by an operator or `cancelled` because its sale was refunded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Completed,
    Cancelled,
}

impl TaskStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Listing and payment facts denormalized at enqueue time.
///
/// The queue stays self-describing even if the catalog entry later changes,
/// and completion prices the sale from `source_cost` recorded here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub transaction_id: TransactionId,
    pub listing_id: ListingId,
    pub service_name: String,
    pub platform: SourcePlatform,
    pub source_url: String,
    pub source_cost: Cents,
    pub buyer_paid: Cents,
    pub buyer_input: serde_json::Value,
    pub instructions: String,
}

impl TaskDraft {
    /// Snapshot a transaction and its listing for the queue.
    #[must_use]
    pub fn snapshot(tx: &Transaction, listing: &ArbitrageListing) -> Self {
        Self {
            transaction_id: tx.id,
            listing_id: listing.id().clone(),
            service_name: listing.name().to_string(),
            platform: listing.platform(),
            source_url: listing.source_url().to_string(),
            source_cost: listing.source_cost(),
            buyer_paid: tx.amount_paid,
            buyer_input: tx.input.clone(),
            instructions: manual_instructions(listing),
        }
    }
}

/// A task as persisted in the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualTask {
    pub task_number: TaskNumber,
    pub transaction_id: TransactionId,
    pub listing_id: ListingId,
    pub service_name: String,
    pub platform: SourcePlatform,
    pub source_url: String,
    pub source_cost: Cents,
    pub buyer_paid: Cents,
    pub buyer_input: serde_json::Value,
    pub instructions: String,
    pub status: TaskStatus,
    pub enqueued_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivery: Option<DeliveryRecord>,
    /// Set once when the SLA monitor flags the task. Service hint only.
    #[serde(default)]
    pub escalated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl ManualTask {
    /// Materialize a draft under an assigned task number.
    #[must_use]
    pub fn from_draft(task_number: TaskNumber, draft: TaskDraft, enqueued_at: DateTime<Utc>) -> Self {
        Self {
            task_number,
            transaction_id: draft.transaction_id,
            listing_id: draft.listing_id,
            service_name: draft.service_name,
            platform: draft.platform,
            source_url: draft.source_url,
            source_cost: draft.source_cost,
            buyer_paid: draft.buyer_paid,
            buyer_input: draft.buyer_input,
            instructions: draft.instructions,
            status: TaskStatus::Pending,
            enqueued_at,
            completed_at: None,
            delivery: None,
            escalated_at: None,
            cancelled_at: None,
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == TaskStatus::Pending
    }

    #[must_use]
    pub fn is_escalated(&self) -> bool {
        self.escalated_at.is_some()
    }

    /// Time spent in the queue as of `now`.
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.enqueued_at
    }

    /// A pending task breaches at exactly `enqueued_at + threshold`, never before.
    #[must_use]
    pub fn is_breached(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        self.is_pending() && self.age(now) >= threshold
    }

    /// Gross markup the operator sees in the queue view.
    #[must_use]
    pub const fn gross_margin(&self) -> Cents {
        self.buyer_paid - self.source_cost
    }
}

/// Human-readable purchase steps for an operator.
#[must_use]
pub fn manual_instructions(listing: &ArbitrageListing) -> String {
    let budget = format_cents(listing.source_cost());
    let url = listing.source_url();
    format!(
        "MANUAL FULFILLMENT REQUIRED\n\
         \n\
         Platform: {platform}\n\
         Service: {name}\n\
         URL: {url}\n\
         Budget: {budget}\n\
         \n\
         STEPS:\n\
         1. Visit {url}\n\
         2. Purchase the service (budget: {budget})\n\
         3. Provide the buyer's requirements (see buyer input)\n\
         4. Wait for delivery from the seller\n\
         5. Forward the result to the buyer\n\
         6. Mark the task complete\n\
         \n\
         DO NOT exceed the budget of {budget}",
        platform = listing.platform(),
        name = listing.name(),
    )
}
