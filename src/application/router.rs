//! Fulfillment router.
//!
//! Drives a recorded sale from `PENDING` to its end state:
//!
//! ```text
//! PENDING -> PROCESSING -+-> DELIVERED -> COMPLETED           (automated)
//!                        +-> AWAITING_MANUAL -> COMPLETED     (manual, operator completes)
//!                        +-> FAILED -> REFUND_PENDING -> REFUNDED | REFUND_FAILED
//! ```
//!
//! The `PENDING -> PROCESSING` claim is a compare-and-set in the store, so
//! concurrent `process` calls for one transaction make at most one source call.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::dispatch::{Route, SourceRegistry};
use super::refund::{RefundCoordinator, RefundPolicy};
use crate::adapter::outbound::source::ManualSource;
use crate::domain::{
    ArbitrageListing, BuyerId, Cents, DeliveryPayload, DeliveryRecord, DomainError, ListingId,
    ManualTask, PaymentReference, ProfitBreakdown, ProfitCalculator, SourcePlatform, TaskNumber,
    TaskStatus, Transaction, TransactionId, TransactionState, TransactionUpdate,
};
use crate::error::{FulfillmentError, QueueError, SourceError, StoreError};
use crate::port::outbound::catalog::ListingCatalog;
use crate::port::outbound::notifier::{CompletionEvent, Event, Notifier, TaskEvent};
use crate::port::outbound::payment::PaymentProcessor;
use crate::port::outbound::queue::ManualQueueStore;
use crate::port::outbound::source::AutomatedSource;
use crate::port::outbound::store::TransactionStore;

/// Router tuning.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Attempts per automated source call. Only unreachable sources are retried.
    pub source_max_attempts: u32,
    pub source_retry_backoff: Duration,
    /// Attempts to append to the manual queue before releasing the claim.
    pub enqueue_attempts: u32,
    pub enqueue_backoff: Duration,
    pub refund: RefundPolicy,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            source_max_attempts: 1,
            source_retry_backoff: Duration::from_secs(1),
            enqueue_attempts: 3,
            enqueue_backoff: Duration::from_millis(200),
            refund: RefundPolicy::default(),
        }
    }
}

/// Outbound ports the router talks to.
pub struct RouterPorts {
    pub store: Arc<dyn TransactionStore>,
    pub catalog: Arc<dyn ListingCatalog>,
    pub queue: Arc<dyn ManualQueueStore>,
    pub payments: Arc<dyn PaymentProcessor>,
    pub notifier: Arc<dyn Notifier>,
}

/// A captured payment to record.
#[derive(Debug, Clone)]
pub struct NewSale {
    pub buyer: BuyerId,
    pub listing: ListingId,
    pub payment_reference: PaymentReference,
    pub amount_paid: Cents,
    pub input: serde_json::Value,
}

/// Result of one `process` call.
#[derive(Debug, Clone)]
pub enum ProcessOutcome {
    /// Automated delivery succeeded and the sale is priced.
    Completed(Transaction),
    /// Handed to the human queue.
    AwaitingManual {
        transaction: Transaction,
        task: ManualTask,
    },
    /// Fulfillment failed and the buyer was refunded.
    Refunded {
        transaction: Transaction,
        code: &'static str,
        reason: String,
    },
}

impl ProcessOutcome {
    #[must_use]
    pub fn transaction(&self) -> &Transaction {
        match self {
            Self::Completed(tx) => tx,
            Self::AwaitingManual { transaction, .. } | Self::Refunded { transaction, .. } => {
                transaction
            }
        }
    }
}

/// Buyer-facing view of a transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FulfillmentStatus {
    pub transaction_id: TransactionId,
    pub state: TransactionState,
    pub requires_manual: bool,
    pub task_number: Option<TaskNumber>,
    pub source_platform: Option<SourcePlatform>,
    pub delivery: Option<DeliveryRecord>,
    pub failure_reason: Option<String>,
    pub refund_reference: Option<String>,
    pub amount_paid: Cents,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&Transaction> for FulfillmentStatus {
    fn from(tx: &Transaction) -> Self {
        Self {
            transaction_id: tx.id,
            state: tx.state,
            requires_manual: tx.state == TransactionState::AwaitingManual,
            task_number: tx.task_number,
            source_platform: tx.source_platform,
            delivery: tx.output.clone(),
            failure_reason: tx.failure_reason.clone(),
            refund_reference: tx.refund_reference.clone(),
            amount_paid: tx.amount_paid,
            created_at: tx.created_at,
            updated_at: tx.updated_at,
            completed_at: tx.completed_at,
        }
    }
}

/// Routes paid transactions to their source and records the outcome.
pub struct FulfillmentRouter {
    store: Arc<dyn TransactionStore>,
    catalog: Arc<dyn ListingCatalog>,
    queue: Arc<dyn ManualQueueStore>,
    notifier: Arc<dyn Notifier>,
    sources: SourceRegistry,
    calculator: ProfitCalculator,
    refunds: RefundCoordinator,
    config: RouterConfig,
}

impl FulfillmentRouter {
    #[must_use]
    pub fn new(
        ports: RouterPorts,
        sources: SourceRegistry,
        calculator: ProfitCalculator,
        config: RouterConfig,
    ) -> Self {
        let refunds = RefundCoordinator::new(
            Arc::clone(&ports.store),
            ports.payments,
            Arc::clone(&ports.notifier),
            config.refund.clone(),
        );
        Self {
            store: ports.store,
            catalog: ports.catalog,
            queue: ports.queue,
            notifier: ports.notifier,
            sources,
            calculator,
            refunds,
            config,
        }
    }

    #[must_use]
    pub const fn calculator(&self) -> &ProfitCalculator {
        &self.calculator
    }

    /// Record a captured payment as a `PENDING` transaction.
    ///
    /// # Errors
    ///
    /// Rejects a negative amount, or a store failure.
    pub async fn record(&self, sale: NewSale) -> Result<Transaction, FulfillmentError> {
        if sale.amount_paid < 0 {
            return Err(DomainError::NegativeBuyerPaid {
                buyer_paid: sale.amount_paid,
            }
            .into());
        }
        let tx = Transaction::new(
            sale.buyer,
            sale.listing,
            sale.payment_reference,
            sale.amount_paid,
            sale.input,
        );
        self.store.insert(&tx).await?;
        info!(
            transaction_id = %tx.id,
            listing = %tx.listing,
            amount = tx.amount_paid,
            "Payment recorded"
        );
        Ok(tx)
    }

    /// Fulfill a paid transaction.
    ///
    /// # Errors
    ///
    /// - [`FulfillmentError::AlreadyProcessing`] / [`FulfillmentError::AlreadyTerminal`]
    ///   when the transaction is not `PENDING` or another caller claimed it first.
    /// - A retryable error (queue or catalog unavailable) after the claim was
    ///   released back to `PENDING`; nothing was charged at the source.
    /// - [`FulfillmentError::RefundFailed`] when fulfillment failed and the
    ///   refund did too.
    pub async fn process(&self, id: TransactionId) -> Result<ProcessOutcome, FulfillmentError> {
        let tx = self.load(id).await?;
        if tx.state != TransactionState::Pending {
            return Err(FulfillmentError::conflict(
                id,
                tx.state,
                TransactionState::Pending,
            ));
        }

        let claimed = self
            .store
            .transition(
                id,
                TransactionState::Pending,
                TransactionState::Processing,
                TransactionUpdate::none(),
            )
            .await
            .map_err(FulfillmentError::from_store)?;
        debug!(transaction_id = %id, "Claimed for fulfillment");

        let listing = match self.resolve_listing(&claimed).await {
            Ok(listing) => listing,
            Err(err) if err.is_retryable() => return Err(self.release(&claimed, err).await),
            Err(err) => {
                return self
                    .fail_and_refund(&claimed, None, err.code(), err.to_string())
                    .await
            }
        };

        let platform = listing.platform();
        match self.sources.select(&listing) {
            Ok(Route::Automated(source)) => {
                self.fulfill_automated(claimed, &listing, source).await
            }
            Ok(Route::Manual(manual)) => self.fulfill_manual(claimed, &listing, manual).await,
            Err(err) => {
                let err = FulfillmentError::from(err);
                self.fail_and_refund(&claimed, Some(platform), err.code(), err.to_string())
                    .await
            }
        }
    }

    /// Close a manual task with the operator's delivery and price the sale.
    ///
    /// The transaction moves `AWAITING_MANUAL → COMPLETED` before the queue
    /// entry is closed, so a refund racing this call either wins the
    /// transaction first (and the task is cancelled) or loses it (and the
    /// buyer keeps the delivery). The queue never holds a delivery for a
    /// refunded sale.
    ///
    /// # Errors
    ///
    /// - [`QueueError::TaskNotFound`], [`QueueError::TaskAlreadyCompleted`],
    ///   [`QueueError::TaskCancelled`]
    /// - A state conflict when the transaction is no longer `AWAITING_MANUAL`
    ///   (for example, it was refunded after an SLA breach).
    /// - [`DomainError::InvalidManualDelivery`] for an `api_result` payload.
    pub async fn complete_manual(
        &self,
        number: TaskNumber,
        payload: DeliveryPayload,
        notes: Option<String>,
    ) -> Result<Transaction, FulfillmentError> {
        let delivery = DeliveryRecord::manual(payload, notes, Utc::now())?;
        let task = self.queue.get(number).await?;
        match task.status {
            TaskStatus::Pending => {}
            TaskStatus::Completed => return Err(QueueError::TaskAlreadyCompleted(number).into()),
            TaskStatus::Cancelled => return Err(QueueError::TaskCancelled(number).into()),
        }

        let tx = self.load(task.transaction_id).await?;
        match tx.state {
            TransactionState::AwaitingManual => {}
            TransactionState::Completed => {
                // An earlier completion priced the sale but never closed the task.
                self.close_task(number, &tx).await;
                return Err(QueueError::TaskAlreadyCompleted(number).into());
            }
            state => {
                return Err(FulfillmentError::conflict(
                    tx.id,
                    state,
                    TransactionState::AwaitingManual,
                ))
            }
        }

        // Priced from the queue snapshot so later catalog edits don't move it.
        let profit = self
            .calculator
            .compute(task.buyer_paid, task.source_cost, task.platform)?;

        let completed = self
            .store
            .transition(
                tx.id,
                TransactionState::AwaitingManual,
                TransactionState::Completed,
                TransactionUpdate::none()
                    .with_output(delivery)
                    .with_profit(profit.clone()),
            )
            .await
            .map_err(|e| match e {
                StoreError::StateMismatch {
                    actual: TransactionState::Completed,
                    ..
                } => QueueError::TaskAlreadyCompleted(number).into(),
                other => FulfillmentError::from_store(other),
            })?;
        self.close_task(number, &completed).await;

        info!(
            task = %number,
            transaction_id = %completed.id,
            net_profit = profit.net_profit,
            "Manual task completed"
        );
        self.notify_completed(&completed, &profit);
        Ok(completed)
    }

    /// Cancel fulfillment and refund the buyer in full.
    ///
    /// Valid from `PENDING` or `AWAITING_MANUAL` (any queued task is
    /// cancelled), from `FAILED` to start a refund that never began, and from
    /// `REFUND_PENDING` to finish one that was interrupted.
    ///
    /// # Errors
    ///
    /// A state conflict from any other state, or [`FulfillmentError::RefundFailed`].
    pub async fn refund(
        &self,
        id: TransactionId,
        reason: impl Into<String>,
    ) -> Result<Transaction, FulfillmentError> {
        let tx = self.load(id).await?;
        match tx.state {
            TransactionState::Pending | TransactionState::AwaitingManual => {
                let outcome = self
                    .fail_and_refund(&tx, tx.source_platform, "CANCELLED", reason.into())
                    .await?;
                Ok(outcome.transaction().clone())
            }
            TransactionState::Failed => {
                self.cancel_task(&tx).await;
                self.refunds.refund(&tx).await
            }
            TransactionState::RefundPending => {
                self.cancel_task(&tx).await;
                self.refunds.resume(&tx).await
            }
            state => Err(FulfillmentError::conflict(
                id,
                state,
                TransactionState::Failed,
            )),
        }
    }

    /// Fail a transaction left in `PROCESSING` and refund the buyer.
    ///
    /// For operator reconciliation after a crash mid-fulfillment, or after a
    /// queued task could not be recorded on the transaction. Any task queued
    /// for the sale is cancelled. A source call still running for the
    /// transaction will fail to record its result.
    ///
    /// # Errors
    ///
    /// A state conflict unless the transaction is `PROCESSING`, or
    /// [`FulfillmentError::RefundFailed`].
    pub async fn fail(
        &self,
        id: TransactionId,
        reason: impl Into<String>,
    ) -> Result<Transaction, FulfillmentError> {
        let tx = self.load(id).await?;
        if tx.state != TransactionState::Processing {
            return Err(FulfillmentError::conflict(
                id,
                tx.state,
                TransactionState::Processing,
            ));
        }
        let outcome = self
            .fail_and_refund(&tx, tx.source_platform, "OPERATOR_FAILED", reason.into())
            .await?;
        Ok(outcome.transaction().clone())
    }

    /// Buyer-facing status.
    ///
    /// # Errors
    ///
    /// [`FulfillmentError::TransactionNotFound`] for an unknown id.
    pub async fn status(&self, id: TransactionId) -> Result<FulfillmentStatus, FulfillmentError> {
        self.load(id).await.map(|tx| FulfillmentStatus::from(&tx))
    }

    /// Price a hypothetical sale.
    ///
    /// # Errors
    ///
    /// Invalid-input errors from [`ProfitCalculator::compute`].
    pub fn calculate_profit(
        &self,
        buyer_paid: Cents,
        source_cost: Cents,
        platform: SourcePlatform,
    ) -> Result<ProfitBreakdown, FulfillmentError> {
        Ok(self.calculator.compute(buyer_paid, source_cost, platform)?)
    }

    async fn load(&self, id: TransactionId) -> Result<Transaction, FulfillmentError> {
        self.store
            .get(id)
            .await?
            .ok_or(FulfillmentError::TransactionNotFound(id))
    }

    async fn resolve_listing(&self, tx: &Transaction) -> Result<ArbitrageListing, FulfillmentError> {
        let record = self
            .catalog
            .get(&tx.listing)
            .await
            .map_err(|e| FulfillmentError::CatalogUnavailable(e.to_string()))?
            .ok_or_else(|| FulfillmentError::ListingNotFound(tx.listing.clone()))?;
        let listing = ArbitrageListing::try_from(record)?;
        // Priced up front so a sale that cannot be priced never reaches a source.
        self.calculator
            .compute(tx.amount_paid, listing.source_cost(), listing.platform())?;
        Ok(listing)
    }

    async fn fulfill_automated(
        &self,
        tx: Transaction,
        listing: &ArbitrageListing,
        source: &dyn AutomatedSource,
    ) -> Result<ProcessOutcome, FulfillmentError> {
        let platform = listing.platform();
        let payload = match self.call_source(source, &tx, listing).await {
            Ok(payload) => payload,
            Err(err) => {
                return self
                    .fail_and_refund(&tx, Some(platform), err.code(), err.to_string())
                    .await
            }
        };

        let delivered = self
            .store
            .transition(
                tx.id,
                TransactionState::Processing,
                TransactionState::Delivered,
                TransactionUpdate::none()
                    .with_output(DeliveryRecord::automated(payload, Utc::now()))
                    .with_platform(platform),
            )
            .await
            .map_err(|e| {
                error!(transaction_id = %tx.id, error = %e, "Delivered output could not be recorded");
                FulfillmentError::from_store(e)
            })?;

        let profit = self
            .calculator
            .compute(delivered.amount_paid, listing.source_cost(), platform)?;
        let completed = self
            .store
            .transition(
                tx.id,
                TransactionState::Delivered,
                TransactionState::Completed,
                TransactionUpdate::none().with_profit(profit.clone()),
            )
            .await
            .map_err(FulfillmentError::from_store)?;

        info!(
            transaction_id = %completed.id,
            platform = %platform,
            net_profit = profit.net_profit,
            "Automated fulfillment completed"
        );
        self.notify_completed(&completed, &profit);
        Ok(ProcessOutcome::Completed(completed))
    }

    async fn call_source(
        &self,
        source: &dyn AutomatedSource,
        tx: &Transaction,
        listing: &ArbitrageListing,
    ) -> Result<DeliveryPayload, SourceError> {
        let attempts = self.config.source_max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match source.fulfill(tx, listing).await {
                Ok(payload) => return Ok(payload),
                // Only a request that never reached the source is safe to repeat.
                Err(SourceError::Unreachable(reason)) if attempt < attempts => {
                    warn!(
                        transaction_id = %tx.id,
                        attempt,
                        reason = %reason,
                        "Source unreachable, retrying"
                    );
                    tokio::time::sleep(self.config.source_retry_backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn fulfill_manual(
        &self,
        tx: Transaction,
        listing: &ArbitrageListing,
        manual: &ManualSource,
    ) -> Result<ProcessOutcome, FulfillmentError> {
        let task = match self.enqueue(manual, &tx, listing).await {
            Ok(task) => task,
            Err(err) => return Err(self.release(&tx, err.into()).await),
        };

        let awaiting = self
            .store
            .transition(
                tx.id,
                TransactionState::Processing,
                TransactionState::AwaitingManual,
                TransactionUpdate::none()
                    .with_task(task.task_number)
                    .with_platform(listing.platform()),
            )
            .await
            .map_err(FulfillmentError::from_store)?;

        self.notifier.notify(Event::TaskQueued(TaskEvent::from(&task)));
        Ok(ProcessOutcome::AwaitingManual {
            transaction: awaiting,
            task,
        })
    }

    async fn enqueue(
        &self,
        manual: &ManualSource,
        tx: &Transaction,
        listing: &ArbitrageListing,
    ) -> Result<ManualTask, QueueError> {
        let attempts = self.config.enqueue_attempts.max(1);
        let mut attempt = 1;
        loop {
            match manual.enqueue(tx, listing).await {
                Ok(task) => return Ok(task),
                Err(err) if attempt < attempts => {
                    warn!(
                        transaction_id = %tx.id,
                        attempt,
                        error = %err,
                        "Enqueue failed, retrying"
                    );
                    tokio::time::sleep(self.config.enqueue_backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Hand the claim back so a later `process` call can retry.
    async fn release(&self, tx: &Transaction, cause: FulfillmentError) -> FulfillmentError {
        warn!(transaction_id = %tx.id, error = %cause, "Releasing claim");
        if let Err(e) = self
            .store
            .transition(
                tx.id,
                TransactionState::Processing,
                TransactionState::Pending,
                TransactionUpdate::none(),
            )
            .await
        {
            error!(transaction_id = %tx.id, error = %e, "Failed to release claim");
        }
        cause
    }

    async fn fail_and_refund(
        &self,
        tx: &Transaction,
        platform: Option<SourcePlatform>,
        code: &'static str,
        reason: String,
    ) -> Result<ProcessOutcome, FulfillmentError> {
        let mut update = TransactionUpdate::none().with_failure(reason.clone());
        if let Some(platform) = platform {
            update = update.with_platform(platform);
        }
        let failed = self
            .store
            .transition(tx.id, tx.state, TransactionState::Failed, update)
            .await
            .map_err(FulfillmentError::from_store)?;

        if matches!(
            tx.state,
            TransactionState::Processing | TransactionState::AwaitingManual
        ) {
            self.cancel_task(tx).await;
        }

        warn!(transaction_id = %failed.id, code, reason = %reason, "Fulfillment failed");
        self.notifier.notify(Event::FulfillmentFailed {
            transaction_id: failed.id,
            code: code.to_string(),
            reason: reason.clone(),
        });

        let refunded = self.refunds.refund(&failed).await?;
        Ok(ProcessOutcome::Refunded {
            transaction: refunded,
            code,
            reason,
        })
    }

    /// Withdraw the queued task of a sale that is being refunded. Failures are
    /// logged; the SLA sweep closes tasks whose sale already ended.
    async fn cancel_task(&self, tx: &Transaction) {
        let number = match tx.task_number {
            Some(number) => number,
            None => match self.queue.find_by_transaction(tx.id).await {
                Ok(Some(task)) => task.task_number,
                Ok(None) => return,
                Err(e) => {
                    error!(transaction_id = %tx.id, error = %e, "Failed to look up queued task");
                    return;
                }
            },
        };
        match self.queue.cancel(number, Utc::now()).await {
            Ok(task) => debug!(task = %number, status = %task.status, "Manual task withdrawn"),
            Err(e) => error!(
                task = %number,
                transaction_id = %tx.id,
                error = %e,
                "Failed to cancel manual task"
            ),
        }
    }

    /// Record the delivery on the queue entry of a completed sale.
    async fn close_task(&self, number: TaskNumber, tx: &Transaction) {
        let Some(delivery) = tx.output.clone() else {
            return;
        };
        match self.queue.complete(number, delivery).await {
            Ok(_) | Err(QueueError::TaskAlreadyCompleted(_)) => {}
            Err(e) => error!(
                task = %number,
                transaction_id = %tx.id,
                error = %e,
                "Sale completed but its task is still open"
            ),
        }
    }

    fn notify_completed(&self, tx: &Transaction, profit: &ProfitBreakdown) {
        self.notifier
            .notify(Event::TransactionCompleted(CompletionEvent::new(tx.id, profit)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::domain::{listing_record, manual_delivery};
    use crate::testkit::harness::Harness;

    async fn awaiting_manual(harness: &Harness) -> (Transaction, TaskNumber) {
        let tx = harness
            .sale(listing_record("gig", "fiverr", 2000), 5000)
            .await;
        harness.router.process(tx.id).await.unwrap();
        let tx = harness.store.get(tx.id).await.unwrap().unwrap();
        let number = tx.task_number.unwrap();
        (tx, number)
    }

    #[tokio::test]
    async fn negative_amount_is_rejected_at_record_time() {
        let harness = Harness::builder().build();
        let err = harness
            .router
            .record(NewSale {
                buyer: BuyerId::new("b"),
                listing: ListingId::new("l"),
                payment_reference: PaymentReference::new("pi_1"),
                amount_paid: -5,
                input: serde_json::Value::Null,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }

    #[tokio::test]
    async fn unknown_transaction_is_not_found() {
        let harness = Harness::builder().build();
        let err = harness.router.process(TransactionId::new()).await.unwrap_err();
        assert_eq!(err.code(), "TRANSACTION_NOT_FOUND");
    }

    #[tokio::test]
    async fn status_reports_manual_requirement() {
        let harness = Harness::builder().build();
        let tx = harness
            .sale(listing_record("gig", "fiverr", 2000), 5000)
            .await;
        harness.router.process(tx.id).await.unwrap();

        let status = harness.router.status(tx.id).await.unwrap();
        assert_eq!(status.state, TransactionState::AwaitingManual);
        assert!(status.requires_manual);
        assert_eq!(status.task_number, Some(TaskNumber::FIRST));
        assert_eq!(status.source_platform, Some(SourcePlatform::Fiverr));
        assert!(status.delivery.is_none());
    }

    #[tokio::test]
    async fn cost_above_price_fails_and_refunds() {
        let harness = Harness::builder().build();
        let tx = harness
            .sale(listing_record("gig", "fiverr", 6000), 5000)
            .await;

        let outcome = harness.router.process(tx.id).await.unwrap();
        match outcome {
            ProcessOutcome::Refunded {
                transaction, code, ..
            } => {
                assert_eq!(transaction.state, TransactionState::Refunded);
                assert_eq!(code, "INVALID_INPUT");
            }
            other => panic!("expected refund, got {other:?}"),
        }
        assert_eq!(harness.payments.calls(), 1);
    }

    #[tokio::test]
    async fn operator_refund_cancels_pending_sale() {
        let harness = Harness::builder().build();
        let tx = harness
            .sale(listing_record("gig", "fiverr", 1000), 5000)
            .await;

        let refunded = harness.router.refund(tx.id, "buyer asked").await.unwrap();
        assert_eq!(refunded.state, TransactionState::Refunded);
        assert_eq!(refunded.failure_reason.as_deref(), Some("buyer asked"));

        let err = harness.router.refund(tx.id, "again").await.unwrap_err();
        assert_eq!(err.code(), "ALREADY_TERMINAL");
    }

    #[tokio::test]
    async fn refund_of_queued_sale_cancels_its_task() {
        let harness = Harness::builder().build();
        let (tx, number) = awaiting_manual(&harness).await;

        let refunded = harness.router.refund(tx.id, "buyer asked").await.unwrap();
        assert_eq!(refunded.state, TransactionState::Refunded);

        let task = harness.queue.get(number).await.unwrap();
        assert_eq!(task.status, TaskStatus::Cancelled);
        assert!(harness
            .queue
            .list(Some(TaskStatus::Pending))
            .await
            .unwrap()
            .is_empty());

        let err = harness
            .router
            .complete_manual(number, manual_delivery().payload, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "TASK_CANCELLED");
        assert!(harness.queue.get(number).await.unwrap().delivery.is_none());
    }

    #[tokio::test]
    async fn completion_after_refund_won_the_race_leaves_task_open_for_sweep() {
        let harness = Harness::builder().build();
        let (tx, number) = awaiting_manual(&harness).await;
        // The refund moved the sale on before its task was withdrawn.
        harness
            .store
            .transition(
                tx.id,
                TransactionState::AwaitingManual,
                TransactionState::Failed,
                TransactionUpdate::none().with_failure("cancelled"),
            )
            .await
            .unwrap();

        let err = harness
            .router
            .complete_manual(number, manual_delivery().payload, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "ALREADY_TERMINAL");
        let task = harness.queue.get(number).await.unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.delivery.is_none());
    }

    #[tokio::test]
    async fn completion_closes_task_left_open_by_an_earlier_completion() {
        let harness = Harness::builder().build();
        let (tx, number) = awaiting_manual(&harness).await;
        let delivery = manual_delivery();
        harness
            .store
            .transition(
                tx.id,
                TransactionState::AwaitingManual,
                TransactionState::Completed,
                TransactionUpdate::none().with_output(delivery.clone()),
            )
            .await
            .unwrap();

        let err = harness
            .router
            .complete_manual(number, manual_delivery().payload, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "TASK_ALREADY_COMPLETED");
        let task = harness.queue.get(number).await.unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.delivery, Some(delivery));
    }

    #[tokio::test]
    async fn refund_resumes_after_interruption() {
        let harness = Harness::builder().build();
        let (tx, number) = awaiting_manual(&harness).await;
        for (from, to) in [
            (TransactionState::AwaitingManual, TransactionState::Failed),
            (TransactionState::Failed, TransactionState::RefundPending),
        ] {
            harness
                .store
                .transition(tx.id, from, to, TransactionUpdate::none())
                .await
                .unwrap();
        }

        let refunded = harness.router.refund(tx.id, "resume").await.unwrap();
        assert_eq!(refunded.state, TransactionState::Refunded);
        assert_eq!(harness.payments.refunded_amounts(), vec![5000]);
        assert_eq!(
            harness.queue.get(number).await.unwrap().status,
            TaskStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn operator_fails_stale_processing_sale() {
        let harness = Harness::builder().build();
        let record = listing_record("gig", "fiverr", 2000);
        let listing = ArbitrageListing::try_from(record.clone()).unwrap();
        let tx = harness.sale(record, 5000).await;
        let claimed = harness
            .store
            .transition(
                tx.id,
                TransactionState::Pending,
                TransactionState::Processing,
                TransactionUpdate::none(),
            )
            .await
            .unwrap();
        // Queued, but the crash hit before the task number was recorded.
        let orphan = harness
            .queue
            .enqueue(crate::domain::TaskDraft::snapshot(&claimed, &listing))
            .await
            .unwrap();

        let refunded = harness.router.fail(tx.id, "worker crashed").await.unwrap();
        assert_eq!(refunded.state, TransactionState::Refunded);
        assert_eq!(refunded.failure_reason.as_deref(), Some("worker crashed"));
        assert_eq!(harness.payments.refunded_amounts(), vec![5000]);
        assert_eq!(
            harness.queue.get(orphan.task_number).await.unwrap().status,
            TaskStatus::Cancelled
        );
        assert!(harness.notifier.names().contains(&"fulfillment_failed"));
    }

    #[tokio::test]
    async fn operator_fail_requires_processing() {
        let harness = Harness::builder().build();
        let tx = harness
            .sale(listing_record("gig", "fiverr", 2000), 5000)
            .await;

        let err = harness.router.fail(tx.id, "stale").await.unwrap_err();
        assert_eq!(err.code(), "WRONG_STATE");
        assert_eq!(harness.payments.calls(), 0);

        let (queued, _) = awaiting_manual(&harness).await;
        let err = harness.router.fail(queued.id, "stale").await.unwrap_err();
        assert_eq!(err.code(), "ALREADY_PROCESSING");
    }
}
