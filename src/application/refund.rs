//! Refund coordination for failed fulfillments.
//!
//! Moves a `FAILED` transaction through `REFUND_PENDING` to either `REFUNDED`
//! or `REFUND_FAILED`. The claim on `FAILED -> REFUND_PENDING` is a
//! compare-and-set, so a transaction is refunded at most once no matter how
//! many callers race.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::domain::{Transaction, TransactionState, TransactionUpdate};
use crate::error::{FulfillmentError, RefundError};
use crate::port::outbound::notifier::{Event, Notifier};
use crate::port::outbound::payment::{PaymentProcessor, RefundReceipt};
use crate::port::outbound::store::TransactionStore;

/// Retry policy for refund calls.
///
/// The per-call deadline lives in the payment adapter; this only bounds how
/// many calls are made.
#[derive(Debug, Clone)]
pub struct RefundPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Base delay between attempts; grows linearly with the attempt number.
    pub backoff: Duration,
}

impl Default for RefundPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Issues full refunds and records the outcome.
pub struct RefundCoordinator {
    store: Arc<dyn TransactionStore>,
    processor: Arc<dyn PaymentProcessor>,
    notifier: Arc<dyn Notifier>,
    policy: RefundPolicy,
}

impl RefundCoordinator {
    #[must_use]
    pub fn new(
        store: Arc<dyn TransactionStore>,
        processor: Arc<dyn PaymentProcessor>,
        notifier: Arc<dyn Notifier>,
        policy: RefundPolicy,
    ) -> Self {
        Self {
            store,
            processor,
            notifier,
            policy,
        }
    }

    /// Refund a failed transaction in full.
    ///
    /// Returns the `REFUNDED` transaction.
    ///
    /// # Errors
    ///
    /// - [`FulfillmentError::AlreadyProcessing`] / [`FulfillmentError::AlreadyTerminal`]
    ///   when another caller already claimed the refund.
    /// - [`FulfillmentError::RefundFailed`] when the processor never accepted
    ///   the refund; the transaction is then `REFUND_FAILED` and needs an
    ///   operator.
    pub async fn refund(&self, tx: &Transaction) -> Result<Transaction, FulfillmentError> {
        let pending = self
            .store
            .transition(
                tx.id,
                TransactionState::Failed,
                TransactionState::RefundPending,
                TransactionUpdate::none(),
            )
            .await
            .map_err(FulfillmentError::from_store)?;
        self.settle(pending).await
    }

    /// Finish a refund left in `REFUND_PENDING`, for example by a crash
    /// between the processor call and the store write. The processor call is
    /// repeated; its idempotency key makes a second call return the original
    /// refund instead of paying twice.
    ///
    /// # Errors
    ///
    /// A state conflict unless the transaction is `REFUND_PENDING`, otherwise
    /// as [`RefundCoordinator::refund`].
    pub async fn resume(&self, tx: &Transaction) -> Result<Transaction, FulfillmentError> {
        if tx.state != TransactionState::RefundPending {
            return Err(FulfillmentError::conflict(
                tx.id,
                tx.state,
                TransactionState::RefundPending,
            ));
        }
        warn!(transaction_id = %tx.id, "Resuming interrupted refund");
        self.settle(tx.clone()).await
    }

    async fn settle(&self, pending: Transaction) -> Result<Transaction, FulfillmentError> {
        match self.issue(&pending).await {
            Ok(receipt) => {
                let refunded = self
                    .store
                    .transition(
                        pending.id,
                        TransactionState::RefundPending,
                        TransactionState::Refunded,
                        TransactionUpdate::none().with_refund_reference(receipt.refund_id.clone()),
                    )
                    .await
                    .map_err(FulfillmentError::from_store)?;
                info!(
                    transaction_id = %refunded.id,
                    amount = receipt.amount,
                    refund_id = %receipt.refund_id,
                    "Refund issued"
                );
                self.notifier.notify(Event::RefundIssued {
                    transaction_id: refunded.id,
                    amount: receipt.amount,
                    refund_id: receipt.refund_id,
                });
                Ok(refunded)
            }
            Err(err) => {
                let reason = match &pending.failure_reason {
                    Some(original) => format!("{original}; refund failed: {err}"),
                    None => format!("refund failed: {err}"),
                };
                self.store
                    .transition(
                        pending.id,
                        TransactionState::RefundPending,
                        TransactionState::RefundFailed,
                        TransactionUpdate::none().with_failure(reason),
                    )
                    .await
                    .map_err(FulfillmentError::from_store)?;
                error!(
                    transaction_id = %pending.id,
                    amount = pending.amount_paid,
                    error = %err,
                    "Refund failed, operator action required"
                );
                self.notifier.notify(Event::RefundFailed {
                    transaction_id: pending.id,
                    amount: pending.amount_paid,
                    reason: err.to_string(),
                });
                Err(FulfillmentError::RefundFailed {
                    id: pending.id,
                    source: err,
                })
            }
        }
    }

    async fn issue(&self, tx: &Transaction) -> Result<RefundReceipt, RefundError> {
        let attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self
                .processor
                .refund(&tx.payment_reference, tx.amount_paid)
                .await
            {
                Ok(receipt) => return Ok(receipt),
                Err(err) if attempt < attempts && is_transient(&err) => {
                    warn!(
                        transaction_id = %tx.id,
                        attempt,
                        error = %err,
                        "Refund attempt failed, retrying"
                    );
                    tokio::time::sleep(self.policy.backoff * attempt).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Whether a retry could plausibly succeed. Client errors are final.
fn is_transient(err: &RefundError) -> bool {
    match err {
        RefundError::Timeout { .. } | RefundError::Transport(_) => true,
        RefundError::Rejected { status, .. } => *status >= 500 || *status == 429,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::memory::MemoryTransactionStore;
    use crate::testkit::domain::failed_transaction;
    use crate::testkit::doubles::{RecordingNotifier, ScriptedPaymentProcessor};

    fn policy() -> RefundPolicy {
        RefundPolicy {
            max_attempts: 3,
            backoff: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn refund_records_reference_and_notifies() {
        let store = Arc::new(MemoryTransactionStore::new());
        let tx = failed_transaction(2000);
        store.insert(&tx).await.unwrap();
        let processor = Arc::new(ScriptedPaymentProcessor::succeeding());
        let notifier = Arc::new(RecordingNotifier::new());
        let coordinator = RefundCoordinator::new(store.clone(), processor.clone(), notifier.clone(), policy());

        let refunded = coordinator.refund(&tx).await.unwrap();

        assert_eq!(refunded.state, TransactionState::Refunded);
        assert!(refunded.refund_reference.is_some());
        assert_eq!(processor.calls(), 1);
        assert_eq!(processor.refunded_amounts(), vec![2000]);
        assert_eq!(notifier.names(), vec!["refund_issued"]);
    }

    #[tokio::test]
    async fn transient_errors_are_retried() {
        let store = Arc::new(MemoryTransactionStore::new());
        let tx = failed_transaction(900);
        store.insert(&tx).await.unwrap();
        let processor = Arc::new(ScriptedPaymentProcessor::failing_then_ok(
            vec![RefundError::Timeout { timeout_ms: 10 }],
        ));
        let coordinator = RefundCoordinator::new(
            store.clone(),
            processor.clone(),
            Arc::new(RecordingNotifier::new()),
            policy(),
        );

        let refunded = coordinator.refund(&tx).await.unwrap();
        assert_eq!(refunded.state, TransactionState::Refunded);
        assert_eq!(processor.calls(), 2);
    }

    #[tokio::test]
    async fn rejection_leaves_refund_failed() {
        let store = Arc::new(MemoryTransactionStore::new());
        let tx = failed_transaction(900);
        store.insert(&tx).await.unwrap();
        let processor = Arc::new(ScriptedPaymentProcessor::failing_then_ok(vec![
            RefundError::Rejected {
                status: 400,
                message: "charge already refunded".into(),
            },
        ]));
        let notifier = Arc::new(RecordingNotifier::new());
        let coordinator = RefundCoordinator::new(store.clone(), processor.clone(), notifier.clone(), policy());

        let err = coordinator.refund(&tx).await.unwrap_err();
        assert_eq!(err.code(), "REFUND_FAILED");
        assert_eq!(processor.calls(), 1);

        let stored = store.get(tx.id).await.unwrap().unwrap();
        assert_eq!(stored.state, TransactionState::RefundFailed);
        assert!(stored
            .failure_reason
            .as_deref()
            .unwrap()
            .contains("charge already refunded"));
        assert_eq!(notifier.names(), vec!["refund_failed"]);
    }

    #[tokio::test]
    async fn interrupted_refund_resumes_from_refund_pending() {
        let store = Arc::new(MemoryTransactionStore::new());
        let tx = failed_transaction(1200);
        store.insert(&tx).await.unwrap();
        let stuck = store
            .transition(
                tx.id,
                TransactionState::Failed,
                TransactionState::RefundPending,
                TransactionUpdate::none(),
            )
            .await
            .unwrap();
        let processor = Arc::new(ScriptedPaymentProcessor::succeeding());
        let coordinator = RefundCoordinator::new(
            store.clone(),
            processor.clone(),
            Arc::new(RecordingNotifier::new()),
            policy(),
        );

        let err = coordinator.refund(&stuck).await.unwrap_err();
        assert_eq!(err.code(), "ALREADY_PROCESSING");
        assert_eq!(processor.calls(), 0);

        let refunded = coordinator.resume(&stuck).await.unwrap();
        assert_eq!(refunded.state, TransactionState::Refunded);
        assert_eq!(processor.refunded_amounts(), vec![1200]);

        let err = coordinator.resume(&refunded).await.unwrap_err();
        assert_eq!(err.code(), "ALREADY_TERMINAL");
        assert_eq!(processor.calls(), 1);
    }

    #[tokio::test]
    async fn second_refund_is_rejected_without_calling_processor() {
        let store = Arc::new(MemoryTransactionStore::new());
        let tx = failed_transaction(900);
        store.insert(&tx).await.unwrap();
        let processor = Arc::new(ScriptedPaymentProcessor::succeeding());
        let coordinator = RefundCoordinator::new(
            store.clone(),
            processor.clone(),
            Arc::new(RecordingNotifier::new()),
            policy(),
        );

        coordinator.refund(&tx).await.unwrap();
        let err = coordinator.refund(&tx).await.unwrap_err();
        assert_eq!(err.code(), "ALREADY_TERMINAL");
        assert_eq!(processor.calls(), 1);
    }
}
