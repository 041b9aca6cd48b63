//! Scripted port implementations for testing.
//!
//! - [`ScriptedSource`] - Automated source with pre-loaded results and a call counter.
//! - [`ScriptedPaymentProcessor`] - Refund endpoint that fails on cue.
//! - [`RecordingNotifier`] - Captures every event.
//! - [`FlakyQueue`] - Wraps a queue and fails the first N enqueues.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::domain::{
    ArbitrageListing, Cents, DeliveryPayload, DeliveryRecord, ManualTask, PaymentReference,
    TaskDraft, TaskNumber, TaskStatus, Transaction, TransactionId,
};
use crate::error::{QueueError, RefundError, SourceError};
use crate::port::outbound::notifier::{Event, Notifier};
use crate::port::outbound::payment::{PaymentProcessor, RefundReceipt};
use crate::port::outbound::queue::ManualQueueStore;
use crate::port::outbound::source::AutomatedSource;

// ---------------------------------------------------------------------------
// ScriptedSource
// ---------------------------------------------------------------------------

/// An automated source that replays scripted results.
///
/// Each call pops the next result; once the script is exhausted the
/// fallback result is returned forever.
pub struct ScriptedSource {
    script: Mutex<VecDeque<Result<DeliveryPayload, SourceError>>>,
    fallback: Result<DeliveryPayload, SourceError>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(fallback: Result<DeliveryPayload, SourceError>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Always answers with `data`.
    pub fn ok_json(data: serde_json::Value) -> Self {
        Self::new(Ok(DeliveryPayload::ApiResult { data }))
    }

    /// Always fails with `err`.
    pub fn failing(err: SourceError) -> Self {
        Self::new(Err(err))
    }

    /// Play `results` first, then fall back.
    pub fn with_script(self, results: Vec<Result<DeliveryPayload, SourceError>>) -> Self {
        *self.script.lock() = results.into();
        self
    }

    /// Sleep before answering, to widen race windows.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AutomatedSource for ScriptedSource {
    async fn fulfill(
        &self,
        _tx: &Transaction,
        _listing: &ArbitrageListing,
    ) -> Result<DeliveryPayload, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.script.lock().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

// ---------------------------------------------------------------------------
// ScriptedPaymentProcessor
// ---------------------------------------------------------------------------

/// A payment processor whose refunds fail on cue.
pub struct ScriptedPaymentProcessor {
    failures: Mutex<VecDeque<RefundError>>,
    permanent: Option<RefundError>,
    amounts: Mutex<Vec<Cents>>,
    calls: AtomicUsize,
}

impl ScriptedPaymentProcessor {
    /// Every refund succeeds.
    pub fn succeeding() -> Self {
        Self::failing_then_ok(Vec::new())
    }

    /// Fail with each of `errors` in turn, then succeed.
    pub fn failing_then_ok(errors: Vec<RefundError>) -> Self {
        Self {
            failures: Mutex::new(errors.into()),
            permanent: None,
            amounts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Every refund fails with `err`.
    pub fn always_failing(err: RefundError) -> Self {
        Self {
            permanent: Some(err),
            ..Self::succeeding()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Amounts of the refunds that went through.
    pub fn refunded_amounts(&self) -> Vec<Cents> {
        self.amounts.lock().clone()
    }
}

#[async_trait]
impl PaymentProcessor for ScriptedPaymentProcessor {
    async fn refund(
        &self,
        payment: &PaymentReference,
        amount: Cents,
    ) -> Result<RefundReceipt, RefundError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(err) = &self.permanent {
            return Err(err.clone());
        }
        if let Some(err) = self.failures.lock().pop_front() {
            return Err(err);
        }
        self.amounts.lock().push(amount);
        Ok(RefundReceipt {
            refund_id: format!("re_{payment}_{n}"),
            amount,
        })
    }
}

// ---------------------------------------------------------------------------
// RecordingNotifier
// ---------------------------------------------------------------------------

/// Captures events for assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<Event>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Event tags in emission order.
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(Event::name).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: Event) {
        self.events.lock().push(event);
    }
}

// ---------------------------------------------------------------------------
// FlakyQueue
// ---------------------------------------------------------------------------

/// Fails the first `n` enqueues with `QueueUnavailable`, then delegates.
pub struct FlakyQueue {
    inner: Arc<dyn ManualQueueStore>,
    failures_left: AtomicUsize,
    enqueue_calls: AtomicUsize,
}

impl FlakyQueue {
    pub fn new(inner: Arc<dyn ManualQueueStore>, failures: usize) -> Self {
        Self {
            inner,
            failures_left: AtomicUsize::new(failures),
            enqueue_calls: AtomicUsize::new(0),
        }
    }

    pub fn enqueue_calls(&self) -> usize {
        self.enqueue_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ManualQueueStore for FlakyQueue {
    async fn enqueue(&self, draft: TaskDraft) -> Result<ManualTask, QueueError> {
        self.enqueue_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(QueueError::Unavailable("disk full".into()));
        }
        self.inner.enqueue(draft).await
    }

    async fn list(&self, status: Option<TaskStatus>) -> Result<Vec<ManualTask>, QueueError> {
        self.inner.list(status).await
    }

    async fn get(&self, number: TaskNumber) -> Result<ManualTask, QueueError> {
        self.inner.get(number).await
    }

    async fn find_by_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Option<ManualTask>, QueueError> {
        self.inner.find_by_transaction(id).await
    }

    async fn complete(
        &self,
        number: TaskNumber,
        delivery: DeliveryRecord,
    ) -> Result<ManualTask, QueueError> {
        self.inner.complete(number, delivery).await
    }

    async fn cancel(&self, number: TaskNumber, at: DateTime<Utc>) -> Result<ManualTask, QueueError> {
        self.inner.cancel(number, at).await
    }

    async fn escalate(
        &self,
        number: TaskNumber,
        at: DateTime<Utc>,
    ) -> Result<ManualTask, QueueError> {
        self.inner.escalate(number, at).await
    }
}
