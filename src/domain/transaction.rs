//! Transactions and the fulfillment state machine.
//!
//! ```text
//! PENDING → PROCESSING → AWAITING_MANUAL ─┐
//!    ↑           │                         ├→ COMPLETED
//!    └─(release)─┤→ DELIVERED ─────────────┘
//!                ↓
//!   (any non-terminal) → FAILED → REFUND_PENDING → REFUNDED
//!                                              └→ REFUND_FAILED
//! ```
//!
//! The only entry into `PROCESSING` is from `PENDING`. Stores apply every
//! transition as a compare-and-set against the persisted state, which is what
//! makes `PENDING → PROCESSING` a single-flight claim.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::delivery::DeliveryRecord;
use super::error::DomainError;
use super::id::{BuyerId, ListingId, PaymentReference, TaskNumber, TransactionId};
use super::money::Cents;
use super::platform::SourcePlatform;
use super::profit::ProfitBreakdown;

/// Lifecycle state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionState {
    /// Payment captured, fulfillment not yet attempted.
    Pending,
    /// Claimed by a router.
    Processing,
    /// Enqueued, waiting on a human.
    AwaitingManual,
    /// Automated result obtained, profit not yet stamped.
    Delivered,
    /// Terminal success.
    Completed,
    /// Terminal failure; a refund follows.
    Failed,
    /// Refund requested from the payment processor.
    RefundPending,
    /// Terminal: buyer refunded.
    Refunded,
    /// Terminal: refund errored, needs an operator.
    RefundFailed,
}

impl TransactionState {
    /// Every state, in lifecycle order.
    pub const ALL: [Self; 9] = [
        Self::Pending,
        Self::Processing,
        Self::AwaitingManual,
        Self::Delivered,
        Self::Completed,
        Self::Failed,
        Self::RefundPending,
        Self::Refunded,
        Self::RefundFailed,
    ];

    /// Stable persisted name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::AwaitingManual => "AWAITING_MANUAL",
            Self::Delivered => "DELIVERED",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::RefundPending => "REFUND_PENDING",
            Self::Refunded => "REFUNDED",
            Self::RefundFailed => "REFUND_FAILED",
        }
    }

    /// Terminal states. `FAILED` is terminal for fulfillment even though the
    /// refund path continues from it.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Refunded | Self::RefundFailed
        )
    }

    /// States in which fulfillment or a refund is in flight.
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        matches!(
            self,
            Self::Processing | Self::AwaitingManual | Self::Delivered | Self::RefundPending
        )
    }

    /// Whether the state machine permits `self → to`.
    #[must_use]
    pub const fn can_transition_to(&self, to: Self) -> bool {
        use TransactionState::{
            AwaitingManual, Completed, Delivered, Failed, Pending, Processing, RefundFailed,
            RefundPending, Refunded,
        };
        match (*self, to) {
            (Pending, Processing)
            | (Processing, AwaitingManual | Delivered | Pending)
            | (AwaitingManual | Delivered, Completed)
            | (Pending | Processing | AwaitingManual | Delivered, Failed)
            | (Failed, RefundPending)
            | (RefundPending, Refunded | RefundFailed) => true,
            _ => false,
        }
    }

    /// Validate a transition.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidTransition`] when the move is illegal.
    pub fn transition(self, to: Self) -> Result<Self, DomainError> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(DomainError::InvalidTransition { from: self, to })
        }
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown transaction state: {s}"))
    }
}

/// One buyer purchase of one listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub buyer: BuyerId,
    pub listing: ListingId,
    pub payment_reference: PaymentReference,
    /// Immutable once recorded.
    pub amount_paid: Cents,
    pub state: TransactionState,
    /// Buyer-supplied parameters forwarded to the source.
    pub input: serde_json::Value,
    /// Set at most once, on entry into a delivered state.
    pub output: Option<DeliveryRecord>,
    pub source_platform: Option<SourcePlatform>,
    pub task_number: Option<TaskNumber>,
    pub profit: Option<ProfitBreakdown>,
    pub failure_reason: Option<String>,
    pub refund_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Record a captured payment as a new `PENDING` transaction.
    #[must_use]
    pub fn new(
        buyer: BuyerId,
        listing: ListingId,
        payment_reference: PaymentReference,
        amount_paid: Cents,
        input: serde_json::Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: TransactionId::new(),
            buyer,
            listing,
            payment_reference,
            amount_paid,
            state: TransactionState::Pending,
            input,
            output: None,
            source_platform: None,
            task_number: None,
            profit: None,
            failure_reason: None,
            refund_reference: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Time from payment capture to completion, if completed.
    #[must_use]
    pub fn fulfillment_latency(&self) -> Option<chrono::Duration> {
        self.completed_at.map(|done| done - self.created_at)
    }
}

/// Field changes applied atomically together with a state transition.
///
/// `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionUpdate {
    pub output: Option<DeliveryRecord>,
    pub source_platform: Option<SourcePlatform>,
    pub task_number: Option<TaskNumber>,
    pub profit: Option<ProfitBreakdown>,
    pub failure_reason: Option<String>,
    pub refund_reference: Option<String>,
}

impl TransactionUpdate {
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_output(mut self, output: DeliveryRecord) -> Self {
        self.output = Some(output);
        self
    }

    #[must_use]
    pub fn with_platform(mut self, platform: SourcePlatform) -> Self {
        self.source_platform = Some(platform);
        self
    }

    #[must_use]
    pub fn with_task(mut self, task_number: TaskNumber) -> Self {
        self.task_number = Some(task_number);
        self
    }

    #[must_use]
    pub fn with_profit(mut self, profit: ProfitBreakdown) -> Self {
        self.profit = Some(profit);
        self
    }

    #[must_use]
    pub fn with_failure(mut self, reason: impl Into<String>) -> Self {
        self.failure_reason = Some(reason.into());
        self
    }

    #[must_use]
    pub fn with_refund_reference(mut self, reference: impl Into<String>) -> Self {
        self.refund_reference = Some(reference.into());
        self
    }

    /// Apply the update to `tx` after a successful transition to `to`.
    ///
    /// Callers (stores) have already checked the output-at-most-once rule.
    pub fn apply(self, tx: &mut Transaction, to: TransactionState, at: DateTime<Utc>) {
        tx.state = to;
        tx.updated_at = at;
        if let Some(output) = self.output {
            tx.output = Some(output);
        }
        if let Some(platform) = self.source_platform {
            tx.source_platform = Some(platform);
        }
        if let Some(task) = self.task_number {
            tx.task_number = Some(task);
        }
        if let Some(profit) = self.profit {
            tx.profit = Some(profit);
        }
        if let Some(reason) = self.failure_reason {
            tx.failure_reason = Some(reason);
        }
        if let Some(reference) = self.refund_reference {
            tx.refund_reference = Some(reference);
        }
        if to == TransactionState::Completed {
            tx.completed_at = Some(at);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TransactionState::*;

    #[test]
    fn processing_is_only_entered_from_pending() {
        for from in TransactionState::ALL {
            assert_eq!(from.can_transition_to(Processing), from == Pending, "{from}");
        }
    }

    #[test]
    fn happy_paths_are_legal() {
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Delivered));
        assert!(Delivered.can_transition_to(Completed));
        assert!(Processing.can_transition_to(AwaitingManual));
        assert!(AwaitingManual.can_transition_to(Completed));
    }

    #[test]
    fn refund_path_is_legal() {
        assert!(Processing.can_transition_to(Failed));
        assert!(Failed.can_transition_to(RefundPending));
        assert!(RefundPending.can_transition_to(Refunded));
        assert!(RefundPending.can_transition_to(RefundFailed));
    }

    #[test]
    fn claim_can_be_released() {
        assert!(Processing.can_transition_to(Pending));
        assert!(!AwaitingManual.can_transition_to(Pending));
    }

    #[test]
    fn terminal_success_and_refunds_have_no_exits() {
        for to in TransactionState::ALL {
            assert!(!Completed.can_transition_to(to));
            assert!(!Refunded.can_transition_to(to));
            assert!(!RefundFailed.can_transition_to(to));
        }
    }

    #[test]
    fn failed_only_leads_to_refund_pending() {
        for to in TransactionState::ALL {
            assert_eq!(Failed.can_transition_to(to), to == RefundPending);
        }
    }

    #[test]
    fn transition_reports_illegal_moves() {
        assert_eq!(
            Completed.transition(Failed),
            Err(DomainError::InvalidTransition {
                from: Completed,
                to: Failed
            })
        );
        assert_eq!(Pending.transition(Processing), Ok(Processing));
    }

    #[test]
    fn state_names_round_trip() {
        for state in TransactionState::ALL {
            assert_eq!(state.as_str().parse::<TransactionState>(), Ok(state));
        }
        assert!("bogus".parse::<TransactionState>().is_err());
    }

    #[test]
    fn serde_uses_screaming_snake_case() {
        let json = serde_json::to_string(&AwaitingManual).unwrap();
        assert_eq!(json, "\"AWAITING_MANUAL\"");
    }

    #[test]
    fn update_stamps_completion_time() {
        let mut tx = Transaction::new(
            BuyerId::new("buyer"),
            ListingId::new("lst"),
            PaymentReference::new("pi_1"),
            1500,
            serde_json::json!({}),
        );
        let at = tx.created_at + chrono::Duration::seconds(90);
        TransactionUpdate::none().apply(&mut tx, Completed, at);
        assert_eq!(tx.state, Completed);
        assert_eq!(tx.fulfillment_latency(), Some(chrono::Duration::seconds(90)));
    }
}
