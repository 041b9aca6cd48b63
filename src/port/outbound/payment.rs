//! Payment processor port.

use async_trait::async_trait;

use crate::domain::{Cents, PaymentReference};
use crate::error::RefundError;

/// Receipt for an accepted refund.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundReceipt {
    /// Processor-side refund identifier.
    pub refund_id: String,
    /// Amount refunded in minor units.
    pub amount: Cents,
}

/// The processor's full-refund capability.
///
/// One call is one attempt; the refund coordinator owns retries.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn refund(
        &self,
        payment: &PaymentReference,
        amount: Cents,
    ) -> Result<RefundReceipt, RefundError>;
}
