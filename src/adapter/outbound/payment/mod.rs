//! Payment processor adapters.

pub mod http;

use async_trait::async_trait;

pub use http::HttpPaymentProcessor;

use crate::domain::{Cents, PaymentReference};
use crate::error::RefundError;
use crate::port::outbound::payment::{PaymentProcessor, RefundReceipt};

/// Stand-in used when no processor key is configured.
///
/// Commands that never refund (queue review, stats) can still build a router;
/// any refund attempt fails without touching the network.
pub struct UnconfiguredProcessor;

#[async_trait]
impl PaymentProcessor for UnconfiguredProcessor {
    async fn refund(
        &self,
        _payment: &PaymentReference,
        _amount: Cents,
    ) -> Result<RefundReceipt, RefundError> {
        Err(RefundError::Rejected {
            status: 0,
            message: "payment processor key is not configured".to_string(),
        })
    }
}
