//! Source adapter port.
//!
//! An automated source performs exactly one outbound call per invocation.
//! Retry policy belongs to the router so attempt counts stay observable.

use async_trait::async_trait;

use crate::domain::{ArbitrageListing, DeliveryPayload, Transaction};
use crate::error::SourceError;

/// A platform whose fulfillment is one programmatic call.
#[async_trait]
pub trait AutomatedSource: Send + Sync {
    /// Obtain the result for `tx` from the listing's endpoint.
    ///
    /// Successful responses map to [`DeliveryPayload::ApiResult`].
    async fn fulfill(
        &self,
        tx: &Transaction,
        listing: &ArbitrageListing,
    ) -> Result<DeliveryPayload, SourceError>;
}
