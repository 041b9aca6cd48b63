//! Stats aggregation over the transaction history and the manual queue.

use std::sync::Arc;

use crate::domain::StatsSummary;
use crate::error::FulfillmentError;
use crate::port::outbound::queue::ManualQueueStore;
use crate::port::outbound::store::TransactionStore;

/// Read-only reporting service.
pub struct StatsAggregator {
    store: Arc<dyn TransactionStore>,
    queue: Arc<dyn ManualQueueStore>,
}

impl StatsAggregator {
    #[must_use]
    pub fn new(store: Arc<dyn TransactionStore>, queue: Arc<dyn ManualQueueStore>) -> Self {
        Self { store, queue }
    }

    /// Summarize everything recorded so far.
    pub async fn summary(&self) -> Result<StatsSummary, FulfillmentError> {
        let transactions = self.store.list().await?;
        let tasks = self.queue.list(None).await?;
        Ok(StatsSummary::from_history(&transactions, &tasks))
    }
}
