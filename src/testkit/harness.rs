//! A fully wired in-memory fulfillment router.

use std::sync::Arc;

use crate::adapter::outbound::catalog::MemoryCatalog;
use crate::adapter::outbound::memory::MemoryTransactionStore;
use crate::adapter::outbound::queue::MemoryQueueStore;
use crate::adapter::outbound::source::ManualSource;
use crate::application::{
    FulfillmentRouter, NewSale, RouterConfig, RouterPorts, SlaConfig, SlaMonitor, SourceRegistry,
};
use crate::domain::{
    BuyerId, Cents, FeeSchedule, ListingRecord, PaymentReference, ProfitCalculator,
    SourcePlatform, Transaction,
};
use crate::port::outbound::queue::ManualQueueStore;
use crate::port::outbound::source::AutomatedSource;
use crate::port::outbound::store::TransactionStore;

use super::doubles::{RecordingNotifier, ScriptedPaymentProcessor};

/// Router plus handles on every port it talks to.
pub struct Harness {
    pub router: Arc<FulfillmentRouter>,
    pub store: Arc<dyn TransactionStore>,
    pub queue: Arc<dyn ManualQueueStore>,
    pub catalog: Arc<MemoryCatalog>,
    pub payments: Arc<ScriptedPaymentProcessor>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder::default()
    }

    /// Put `listing` in the catalog and record a sale of it.
    pub async fn sale(&self, listing: ListingRecord, amount_paid: Cents) -> Transaction {
        let listing_id = listing.id.clone();
        self.catalog.insert(listing);
        self.router
            .record(NewSale {
                buyer: BuyerId::new("buyer-1"),
                payment_reference: PaymentReference::new(format!("pi_{listing_id}")),
                listing: listing_id,
                amount_paid,
                input: serde_json::json!({"prompt": "a red fox"}),
            })
            .await
            .expect("record sale")
    }

    /// SLA monitor sharing this harness's ports and router.
    pub fn sla(&self, config: SlaConfig) -> SlaMonitor {
        SlaMonitor::new(
            self.queue.clone(),
            self.store.clone(),
            self.notifier.clone(),
            config,
        )
            .with_router(self.router.clone())
    }
}

/// Builder for [`Harness`]. Every port defaults to an in-memory double.
pub struct HarnessBuilder {
    store: Option<Arc<dyn TransactionStore>>,
    queue: Option<Arc<dyn ManualQueueStore>>,
    payments: Option<Arc<ScriptedPaymentProcessor>>,
    automated: Vec<(SourcePlatform, Arc<dyn AutomatedSource>)>,
    fees: FeeSchedule,
    config: RouterConfig,
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self {
            store: None,
            queue: None,
            payments: None,
            automated: Vec::new(),
            fees: FeeSchedule::default(),
            config: super::config::router(),
        }
    }
}

impl HarnessBuilder {
    pub fn store(mut self, store: Arc<dyn TransactionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn queue(mut self, queue: Arc<dyn ManualQueueStore>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn payments(mut self, payments: Arc<ScriptedPaymentProcessor>) -> Self {
        self.payments = Some(payments);
        self
    }

    pub fn automated(mut self, platform: SourcePlatform, source: Arc<dyn AutomatedSource>) -> Self {
        self.automated.push((platform, source));
        self
    }

    pub fn fees(mut self, fees: FeeSchedule) -> Self {
        self.fees = fees;
        self
    }

    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Harness {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryTransactionStore::new()) as Arc<dyn TransactionStore>);
        let queue = self
            .queue
            .unwrap_or_else(|| Arc::new(MemoryQueueStore::new()) as Arc<dyn ManualQueueStore>);
        let payments = self
            .payments
            .unwrap_or_else(|| Arc::new(ScriptedPaymentProcessor::succeeding()));
        let catalog = Arc::new(MemoryCatalog::new());
        let notifier = Arc::new(RecordingNotifier::new());

        let mut sources = SourceRegistry::new(ManualSource::new(queue.clone()));
        for (platform, source) in self.automated {
            sources.register(platform, source);
        }

        let router = FulfillmentRouter::new(
            RouterPorts {
                store: store.clone(),
                catalog: catalog.clone(),
                queue: queue.clone(),
                payments: payments.clone(),
                notifier: notifier.clone(),
            },
            sources,
            ProfitCalculator::new(self.fees),
            self.config,
        );

        Harness {
            router: Arc::new(router),
            store,
            queue,
            catalog,
            payments,
            notifier,
        }
    }
}
