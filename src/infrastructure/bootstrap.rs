//! Infrastructure bootstrap helpers for runtime wiring.
//!
//! [`Services`] is the composition root: it opens the durable stores once and
//! builds the router, SLA monitor, and stats aggregator on top of them.

use std::sync::Arc;

use tracing::{info, warn};

use crate::adapter::outbound::catalog::FileCatalog;
use crate::adapter::outbound::notifier::WebhookNotifier;
use crate::adapter::outbound::payment::{HttpPaymentProcessor, UnconfiguredProcessor};
use crate::adapter::outbound::queue::JsonlQueueStore;
use crate::adapter::outbound::secret::EnvCredentialResolver;
use crate::adapter::outbound::source::{HttpSource, ManualSource};
use crate::adapter::outbound::sqlite::database::connection::{create_pool, run_migrations};
use crate::adapter::outbound::sqlite::SqliteTransactionStore;
use crate::application::{
    FulfillmentRouter, RouterPorts, SlaMonitor, SourceRegistry, StatsAggregator,
};
use crate::domain::{ProfitCalculator, SourcePlatform};
use crate::error::Result;
use crate::infrastructure::config::settings::Config;
use crate::port::outbound::notifier::{LogNotifier, Notifier, NotifierRegistry};
use crate::port::outbound::payment::PaymentProcessor;
use crate::port::outbound::queue::ManualQueueStore;
use crate::port::outbound::secret::CredentialResolver;
use crate::port::outbound::store::TransactionStore;

/// Build notifier registry from configuration.
///
/// Always logs; adds the webhook sink when `alerts.webhook_url` is set.
/// Must be called inside a Tokio runtime when a webhook is configured.
pub(crate) fn build_notifier_registry(config: &Config) -> NotifierRegistry {
    let mut registry = NotifierRegistry::new();
    registry.register(Box::new(LogNotifier));
    if let Some(url) = &config.alerts.webhook_url {
        info!(url = %url, "Webhook alerts enabled");
        registry.register(Box::new(WebhookNotifier::new(url.clone())));
    }
    registry
}

/// Open the SQLite store and apply pending migrations.
pub(crate) fn build_transaction_store(config: &Config) -> Result<Arc<dyn TransactionStore>> {
    let pool = create_pool(&config.database)?;
    run_migrations(&pool)?;
    Ok(Arc::new(SqliteTransactionStore::new(pool)))
}

/// Replay the queue log and open it for appends.
pub(crate) async fn build_queue(config: &Config) -> Result<Arc<dyn ManualQueueStore>> {
    let queue = JsonlQueueStore::open(&config.queue.path).await?;
    Ok(Arc::new(queue))
}

/// One HTTP adapter per automated platform, each with its own deadline.
pub(crate) fn build_source_registry(
    config: &Config,
    queue: Arc<dyn ManualQueueStore>,
    credentials: Arc<dyn CredentialResolver>,
) -> SourceRegistry {
    let mut registry = SourceRegistry::new(ManualSource::new(queue));
    for platform in SourcePlatform::ALL {
        if platform.is_automated() {
            registry.register(
                platform,
                Arc::new(HttpSource::new(
                    platform,
                    config.source.timeout_for(platform),
                    config.source.connect_timeout(),
                    Arc::clone(&credentials),
                )),
            );
        }
    }
    registry
}

/// The HTTP processor when `PAYMENT_PROCESSOR_KEY` is set, otherwise a stub
/// that rejects every refund.
pub(crate) fn build_payment_processor(config: &Config) -> Arc<dyn PaymentProcessor> {
    match Config::payment_processor_key() {
        Some(key) => Arc::new(HttpPaymentProcessor::new(
            config.refund.api_url.clone(),
            key,
            config.refund.timeout(),
        )),
        None => {
            warn!("PAYMENT_PROCESSOR_KEY is not set; refunds will fail");
            Arc::new(UnconfiguredProcessor)
        }
    }
}

/// Long-lived handles shared by every command.
pub struct Services {
    pub config: Config,
    pub store: Arc<dyn TransactionStore>,
    pub queue: Arc<dyn ManualQueueStore>,
    pub notifier: Arc<dyn Notifier>,
}

impl Services {
    /// Open the transaction store and the queue log.
    ///
    /// # Errors
    ///
    /// Fails when the database cannot be opened or migrated, or the queue log
    /// cannot be read.
    pub async fn open(config: Config) -> Result<Self> {
        let store = build_transaction_store(&config)?;
        let queue = build_queue(&config).await?;
        let notifier: Arc<dyn Notifier> = Arc::new(build_notifier_registry(&config));
        info!(
            database = %config.database,
            queue = %config.queue.path,
            "Services opened"
        );
        Ok(Self {
            config,
            store,
            queue,
            notifier,
        })
    }

    /// Build the fulfillment router.
    ///
    /// # Errors
    ///
    /// Fails when the listing catalog cannot be loaded.
    pub fn router(&self) -> Result<Arc<FulfillmentRouter>> {
        let catalog = FileCatalog::load(&self.config.catalog)?;
        info!(catalog = %self.config.catalog, listings = catalog.len(), "Catalog loaded");

        let credentials: Arc<dyn CredentialResolver> = Arc::new(EnvCredentialResolver);
        let sources = build_source_registry(&self.config, Arc::clone(&self.queue), credentials);

        let router = FulfillmentRouter::new(
            RouterPorts {
                store: Arc::clone(&self.store),
                catalog: Arc::new(catalog),
                queue: Arc::clone(&self.queue),
                payments: build_payment_processor(&self.config),
                notifier: Arc::clone(&self.notifier),
            },
            sources,
            ProfitCalculator::new(self.config.fees.schedule()),
            self.config.router(),
        );
        Ok(Arc::new(router))
    }

    /// SLA monitor; attaches `router` for automatic refunds when given.
    #[must_use]
    pub fn sla_monitor(&self, router: Option<Arc<FulfillmentRouter>>) -> SlaMonitor {
        let monitor = SlaMonitor::new(
            Arc::clone(&self.queue),
            Arc::clone(&self.store),
            Arc::clone(&self.notifier),
            self.config.sla.monitor_config(),
        );
        match router {
            Some(router) => monitor.with_router(router),
            None => monitor,
        }
    }

    #[must_use]
    pub fn stats(&self) -> StatsAggregator {
        StatsAggregator::new(Arc::clone(&self.store), Arc::clone(&self.queue))
    }
}
