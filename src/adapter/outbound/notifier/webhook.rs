//! Webhook alert sink.
//!
//! Events are queued on a channel and POSTed as JSON by a background worker,
//! so `notify` never blocks the fulfillment path.

use std::time::Duration;

use reqwest::Client as HttpClient;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::port::outbound::notifier::{Event, Notifier};

/// Timeout for a single webhook delivery.
const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts every event to a webhook URL.
pub struct WebhookNotifier {
    /// Channel sender for queuing outbound notifications.
    sender: mpsc::UnboundedSender<Event>,
}

impl WebhookNotifier {
    /// Create the notifier and spawn its delivery worker.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(webhook_worker(url.into(), receiver));
        Self { sender }
    }
}

impl Notifier for WebhookNotifier {
    fn notify(&self, event: Event) {
        if self.sender.send(event).is_err() {
            warn!("Webhook notifier channel closed");
        }
    }
}

/// Background worker that delivers events.
async fn webhook_worker(url: String, mut receiver: mpsc::UnboundedReceiver<Event>) {
    let http = HttpClient::builder()
        .timeout(WEBHOOK_TIMEOUT)
        .build()
        .unwrap_or_else(|err| {
            warn!(error = %err, "Failed to build HTTP client, using defaults");
            HttpClient::new()
        });

    info!(url = %url, "Webhook notifier started");

    while let Some(event) = receiver.recv().await {
        match http.post(&url).json(&event).send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                error!(status = response.status().as_u16(), "Webhook rejected alert");
            }
            Err(e) => error!(error = %e, "Failed to deliver webhook alert"),
        }
    }

    warn!("Webhook notifier worker shutting down");
}
