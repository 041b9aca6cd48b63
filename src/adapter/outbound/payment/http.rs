//! HTTP payment processor client (Stripe-style refunds API).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::{Cents, PaymentReference};
use crate::error::RefundError;
use crate::port::outbound::payment::{PaymentProcessor, RefundReceipt};
use crate::port::outbound::secret::Secret;

/// Reason code attached to every refund.
const REFUND_REASON: &str = "failed_fulfillment";

#[derive(Debug, Deserialize)]
struct RefundResponse {
    id: String,
    #[serde(default)]
    amount: Option<Cents>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Issues full refunds with `POST {api_url}/refunds`.
///
/// Each call carries an idempotency key derived from the payment reference, so
/// a retried refund cannot pay the buyer twice.
pub struct HttpPaymentProcessor {
    http: HttpClient,
    api_url: String,
    api_key: Secret,
    timeout: Duration,
}

impl HttpPaymentProcessor {
    #[must_use]
    pub fn new(api_url: impl Into<String>, api_key: Secret, timeout: Duration) -> Self {
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|err| {
                warn!(error = %err, "Failed to build HTTP client, using defaults");
                HttpClient::new()
            });
        Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_key,
            timeout,
        }
    }

    fn map_send_error(&self, err: &reqwest::Error) -> RefundError {
        if err.is_timeout() {
            RefundError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            RefundError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl PaymentProcessor for HttpPaymentProcessor {
    async fn refund(
        &self,
        payment: &PaymentReference,
        amount: Cents,
    ) -> Result<RefundReceipt, RefundError> {
        let url = format!("{}/refunds", self.api_url);
        let amount_field = amount.to_string();
        debug!(payment = %payment, amount, "Requesting refund");

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.api_key.expose())
            .header("Idempotency-Key", format!("refund-{payment}"))
            .form(&[
                ("payment_intent", payment.as_str()),
                ("amount", amount_field.as_str()),
                ("reason", REFUND_REASON),
            ])
            .send()
            .await
            .map_err(|e| self.map_send_error(&e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.map_send_error(&e))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(RefundError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: RefundResponse = serde_json::from_str(&body)
            .map_err(|e| RefundError::Transport(format!("unreadable refund response: {e}")))?;
        if let Some(state) = parsed.status.as_deref() {
            if matches!(state, "failed" | "canceled") {
                return Err(RefundError::Rejected {
                    status: status.as_u16(),
                    message: format!("refund {} is {state}", parsed.id),
                });
            }
        }

        Ok(RefundReceipt {
            refund_id: parsed.id,
            amount: parsed.amount.unwrap_or(amount),
        })
    }
}
