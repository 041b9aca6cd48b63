//! What the buyer receives.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// The result handed to the buyer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeliveryPayload {
    /// Response body of an automated source call.
    ApiResult { data: serde_json::Value },
    /// A file the operator obtained from the source.
    File { path: String },
    /// Credentials (API keys, logins). Shown only to the paying buyer.
    Credentials { lines: Vec<String> },
    /// Free text result.
    TextResult { body: String },
    /// A link to the result.
    Url { url: String },
}

impl DeliveryPayload {
    /// Stable kind tag, matching the serialized `type` field.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ApiResult { .. } => "api_result",
            Self::File { .. } => "file",
            Self::Credentials { .. } => "credentials",
            Self::TextResult { .. } => "text_result",
            Self::Url { .. } => "url",
        }
    }

    /// Short human summary that never includes credential values.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::ApiResult { .. } => "api result".to_string(),
            Self::File { path } => format!("file {path}"),
            Self::Credentials { lines } => format!("{} credential line(s)", lines.len()),
            Self::TextResult { body } => format!("text ({} chars)", body.chars().count()),
            Self::Url { url } => format!("url {url}"),
        }
    }
}

/// A delivered payload with operator notes and a timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub payload: DeliveryPayload,
    #[serde(default)]
    pub notes: Option<String>,
    pub delivered_at: DateTime<Utc>,
}

impl DeliveryRecord {
    /// Record an automated delivery.
    #[must_use]
    pub fn automated(payload: DeliveryPayload, delivered_at: DateTime<Utc>) -> Self {
        Self {
            payload,
            notes: None,
            delivered_at,
        }
    }

    /// Record a manual delivery, rejecting the automated-only `api_result` kind.
    pub fn manual(
        payload: DeliveryPayload,
        notes: Option<String>,
        delivered_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if matches!(payload, DeliveryPayload::ApiResult { .. }) {
            return Err(DomainError::InvalidManualDelivery {
                kind: payload.kind(),
            });
        }
        Ok(Self {
            payload,
            notes: notes.filter(|n| !n.trim().is_empty()),
            delivered_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_serializes_with_type_tag() {
        let payload = DeliveryPayload::File {
            path: "/tmp/logo.png".into(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "file");
        assert_eq!(json["path"], "/tmp/logo.png");
    }

    #[test]
    fn manual_delivery_rejects_api_result() {
        let err = DeliveryRecord::manual(
            DeliveryPayload::ApiResult {
                data: serde_json::json!({}),
            },
            None,
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err, DomainError::InvalidManualDelivery { kind: "api_result" });
    }

    #[test]
    fn manual_delivery_drops_blank_notes() {
        let record = DeliveryRecord::manual(
            DeliveryPayload::Url {
                url: "https://x.test".into(),
            },
            Some("   ".into()),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(record.notes, None);
    }

    #[test]
    fn summary_hides_credential_values() {
        let payload = DeliveryPayload::Credentials {
            lines: vec!["user: a".into(), "pass: hunter2".into()],
        };
        assert!(!payload.summary().contains("hunter2"));
    }
}
