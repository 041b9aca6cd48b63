//! HTTP source adapter for automated platforms.
//!
//! Request shaping per platform:
//! - **RapidAPI** - `X-RapidAPI-Key` / `X-RapidAPI-Host` headers; credential required
//! - **Hugging Face** - input wrapped as `{"data": [input]}`, optional bearer
//!   token, Space page URLs rewritten to the Space's `/api/predict` endpoint
//! - **GitHub** - authenticated GET; delivers repository access alongside the
//!   API response
//!
//! GET requests carry the buyer input as query parameters, POST as JSON.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, RequestBuilder};
use serde_json::{json, Value};
use tracing::{debug, warn};
use url::Url;

use crate::domain::{ArbitrageListing, DeliveryPayload, EndpointConfig, HttpMethod, SourcePlatform, Transaction};
use crate::error::SourceError;
use crate::port::outbound::secret::{CredentialResolver, Secret};
use crate::port::outbound::source::AutomatedSource;

/// Longest response body kept in a `CallFailed` error.
const MAX_ERROR_BODY: usize = 512;

/// One automated platform reached over HTTP.
pub struct HttpSource {
    http: HttpClient,
    platform: SourcePlatform,
    timeout: Duration,
    credentials: Arc<dyn CredentialResolver>,
}

impl HttpSource {
    /// Build an adapter for `platform` with its own request deadline.
    #[must_use]
    pub fn new(
        platform: SourcePlatform,
        timeout: Duration,
        connect_timeout: Duration,
        credentials: Arc<dyn CredentialResolver>,
    ) -> Self {
        let http = HttpClient::builder()
            .connect_timeout(connect_timeout)
            .user_agent(concat!("arbfill/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|err| {
                warn!(error = %err, "Failed to build HTTP client, using defaults");
                HttpClient::new()
            });

        Self {
            http,
            platform,
            timeout,
            credentials,
        }
    }

    #[must_use]
    pub const fn platform(&self) -> SourcePlatform {
        self.platform
    }

    fn resolve_credential(&self, endpoint: &EndpointConfig) -> Result<Option<Secret>, SourceError> {
        match &endpoint.credential {
            Some(reference) => self
                .credentials
                .resolve(reference)
                .map(Some)
                .ok_or_else(|| SourceError::CredentialMissing {
                    reference: reference.to_string(),
                }),
            None if self.platform.requires_credential() => Err(SourceError::CredentialMissing {
                reference: format!("<{} credential not configured>", self.platform),
            }),
            None => Ok(None),
        }
    }

    fn build_request(
        &self,
        listing: &ArbitrageListing,
        endpoint: &EndpointConfig,
        input: &Value,
        secret: Option<&Secret>,
    ) -> Result<RequestBuilder, SourceError> {
        let request = match self.platform {
            SourcePlatform::RapidApi => {
                let host = rapidapi_host(&endpoint.url)?;
                let request = with_input(&self.http, &endpoint.url, endpoint.method, input)
                    .header("X-RapidAPI-Host", host);
                match secret {
                    Some(key) => request.header("X-RapidAPI-Key", key.expose()),
                    None => request,
                }
            }
            SourcePlatform::HuggingFace => {
                let url = space_api_url(&endpoint.url);
                let request = self.http.post(url).json(&json!({ "data": [input] }));
                with_bearer(request, secret)
            }
            SourcePlatform::GitHub => with_bearer(
                self.http
                    .get(&endpoint.url)
                    .header("Accept", "application/vnd.github+json"),
                secret,
            ),
            SourcePlatform::Fiverr | SourcePlatform::Upwork => {
                return Err(SourceError::CallFailed {
                    status: 0,
                    body: format!("{} listing {} has no API", self.platform, listing.id()),
                })
            }
        };
        Ok(request.timeout(self.timeout))
    }

    fn map_send_error(&self, err: &reqwest::Error) -> SourceError {
        if err.is_timeout() {
            SourceError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else if err.is_connect() {
            SourceError::Unreachable(err.to_string())
        } else {
            SourceError::CallFailed {
                status: err.status().map_or(0, |s| s.as_u16()),
                body: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl AutomatedSource for HttpSource {
    async fn fulfill(
        &self,
        tx: &Transaction,
        listing: &ArbitrageListing,
    ) -> Result<DeliveryPayload, SourceError> {
        let endpoint = listing.endpoint().ok_or_else(|| SourceError::CallFailed {
            status: 0,
            body: format!("listing {} has no endpoint", listing.id()),
        })?;
        let secret = self.resolve_credential(endpoint)?;
        let request = self.build_request(listing, endpoint, &tx.input, secret.as_ref())?;

        debug!(
            transaction_id = %tx.id,
            platform = %self.platform,
            url = %endpoint.url,
            "Calling source"
        );

        let response = request.send().await.map_err(|e| self.map_send_error(&e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                self.map_send_error(&e)
            } else {
                SourceError::Decode(e.to_string())
            }
        })?;

        if !status.is_success() {
            return Err(SourceError::CallFailed {
                status: status.as_u16(),
                body: truncate(&body, MAX_ERROR_BODY),
            });
        }

        let data = parse_body(&body);
        let data = match self.platform {
            SourcePlatform::GitHub => repository_access(listing, data),
            _ => data,
        };
        Ok(DeliveryPayload::ApiResult { data })
    }
}

fn with_input(http: &HttpClient, url: &str, method: HttpMethod, input: &Value) -> RequestBuilder {
    match method {
        HttpMethod::Get => http.get(url).query(&query_pairs(input)),
        HttpMethod::Post => http.post(url).json(input),
    }
}

fn with_bearer(request: RequestBuilder, secret: Option<&Secret>) -> RequestBuilder {
    match secret {
        Some(token) => request.bearer_auth(token.expose()),
        None => request,
    }
}

/// Flatten a JSON object into query pairs. Strings are sent bare, other
/// values as JSON text. Non-objects produce no pairs.
fn query_pairs(input: &Value) -> Vec<(String, String)> {
    match input {
        Value::Object(map) => map
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| {
                let value = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// `host[:port]` of the endpoint, as RapidAPI expects in `X-RapidAPI-Host`.
fn rapidapi_host(endpoint: &str) -> Result<String, SourceError> {
    let url = Url::parse(endpoint).map_err(|e| SourceError::CallFailed {
        status: 0,
        body: format!("invalid endpoint {endpoint}: {e}"),
    })?;
    let host = url.host_str().ok_or_else(|| SourceError::CallFailed {
        status: 0,
        body: format!("endpoint {endpoint} has no host"),
    })?;
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

/// Rewrite `https://huggingface.co/spaces/{user}/{name}` to the Space's
/// predict endpoint. Anything else is used unchanged.
fn space_api_url(endpoint: &str) -> String {
    let Ok(url) = Url::parse(endpoint) else {
        return endpoint.to_string();
    };
    if url.host_str() != Some("huggingface.co") {
        return endpoint.to_string();
    }
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();
    match segments.as_slice() {
        ["spaces", user, name, ..] => {
            let subdomain = format!("{user}-{name}").to_ascii_lowercase().replace(['_', '.'], "-");
            format!("https://{subdomain}.hf.space/api/predict")
        }
        _ => endpoint.to_string(),
    }
}

fn repository_access(listing: &ArbitrageListing, api: Value) -> Value {
    let repo = listing.source_url();
    json!({
        "repository_url": repo,
        "clone_command": format!("git clone {repo}"),
        "instructions": listing.usage_instructions().unwrap_or("See README.md"),
        "api": api,
    })
}

fn parse_body(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

fn truncate(body: &str, max: usize) -> String {
    match body.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
