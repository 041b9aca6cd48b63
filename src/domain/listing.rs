//! Arbitrage listing metadata: the sourcing contract attached to a listing.

use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::id::{CredentialRef, ListingId};
use super::money::Cents;
use super::platform::{AccessKind, SourcePlatform};

/// HTTP method used for an automated source call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
}

impl HttpMethod {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(|m| m.trim().to_ascii_uppercase()) {
            Some(m) if m == "GET" => Self::Get,
            _ => Self::Post,
        }
    }
}

/// Where and how an automated platform is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Absolute URL of the source API.
    pub url: String,
    /// Request method.
    pub method: HttpMethod,
    /// Handle to the credential, resolved at call time.
    pub credential: Option<CredentialRef>,
}

/// Closed capability tag resolved once when the listing is ingested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    /// Direct API call to the given endpoint.
    Automated(EndpointConfig),
    /// Human-mediated purchase via the manual queue.
    Manual,
}

/// Raw listing metadata as stored in the catalog.
///
/// The platform is an unvalidated tag; convert with
/// [`ArbitrageListing::try_from`] before routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub id: ListingId,
    #[serde(default)]
    pub name: String,
    pub platform: String,
    pub source_url: String,
    pub source_cost: Cents,
    #[serde(default)]
    pub api_endpoint: Option<String>,
    #[serde(default)]
    pub api_method: Option<String>,
    #[serde(default)]
    pub credential: Option<String>,
    #[serde(default)]
    pub usage_instructions: Option<String>,
}

/// Validated arbitrage listing metadata.
///
/// Invariant: automated platforms always carry a non-empty endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArbitrageListing {
    id: ListingId,
    name: String,
    platform: SourcePlatform,
    source_url: String,
    source_cost: Cents,
    capability: Capability,
    usage_instructions: Option<String>,
}

impl ArbitrageListing {
    #[must_use]
    pub fn id(&self) -> &ListingId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn platform(&self) -> SourcePlatform {
        self.platform
    }

    #[must_use]
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    #[must_use]
    pub const fn source_cost(&self) -> Cents {
        self.source_cost
    }

    #[must_use]
    pub const fn capability(&self) -> &Capability {
        &self.capability
    }

    #[must_use]
    pub fn usage_instructions(&self) -> Option<&str> {
        self.usage_instructions.as_deref()
    }

    /// Endpoint configuration, present only for automated platforms.
    #[must_use]
    pub fn endpoint(&self) -> Option<&EndpointConfig> {
        match &self.capability {
            Capability::Automated(endpoint) => Some(endpoint),
            Capability::Manual => None,
        }
    }
}

impl TryFrom<ListingRecord> for ArbitrageListing {
    type Error = DomainError;

    fn try_from(record: ListingRecord) -> Result<Self, Self::Error> {
        let platform: SourcePlatform = record.platform.parse()?;
        if record.source_cost < 0 {
            return Err(DomainError::NegativeSourceCost {
                source_cost: record.source_cost,
            });
        }

        let capability = match platform.access() {
            AccessKind::Automated => {
                let url = record
                    .api_endpoint
                    .as_deref()
                    .map(str::trim)
                    .filter(|u| !u.is_empty())
                    .ok_or_else(|| DomainError::MissingEndpoint {
                        platform: platform.to_string(),
                    })?;
                Capability::Automated(EndpointConfig {
                    url: url.to_string(),
                    method: HttpMethod::parse(record.api_method.as_deref()),
                    credential: record
                        .credential
                        .filter(|c| !c.trim().is_empty())
                        .map(CredentialRef::new),
                })
            }
            AccessKind::Manual => Capability::Manual,
        };

        let name = if record.name.trim().is_empty() {
            record.id.to_string()
        } else {
            record.name
        };

        Ok(Self {
            id: record.id,
            name,
            platform,
            source_url: record.source_url,
            source_cost: record.source_cost,
            capability,
            usage_instructions: record.usage_instructions,
        })
    }
}
