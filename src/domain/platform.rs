//! Source platforms and their fulfillment capability.
//!
//! The set of platforms is closed: every tag a listing may carry maps to
//! exactly one variant, and unknown tags fail with
//! [`DomainError::UnsupportedPlatform`] instead of defaulting to manual.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// A third-party platform that listings are sourced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourcePlatform {
    /// RapidAPI-style paid HTTP API.
    RapidApi,
    /// Hugging Face Spaces inference API.
    HuggingFace,
    /// GitHub repository access.
    GitHub,
    /// Fiverr gig, ordered by a human.
    Fiverr,
    /// Upwork contract, ordered by a human.
    Upwork,
}

/// How a platform's fulfillment is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    /// One direct programmatic call, no human step.
    Automated,
    /// A human places the order outside this system.
    Manual,
}

impl SourcePlatform {
    /// Every supported platform.
    pub const ALL: [Self; 5] = [
        Self::RapidApi,
        Self::HuggingFace,
        Self::GitHub,
        Self::Fiverr,
        Self::Upwork,
    ];

    /// Stable lowercase tag used in listings, config, and persisted records.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RapidApi => "rapidapi",
            Self::HuggingFace => "huggingface",
            Self::GitHub => "github",
            Self::Fiverr => "fiverr",
            Self::Upwork => "upwork",
        }
    }

    /// Capability class, derived from the tag and never set independently.
    #[must_use]
    pub const fn access(&self) -> AccessKind {
        match self {
            Self::RapidApi | Self::HuggingFace | Self::GitHub => AccessKind::Automated,
            Self::Fiverr | Self::Upwork => AccessKind::Manual,
        }
    }

    /// True when fulfillment is a direct API call.
    #[must_use]
    pub const fn is_automated(&self) -> bool {
        matches!(self.access(), AccessKind::Automated)
    }

    /// True when calls fail without a resolvable credential.
    ///
    /// Hugging Face and GitHub accept anonymous calls for public resources.
    #[must_use]
    pub const fn requires_credential(&self) -> bool {
        matches!(self, Self::RapidApi)
    }
}

impl fmt::Display for SourcePlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourcePlatform {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == tag)
            .ok_or(DomainError::UnsupportedPlatform {
                tag: s.trim().to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_tags_case_insensitively() {
        assert_eq!("rapidapi".parse(), Ok(SourcePlatform::RapidApi));
        assert_eq!(" HuggingFace ".parse(), Ok(SourcePlatform::HuggingFace));
        assert_eq!("GitHub".parse(), Ok(SourcePlatform::GitHub));
        assert_eq!("fiverr".parse(), Ok(SourcePlatform::Fiverr));
        assert_eq!("upwork".parse(), Ok(SourcePlatform::Upwork));
    }

    #[test]
    fn unknown_tag_is_unsupported_not_manual() {
        let err = "default".parse::<SourcePlatform>().unwrap_err();
        assert_eq!(
            err,
            DomainError::UnsupportedPlatform {
                tag: "default".into()
            }
        );
    }

    #[test]
    fn capability_follows_platform() {
        assert!(SourcePlatform::RapidApi.is_automated());
        assert!(SourcePlatform::HuggingFace.is_automated());
        assert!(SourcePlatform::GitHub.is_automated());
        assert_eq!(SourcePlatform::Fiverr.access(), AccessKind::Manual);
        assert_eq!(SourcePlatform::Upwork.access(), AccessKind::Manual);
    }

    #[test]
    fn tags_round_trip_through_display() {
        for platform in SourcePlatform::ALL {
            assert_eq!(platform.to_string().parse(), Ok(platform));
        }
    }
}
