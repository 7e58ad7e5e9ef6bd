//! Producer classes that assert fact values.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The class of actor asserting a fact value.
///
/// Trust ordering between sources is configuration
/// ([`crate::config::SourceRanks`]), not something baked into this enum; the
/// enum only names the closed set of producer classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Structured extraction from an uploaded document.
    DocumentExtraction,
    /// One of the LLM analysis agent tiers.
    LlmAgent,
    /// An answer submitted directly by the founder.
    FounderResponse,
    /// A human reviewer's explicit override. Maximally trusted.
    HumanOverride,
}

impl Source {
    /// All producer classes in canonical order.
    pub const ALL: [Self; 4] = [
        Self::DocumentExtraction,
        Self::LlmAgent,
        Self::FounderResponse,
        Self::HumanOverride,
    ];

    /// Canonical snake_case string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DocumentExtraction => "document_extraction",
            Self::LlmAgent => "llm_agent",
            Self::FounderResponse => "founder_response",
            Self::HumanOverride => "human_override",
        }
    }

    /// Whether events from this source are human-originated.
    ///
    /// Human-originated events must carry a free-text `reason`.
    #[must_use]
    pub const fn is_human(self) -> bool {
        matches!(self, Self::HumanOverride)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown source string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSource {
    pub raw: String,
}

impl fmt::Display for UnknownSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown source '{}': expected one of document_extraction, llm_agent, \
             founder_response, human_override",
            self.raw
        )
    }
}

impl std::error::Error for UnknownSource {}

impl FromStr for Source {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "document_extraction" => Ok(Self::DocumentExtraction),
            "llm_agent" => Ok(Self::LlmAgent),
            "founder_response" => Ok(Self::FounderResponse),
            "human_override" => Ok(Self::HumanOverride),
            _ => Err(UnknownSource { raw: s.to_string() }),
        }
    }
}
