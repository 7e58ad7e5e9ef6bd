//! Ledger configuration.
//!
//! Every arbitration policy constant lives here as a named field so the
//! decision algorithm stays free of magic numbers and policy can be tuned
//! from `factline.toml` without touching code.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::LedgerError;
use crate::model::Source;

/// Top-level configuration for a ledger instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub arbitration: ArbitrationConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl LedgerConfig {
    /// Load configuration from a TOML file, falling back to defaults when
    /// the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| LedgerError::ConfigParse(format!("{}: {e}", path.display())))?;
        Ok(config)
    }

    /// Render this configuration as TOML, e.g. for `fl init --with-config`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (it cannot for well-formed
    /// config values).
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("serialize config to TOML")
    }
}

/// Policy knobs for the arbitration decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbitrationConfig {
    /// Same-rank confidence margin: a candidate at equal source rank must
    /// exceed the current event's confidence by at least this many points to
    /// dominate.
    #[serde(default = "default_confidence_margin")]
    pub confidence_margin: u8,

    /// Relative tolerance under which two numeric values count as the same.
    #[serde(default = "default_numeric_tolerance")]
    pub numeric_tolerance: f64,

    /// Trust ranks per producer class. Higher rank wins outright.
    #[serde(default)]
    pub source_ranks: SourceRanks,
}

impl Default for ArbitrationConfig {
    fn default() -> Self {
        Self {
            confidence_margin: default_confidence_margin(),
            numeric_tolerance: default_numeric_tolerance(),
            source_ranks: SourceRanks::default(),
        }
    }
}

/// Trust rank per producer class.
///
/// Defaults encode HUMAN_OVERRIDE > FOUNDER_RESPONSE > DOCUMENT_EXTRACTION >
/// LLM_AGENT. A strictly higher rank dominates regardless of confidence; a
/// lower rank never dominates regardless of confidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRanks {
    #[serde(default = "default_rank_human_override")]
    pub human_override: u8,
    #[serde(default = "default_rank_founder_response")]
    pub founder_response: u8,
    #[serde(default = "default_rank_document_extraction")]
    pub document_extraction: u8,
    #[serde(default = "default_rank_llm_agent")]
    pub llm_agent: u8,
}

impl Default for SourceRanks {
    fn default() -> Self {
        Self {
            human_override: default_rank_human_override(),
            founder_response: default_rank_founder_response(),
            document_extraction: default_rank_document_extraction(),
            llm_agent: default_rank_llm_agent(),
        }
    }
}

impl SourceRanks {
    /// The configured rank for a producer class.
    #[must_use]
    pub const fn rank(&self, source: Source) -> u8 {
        match source {
            Source::HumanOverride => self.human_override,
            Source::FounderResponse => self.founder_response,
            Source::DocumentExtraction => self.document_extraction,
            Source::LlmAgent => self.llm_agent,
        }
    }
}

/// Bounded retry policy for lock races on a fact key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts (first try included) before surfacing
    /// `ArbitrationConflict`.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base backoff delay in milliseconds; doubles per attempt.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound on a single backoff delay, jitter included.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

const fn default_confidence_margin() -> u8 {
    15
}

const fn default_numeric_tolerance() -> f64 {
    1e-6
}

const fn default_rank_human_override() -> u8 {
    3
}

const fn default_rank_founder_response() -> u8 {
    2
}

const fn default_rank_document_extraction() -> u8 {
    1
}

const fn default_rank_llm_agent() -> u8 {
    0
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_base_delay_ms() -> u64 {
    25
}

const fn default_max_delay_ms() -> u64 {
    250
}
