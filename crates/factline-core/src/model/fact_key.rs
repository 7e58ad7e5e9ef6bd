//! Validated dotted fact keys and the closed category enumeration.
//!
//! A fact key is a dotted path naming one logical attribute of a deal, e.g.
//! `financial.arr` or `team.founder_count`. The leading segment derives the
//! [`Category`]; unknown prefixes fall back to [`Category::Other`] rather
//! than failing, so a producer with a novel key never blocks ingestion.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LedgerError;

/// The closed category enumeration derived from a fact key's first segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Financial,
    Team,
    Market,
    Product,
    Legal,
    Competition,
    Traction,
    Other,
}

impl Category {
    /// All categories in canonical order.
    pub const ALL: [Self; 8] = [
        Self::Financial,
        Self::Team,
        Self::Market,
        Self::Product,
        Self::Legal,
        Self::Competition,
        Self::Traction,
        Self::Other,
    ];

    /// Canonical lowercase string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Financial => "financial",
            Self::Team => "team",
            Self::Market => "market",
            Self::Product => "product",
            Self::Legal => "legal",
            Self::Competition => "competition",
            Self::Traction => "traction",
            Self::Other => "other",
        }
    }

    /// Derive a category from a fact key's leading segment.
    ///
    /// Unknown prefixes map to [`Self::Other`] so ingestion never fails on a
    /// novel key family.
    #[must_use]
    pub fn from_prefix(prefix: &str) -> Self {
        prefix.parse().unwrap_or(Self::Other)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown category string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory {
    pub raw: String,
}

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown category '{}'", self.raw)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "financial" => Ok(Self::Financial),
            "team" => Ok(Self::Team),
            "market" => Ok(Self::Market),
            "product" => Ok(Self::Product),
            "legal" => Ok(Self::Legal),
            "competition" => Ok(Self::Competition),
            "traction" => Ok(Self::Traction),
            "other" => Ok(Self::Other),
            _ => Err(UnknownCategory { raw: s.to_string() }),
        }
    }
}

/// A validated dotted fact key.
///
/// Keys are lowercase dotted paths with segments of `[a-z0-9_]`. Validation
/// lowercases input but rejects empty segments and foreign characters, so two
/// producers spelling the same key differently collapse onto one history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FactKey(String);

impl FactKey {
    /// Parse and normalize a fact key.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Validation`] if the key is empty, has an empty
    /// segment, or contains characters outside `[a-z0-9_.]` after
    /// lowercasing.
    pub fn new(raw: &str) -> Result<Self, LedgerError> {
        let key = raw.trim().to_ascii_lowercase();
        if key.is_empty() {
            return Err(LedgerError::Validation("fact key must not be empty".into()));
        }
        for segment in key.split('.') {
            if segment.is_empty() {
                return Err(LedgerError::Validation(format!(
                    "fact key '{key}' has an empty segment"
                )));
            }
            if !segment
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
            {
                return Err(LedgerError::Validation(format!(
                    "fact key segment '{segment}' contains invalid characters"
                )));
            }
        }
        Ok(Self(key))
    }

    /// The raw dotted key string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The category derived from the leading segment.
    #[must_use]
    pub fn category(&self) -> Category {
        let prefix = self.0.split('.').next().unwrap_or_default();
        Category::from_prefix(prefix)
    }
}

impl fmt::Display for FactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for FactKey {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for FactKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::new(&s).map_err(serde::de::Error::custom)
    }
}
