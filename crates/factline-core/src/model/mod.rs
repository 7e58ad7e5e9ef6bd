//! Core domain types: fact keys, categories, sources, and values.

pub mod fact_key;
pub mod source;
pub mod value;

pub use fact_key::{Category, FactKey};
pub use source::Source;
pub use value::FactValue;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of the deal that owns a fact. The ledger never interprets deal
/// semantics; this is a foreign scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DealId(String);

impl DealId {
    /// Wrap a deal identifier. Emptiness is checked at submission time, not
    /// here, so query paths can construct ids freely.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DealId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DealId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
