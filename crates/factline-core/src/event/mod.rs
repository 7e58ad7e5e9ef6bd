//! Event data model for the fact ledger.
//!
//! One [`FactEvent`] is one immutable record in the append-only log. The
//! total order within a `(deal_id, fact_key)` scope is `created_at_us`
//! ascending with the rowid-derived [`EventId`] breaking ties, since two
//! producers can land in the same microsecond. Events are never reordered
//! and never physically deleted.

pub mod types;

pub use types::{EventType, UnknownEventType};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::LedgerError;
use crate::model::{Category, DealId, FactKey, FactValue, Source};

/// Unique identifier of a persisted event.
///
/// Wraps the SQLite `AUTOINCREMENT` rowid: assigned at insert, unique, never
/// reused. Doubles as the tie-breaker in the per-fact-key total order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EventId(i64);

impl EventId {
    /// Wrap a raw rowid.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// The raw rowid.
    #[must_use]
    pub const fn raw(self) -> i64 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single immutable record in the fact ledger.
///
/// Only `event_type` ever changes after persistence (and `reason`, once, at
/// human review closure); every other field is written exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactEvent {
    /// Rowid-derived identity, assigned at insert.
    pub id: EventId,

    /// Owning deal. Foreign scope; the ledger does not interpret it.
    pub deal_id: DealId,

    /// Dotted path naming the logical attribute, e.g. `financial.arr`.
    pub fact_key: FactKey,

    /// Category derived from the fact key's leading segment at append time.
    pub category: Category,

    /// The asserted value.
    pub value: FactValue,

    /// Human-readable rendering of the value.
    pub display_value: String,

    /// Optional unit, e.g. `USD` or `%`.
    pub unit: Option<String>,

    /// Producer class that asserted this value.
    pub source: Source,

    /// Producer-asserted reliability, 0..=100.
    pub source_confidence: u8,

    /// Lifecycle type. The only mutable field.
    pub event_type: EventType,

    /// Informational lineage: the event this one replaces or contests.
    /// Never mutated after creation.
    pub supersedes_event_id: Option<EventId>,

    /// Producer name or human id that created this event.
    pub created_by: String,

    /// Free-text justification. Mandatory for human-originated events.
    pub reason: Option<String>,

    /// Creation timestamp, microseconds since the Unix epoch.
    pub created_at_us: i64,
}

impl fmt::Display for FactEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} {} {} = {} [{} conf={}]",
            self.id,
            self.event_type,
            self.deal_id,
            self.fact_key,
            self.display_value,
            self.source,
            self.source_confidence,
        )
    }
}

/// A candidate fact as submitted by a producer, before arbitration.
///
/// `fact_key` is already validated by construction ([`FactKey::new`]);
/// [`FactDraft::validate`] checks the remaining field-level rules before any
/// lock is taken or row written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactDraft {
    pub deal_id: DealId,
    pub fact_key: FactKey,
    pub value: FactValue,
    pub display_value: String,
    pub unit: Option<String>,
    pub source: Source,
    pub source_confidence: u8,
    pub created_by: String,
    pub reason: Option<String>,
}

impl FactDraft {
    /// Validate field-level rules that types alone cannot enforce.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Validation`] if the deal id or `created_by` is
    /// empty, the confidence exceeds 100, the display value is empty, or a
    /// human-originated submission lacks a reason.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.deal_id.as_str().trim().is_empty() {
            return Err(LedgerError::Validation("deal_id must not be empty".into()));
        }
        if self.created_by.trim().is_empty() {
            return Err(LedgerError::Validation("created_by must not be empty".into()));
        }
        if self.display_value.trim().is_empty() {
            return Err(LedgerError::Validation(
                "display_value must not be empty".into(),
            ));
        }
        if self.source_confidence > 100 {
            return Err(LedgerError::Validation(format!(
                "source_confidence {} exceeds 100",
                self.source_confidence
            )));
        }
        if self.source.is_human() && self.reason.as_deref().is_none_or(|r| r.trim().is_empty()) {
            return Err(LedgerError::Validation(
                "human-originated events require a reason".into(),
            ));
        }
        Ok(())
    }
}

/// Current wall-clock time in microseconds since the Unix epoch.
#[must_use]
pub fn now_us() -> i64 {
    chrono::Utc::now().timestamp_micros()
}
