//! Error taxonomy for the fact ledger.
//!
//! Every failure a caller can observe maps to one [`ErrorCode`] so that
//! producers and the dashboard can branch on a stable `E####` string instead
//! of parsing error text. Validation and not-found errors are deterministic
//! and never retried; concurrency errors are retried internally and only
//! surface once retries are exhausted.

use std::fmt;

use crate::event::EventId;

/// Machine-readable error codes for producer-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Validation,
    ConfigParseError,
    EventNotFound,
    ReviewNotFound,
    IllegalTransition,
    ConcurrentModification,
    ArbitrationConflict,
    StorageFailure,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Validation => "E1001",
            Self::ConfigParseError => "E1002",
            Self::EventNotFound => "E2001",
            Self::ReviewNotFound => "E2002",
            Self::IllegalTransition => "E2003",
            Self::ConcurrentModification => "E3001",
            Self::ArbitrationConflict => "E3002",
            Self::StorageFailure => "E5001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Validation => "Candidate fact failed validation",
            Self::ConfigParseError => "Config file parse error",
            Self::EventNotFound => "Fact event not found",
            Self::ReviewNotFound => "Review not found or already closed",
            Self::IllegalTransition => "Illegal event type transition",
            Self::ConcurrentModification => "Lost a write race on this fact key",
            Self::ArbitrationConflict => "Arbitration retries exhausted",
            Self::StorageFailure => "Ledger storage failure",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and producers.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::Validation => Some("Fix the rejected field and resubmit; nothing was written."),
            Self::ConfigParseError => Some("Fix syntax in factline.toml and retry."),
            Self::EventNotFound => None,
            Self::ReviewNotFound => {
                Some("List pending reviews again; this one may have been closed by someone else.")
            }
            Self::IllegalTransition => {
                Some("Terminal events are immutable; submit a new candidate instead.")
            }
            Self::ConcurrentModification => {
                Some("Re-read current state and resubmit; do not retry with stale inputs.")
            }
            Self::ArbitrationConflict => {
                Some("The fact key is under heavy contention. Back off and resubmit.")
            }
            Self::StorageFailure => Some("Check disk space and database file permissions."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// All errors surfaced by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Malformed candidate or closure input, rejected before any write.
    #[error("validation failed: {0}")]
    Validation(String),

    /// `factline.toml` exists but could not be parsed.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// Referenced event does not exist in the log.
    #[error("event {0} not found")]
    EventNotFound(EventId),

    /// The review id does not resolve to an open PENDING_REVIEW event.
    ///
    /// Already-closed and never-existed are deliberately indistinguishable.
    #[error("review {0} not found or already closed")]
    ReviewNotFound(EventId),

    /// Attempt to flip an event that is already terminal, or to an
    /// unreachable event type.
    #[error("illegal transition for event {id}: {from} -> {to}")]
    IllegalTransition {
        id: EventId,
        from: &'static str,
        to: &'static str,
    },

    /// Lost a serialization race on a fact key. Retried internally.
    #[error("concurrent modification on {context}")]
    ConcurrentModification { context: String },

    /// Concurrency retries exhausted; the caller must back off and resubmit.
    #[error("arbitration conflict on {context} after {attempts} attempts")]
    ArbitrationConflict { context: String, attempts: u32 },

    /// Underlying SQLite failure not attributable to a lock race.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl LedgerError {
    /// The stable machine code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::Validation,
            Self::ConfigParse(_) => ErrorCode::ConfigParseError,
            Self::EventNotFound(_) => ErrorCode::EventNotFound,
            Self::ReviewNotFound(_) => ErrorCode::ReviewNotFound,
            Self::IllegalTransition { .. } => ErrorCode::IllegalTransition,
            Self::ConcurrentModification { .. } => ErrorCode::ConcurrentModification,
            Self::ArbitrationConflict { .. } => ErrorCode::ArbitrationConflict,
            Self::Storage(_) => ErrorCode::StorageFailure,
        }
    }

    /// Whether internal bounded retry is appropriate for this error.
    ///
    /// Validation and not-found errors are deterministic: retrying them with
    /// the same inputs can never succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification { .. })
    }
}

/// Result alias used throughout the core.
pub type Result<T> = std::result::Result<T, LedgerError>;
