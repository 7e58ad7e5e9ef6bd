//! Event type enum and the legal lifecycle transitions.
//!
//! An event's type is the only field that may change after persistence, and
//! only along the transitions encoded in [`EventType::can_transition_to`].
//! Everything else about an event is immutable; "editing" a fact means
//! appending a new event and flipping the old one terminal.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LedgerError;

/// The six event types in the fact ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// An accepted fact value. Supplies the current value while active.
    Created,
    /// Terminal: replaced by a more-trusted event.
    Superseded,
    /// Terminal: tombstoned. Never physically removed.
    Deleted,
    /// A conflicting candidate folded into an already-open review; it
    /// references that review. Active but does not supply the current value.
    Disputed,
    /// An escalated candidate awaiting human closure. Active but does not
    /// supply the current value.
    PendingReview,
    /// Terminal: a review candidate dismissed by a human.
    Resolved,
}

/// Error returned when parsing an unknown event type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEventType {
    pub raw: String,
}

impl fmt::Display for UnknownEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown event type '{}': expected one of created, superseded, deleted, \
             disputed, pending_review, resolved",
            self.raw
        )
    }
}

impl std::error::Error for UnknownEventType {}

impl EventType {
    /// All event types in catalog order.
    pub const ALL: [Self; 6] = [
        Self::Created,
        Self::Superseded,
        Self::Deleted,
        Self::Disputed,
        Self::PendingReview,
        Self::Resolved,
    ];

    /// Canonical snake_case string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Superseded => "superseded",
            Self::Deleted => "deleted",
            Self::Disputed => "disputed",
            Self::PendingReview => "pending_review",
            Self::Resolved => "resolved",
        }
    }

    /// Terminal types contribute nothing further to current-state resolution
    /// and can never transition again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Superseded | Self::Deleted | Self::Resolved)
    }

    /// Active := not terminal. At most one active event exists per fact key,
    /// excluding at most one outstanding [`Self::PendingReview`].
    #[must_use]
    pub const fn is_active(self) -> bool {
        !self.is_terminal()
    }

    /// Whether an active event of this type supplies the fact's current
    /// value. Pending reviews and dispute markers are active but valueless.
    #[must_use]
    pub const fn supplies_current_value(self) -> bool {
        matches!(self, Self::Created)
    }

    /// Validate a transition from `self` to `target`.
    ///
    /// Legal transitions:
    /// - `created -> superseded | deleted`
    /// - `pending_review -> created` (promotion via ACCEPT_NEW)
    /// - `pending_review -> resolved | superseded | deleted`
    /// - `disputed -> resolved | superseded | deleted`
    ///
    /// Terminal types transition nowhere.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::IllegalTransition`] (with a placeholder event
    /// id of 0 filled in by the caller) if the transition is not allowed.
    pub fn can_transition_to(self, target: Self) -> Result<(), LedgerError> {
        let allowed = matches!(
            (self, target),
            (Self::Created, Self::Superseded | Self::Deleted)
                | (
                    Self::PendingReview | Self::Disputed,
                    Self::Resolved | Self::Superseded | Self::Deleted
                )
                | (Self::PendingReview, Self::Created)
        );
        if allowed {
            Ok(())
        } else {
            Err(LedgerError::IllegalTransition {
                id: super::EventId::new(0),
                from: self.as_str(),
                to: target.as_str(),
            })
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "superseded" => Ok(Self::Superseded),
            "deleted" => Ok(Self::Deleted),
            "disputed" => Ok(Self::Disputed),
            "pending_review" => Ok(Self::PendingReview),
            "resolved" => Ok(Self::Resolved),
            _ => Err(UnknownEventType { raw: s.to_string() }),
        }
    }
}

// Custom serde: serialize as the snake_case string.
impl Serialize for EventType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_fromstr_roundtrip() {
        for et in EventType::ALL {
            let parsed: EventType = et.as_str().parse().expect("roundtrip");
            assert_eq!(parsed, et);
        }
    }

    #[test]
    fn fromstr_rejects_unknown() {
        let err = "archived".parse::<EventType>().unwrap_err();
        assert_eq!(err.raw, "archived");
        assert!(err.to_string().contains("expected one of"));
    }

    #[test]
    fn terminal_partition() {
        for et in EventType::ALL {
            assert_ne!(et.is_terminal(), et.is_active());
        }
        assert!(EventType::Superseded.is_terminal());
        assert!(EventType::Deleted.is_terminal());
        assert!(EventType::Resolved.is_terminal());
        assert!(EventType::Created.is_active());
        assert!(EventType::PendingReview.is_active());
        assert!(EventType::Disputed.is_active());
    }

    #[test]
    fn only_created_supplies_current_value() {
        for et in EventType::ALL {
            assert_eq!(et.supplies_current_value(), et == EventType::Created);
        }
    }

    #[test]
    fn created_transitions() {
        assert!(EventType::Created.can_transition_to(EventType::Superseded).is_ok());
        assert!(EventType::Created.can_transition_to(EventType::Deleted).is_ok());
        assert!(EventType::Created.can_transition_to(EventType::Resolved).is_err());
        assert!(EventType::Created.can_transition_to(EventType::PendingReview).is_err());
    }

    #[test]
    fn pending_review_transitions_include_promotion() {
        assert!(EventType::PendingReview.can_transition_to(EventType::Created).is_ok());
        assert!(EventType::PendingReview.can_transition_to(EventType::Resolved).is_ok());
        assert!(EventType::PendingReview.can_transition_to(EventType::Superseded).is_ok());
        assert!(EventType::PendingReview.can_transition_to(EventType::Disputed).is_err());
    }

    #[test]
    fn disputed_cannot_be_promoted() {
        assert!(EventType::Disputed.can_transition_to(EventType::Resolved).is_ok());
        assert!(EventType::Disputed.can_transition_to(EventType::Created).is_err());
    }

    #[test]
    fn terminal_types_transition_nowhere() {
        for from in [EventType::Superseded, EventType::Deleted, EventType::Resolved] {
            for to in EventType::ALL {
                assert!(from.can_transition_to(to).is_err(), "{from} -> {to} allowed");
            }
        }
    }

    #[test]
    fn serde_roundtrip() {
        for et in EventType::ALL {
            let json = serde_json::to_string(&et).expect("serialize");
            assert_eq!(json, format!("\"{}\"", et.as_str()));
            let back: EventType = serde_json::from_str(&json).expect("deserialize");
            assert_eq!(back, et);
        }
    }
}
