//! Review workflow: human closure of escalated facts.
//!
//! A PENDING_REVIEW event has exactly three exits, each applied as one
//! all-or-nothing transaction:
//!
//! - ACCEPT_NEW: prior current is superseded, the pending event is promoted
//!   to CREATED and becomes the current value
//! - KEEP_EXISTING: the pending event is resolved (dismissed); the prior
//!   current value is untouched
//! - OVERRIDE: both sides are closed out and a fresh HUMAN_OVERRIDE event at
//!   confidence 100 becomes the current value, without re-entering
//!   arbitration
//!
//! Candidates that arrived while the review was open sit in the log as
//! DISPUTED markers pointing at it; every closure resolves those markers
//! along with the review itself.
//!
//! A closed review can only be reopened by a brand-new candidate submission,
//! never by reverting state.

use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::arbitration::{backoff_delay, map_lock_error};
use crate::config::RetryConfig;
use crate::db::log;
use crate::error::{LedgerError, Result};
use crate::event::{now_us, EventId, EventType, FactDraft, FactEvent};
use crate::model::{DealId, FactValue, Source};

/// Reason prefixes distinguishing the three human closures in the log.
const ACCEPT_PREFIX: &str = "[human-accepted]";
const KEEP_PREFIX: &str = "[human-kept-existing]";

/// A pending review as surfaced to the human-review UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingReview {
    /// Id of the PENDING_REVIEW event; pass this to [`resolve_review`].
    pub review_id: EventId,
    pub deal_id: DealId,
    pub fact_key: crate::model::FactKey,

    /// The escalated candidate.
    pub new_value: FactValue,
    pub new_display_value: String,
    pub new_source: Source,
    pub new_confidence: u8,

    /// The value that was current when the conflict arose, if still known.
    pub existing_value: Option<FactValue>,
    pub existing_display_value: Option<String>,

    /// The producer's stated justification for the conflicting candidate.
    pub contradiction_reason: Option<String>,
    pub created_at_us: i64,

    /// Later conflicting candidates folded into this review while it was
    /// open, oldest first. Closing the review resolves them all.
    pub folded: Vec<FoldedCandidate>,
}

/// A candidate recorded as DISPUTED against an already-open review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldedCandidate {
    pub event_id: EventId,
    pub value: FactValue,
    pub display_value: String,
    pub source: Source,
    pub confidence: u8,
}

/// The three closure decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    /// Promote the escalated candidate to the current value.
    AcceptNew,
    /// Dismiss the candidate; the existing value stands.
    KeepExisting,
    /// Discard both sides in favor of a human-supplied value.
    Override {
        value: FactValue,
        display_value: String,
        unit: Option<String>,
    },
}

impl ReviewDecision {
    /// Canonical name for logs and CLI output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AcceptNew => "accept_new",
            Self::KeepExisting => "keep_existing",
            Self::Override { .. } => "override",
        }
    }
}

impl fmt::Display for ReviewDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful closure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewOutcome {
    pub review_id: EventId,
    pub decision: String,
    /// The event now supplying the current value, when the closure produced
    /// or promoted one (`None` for KEEP_EXISTING with a since-deleted prior).
    pub current_event_id: Option<EventId>,
}

/// List every outstanding review for a deal, oldest first.
///
/// # Errors
///
/// Returns a storage error if the query fails.
pub fn list_pending(conn: &Connection, deal_id: &DealId) -> Result<Vec<PendingReview>> {
    let events = log::pending_reviews_for_deal(conn, deal_id)?;
    let mut reviews = Vec::with_capacity(events.len());
    for event in events {
        let existing = event
            .supersedes_event_id
            .map(|id| log::get_event(conn, id))
            .transpose()?;
        let folded = log::open_disputes(conn, &event.deal_id, &event.fact_key)?
            .into_iter()
            .map(|marker| FoldedCandidate {
                event_id: marker.id,
                value: marker.value,
                display_value: marker.display_value,
                source: marker.source,
                confidence: marker.source_confidence,
            })
            .collect();
        reviews.push(summarize(event, existing.as_ref(), folded));
    }
    Ok(reviews)
}

fn summarize(
    event: FactEvent,
    existing: Option<&FactEvent>,
    folded: Vec<FoldedCandidate>,
) -> PendingReview {
    PendingReview {
        review_id: event.id,
        deal_id: event.deal_id,
        fact_key: event.fact_key,
        new_value: event.value,
        new_display_value: event.display_value,
        new_source: event.source,
        new_confidence: event.source_confidence,
        existing_value: existing.map(|e| e.value.clone()),
        existing_display_value: existing.map(|e| e.display_value.clone()),
        contradiction_reason: event.reason,
        created_at_us: event.created_at_us,
        folded,
    }
}

/// Close a pending review with one of the three decisions.
///
/// The whole closure runs inside one IMMEDIATE transaction, with the same
/// bounded jittered retry on lock races as arbitration. The review must
/// still be in PENDING_REVIEW state; a review that was already closed and
/// one that never existed are both reported as [`LedgerError::ReviewNotFound`].
///
/// # Errors
///
/// [`LedgerError::Validation`] for an empty reason or reviewer,
/// [`LedgerError::ReviewNotFound`], [`LedgerError::ArbitrationConflict`]
/// once retries are exhausted, or a storage error.
pub fn resolve_review(
    conn: &mut Connection,
    retry: &RetryConfig,
    review_id: EventId,
    decision: &ReviewDecision,
    reason: &str,
    resolved_by: &str,
) -> Result<ReviewOutcome> {
    if reason.trim().is_empty() {
        return Err(LedgerError::Validation(
            "review closure requires a reason".into(),
        ));
    }
    if resolved_by.trim().is_empty() {
        return Err(LedgerError::Validation(
            "review closure requires a resolver identity".into(),
        ));
    }

    let context = format!("review {review_id}");
    let mut attempt = 0;
    loop {
        attempt += 1;
        match try_resolve(conn, review_id, decision, reason, resolved_by) {
            Err(err) if err.is_retryable() && attempt < retry.max_attempts => {
                let delay = backoff_delay(retry, attempt);
                tracing::warn!(context = %context, attempt, "lock race on review closure, backing off");
                std::thread::sleep(delay);
            }
            Err(err) if err.is_retryable() => {
                return Err(LedgerError::ArbitrationConflict {
                    context,
                    attempts: attempt,
                });
            }
            other => return other,
        }
    }
}

fn try_resolve(
    conn: &mut Connection,
    review_id: EventId,
    decision: &ReviewDecision,
    reason: &str,
    resolved_by: &str,
) -> Result<ReviewOutcome> {
    let context = format!("review {review_id}");
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| map_lock_error(e, &context))?;

    // Closed-or-never-existed are deliberately indistinguishable here.
    let review = match log::get_event(&tx, review_id) {
        Ok(event) if event.event_type == EventType::PendingReview => event,
        Ok(_) | Err(LedgerError::EventNotFound(_)) => {
            return Err(LedgerError::ReviewNotFound(review_id));
        }
        Err(other) => return Err(other),
    };

    let current = log::current_active(&tx, &review.deal_id, &review.fact_key)?;
    let now = now_us();

    // Whatever the decision, the closure settles every candidate folded into
    // this review while it was open.
    for marker in log::open_disputes(&tx, &review.deal_id, &review.fact_key)? {
        log::mark_terminal(&tx, marker.id, EventType::Resolved, None)?;
    }

    let outcome = match decision {
        ReviewDecision::AcceptNew => {
            if let Some(current) = &current {
                log::mark_terminal(&tx, current.id, EventType::Superseded, None)?;
            }
            log::promote_to_created(&tx, review_id, &format!("{ACCEPT_PREFIX} {reason}"))?;
            ReviewOutcome {
                review_id,
                decision: decision.as_str().to_string(),
                current_event_id: Some(review_id),
            }
        }
        ReviewDecision::KeepExisting => {
            // The prior current event stays active and untouched; only the
            // candidate is dismissed.
            log::mark_terminal(
                &tx,
                review_id,
                EventType::Resolved,
                Some(&format!("{KEEP_PREFIX} {reason}")),
            )?;
            ReviewOutcome {
                review_id,
                decision: decision.as_str().to_string(),
                current_event_id: current.map(|e| e.id),
            }
        }
        ReviewDecision::Override {
            value,
            display_value,
            unit,
        } => {
            if let Some(current) = &current {
                log::mark_terminal(&tx, current.id, EventType::Superseded, None)?;
            }
            log::mark_terminal(&tx, review_id, EventType::Resolved, None)?;

            let draft = FactDraft {
                deal_id: review.deal_id.clone(),
                fact_key: review.fact_key.clone(),
                value: value.clone(),
                display_value: display_value.clone(),
                unit: unit.clone(),
                source: Source::HumanOverride,
                source_confidence: 100,
                created_by: resolved_by.to_string(),
                reason: Some(reason.to_string()),
            };
            let id = log::append(
                &tx,
                &draft,
                EventType::Created,
                current.map(|e| e.id),
                now,
            )?;
            ReviewOutcome {
                review_id,
                decision: decision.as_str().to_string(),
                current_event_id: Some(id),
            }
        }
    };

    tx.commit().map_err(|e| map_lock_error(e, &context))?;
    tracing::info!(
        review_id = review_id.raw(),
        decision = %decision,
        resolved_by,
        "review closed"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitration::{submit_fact, SubmitStatus};
    use crate::config::{ArbitrationConfig, RetryConfig};
    use crate::db::open_in_memory;
    use crate::model::FactKey;

    fn draft(value: f64, source: Source, confidence: u8) -> FactDraft {
        FactDraft {
            deal_id: DealId::new("deal-1"),
            fact_key: FactKey::new("financial.arr").expect("valid key"),
            value: FactValue::Number(value),
            display_value: format!("${value}"),
            unit: Some("USD".into()),
            source,
            source_confidence: confidence,
            created_by: "producer".into(),
            reason: Some("conflicting extraction".into()),
        }
    }

    /// Seed: accepted 500k at confidence 70, then a 520k candidate at 72
    /// escalates. Returns (current event id, review id).
    fn seed_conflict(conn: &mut Connection) -> (EventId, EventId) {
        let cfg = ArbitrationConfig::default();
        let retry = RetryConfig::default();
        let first = submit_fact(conn, &cfg, &retry, &draft(500_000.0, Source::DocumentExtraction, 70))
            .expect("seed current");
        assert_eq!(first.status, SubmitStatus::Accepted);
        let escalated = submit_fact(conn, &cfg, &retry, &draft(520_000.0, Source::LlmAgent, 72))
            .expect("seed conflict");
        assert_eq!(escalated.status, SubmitStatus::Escalated);
        (first.event_id, escalated.event_id)
    }

    #[test]
    fn list_pending_surfaces_both_sides() {
        let mut conn = open_in_memory().expect("db");
        let (_current, review_id) = seed_conflict(&mut conn);

        let reviews = list_pending(&conn, &DealId::new("deal-1")).expect("list");
        assert_eq!(reviews.len(), 1);
        let review = &reviews[0];
        assert_eq!(review.review_id, review_id);
        assert!(review.new_value.normalized_eq(&FactValue::Number(520_000.0), 1e-9));
        assert!(
            review
                .existing_value
                .as_ref()
                .expect("existing")
                .normalized_eq(&FactValue::Number(500_000.0), 1e-9)
        );
        assert_eq!(review.contradiction_reason.as_deref(), Some("conflicting extraction"));
        assert!(review.folded.is_empty());
    }

    #[test]
    fn folded_candidates_surface_and_close_with_the_review() {
        let mut conn = open_in_memory().expect("db");
        let (current_id, review_id) = seed_conflict(&mut conn);
        let cfg = ArbitrationConfig::default();
        let retry = RetryConfig::default();

        let folded = submit_fact(&mut conn, &cfg, &retry, &draft(530_000.0, Source::LlmAgent, 71))
            .expect("fold");
        assert_eq!(folded.status, SubmitStatus::Escalated);
        assert_eq!(folded.event_id, review_id);

        let reviews = list_pending(&conn, &DealId::new("deal-1")).expect("list");
        assert_eq!(reviews[0].folded.len(), 1);
        let marker_id = reviews[0].folded[0].event_id;
        assert!(
            reviews[0].folded[0]
                .value
                .normalized_eq(&FactValue::Number(530_000.0), 1e-9)
        );

        resolve_review(
            &mut conn,
            &retry,
            review_id,
            &ReviewDecision::KeepExisting,
            "original figure matches the audited statement",
            "analyst-3",
        )
        .expect("resolve");

        let marker = log::get_event(&conn, marker_id).expect("get");
        assert_eq!(marker.event_type, EventType::Resolved);
        assert_eq!(
            log::get_event(&conn, current_id).expect("get").event_type,
            EventType::Created
        );
    }

    #[test]
    fn accept_new_promotes_and_supersedes() {
        let mut conn = open_in_memory().expect("db");
        let (current_id, review_id) = seed_conflict(&mut conn);
        let retry = RetryConfig::default();

        let outcome = resolve_review(
            &mut conn,
            &retry,
            review_id,
            &ReviewDecision::AcceptNew,
            "newer document is authoritative",
            "analyst-3",
        )
        .expect("resolve");
        assert_eq!(outcome.current_event_id, Some(review_id));

        let prior = log::get_event(&conn, current_id).expect("get");
        assert_eq!(prior.event_type, EventType::Superseded);

        let promoted = log::get_event(&conn, review_id).expect("get");
        assert_eq!(promoted.event_type, EventType::Created);
        assert!(promoted.reason.expect("reason").starts_with(ACCEPT_PREFIX));

        assert!(list_pending(&conn, &DealId::new("deal-1")).expect("list").is_empty());
    }

    #[test]
    fn keep_existing_dismisses_candidate_untouched_current() {
        let mut conn = open_in_memory().expect("db");
        let (current_id, review_id) = seed_conflict(&mut conn);
        let retry = RetryConfig::default();

        let outcome = resolve_review(
            &mut conn,
            &retry,
            review_id,
            &ReviewDecision::KeepExisting,
            "original figure matches the audited statement",
            "analyst-3",
        )
        .expect("resolve");
        assert_eq!(outcome.current_event_id, Some(current_id));

        let prior = log::get_event(&conn, current_id).expect("get");
        assert_eq!(prior.event_type, EventType::Created);

        let dismissed = log::get_event(&conn, review_id).expect("get");
        assert_eq!(dismissed.event_type, EventType::Resolved);
        assert!(dismissed.reason.expect("reason").starts_with(KEEP_PREFIX));
    }

    #[test]
    fn override_closes_both_and_creates_human_event() {
        let mut conn = open_in_memory().expect("db");
        let (current_id, review_id) = seed_conflict(&mut conn);
        let retry = RetryConfig::default();

        let outcome = resolve_review(
            &mut conn,
            &retry,
            review_id,
            &ReviewDecision::Override {
                value: FactValue::Number(510_000.0),
                display_value: "$510K".into(),
                unit: Some("USD".into()),
            },
            "split the difference per founder call",
            "analyst-3",
        )
        .expect("resolve");

        let new_id = outcome.current_event_id.expect("new event");
        assert_ne!(new_id, current_id);
        assert_ne!(new_id, review_id);

        let new_event = log::get_event(&conn, new_id).expect("get");
        assert_eq!(new_event.source, Source::HumanOverride);
        assert_eq!(new_event.source_confidence, 100);
        assert_eq!(new_event.event_type, EventType::Created);
        assert_eq!(new_event.supersedes_event_id, Some(current_id));

        assert_eq!(
            log::get_event(&conn, current_id).expect("get").event_type,
            EventType::Superseded
        );
        assert_eq!(
            log::get_event(&conn, review_id).expect("get").event_type,
            EventType::Resolved
        );
    }

    #[test]
    fn closing_twice_reports_review_not_found() {
        let mut conn = open_in_memory().expect("db");
        let (_current, review_id) = seed_conflict(&mut conn);
        let retry = RetryConfig::default();

        resolve_review(
            &mut conn,
            &retry,
            review_id,
            &ReviewDecision::KeepExisting,
            "first closure",
            "analyst-3",
        )
        .expect("resolve");

        let err = resolve_review(
            &mut conn,
            &retry,
            review_id,
            &ReviewDecision::AcceptNew,
            "second closure",
            "analyst-3",
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::ReviewNotFound(_)));
    }

    #[test]
    fn unknown_review_id_reports_review_not_found() {
        let mut conn = open_in_memory().expect("db");
        let retry = RetryConfig::default();
        let err = resolve_review(
            &mut conn,
            &retry,
            EventId::new(404),
            &ReviewDecision::KeepExisting,
            "no such review",
            "analyst-3",
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::ReviewNotFound(_)));
    }

    #[test]
    fn empty_reason_rejected_before_any_write() {
        let mut conn = open_in_memory().expect("db");
        let (_current, review_id) = seed_conflict(&mut conn);
        let retry = RetryConfig::default();

        let err = resolve_review(
            &mut conn,
            &retry,
            review_id,
            &ReviewDecision::AcceptNew,
            "  ",
            "analyst-3",
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));

        // Review still open.
        assert_eq!(list_pending(&conn, &DealId::new("deal-1")).expect("list").len(), 1);
    }
}
