//! Arbitration engine: decide how a candidate value relates to current
//! state, and apply that decision atomically.
//!
//! The decision itself ([`arbitrate`]) is a pure, priority-ordered function
//! of the candidate, the current event, the outstanding review, and the
//! configured policy thresholds. [`submit_fact`] wraps it in a
//! `BEGIN IMMEDIATE` transaction so no other writer can interleave between
//! the read of current state and the resulting log mutation, and retries
//! lock races with jittered exponential backoff before surfacing
//! `ArbitrationConflict`.

use rand::Rng;
use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::config::{ArbitrationConfig, RetryConfig};
use crate::db::log;
use crate::error::{LedgerError, Result};
use crate::event::{now_us, EventId, EventType, FactDraft, FactEvent};

/// Producer-visible outcome of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitStatus {
    /// No current value existed; the candidate was accepted outright.
    Accepted,
    /// The candidate dominated and replaced the current value.
    Superseded,
    /// Comparable trust on both sides; escalated for human review.
    Escalated,
    /// Candidate was equivalent to an existing value; nothing was written.
    NoOp,
}

impl SubmitStatus {
    /// Canonical snake_case string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Superseded => "superseded",
            Self::Escalated => "escalated",
            Self::NoOp => "no_op",
        }
    }
}

impl fmt::Display for SubmitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a submission did, and which event now represents it.
///
/// For `NoOp` the id is the already-equivalent event; for `Escalated` while
/// a review was already outstanding, it is that existing review's id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOutcome {
    pub status: SubmitStatus,
    pub event_id: EventId,
}

/// The pure arbitration decision, before any write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arbitration {
    /// Rule 1: no current value; append as CREATED.
    Accept,
    /// Rule 2: candidate is equivalent to this existing event; write nothing.
    NoOp { matches: EventId },
    /// Rule 3: candidate strictly dominates; supersede `prior`, append CREATED.
    Supersede { prior: EventId },
    /// Rule 4: ambiguous conflict; append PENDING_REVIEW contesting `prior`.
    Escalate { prior: EventId },
    /// A review is already outstanding; record the candidate as DISPUTED
    /// against it instead of opening a second review.
    FoldIntoReview { review: EventId },
}

/// Decide how a candidate relates to the fact key's current state.
///
/// Policy, in priority order (thresholds from `cfg`):
/// 1. no current value → accept
/// 2. normalized-equivalent to current (or to the outstanding review's
///    candidate) → no-op
/// 3. strict dominance (higher source rank, or same rank with confidence at
///    least `confidence_margin` above) → supersede
/// 4. otherwise → escalate; if a review is already outstanding, fold into it
///    rather than opening a second one
#[must_use]
pub fn arbitrate(
    draft: &FactDraft,
    current: Option<&FactEvent>,
    pending: Option<&FactEvent>,
    cfg: &ArbitrationConfig,
) -> Arbitration {
    let Some(current) = current else {
        return Arbitration::Accept;
    };

    if draft
        .value
        .normalized_eq(&current.value, cfg.numeric_tolerance)
    {
        return Arbitration::NoOp { matches: current.id };
    }

    // A duplicate of the already-escalated candidate must not pile a second
    // review onto the same fact key.
    if let Some(pending) = pending
        && draft
            .value
            .normalized_eq(&pending.value, cfg.numeric_tolerance)
    {
        return Arbitration::NoOp { matches: pending.id };
    }

    if dominates(draft, current, cfg) {
        return Arbitration::Supersede { prior: current.id };
    }

    match pending {
        Some(review) => Arbitration::FoldIntoReview { review: review.id },
        None => Arbitration::Escalate { prior: current.id },
    }
}

/// Strict dominance: strictly higher source rank, or same rank with the
/// candidate's confidence at least `confidence_margin` points above the
/// current event's. A lower rank never dominates, whatever its confidence.
fn dominates(draft: &FactDraft, current: &FactEvent, cfg: &ArbitrationConfig) -> bool {
    let candidate_rank = cfg.source_ranks.rank(draft.source);
    let current_rank = cfg.source_ranks.rank(current.source);

    if candidate_rank > current_rank {
        return true;
    }
    if candidate_rank < current_rank {
        return false;
    }
    draft.source_confidence >= current.source_confidence.saturating_add(cfg.confidence_margin)
}

/// Submit a candidate fact value through arbitration.
///
/// Validates, short-circuits obvious idempotent resubmissions before taking
/// the write lock, then runs decide-and-apply inside one IMMEDIATE
/// transaction, retrying lock races up to `retry.max_attempts` with jittered
/// exponential backoff. Every retry re-reads current state; stale decisions
/// are never replayed.
///
/// # Errors
///
/// [`LedgerError::Validation`] for a malformed candidate,
/// [`LedgerError::ArbitrationConflict`] once retries are exhausted, or a
/// storage error.
pub fn submit_fact(
    conn: &mut Connection,
    arbitration: &ArbitrationConfig,
    retry: &RetryConfig,
    draft: &FactDraft,
) -> Result<SubmitOutcome> {
    draft.validate()?;

    // Cheap idempotency pre-check on a snapshot read, before any write lock.
    // The decision is re-verified inside the transaction either way.
    if let Some(current) = log::current_active(conn, &draft.deal_id, &draft.fact_key)?
        && draft
            .value
            .normalized_eq(&current.value, arbitration.numeric_tolerance)
    {
        tracing::debug!(
            deal_id = %draft.deal_id,
            fact_key = %draft.fact_key,
            event_id = current.id.raw(),
            "idempotent resubmission, no write"
        );
        return Ok(SubmitOutcome {
            status: SubmitStatus::NoOp,
            event_id: current.id,
        });
    }

    let context = format!("{}/{}", draft.deal_id, draft.fact_key);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match try_submit(conn, arbitration, draft) {
            Err(err) if err.is_retryable() && attempt < retry.max_attempts => {
                let delay = backoff_delay(retry, attempt);
                tracing::warn!(
                    context = %context,
                    attempt,
                    ?delay,
                    "lock race on fact key, backing off"
                );
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

/// One decide-and-apply pass inside a single IMMEDIATE transaction.
fn try_submit(
    conn: &mut Connection,
    cfg: &ArbitrationConfig,
    draft: &FactDraft,
) -> Result<SubmitOutcome> {
    let context = format!("{}/{}", draft.deal_id, draft.fact_key);
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| map_lock_error(e, &context))?;

    let current = log::current_active(&tx, &draft.deal_id, &draft.fact_key)?;
    let pending = log::outstanding_review(&tx, &draft.deal_id, &draft.fact_key)?;
    let decision = arbitrate(draft, current.as_ref(), pending.as_ref(), cfg);
    let now = now_us();

    let outcome = match decision {
        Arbitration::Accept => {
            let id = log::append(&tx, draft, EventType::Created, None, now)?;
            SubmitOutcome {
                status: SubmitStatus::Accepted,
                event_id: id,
            }
        }
        Arbitration::NoOp { matches } => SubmitOutcome {
            status: SubmitStatus::NoOp,
            event_id: matches,
        },
        Arbitration::Supersede { prior } => {
            log::mark_terminal(&tx, prior, EventType::Superseded, None)?;
            let id = log::append(&tx, draft, EventType::Created, Some(prior), now)?;
            tracing::info!(
                context = %context,
                prior = prior.raw(),
                event_id = id.raw(),
                source = %draft.source,
                "candidate superseded current value"
            );
            SubmitOutcome {
                status: SubmitStatus::Superseded,
                event_id: id,
            }
        }
        Arbitration::Escalate { prior } => {
            let id = log::append(&tx, draft, EventType::PendingReview, Some(prior), now)?;
            tracing::info!(
                context = %context,
                prior = prior.raw(),
                review_id = id.raw(),
                "ambiguous conflict escalated for human review"
            );
            SubmitOutcome {
                status: SubmitStatus::Escalated,
                event_id: id,
            }
        }
        Arbitration::FoldIntoReview { review } => {
            // A resubmission of an already-folded candidate writes nothing.
            let disputes = log::open_disputes(&tx, &draft.deal_id, &draft.fact_key)?;
            if let Some(marker) = disputes
                .iter()
                .find(|d| draft.value.normalized_eq(&d.value, cfg.numeric_tolerance))
            {
                SubmitOutcome {
                    status: SubmitStatus::NoOp,
                    event_id: marker.id,
                }
            } else {
                let id = log::append(&tx, draft, EventType::Disputed, Some(review), now)?;
                tracing::info!(
                    context = %context,
                    review_id = review.raw(),
                    event_id = id.raw(),
                    "conflict recorded as disputed, folded into outstanding review"
                );
                SubmitOutcome {
                    status: SubmitStatus::Escalated,
                    event_id: review,
                }
            }
        }
    };

    tx.commit().map_err(|e| map_lock_error(e, &context))?;
    Ok(outcome)
}

/// Map SQLite busy/locked failures to `ConcurrentModification`; everything
/// else passes through as a storage error.
pub(crate) fn map_lock_error(err: rusqlite::Error, context: &str) -> LedgerError {
    if is_lock_error(&err) {
        LedgerError::ConcurrentModification {
            context: context.to_string(),
        }
    } else {
        LedgerError::Storage(err)
    }
}

fn is_lock_error(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _)
            if matches!(
                inner.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            )
    )
}

/// Exponential backoff with uniform jitter, capped at `max_delay_ms`.
pub(crate) fn backoff_delay(retry: &RetryConfig, attempt: u32) -> Duration {
    let exp = retry
        .base_delay_ms
        .saturating_mul(1_u64 << attempt.min(10))
        .min(retry.max_delay_ms);
    let jitter = rand::thread_rng().gen_range(0..=exp / 2);
    Duration::from_millis((exp + jitter).min(retry.max_delay_ms))
}
