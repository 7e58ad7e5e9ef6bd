//! Append-only event log operations.
//!
//! Every function takes `&Connection` so it composes inside a caller-managed
//! transaction (rusqlite's `Transaction` derefs to `Connection`). Nothing
//! here ever physically removes a row, and the only mutations are the
//! `event_type` transitions (with `reason` rewritten once at human closure).
//! All row updates go through this module; callers never issue their own
//! UPDATE statements.

use rusqlite::{Connection, OptionalExtension, Row, params};
use std::str::FromStr;

use crate::error::{LedgerError, Result};
use crate::event::{EventId, EventType, FactDraft, FactEvent};
use crate::model::{Category, DealId, FactKey, FactValue, Source};

/// Append one immutable event derived from a validated draft.
///
/// The category is derived from the fact key's leading segment here, at
/// append time, so an unknown prefix lands in `other` instead of failing
/// ingestion.
///
/// # Errors
///
/// Returns [`LedgerError::Validation`] if the draft fails field validation,
/// or a storage error if the insert fails.
pub fn append(
    conn: &Connection,
    draft: &FactDraft,
    event_type: EventType,
    supersedes: Option<EventId>,
    created_at_us: i64,
) -> Result<EventId> {
    draft.validate()?;

    let value_json = serde_json::to_string(&draft.value.to_json())
        .map_err(|e| LedgerError::Validation(format!("value not serializable: {e}")))?;

    conn.execute(
        "INSERT INTO fact_events (
            deal_id, fact_key, category, value_json, display_value, unit,
            source, source_confidence, event_type, supersedes_event_id,
            created_by, reason, created_at_us
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            draft.deal_id.as_str(),
            draft.fact_key.as_str(),
            draft.fact_key.category().as_str(),
            value_json,
            draft.display_value,
            draft.unit,
            draft.source.as_str(),
            i64::from(draft.source_confidence),
            event_type.as_str(),
            supersedes.map(EventId::raw),
            draft.created_by,
            draft.reason,
            created_at_us,
        ],
    )?;

    let id = EventId::new(conn.last_insert_rowid());
    tracing::debug!(
        event_id = id.raw(),
        deal_id = %draft.deal_id,
        fact_key = %draft.fact_key,
        event_type = %event_type,
        source = %draft.source,
        "appended fact event"
    );
    Ok(id)
}

/// Load one event by id.
///
/// # Errors
///
/// Returns [`LedgerError::EventNotFound`] if no row has this id.
pub fn get_event(conn: &Connection, id: EventId) -> Result<FactEvent> {
    conn.query_row(
        &format!("{SELECT_EVENT} WHERE event_id = ?1"),
        params![id.raw()],
        row_to_event,
    )
    .optional()?
    .ok_or(LedgerError::EventNotFound(id))
}

/// Flip an event's type to a terminal value (SUPERSEDED, DELETED, or
/// RESOLVED). Only `event_type` changes, plus `reason` when a human closure
/// supplies one; the row is otherwise untouched.
///
/// # Errors
///
/// Returns [`LedgerError::EventNotFound`] if the event does not exist,
/// [`LedgerError::IllegalTransition`] if it is already terminal or the
/// target type is not reachable from its current type.
pub fn mark_terminal(
    conn: &Connection,
    id: EventId,
    new_type: EventType,
    reason: Option<&str>,
) -> Result<()> {
    if !new_type.is_terminal() {
        return Err(LedgerError::IllegalTransition {
            id,
            from: "any",
            to: new_type.as_str(),
        });
    }
    transition(conn, id, new_type, reason)
}

/// Promote a PENDING_REVIEW event to CREATED, making it the current value.
///
/// This is the one non-terminal transition in the lifecycle, used by the
/// ACCEPT_NEW review closure. The human's reason replaces the producer's,
/// per the review contract.
///
/// # Errors
///
/// Returns [`LedgerError::EventNotFound`] or [`LedgerError::IllegalTransition`]
/// as for [`mark_terminal`].
pub fn promote_to_created(conn: &Connection, id: EventId, reason: &str) -> Result<()> {
    transition(conn, id, EventType::Created, Some(reason))
}

fn transition(
    conn: &Connection,
    id: EventId,
    new_type: EventType,
    reason: Option<&str>,
) -> Result<()> {
    let current = get_event(conn, id)?;
    current.event_type.can_transition_to(new_type).map_err(|e| match e {
        LedgerError::IllegalTransition { from, to, .. } => {
            LedgerError::IllegalTransition { id, from, to }
        }
        other => other,
    })?;

    let changed = match reason {
        Some(reason) => conn.execute(
            "UPDATE fact_events SET event_type = ?1, reason = ?2 WHERE event_id = ?3",
            params![new_type.as_str(), reason, id.raw()],
        )?,
        None => conn.execute(
            "UPDATE fact_events SET event_type = ?1 WHERE event_id = ?2",
            params![new_type.as_str(), id.raw()],
        )?,
    };
    debug_assert_eq!(changed, 1);

    tracing::debug!(
        event_id = id.raw(),
        from = %current.event_type,
        to = %new_type,
        "event type transition"
    );
    Ok(())
}

/// All events for a deal, ordered by `(created_at_us, event_id)` ascending.
///
/// # Errors
///
/// Returns a storage error if the query fails.
pub fn list_by_deal(conn: &Connection, deal_id: &DealId) -> Result<Vec<FactEvent>> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT_EVENT} WHERE deal_id = ?1 ORDER BY created_at_us ASC, event_id ASC"
    ))?;
    let events = stmt
        .query_map(params![deal_id.as_str()], row_to_event)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(events)
}

/// All events for one fact key, ordered by `(created_at_us, event_id)`
/// ascending.
///
/// # Errors
///
/// Returns a storage error if the query fails.
pub fn list_by_fact_key(
    conn: &Connection,
    deal_id: &DealId,
    fact_key: &FactKey,
) -> Result<Vec<FactEvent>> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT_EVENT} WHERE deal_id = ?1 AND fact_key = ?2
         ORDER BY created_at_us ASC, event_id ASC"
    ))?;
    let events = stmt
        .query_map(params![deal_id.as_str(), fact_key.as_str()], row_to_event)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(events)
}

/// The newest event that supplies the current value for a fact key, if any.
pub fn current_active(
    conn: &Connection,
    deal_id: &DealId,
    fact_key: &FactKey,
) -> Result<Option<FactEvent>> {
    latest_of_type(conn, deal_id, fact_key, EventType::Created)
}

/// The outstanding PENDING_REVIEW event for a fact key, if any.
///
/// Invariant 3 guarantees at most one exists; the query still orders and
/// takes the newest so a violated invariant degrades instead of corrupting.
pub fn outstanding_review(
    conn: &Connection,
    deal_id: &DealId,
    fact_key: &FactKey,
) -> Result<Option<FactEvent>> {
    latest_of_type(conn, deal_id, fact_key, EventType::PendingReview)
}

/// Open DISPUTED markers for a fact key, oldest first.
///
/// Each marker is a conflicting candidate folded into the outstanding review
/// (its `supersedes_event_id` references that review). Closure resolves
/// them, so any still-`disputed` row is open by definition.
///
/// # Errors
///
/// Returns a storage error if the query fails.
pub fn open_disputes(
    conn: &Connection,
    deal_id: &DealId,
    fact_key: &FactKey,
) -> Result<Vec<FactEvent>> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT_EVENT} WHERE deal_id = ?1 AND fact_key = ?2 AND event_type = 'disputed'
         ORDER BY created_at_us ASC, event_id ASC"
    ))?;
    let events = stmt
        .query_map(params![deal_id.as_str(), fact_key.as_str()], row_to_event)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(events)
}

/// All outstanding PENDING_REVIEW events for a deal, oldest first.
///
/// # Errors
///
/// Returns a storage error if the query fails.
pub fn pending_reviews_for_deal(conn: &Connection, deal_id: &DealId) -> Result<Vec<FactEvent>> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT_EVENT} WHERE deal_id = ?1 AND event_type = 'pending_review'
         ORDER BY created_at_us ASC, event_id ASC"
    ))?;
    let events = stmt
        .query_map(params![deal_id.as_str()], row_to_event)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(events)
}

fn latest_of_type(
    conn: &Connection,
    deal_id: &DealId,
    fact_key: &FactKey,
    event_type: EventType,
) -> Result<Option<FactEvent>> {
    let event = conn
        .query_row(
            &format!(
                "{SELECT_EVENT} WHERE deal_id = ?1 AND fact_key = ?2 AND event_type = ?3
                 ORDER BY created_at_us DESC, event_id DESC LIMIT 1"
            ),
            params![deal_id.as_str(), fact_key.as_str(), event_type.as_str()],
            row_to_event,
        )
        .optional()?;
    Ok(event)
}

const SELECT_EVENT: &str = "SELECT
    event_id, deal_id, fact_key, category, value_json, display_value, unit,
    source, source_confidence, event_type, supersedes_event_id,
    created_by, reason, created_at_us
    FROM fact_events";

fn row_to_event(row: &Row<'_>) -> rusqlite::Result<FactEvent> {
    let category_raw: String = row.get(3)?;
    let value_raw: String = row.get(4)?;
    let source_raw: String = row.get(7)?;
    let event_type_raw: String = row.get(9)?;

    let value: serde_json::Value = serde_json::from_str(&value_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let category = Category::from_str(&category_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let source = Source::from_str(&source_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let event_type = EventType::from_str(&event_type_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(9, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let confidence: i64 = row.get(8)?;
    let confidence = u8::try_from(confidence).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Integer, Box::new(e))
    })?;

    Ok(FactEvent {
        id: EventId::new(row.get(0)?),
        deal_id: DealId::new(row.get::<_, String>(1)?),
        // Keys were validated on the way in; rebuilding through FactKey::new
        // keeps a hand-edited database from smuggling in a bad key.
        fact_key: FactKey::new(&row.get::<_, String>(2)?).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?,
        category,
        value: FactValue::from_json(value),
        display_value: row.get(5)?,
        unit: row.get(6)?,
        source,
        source_confidence: confidence,
        event_type,
        supersedes_event_id: row.get::<_, Option<i64>>(10)?.map(EventId::new),
        created_by: row.get(11)?,
        reason: row.get(12)?,
        created_at_us: row.get(13)?,
    })
}
