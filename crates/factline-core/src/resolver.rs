//! State resolver: current truth as a pure projection of the event log.
//!
//! Nothing here touches a database. The resolver is a pure function over an
//! ordered slice of events, so it can be re-run at any time against the log
//! and can never silently diverge from it. The query layer
//! ([`crate::ledger::Ledger`]) loads events and calls in here.
//!
//! The dashboard needs three materially different answers per fact: "no
//! value yet", "value disputed", and "value confidently known". The
//! [`FactState`] shape preserves all three instead of collapsing them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::event::{EventId, FactEvent};
use crate::model::{Category, FactKey, FactValue, Source};

/// The resolved current value of one fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentValue {
    pub event_id: EventId,
    pub value: FactValue,
    pub display_value: String,
    pub unit: Option<String>,
    pub source: Source,
    pub source_confidence: u8,
    pub created_by: String,
}

/// The competing value behind an outstanding dispute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisputeDetails {
    /// Id of the PENDING_REVIEW event; this is the review id the human
    /// closes.
    pub review_id: EventId,
    pub value: FactValue,
    pub display_value: String,
    pub source: Source,
    pub source_confidence: u8,
    pub reason: Option<String>,
    pub created_at_us: i64,
}

/// Resolved state of one fact key: current value, dispute flag, and
/// timestamps, with optional full history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactState {
    pub fact_key: FactKey,
    pub category: Category,

    /// The current value, or `None` when the key has history but no active
    /// value (all prior events terminal).
    pub current: Option<CurrentValue>,

    /// True when a PENDING_REVIEW is outstanding. The still-active current
    /// value keeps being returned alongside the dispute.
    pub is_disputed: bool,
    pub dispute: Option<DisputeDetails>,

    /// Timestamp of the oldest event for this key.
    pub first_seen_at_us: i64,

    /// Timestamp of the event supplying the current value, if any.
    pub last_updated_at_us: Option<i64>,

    /// Full event history, newest first. Populated only on request to keep
    /// default responses small.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<FactEvent>>,
}

/// Resolve one fact key from its complete, ascending-ordered event history.
///
/// Returns `None` for an empty slice: a key with no events has no state at
/// all, as opposed to a key whose events are all terminal (which has state
/// but no current value).
#[must_use]
pub fn resolve_fact(events: &[FactEvent], include_history: bool) -> Option<FactState> {
    let first = events.first()?;
    let fact_key = first.fact_key.clone();
    let category = first.category;
    let first_seen_at_us = first.created_at_us;

    // Newest-first walk. The slice arrives ascending by (created_at_us, id).
    let current_event = events
        .iter()
        .rev()
        .find(|e| e.event_type.supplies_current_value());

    let pending = events
        .iter()
        .rev()
        .find(|e| e.event_type == crate::event::EventType::PendingReview);

    let current = current_event.map(|e| CurrentValue {
        event_id: e.id,
        value: e.value.clone(),
        display_value: e.display_value.clone(),
        unit: e.unit.clone(),
        source: e.source,
        source_confidence: e.source_confidence,
        created_by: e.created_by.clone(),
    });

    let dispute = pending.map(|e| DisputeDetails {
        review_id: e.id,
        value: e.value.clone(),
        display_value: e.display_value.clone(),
        source: e.source,
        source_confidence: e.source_confidence,
        reason: e.reason.clone(),
        created_at_us: e.created_at_us,
    });

    let history = include_history.then(|| {
        let mut h: Vec<FactEvent> = events.to_vec();
        h.reverse();
        h
    });

    Some(FactState {
        fact_key,
        category,
        last_updated_at_us: current_event.map(|e| e.created_at_us),
        current,
        is_disputed: dispute.is_some(),
        dispute,
        first_seen_at_us,
        history,
    })
}

/// Resolve every fact key under a deal from the deal's full event list
/// (ascending order), optionally filtered by category.
///
/// Output is sorted by fact key for stable display.
#[must_use]
pub fn resolve_deal(
    events: &[FactEvent],
    category: Option<Category>,
    include_history: bool,
) -> Vec<FactState> {
    let mut by_key: BTreeMap<&FactKey, Vec<FactEvent>> = BTreeMap::new();
    for event in events {
        by_key.entry(&event.fact_key).or_default().push(event.clone());
    }

    by_key
        .into_values()
        .filter_map(|group| resolve_fact(&group, include_history))
        .filter(|state| category.is_none_or(|c| state.category == c))
        .collect()
}
