//! Canonical SQLite schema for the fact ledger.
//!
//! One append-only table holds every [`crate::event::FactEvent`]; current
//! state is always a projection of this log, never a second mutable table.
//! `ledger_meta` tracks the schema version for migrations.

/// Migration v1: the append-only event table plus ledger metadata.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS fact_events (
    event_id INTEGER PRIMARY KEY AUTOINCREMENT,
    deal_id TEXT NOT NULL CHECK (length(trim(deal_id)) > 0),
    fact_key TEXT NOT NULL CHECK (length(trim(fact_key)) > 0),
    category TEXT NOT NULL CHECK (category IN (
        'financial', 'team', 'market', 'product',
        'legal', 'competition', 'traction', 'other'
    )),
    value_json TEXT NOT NULL,
    display_value TEXT NOT NULL,
    unit TEXT,
    source TEXT NOT NULL CHECK (source IN (
        'document_extraction', 'llm_agent', 'founder_response', 'human_override'
    )),
    source_confidence INTEGER NOT NULL CHECK (source_confidence BETWEEN 0 AND 100),
    event_type TEXT NOT NULL CHECK (event_type IN (
        'created', 'superseded', 'deleted', 'disputed', 'pending_review', 'resolved'
    )),
    supersedes_event_id INTEGER REFERENCES fact_events(event_id),
    created_by TEXT NOT NULL CHECK (length(trim(created_by)) > 0),
    reason TEXT,
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS ledger_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL,
    created_at_us INTEGER NOT NULL DEFAULT 0
);

INSERT OR IGNORE INTO ledger_meta (id, schema_version, created_at_us)
VALUES (1, 1, 0);
";

/// Migration v2: read-path indexes for per-fact history scans and pending
/// review sweeps.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_fact_events_deal_key_created
    ON fact_events(deal_id, fact_key, created_at_us);

CREATE INDEX IF NOT EXISTS idx_fact_events_deal_created
    ON fact_events(deal_id, created_at_us);

CREATE INDEX IF NOT EXISTS idx_fact_events_type
    ON fact_events(event_type);
";
