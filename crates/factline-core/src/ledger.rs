//! The `Ledger` facade: the boundary the analysis pipeline and dashboard
//! consume.
//!
//! One `Ledger` owns one SQLite connection. Callers wanting cross-thread
//! concurrency open one `Ledger` per thread against the same path; SQLite
//! plus the arbitration retry envelope serializes writers per fact key.

use std::path::Path;

use crate::arbitration::{self, SubmitOutcome};
use crate::config::LedgerConfig;
use crate::db;
use crate::error::Result;
use crate::event::{EventId, FactDraft, FactEvent};
use crate::model::{Category, DealId, FactKey};
use crate::resolver::{self, FactState};
use crate::review::{self, PendingReview, ReviewDecision, ReviewOutcome};

/// A handle to one fact ledger database.
pub struct Ledger {
    conn: rusqlite::Connection,
    config: LedgerConfig,
}

impl Ledger {
    /// Open (or create) the ledger at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: &Path, config: LedgerConfig) -> anyhow::Result<Self> {
        let conn = db::open_ledger(path)?;
        Ok(Self { conn, config })
    }

    /// Open an in-memory ledger. State is lost on drop; intended for tests.
    ///
    /// # Errors
    ///
    /// Returns an error if migrations fail.
    pub fn open_in_memory(config: LedgerConfig) -> anyhow::Result<Self> {
        let conn = db::open_in_memory()?;
        Ok(Self { conn, config })
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Submit a candidate fact value through arbitration.
    ///
    /// # Errors
    ///
    /// See [`arbitration::submit_fact`].
    pub fn submit_fact(&mut self, draft: &FactDraft) -> Result<SubmitOutcome> {
        arbitration::submit_fact(
            &mut self.conn,
            &self.config.arbitration,
            &self.config.retry,
            draft,
        )
    }

    /// Current facts for a deal, optionally filtered by category,
    /// optionally carrying full per-fact history. Read-only; safe to call
    /// repeatedly and concurrently with writers.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the log cannot be read.
    pub fn current_facts(
        &self,
        deal_id: &DealId,
        category: Option<Category>,
        include_history: bool,
    ) -> Result<Vec<FactState>> {
        let events = db::log::list_by_deal(&self.conn, deal_id)?;
        Ok(resolver::resolve_deal(&events, category, include_history))
    }

    /// Full ascending event history for one fact key.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the log cannot be read.
    pub fn fact_history(&self, deal_id: &DealId, fact_key: &FactKey) -> Result<Vec<FactEvent>> {
        db::log::list_by_fact_key(&self.conn, deal_id, fact_key)
    }

    /// Outstanding reviews for a deal.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the log cannot be read.
    pub fn pending_reviews(&self, deal_id: &DealId) -> Result<Vec<PendingReview>> {
        review::list_pending(&self.conn, deal_id)
    }

    /// Close a pending review.
    ///
    /// # Errors
    ///
    /// See [`review::resolve_review`].
    pub fn resolve_review(
        &mut self,
        review_id: EventId,
        decision: &ReviewDecision,
        reason: &str,
        resolved_by: &str,
    ) -> Result<ReviewOutcome> {
        review::resolve_review(
            &mut self.conn,
            &self.config.retry,
            review_id,
            decision,
            reason,
            resolved_by,
        )
    }
}
