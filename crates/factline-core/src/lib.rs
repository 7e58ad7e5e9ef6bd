//! factline-core: append-only fact ledger and conflict arbitration engine.
//!
//! Multiple independent producers (document parsers, LLM analysis agents,
//! human reviewers, founder answers) assert values for the same logical
//! facts about a deal. This crate keeps an immutable event log per
//! `(deal, fact_key)`, derives current truth from it on demand, decides
//! whether a new candidate may replace the current value automatically or
//! must be escalated to a human, and applies human closures transactionally.
//! A disagreement is never silently discarded.
//!
//! # Conventions
//!
//! - **Errors**: typed [`error::LedgerError`] with stable `E####` codes in
//!   core paths; `anyhow::Result` with context at I/O seams.
//! - **Logging**: `tracing` macros (`info!`, `warn!`, `debug!`). Subscriber
//!   setup belongs to the binary, never this crate.

pub mod arbitration;
pub mod config;
pub mod db;
pub mod error;
pub mod event;
pub mod ledger;
pub mod model;
pub mod resolver;
pub mod review;

pub use arbitration::{SubmitOutcome, SubmitStatus};
pub use config::{ArbitrationConfig, LedgerConfig, RetryConfig};
pub use error::{ErrorCode, LedgerError};
pub use event::{EventId, EventType, FactDraft, FactEvent};
pub use ledger::Ledger;
pub use model::{Category, DealId, FactKey, FactValue, Source};
pub use resolver::{CurrentValue, DisputeDetails, FactState};
pub use review::{FoldedCandidate, PendingReview, ReviewDecision, ReviewOutcome};
