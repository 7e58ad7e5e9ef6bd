//! `fl resolve`: close a pending review.

use anyhow::bail;
use clap::{Args, ValueEnum};

use factline_core::{EventId, FactValue, Ledger, ReviewDecision};

use crate::output::{OutputMode, render_json, render_success};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Decision {
    AcceptNew,
    KeepExisting,
    Override,
}

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Review id, as shown by `fl reviews`.
    #[arg(long)]
    pub review: i64,

    /// The closure decision.
    #[arg(long, value_enum)]
    pub decision: Decision,

    /// Free-text justification (mandatory).
    #[arg(long)]
    pub reason: String,

    /// Reviewer identity.
    #[arg(long)]
    pub by: String,

    /// Replacement value; required for (and only for) override.
    #[arg(long)]
    pub value: Option<String>,

    /// Human-readable rendering of the override value.
    #[arg(long)]
    pub display: Option<String>,

    /// Unit of the override value.
    #[arg(long)]
    pub unit: Option<String>,
}

pub fn run(args: &ResolveArgs, ledger: &mut Ledger, output: OutputMode) -> anyhow::Result<()> {
    let decision = match args.decision {
        Decision::AcceptNew => {
            if args.value.is_some() {
                bail!("--value only applies to --decision override");
            }
            ReviewDecision::AcceptNew
        }
        Decision::KeepExisting => {
            if args.value.is_some() {
                bail!("--value only applies to --decision override");
            }
            ReviewDecision::KeepExisting
        }
        Decision::Override => {
            let Some(raw) = &args.value else {
                bail!("--decision override requires --value");
            };
            let value = serde_json::from_str::<serde_json::Value>(raw)
                .map_or_else(|_| FactValue::Text(raw.clone()), FactValue::from_json);
            ReviewDecision::Override {
                value,
                display_value: args.display.clone().unwrap_or_else(|| raw.clone()),
                unit: args.unit.clone(),
            }
        }
    };

    let outcome = ledger.resolve_review(
        EventId::new(args.review),
        &decision,
        &args.reason,
        &args.by,
    )?;

    if output.is_json() {
        render_json(&outcome)
    } else {
        render_success(
            output,
            &format!("Review {} closed: {}", outcome.review_id, outcome.decision),
        )
    }
}
