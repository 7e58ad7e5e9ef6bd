//! `fl facts`: resolved current facts for a deal.

use clap::Args;
use std::io::Write;
use std::str::FromStr;

use factline_core::{Category, DealId, Ledger};

use crate::output::{OutputMode, format_ts, kv, render_json, rule};

#[derive(Args, Debug)]
pub struct FactsArgs {
    /// Deal to query.
    #[arg(long)]
    pub deal: String,

    /// Restrict to one category (financial, team, market, product, legal,
    /// competition, traction, other).
    #[arg(long)]
    pub category: Option<String>,

    /// Include the full event history per fact (newest first).
    #[arg(long)]
    pub history: bool,
}

pub fn run(args: &FactsArgs, ledger: &Ledger, output: OutputMode) -> anyhow::Result<()> {
    let category = args
        .category
        .as_deref()
        .map(Category::from_str)
        .transpose()?;

    let facts = ledger.current_facts(&DealId::new(args.deal.clone()), category, args.history)?;

    if output.is_json() {
        return render_json(&facts);
    }

    if facts.is_empty() {
        println!("No facts recorded for {}", args.deal);
        return Ok(());
    }

    let mut out = std::io::stdout().lock();
    for fact in &facts {
        rule(&mut out)?;
        kv(&mut out, "fact", fact.fact_key.as_str())?;
        kv(&mut out, "category", fact.category.as_str())?;
        match &fact.current {
            Some(current) => {
                let unit = current.unit.as_deref().unwrap_or("");
                kv(&mut out, "value", format!("{} {unit}", current.display_value).trim())?;
                kv(
                    &mut out,
                    "source",
                    format!("{} (confidence {})", current.source, current.source_confidence),
                )?;
            }
            None => kv(&mut out, "value", "(no current value)")?,
        }
        if let Some(dispute) = &fact.dispute {
            kv(
                &mut out,
                "disputed",
                format!(
                    "yes: {} from {} awaiting review #{}",
                    dispute.display_value, dispute.source, dispute.review_id
                ),
            )?;
        }
        kv(&mut out, "first seen", format_ts(fact.first_seen_at_us))?;
        if let Some(updated) = fact.last_updated_at_us {
            kv(&mut out, "updated", format_ts(updated))?;
        }
        if let Some(history) = &fact.history {
            writeln!(out, "history ({} events):", history.len())?;
            for event in history {
                writeln!(out, "  {event}")?;
            }
        }
    }
    rule(&mut out)?;
    Ok(())
}
