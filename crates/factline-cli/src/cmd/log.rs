//! `fl log`: raw ascending event history for one fact key.

use clap::Args;
use std::io::Write;

use factline_core::{DealId, FactKey, Ledger};

use crate::output::{OutputMode, format_ts, render_json};

#[derive(Args, Debug)]
pub struct LogArgs {
    /// Deal to query.
    #[arg(long)]
    pub deal: String,

    /// Dotted fact key.
    #[arg(long)]
    pub key: String,
}

pub fn run(args: &LogArgs, ledger: &Ledger, output: OutputMode) -> anyhow::Result<()> {
    let key = FactKey::new(&args.key)?;
    let events = ledger.fact_history(&DealId::new(args.deal.clone()), &key)?;

    if output.is_json() {
        return render_json(&events);
    }

    if events.is_empty() {
        println!("No events for {}/{}", args.deal, key);
        return Ok(());
    }

    let mut out = std::io::stdout().lock();
    for event in &events {
        write!(out, "{}  {event}", format_ts(event.created_at_us))?;
        if let Some(supersedes) = event.supersedes_event_id {
            write!(out, "  (supersedes #{supersedes})")?;
        }
        if let Some(reason) = &event.reason {
            write!(out, "  reason: {reason}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}
