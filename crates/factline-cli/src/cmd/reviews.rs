//! `fl reviews`: outstanding escalations for a deal.

use clap::Args;
use std::io::Write;

use factline_core::{DealId, Ledger};

use crate::output::{OutputMode, format_ts, kv, render_json, rule};

#[derive(Args, Debug)]
pub struct ReviewsArgs {
    /// Deal to query.
    #[arg(long)]
    pub deal: String,
}

pub fn run(args: &ReviewsArgs, ledger: &Ledger, output: OutputMode) -> anyhow::Result<()> {
    let reviews = ledger.pending_reviews(&DealId::new(args.deal.clone()))?;

    if output.is_json() {
        return render_json(&reviews);
    }

    if reviews.is_empty() {
        println!("No pending reviews for {}", args.deal);
        return Ok(());
    }

    let mut out = std::io::stdout().lock();
    for review in &reviews {
        rule(&mut out)?;
        kv(&mut out, "review", review.review_id.to_string())?;
        kv(&mut out, "fact", review.fact_key.as_str())?;
        kv(
            &mut out,
            "candidate",
            format!(
                "{} from {} (confidence {})",
                review.new_display_value, review.new_source, review.new_confidence
            ),
        )?;
        kv(
            &mut out,
            "existing",
            review
                .existing_display_value
                .as_deref()
                .unwrap_or("(no longer on record)"),
        )?;
        if let Some(reason) = &review.contradiction_reason {
            kv(&mut out, "reason", reason)?;
        }
        for candidate in &review.folded {
            kv(
                &mut out,
                "also disputed",
                format!(
                    "{} from {} (confidence {})",
                    candidate.display_value, candidate.source, candidate.confidence
                ),
            )?;
        }
        kv(&mut out, "raised", format_ts(review.created_at_us))?;
    }
    rule(&mut out)?;
    writeln!(out, "{} pending review(s)", reviews.len())?;
    Ok(())
}
