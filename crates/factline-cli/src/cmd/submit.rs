//! `fl submit`: push a candidate fact value through arbitration.

use clap::Args;
use std::str::FromStr;

use factline_core::{DealId, FactDraft, FactKey, FactValue, Ledger, Source};

use crate::output::{OutputMode, render_json};

#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Deal the fact belongs to.
    #[arg(long)]
    pub deal: String,

    /// Dotted fact key, e.g. financial.arr.
    #[arg(long)]
    pub key: String,

    /// The value. Parsed as JSON when possible (numbers, booleans, objects),
    /// otherwise treated as a plain string.
    #[arg(long)]
    pub value: String,

    /// Human-readable rendering. Defaults to the raw value.
    #[arg(long)]
    pub display: Option<String>,

    /// Optional unit, e.g. USD.
    #[arg(long)]
    pub unit: Option<String>,

    /// Producer class: document_extraction, llm_agent, founder_response,
    /// or human_override.
    #[arg(long)]
    pub source: String,

    /// Producer-asserted confidence, 0..=100.
    #[arg(long)]
    pub confidence: u8,

    /// Actor identity (producer name or human id).
    #[arg(long)]
    pub by: String,

    /// Free-text justification. Mandatory for human_override.
    #[arg(long)]
    pub reason: Option<String>,
}

/// Parse a CLI value string: JSON first, raw string as fallback.
fn parse_value(raw: &str) -> FactValue {
    serde_json::from_str::<serde_json::Value>(raw)
        .map_or_else(|_| FactValue::Text(raw.to_string()), FactValue::from_json)
}

pub fn run(args: &SubmitArgs, ledger: &mut Ledger, output: OutputMode) -> anyhow::Result<()> {
    let draft = FactDraft {
        deal_id: DealId::new(args.deal.clone()),
        fact_key: FactKey::new(&args.key)?,
        value: parse_value(&args.value),
        display_value: args.display.clone().unwrap_or_else(|| args.value.clone()),
        unit: args.unit.clone(),
        source: Source::from_str(&args.source)?,
        source_confidence: args.confidence,
        created_by: args.by.clone(),
        reason: args.reason.clone(),
    };

    let outcome = ledger.submit_fact(&draft)?;

    if output.is_json() {
        render_json(&outcome)?;
    } else {
        println!("{}: event {}", outcome.status, outcome.event_id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_parse_json_first() {
        assert!(matches!(parse_value("500000"), FactValue::Number(_)));
        assert!(matches!(parse_value("true"), FactValue::Bool(true)));
        assert!(matches!(parse_value("{\"a\": 1}"), FactValue::Structured(_)));
        assert!(matches!(parse_value("London"), FactValue::Text(_)));
    }

    #[test]
    fn submit_args_parse() {
        use clap::Parser;

        #[derive(Parser)]
        struct Wrapper {
            #[command(flatten)]
            args: SubmitArgs,
        }
        let w = Wrapper::parse_from([
            "test",
            "--deal",
            "deal-1",
            "--key",
            "financial.arr",
            "--value",
            "500000",
            "--source",
            "document_extraction",
            "--confidence",
            "70",
            "--by",
            "parser-v2",
        ]);
        assert_eq!(w.args.deal, "deal-1");
        assert_eq!(w.args.confidence, 70);
        assert!(w.args.display.is_none());
    }
}
