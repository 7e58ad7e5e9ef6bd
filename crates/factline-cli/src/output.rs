//! Shared output layer for human/JSON parity across all CLI commands.
//!
//! Every command handler receives an [`OutputMode`] and formats accordingly:
//! aligned key/value output for humans, stable JSON for scripts and the
//! dashboard's ingestion jobs.

use serde::Serialize;
use std::io::{self, Write};

/// The two output modes supported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-optimized output.
    Human,
    /// Machine-readable JSON (one object, or a JSON array).
    Json,
}

impl OutputMode {
    /// Returns `true` if JSON output was requested.
    #[must_use]
    pub fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Shared width for human output separators.
pub const RULE_WIDTH: usize = 72;

/// Write a horizontal separator used by human output.
///
/// # Errors
///
/// Returns an error if writing to the stream fails.
pub fn rule(w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{:-<width$}", "", width = RULE_WIDTH)
}

/// Render a left-aligned key/value line in human output.
///
/// # Errors
///
/// Returns an error if writing to the stream fails.
pub fn kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    writeln!(w, "{:<14} {}", format!("{key}:"), value.as_ref())
}

/// Serialize a value as pretty JSON to stdout.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn render_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}

/// Render a one-line success message (human) or `{"ok": ...}` (JSON).
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn render_success(mode: OutputMode, message: &str) -> anyhow::Result<()> {
    if mode.is_json() {
        render_json(&serde_json::json!({ "ok": true, "message": message }))
    } else {
        println!("{message}");
        Ok(())
    }
}

/// Render a ledger error with its stable machine code and hint, then let the
/// caller propagate the failure exit.
pub fn render_error(mode: OutputMode, err: &anyhow::Error) {
    let (code, hint) = err.downcast_ref::<factline_core::LedgerError>().map_or(
        ("E9999", None),
        |ledger_err| {
            let code = ledger_err.code();
            (code.code(), code.hint())
        },
    );

    if mode.is_json() {
        let body = serde_json::json!({
            "ok": false,
            "code": code,
            "error": format!("{err:#}"),
            "hint": hint,
        });
        // Errors go to stderr in both modes.
        eprintln!("{body}");
    } else {
        eprintln!("error [{code}]: {err:#}");
        if let Some(hint) = hint {
            eprintln!("hint: {hint}");
        }
    }
}

/// Render a microsecond timestamp for humans.
#[must_use]
pub fn format_ts(us: i64) -> String {
    chrono::DateTime::from_timestamp_micros(us)
        .map_or_else(|| us.to_string(), |dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kv_aligns_keys() {
        let mut buf = Vec::new();
        kv(&mut buf, "fact", "financial.arr").expect("write");
        let line = String::from_utf8(buf).expect("utf8");
        assert!(line.starts_with("fact:"));
        assert!(line.contains("financial.arr"));
    }

    #[test]
    fn format_ts_renders_utc() {
        let s = format_ts(1_700_000_000_000_000);
        assert!(s.ends_with("UTC"));
        assert!(s.starts_with("2023-11-14"));
    }

    #[test]
    fn json_mode_detection() {
        assert!(OutputMode::Json.is_json());
        assert!(!OutputMode::Human.is_json());
    }
}
