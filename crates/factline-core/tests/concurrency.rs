//! Concurrent writers on the same fact key must serialize, preserving the
//! at-most-one-active invariant. Each thread opens its own connection, as
//! real producers would.

use std::thread;

use factline_core::{
    DealId, FactDraft, FactKey, FactValue, Ledger, LedgerConfig, LedgerError, Source,
};

fn draft(key: &str, value: f64, source: Source, confidence: u8, actor: &str) -> FactDraft {
    FactDraft {
        deal_id: DealId::new("deal-1"),
        fact_key: FactKey::new(key).expect("valid key"),
        value: FactValue::Number(value),
        display_value: format!("{value}"),
        unit: None,
        source,
        source_confidence: confidence,
        created_by: actor.into(),
        reason: None,
    }
}

/// Active events per key, split into (value-supplying, pending-review).
fn active_counts(ledger: &Ledger, key: &str) -> (usize, usize) {
    let fact_key = FactKey::new(key).expect("valid key");
    let history = ledger
        .fact_history(&DealId::new("deal-1"), &fact_key)
        .expect("history");
    let value_supplying = history
        .iter()
        .filter(|e| e.event_type.is_active() && e.event_type.supplies_current_value())
        .count();
    let pending = history
        .iter()
        .filter(|e| e.event_type == factline_core::EventType::PendingReview)
        .count();
    (value_supplying, pending)
}

#[test]
fn hammering_one_fact_key_preserves_invariants() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("factline.sqlite3");

    // Create the database before spawning writers.
    drop(Ledger::open(&path, LedgerConfig::default()).expect("init"));

    let threads: Vec<_> = (0..4)
        .map(|t| {
            let path = path.clone();
            thread::spawn(move || {
                let mut ledger =
                    Ledger::open(&path, LedgerConfig::default()).expect("open per-thread ledger");
                let mut conflicts = 0_u32;
                for i in 0..25_i64 {
                    // Values collide across threads on purpose; confidence
                    // walks so some submissions dominate and some escalate.
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let confidence = ((t * 25 + i) % 101) as u8;
                    let value = 500_000.0 + f64::from(u32::try_from(i % 5).expect("small"));
                    let d = draft(
                        "financial.arr",
                        value,
                        Source::DocumentExtraction,
                        confidence,
                        &format!("producer-{t}"),
                    );
                    match ledger.submit_fact(&d) {
                        Ok(_) => {}
                        // Exhausted retries are a legal outcome under
                        // contention; anything else is a bug.
                        Err(LedgerError::ArbitrationConflict { .. }) => conflicts += 1,
                        Err(other) => panic!("unexpected error: {other}"),
                    }
                }
                conflicts
            })
        })
        .collect();

    for handle in threads {
        handle.join().expect("writer thread panicked");
    }

    let ledger = Ledger::open(&path, LedgerConfig::default()).expect("reopen");
    let (value_supplying, pending) = active_counts(&ledger, "financial.arr");
    assert!(value_supplying <= 1, "multiple current values: {value_supplying}");
    assert!(pending <= 1, "multiple outstanding reviews: {pending}");

    // Something must have landed.
    let facts = ledger
        .current_facts(&DealId::new("deal-1"), None, false)
        .expect("facts");
    assert_eq!(facts.len(), 1);
    assert!(facts[0].current.is_some());
}

#[test]
fn writers_on_different_keys_do_not_interfere() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("factline.sqlite3");
    drop(Ledger::open(&path, LedgerConfig::default()).expect("init"));

    let keys = ["financial.arr", "team.size", "market.tam", "traction.mrr_growth"];
    let threads: Vec<_> = keys
        .iter()
        .map(|key| {
            let path = path.clone();
            let key = (*key).to_string();
            thread::spawn(move || {
                let mut ledger =
                    Ledger::open(&path, LedgerConfig::default()).expect("open per-thread ledger");
                for i in 0..10_u8 {
                    let d = draft(&key, f64::from(i), Source::DocumentExtraction, 90, "producer");
                    // Distinct values at equal rank without the margin will
                    // escalate after the first; both outcomes are fine here.
                    match ledger.submit_fact(&d) {
                        Ok(_) | Err(LedgerError::ArbitrationConflict { .. }) => {}
                        Err(other) => panic!("unexpected error: {other}"),
                    }
                }
            })
        })
        .collect();

    for handle in threads {
        handle.join().expect("writer thread panicked");
    }

    let ledger = Ledger::open(&path, LedgerConfig::default()).expect("reopen");
    for key in keys {
        let (value_supplying, pending) = active_counts(&ledger, key);
        assert!(value_supplying <= 1, "{key}: multiple current values");
        assert!(pending <= 1, "{key}: multiple outstanding reviews");
    }
    let facts = ledger
        .current_facts(&DealId::new("deal-1"), None, false)
        .expect("facts");
    assert_eq!(facts.len(), keys.len());
}
