//! Property tests: arbitrary interleavings of submissions and review
//! closures never break the ledger's structural invariants.

use proptest::prelude::*;

use factline_core::{
    DealId, EventType, FactDraft, FactKey, FactValue, Ledger, LedgerConfig, LedgerError,
    ReviewDecision, Source,
};

#[derive(Debug, Clone)]
enum Op {
    Submit {
        key_idx: usize,
        value_idx: usize,
        source: Source,
        confidence: u8,
    },
    CloseOldestReview {
        accept: bool,
    },
}

const KEYS: [&str; 3] = ["financial.arr", "team.size", "legal.cap_table_clean"];
const VALUES: [f64; 4] = [100.0, 250.0, 500.0, 1_000.0];

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..KEYS.len(), 0..VALUES.len(), 0..4_u8, 0..=100_u8).prop_map(
            |(key_idx, value_idx, source, confidence)| {
                let source = match source {
                    0 => Source::DocumentExtraction,
                    1 => Source::LlmAgent,
                    2 => Source::FounderResponse,
                    _ => Source::HumanOverride,
                };
                Op::Submit {
                    key_idx,
                    value_idx,
                    source,
                    confidence,
                }
            }
        ),
        1 => any::<bool>().prop_map(|accept| Op::CloseOldestReview { accept }),
    ]
}

fn apply(ledger: &mut Ledger, op: &Op) {
    let deal = DealId::new("deal-p");
    match op {
        Op::Submit {
            key_idx,
            value_idx,
            source,
            confidence,
        } => {
            let draft = FactDraft {
                deal_id: deal,
                fact_key: FactKey::new(KEYS[*key_idx]).expect("valid key"),
                value: FactValue::Number(VALUES[*value_idx]),
                display_value: format!("{}", VALUES[*value_idx]),
                unit: None,
                source: *source,
                source_confidence: *confidence,
                created_by: "prop-producer".into(),
                reason: Some("property run".into()),
            };
            match ledger.submit_fact(&draft) {
                Ok(_) | Err(LedgerError::ArbitrationConflict { .. }) => {}
                Err(other) => panic!("unexpected submit error: {other}"),
            }
        }
        Op::CloseOldestReview { accept } => {
            let reviews = ledger.pending_reviews(&deal).expect("reviews");
            if let Some(review) = reviews.first() {
                let decision = if *accept {
                    ReviewDecision::AcceptNew
                } else {
                    ReviewDecision::KeepExisting
                };
                match ledger.resolve_review(
                    review.review_id,
                    &decision,
                    "property closure",
                    "prop-human",
                ) {
                    Ok(_) | Err(LedgerError::ReviewNotFound(_)) => {}
                    Err(other) => panic!("unexpected closure error: {other}"),
                }
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_interleavings_preserve_invariants(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let mut ledger = Ledger::open_in_memory(LedgerConfig::default()).expect("ledger");
        let deal = DealId::new("deal-p");

        for op in &ops {
            apply(&mut ledger, op);
        }

        for key in KEYS {
            let fact_key = FactKey::new(key).expect("valid key");
            let history = ledger.fact_history(&deal, &fact_key).expect("history");

            // At most one value-supplying active event, at most one pending
            // review, per fact key.
            let value_supplying = history
                .iter()
                .filter(|e| e.event_type.is_active() && e.event_type.supplies_current_value())
                .count();
            let pending = history
                .iter()
                .filter(|e| e.event_type == EventType::PendingReview)
                .count();
            prop_assert!(value_supplying <= 1, "{key}: {value_supplying} current values");
            prop_assert!(pending <= 1, "{key}: {pending} outstanding reviews");

            // Folded candidates only stay DISPUTED while their review is open.
            let open_disputed = history
                .iter()
                .filter(|e| e.event_type == EventType::Disputed)
                .count();
            prop_assert!(
                pending == 1 || open_disputed == 0,
                "{key}: {open_disputed} disputed markers with no open review"
            );

            // Ordering: history is ascending by (created_at_us, id).
            for pair in history.windows(2) {
                prop_assert!(
                    (pair[0].created_at_us, pair[0].id) <= (pair[1].created_at_us, pair[1].id)
                );
            }
        }

        // Resolver determinism over the final log.
        let a = ledger.current_facts(&deal, None, true).expect("facts");
        let b = ledger.current_facts(&deal, None, true).expect("facts");
        prop_assert_eq!(a, b);
    }
}
