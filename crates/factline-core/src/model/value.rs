//! Self-describing fact values and normalized equivalence.
//!
//! Arbitration rule 2 (idempotency) hinges on "the same value": re-running an
//! extraction must not create log noise just because a producer rendered
//! `500000` as `500000.0` or padded a string with whitespace. Equivalence is
//! therefore *normalized*: numbers compare within a configurable relative
//! tolerance, strings compare case- and whitespace-insensitively, and
//! structured values compare recursively under the same rules.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A fact's value in self-describing form.
///
/// Serialized untagged: JSON booleans, numbers, and strings map straight to
/// their variant; arrays and objects land in [`Self::Structured`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Structured(serde_json::Value),
}

impl FactValue {
    /// Build a value from an arbitrary JSON value, collapsing scalars onto
    /// their typed variants.
    #[must_use]
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                n.as_f64().map_or(Self::Structured(serde_json::Value::Number(n)), Self::Number)
            }
            serde_json::Value::String(s) => Self::Text(s),
            other => Self::Structured(other),
        }
    }

    /// The JSON rendering of this value, used for storage.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => serde_json::Number::from_f64(*n)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::Structured(v) => v.clone(),
        }
    }

    /// Normalized equivalence between two values.
    ///
    /// `rel_tolerance` bounds the relative difference under which two numbers
    /// count as the same; see [`crate::config::ArbitrationConfig`].
    #[must_use]
    pub fn normalized_eq(&self, other: &Self, rel_tolerance: f64) -> bool {
        json_eq(&self.to_json(), &other.to_json(), rel_tolerance)
    }
}

impl fmt::Display for FactValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
            Self::Structured(v) => write!(f, "{v}"),
        }
    }
}

/// Collapse internal whitespace, trim, and lowercase for comparison.
fn normalize_text(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Relative numeric closeness. Exact-zero pairs compare equal; otherwise the
/// difference is measured against the larger magnitude.
fn numbers_close(a: f64, b: f64, rel_tolerance: f64) -> bool {
    if !a.is_finite() || !b.is_finite() {
        return false;
    }
    let diff = (a - b).abs();
    if diff == 0.0 {
        return true;
    }
    let scale = a.abs().max(b.abs());
    diff <= rel_tolerance * scale
}

fn json_eq(a: &serde_json::Value, b: &serde_json::Value, tol: f64) -> bool {
    use serde_json::Value;
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => numbers_close(x, y, tol),
            _ => x == y,
        },
        (Value::String(x), Value::String(y)) => normalize_text(x) == normalize_text(y),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| json_eq(x, y, tol))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, xv)| y.get(k).is_some_and(|yv| json_eq(xv, yv, tol)))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TOL: f64 = 1e-6;

    #[test]
    fn numbers_within_tolerance_are_equal() {
        let a = FactValue::Number(500_000.0);
        let b = FactValue::Number(500_000.000_1);
        assert!(a.normalized_eq(&b, TOL));
    }

    #[test]
    fn numbers_outside_tolerance_differ() {
        let a = FactValue::Number(500_000.0);
        let b = FactValue::Number(520_000.0);
        assert!(!a.normalized_eq(&b, TOL));
    }

    #[test]
    fn zero_equals_zero() {
        assert!(FactValue::Number(0.0).normalized_eq(&FactValue::Number(0.0), TOL));
        assert!(!FactValue::Number(0.0).normalized_eq(&FactValue::Number(1.0), TOL));
    }

    #[test]
    fn non_finite_numbers_never_match() {
        assert!(!FactValue::Number(f64::NAN).normalized_eq(&FactValue::Number(f64::NAN), TOL));
    }

    #[test]
    fn strings_compare_case_and_whitespace_insensitively() {
        let a = FactValue::Text("  United   Kingdom ".into());
        let b = FactValue::Text("united kingdom".into());
        assert!(a.normalized_eq(&b, TOL));
        assert!(!a.normalized_eq(&FactValue::Text("united states".into()), TOL));
    }

    #[test]
    fn booleans_compare_exactly() {
        assert!(FactValue::Bool(true).normalized_eq(&FactValue::Bool(true), TOL));
        assert!(!FactValue::Bool(true).normalized_eq(&FactValue::Bool(false), TOL));
    }

    #[test]
    fn cross_type_values_never_match() {
        assert!(!FactValue::Text("true".into()).normalized_eq(&FactValue::Bool(true), TOL));
        assert!(!FactValue::Number(1.0).normalized_eq(&FactValue::Text("1".into()), TOL));
    }

    #[test]
    fn structured_values_compare_recursively() {
        let a = FactValue::Structured(json!({"lead": "Acme  Ventures", "amount": 2_000_000.0}));
        let b = FactValue::Structured(json!({"amount": 2_000_000.000_001, "lead": "acme ventures"}));
        assert!(a.normalized_eq(&b, TOL));

        let c = FactValue::Structured(json!({"lead": "Beta Capital", "amount": 2_000_000.0}));
        assert!(!a.normalized_eq(&c, TOL));
    }

    #[test]
    fn untagged_serde_maps_scalars_to_variants() {
        let v: FactValue = serde_json::from_str("42.5").expect("number");
        assert!(matches!(v, FactValue::Number(_)));
        let v: FactValue = serde_json::from_str("\"hq in london\"").expect("string");
        assert!(matches!(v, FactValue::Text(_)));
        let v: FactValue = serde_json::from_str("false").expect("bool");
        assert!(matches!(v, FactValue::Bool(false)));
        let v: FactValue = serde_json::from_str("{\"a\":1}").expect("object");
        assert!(matches!(v, FactValue::Structured(_)));
    }

    #[test]
    fn from_json_collapses_scalars() {
        assert!(matches!(FactValue::from_json(json!(3)), FactValue::Number(_)));
        assert!(matches!(FactValue::from_json(json!([1, 2])), FactValue::Structured(_)));
    }
}
