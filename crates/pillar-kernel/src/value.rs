//! Fact values and dot-path lookup.
//!
//! Fact contexts arrive as `serde_json::Value` and are never mutated.
//! Expression evaluation works over [`FactValue`], which adds two things
//! JSON cannot carry: an explicit `Absent` marker for paths that do not
//! resolve, and arbitrary `f64` numbers (NaN and infinities included) so
//! that coercion failures can propagate instead of erroring.

use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// Largest integer magnitude rendered back to JSON as an integer.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// A value produced or consumed by expression evaluation.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FactValue {
    /// A path that did not resolve. Distinct from an explicit `null`.
    #[default]
    Absent,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<FactValue>),
    Map(BTreeMap<String, FactValue>),
}

impl FactValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, FactValue::Absent)
    }

    /// Truthiness: `false`, null/absent, `0`, NaN, `""` and `[]` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            FactValue::Absent | FactValue::Null => false,
            FactValue::Bool(b) => *b,
            FactValue::Number(n) => *n != 0.0 && !n.is_nan(),
            FactValue::String(s) => !s.is_empty(),
            FactValue::List(items) => !items.is_empty(),
            FactValue::Map(_) => true,
        }
    }

    /// Numeric coercion. Accepts numbers, booleans, and numeric strings;
    /// everything else becomes NaN.
    pub fn to_number(&self) -> f64 {
        match self {
            FactValue::Number(n) => *n,
            FactValue::Bool(true) => 1.0,
            FactValue::Bool(false) => 0.0,
            FactValue::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    f64::NAN
                } else {
                    trimmed.parse::<f64>().unwrap_or(f64::NAN)
                }
            }
            _ => f64::NAN,
        }
    }

    pub fn as_list(&self) -> Option<&[FactValue]> {
        match self {
            FactValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FactValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Structural equality used by `eq`, `ne`, `in`, and `intersect`.
    ///
    /// `Absent` and `Null` compare equal to each other. Numbers compare
    /// by IEEE equality, so NaN never equals anything. Values of different
    /// kinds are never equal; no cross-kind coercion is applied.
    pub fn loose_eq(&self, other: &FactValue) -> bool {
        match (self, other) {
            (
                FactValue::Absent | FactValue::Null,
                FactValue::Absent | FactValue::Null,
            ) => true,
            (FactValue::Bool(a), FactValue::Bool(b)) => a == b,
            (FactValue::Number(a), FactValue::Number(b)) => a == b,
            (FactValue::String(a), FactValue::String(b)) => a == b,
            (FactValue::List(a), FactValue::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            (FactValue::Map(a), FactValue::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|((ka, va), (kb, vb))| ka == kb && va.loose_eq(vb))
            }
            _ => false,
        }
    }

    /// Render back to JSON.
    ///
    /// `Absent` and non-finite numbers become `null`. Integral numbers
    /// within the safe-integer range become JSON integers so that results
    /// serialize identically regardless of how a number was computed.
    pub fn to_json(&self) -> Value {
        match self {
            FactValue::Absent | FactValue::Null => Value::Null,
            FactValue::Bool(b) => Value::Bool(*b),
            FactValue::Number(n) => number_to_json(*n),
            FactValue::String(s) => Value::String(s.clone()),
            FactValue::List(items) => Value::Array(items.iter().map(FactValue::to_json).collect()),
            FactValue::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }
}

pub(crate) fn number_to_json(n: f64) -> Value {
    if !n.is_finite() {
        return Value::Null;
    }
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return Value::Number(Number::from(n as i64));
    }
    Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
}

impl From<&Value> for FactValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => FactValue::Null,
            Value::Bool(b) => FactValue::Bool(*b),
            Value::Number(n) => FactValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => FactValue::String(s.clone()),
            Value::Array(items) => FactValue::List(items.iter().map(FactValue::from).collect()),
            Value::Object(entries) => FactValue::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), FactValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for FactValue {
    fn from(value: Value) -> Self {
        FactValue::from(&value)
    }
}

impl From<f64> for FactValue {
    fn from(n: f64) -> Self {
        FactValue::Number(n)
    }
}

impl From<bool> for FactValue {
    fn from(b: bool) -> Self {
        FactValue::Bool(b)
    }
}

impl From<&str> for FactValue {
    fn from(s: &str) -> Self {
        FactValue::String(s.to_string())
    }
}

/// Resolve a dot-separated path against a fact context.
///
/// Object segments select keys; segments that parse as an unsigned
/// integer index into arrays. A missing key, an out-of-range index, or a
/// `null`/scalar intermediate yields [`FactValue::Absent`]. An empty path
/// selects the whole context.
pub fn lookup_path(facts: &Value, path: &str) -> FactValue {
    if path.is_empty() {
        return FactValue::from(facts);
    }

    let mut current = facts;
    for segment in path.split('.') {
        let next = match current {
            Value::Object(entries) => entries.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        match next {
            Some(value) => current = value,
            None => return FactValue::Absent,
        }
    }
    FactValue::from(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_walks_nested_objects_and_arrays() {
        let facts = json!({"chart": {"pillars": [{"stem": "gap"}, {"stem": "eul"}]}});
        assert_eq!(
            lookup_path(&facts, "chart.pillars.1.stem"),
            FactValue::String("eul".to_string())
        );
    }

    #[test]
    fn lookup_short_circuits_on_null_intermediate() {
        let facts = json!({"a": null});
        assert_eq!(lookup_path(&facts, "a.b.c"), FactValue::Absent);
        assert_eq!(lookup_path(&facts, "a"), FactValue::Null);
        assert_eq!(lookup_path(&facts, "missing"), FactValue::Absent);
    }

    #[test]
    fn numeric_coercion() {
        assert_eq!(FactValue::Bool(true).to_number(), 1.0);
        assert_eq!(FactValue::from(" 2.5 ").to_number(), 2.5);
        assert!(FactValue::from("wood").to_number().is_nan());
        assert!(FactValue::from("").to_number().is_nan());
        assert!(FactValue::Null.to_number().is_nan());
        assert!(FactValue::List(vec![]).to_number().is_nan());
    }

    #[test]
    fn truthiness_table() {
        assert!(!FactValue::Absent.is_truthy());
        assert!(!FactValue::Number(0.0).is_truthy());
        assert!(!FactValue::Number(f64::NAN).is_truthy());
        assert!(!FactValue::from("").is_truthy());
        assert!(!FactValue::List(vec![]).is_truthy());
        assert!(FactValue::Map(BTreeMap::new()).is_truthy());
        assert!(FactValue::from("0").is_truthy());
    }

    #[test]
    fn json_rendering_normalizes_numbers() {
        assert_eq!(FactValue::Number(42.0).to_json(), json!(42));
        assert_eq!(FactValue::Number(0.5).to_json(), json!(0.5));
        assert_eq!(FactValue::Number(f64::INFINITY).to_json(), Value::Null);
        assert_eq!(FactValue::Absent.to_json(), Value::Null);
    }

    #[test]
    fn absent_equals_null_but_nan_equals_nothing() {
        assert!(FactValue::Absent.loose_eq(&FactValue::Null));
        assert!(!FactValue::Number(f64::NAN).loose_eq(&FactValue::Number(f64::NAN)));
        assert!(!FactValue::Number(1.0).loose_eq(&FactValue::from("1")));
    }
}
