//! Typed query results
//!
//! [`QueryResult`] is a closed sum type over the JSON shapes the query API
//! returns. Exactly one `is_*` predicate holds for any value, and the matching
//! accessor returns `Some` only for that shape (numeric accessors follow the
//! exact-value rule documented on [`QueryResult::long_value`] and
//! [`QueryResult::double_value`]).
//!
//! Plain values are decoded with [`QueryResult::from_json`]. Whole responses,
//! including grouped and interval envelopes, go through [`decode_response`].

mod response;

pub use response::{decode_response, AbsoluteTimeframe, GroupByEntry, IntervalEntry, ResponseShape};

use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// Largest magnitude an f64 holds without losing integer precision
const MAX_EXACT_F64_INT: u64 = 1 << 53;

/// A decoded query result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryResult {
    String(String),
    Long(i64),
    Double(f64),
    List(Vec<QueryResult>),
    Map(IndexMap<String, QueryResult>),
    GroupBy(Vec<GroupByEntry>),
    Interval(Vec<IntervalEntry>),
    Null,
}

impl QueryResult {
    /// Decode a plain JSON value.
    ///
    /// Objects become [`QueryResult::Map`] in response order. Booleans are
    /// not part of the result contract and fail the whole decode.
    ///
    /// Integers that fit in an i64 become [`QueryResult::Long`]. Larger
    /// integers become [`QueryResult::Double`] and keep only f64 precision,
    /// so `18446744073709551615` re-serializes as the nearest f64
    /// (1.8446744073709552e19), not the original digits.
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(QueryResult::Null),
            Value::String(s) => Ok(QueryResult::String(s.clone())),
            Value::Number(n) => {
                if let Some(v) = n.as_i64() {
                    Ok(QueryResult::Long(v))
                } else if let Some(v) = n.as_f64() {
                    Ok(QueryResult::Double(v))
                } else {
                    Err(Error::unsupported(format!("unrepresentable number {}", n)))
                }
            }
            Value::Array(items) => items
                .iter()
                .map(QueryResult::from_json)
                .collect::<Result<Vec<_>>>()
                .map(QueryResult::List),
            Value::Object(map) => map
                .iter()
                .map(|(k, v)| Ok((k.clone(), QueryResult::from_json(v)?)))
                .collect::<Result<IndexMap<_, _>>>()
                .map(QueryResult::Map),
            Value::Bool(b) => Err(Error::unsupported(format!("boolean result {}", b))),
        }
    }

    /// Serialize back to JSON, preserving list and key order
    pub fn to_json(&self) -> Value {
        // Every variant maps onto plain JSON types, so this cannot fail
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn is_string(&self) -> bool {
        matches!(self, QueryResult::String(_))
    }

    pub fn is_long(&self) -> bool {
        matches!(self, QueryResult::Long(_))
    }

    pub fn is_double(&self) -> bool {
        matches!(self, QueryResult::Double(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, QueryResult::List(_))
    }

    pub fn is_map(&self) -> bool {
        matches!(self, QueryResult::Map(_))
    }

    pub fn is_group_by(&self) -> bool {
        matches!(self, QueryResult::GroupBy(_))
    }

    pub fn is_interval(&self) -> bool {
        matches!(self, QueryResult::Interval(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, QueryResult::Null)
    }

    pub fn string_value(&self) -> Option<&str> {
        match self {
            QueryResult::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view of a numeric result.
    ///
    /// A `Double` converts only when it is finite, has no fractional part and
    /// fits in an i64; anything else yields `None` rather than truncating.
    pub fn long_value(&self) -> Option<i64> {
        match *self {
            QueryResult::Long(v) => Some(v),
            QueryResult::Double(v)
                if v.is_finite()
                    && v.fract() == 0.0
                    && v >= i64::MIN as f64
                    && v < i64::MAX as f64 =>
            {
                Some(v as i64)
            }
            _ => None,
        }
    }

    /// Floating point view of a numeric result.
    ///
    /// A `Long` converts only when its magnitude is at most 2^53, where every
    /// integer is exactly representable.
    pub fn double_value(&self) -> Option<f64> {
        match *self {
            QueryResult::Double(v) => Some(v),
            QueryResult::Long(v) if v.unsigned_abs() <= MAX_EXACT_F64_INT => Some(v as f64),
            _ => None,
        }
    }

    pub fn list_value(&self) -> Option<&[QueryResult]> {
        match self {
            QueryResult::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn map_value(&self) -> Option<&IndexMap<String, QueryResult>> {
        match self {
            QueryResult::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn group_by_value(&self) -> Option<&[GroupByEntry]> {
        match self {
            QueryResult::GroupBy(groups) => Some(groups),
            _ => None,
        }
    }

    pub fn interval_value(&self) -> Option<&[IntervalEntry]> {
        match self {
            QueryResult::Interval(intervals) => Some(intervals),
            _ => None,
        }
    }
}

impl TryFrom<&Value> for QueryResult {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self> {
        QueryResult::from_json(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn predicates(result: &QueryResult) -> [bool; 8] {
        [
            result.is_string(),
            result.is_long(),
            result.is_double(),
            result.is_list(),
            result.is_map(),
            result.is_group_by(),
            result.is_interval(),
            result.is_null(),
        ]
    }

    fn true_count(result: &QueryResult) -> usize {
        predicates(result).iter().filter(|p| **p).count()
    }

    #[test]
    fn test_string() {
        let result = QueryResult::from_json(&json!("hello")).unwrap();
        assert!(result.is_string());
        assert_eq!(result.string_value(), Some("hello"));
        assert_eq!(true_count(&result), 1);
        assert_eq!(result.long_value(), None);
        assert!(result.list_value().is_none());
    }

    #[test]
    fn test_numbers() {
        let long = QueryResult::from_json(&json!(42)).unwrap();
        assert!(long.is_long());
        assert_eq!(long.long_value(), Some(42));
        assert_eq!(long.double_value(), Some(42.0));
        assert_eq!(true_count(&long), 1);

        let double = QueryResult::from_json(&json!(2.5)).unwrap();
        assert!(double.is_double());
        assert_eq!(double.double_value(), Some(2.5));
        assert_eq!(true_count(&double), 1);
    }

    #[test]
    fn test_numeric_width_is_exact() {
        // fractional doubles never truncate to an integer
        assert_eq!(QueryResult::Double(2.5).long_value(), None);
        assert_eq!(QueryResult::Double(-0.1).long_value(), None);
        assert_eq!(QueryResult::Double(3.0).long_value(), Some(3));
        assert_eq!(QueryResult::Double(1e19).long_value(), None);
        assert_eq!(QueryResult::Double(f64::NAN).long_value(), None);

        assert_eq!(QueryResult::Long(1 << 53).double_value(), Some(9_007_199_254_740_992.0));
        assert_eq!(QueryResult::Long(-(1 << 53)).double_value(), Some(-9_007_199_254_740_992.0));
        assert_eq!(QueryResult::Long((1 << 53) + 1).double_value(), None);
        assert_eq!(QueryResult::Long(i64::MIN).double_value(), None);
    }

    #[test]
    fn test_u64_beyond_i64_is_double() {
        let result = QueryResult::from_json(&json!(u64::MAX)).unwrap();
        assert!(result.is_double());
        assert_eq!(result.long_value(), None);

        // f64 precision only: the low digits do not survive re-serialization
        let value: Value = serde_json::from_str("18446744073709551615").unwrap();
        let result = QueryResult::from_json(&value).unwrap();
        let written = serde_json::to_string(&result).unwrap();
        assert_ne!(written, "18446744073709551615");
        let reread: f64 = serde_json::from_str(&written).unwrap();
        assert_eq!(reread, u64::MAX as f64);
    }

    #[test]
    fn test_list_preserves_order() {
        let result = QueryResult::from_json(&json!([1, 2, 3])).unwrap();
        assert!(result.is_list());
        assert_eq!(true_count(&result), 1);
        let items = result.list_value().unwrap();
        assert_eq!(
            items,
            &[QueryResult::Long(1), QueryResult::Long(2), QueryResult::Long(3)]
        );
    }

    #[test]
    fn test_map_preserves_key_order() {
        let value: Value = serde_json::from_str(r#"{"b": 2, "a": 1, "c": null}"#).unwrap();
        let result = QueryResult::from_json(&value).unwrap();
        assert!(result.is_map());
        assert_eq!(true_count(&result), 1);
        let keys: Vec<&str> = result.map_value().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["b", "a", "c"]);
        assert!(result.map_value().unwrap()["c"].is_null());
    }

    #[test]
    fn test_null() {
        let result = QueryResult::from_json(&Value::Null).unwrap();
        assert!(result.is_null());
        assert_eq!(predicates(&result), [false, false, false, false, false, false, false, true]);
    }

    #[test]
    fn test_boolean_rejected() {
        let err = QueryResult::from_json(&json!(true)).unwrap_err();
        assert!(matches!(err, Error::UnsupportedResultShape(_)));

        // nested booleans fail the whole decode
        assert!(QueryResult::from_json(&json!([1, false])).is_err());
        assert!(QueryResult::from_json(&json!({ "a": { "b": true } })).is_err());
    }

    #[test]
    fn test_round_trip_preserves_order() {
        let text = r#"{"zeta":[3,1,2],"alpha":{"y":"b","x":"a"},"mid":1.5,"none":null}"#;
        let value: Value = serde_json::from_str(text).unwrap();
        let result = QueryResult::try_from(&value).unwrap();
        assert_eq!(serde_json::to_string(&result).unwrap(), text);
        assert_eq!(result.to_json(), value);
    }
}
