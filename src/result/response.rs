//! Response envelope decoding
//!
//! The query API wraps every result as `{"result": ...}`. Grouped queries
//! return a list of objects, each holding the group-by property values plus a
//! `result` member. Interval queries return a list of `{timeframe, value}`
//! entries, and when a query is both grouped and interval-based each `value`
//! is itself a grouped list.

use super::QueryResult;
use crate::analysis::KeenQueryRequest;
use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::{Map, Value};

/// The result of one group in a grouped response.
///
/// Group-by property values are dimension keys, not analysis results, so they
/// keep their raw JSON form (booleans included).
#[derive(Debug, Clone, PartialEq)]
pub struct GroupByEntry {
    pub properties: IndexMap<String, Value>,
    pub result: QueryResult,
    /// Position of the `result` member among the entry's members
    result_position: usize,
}

impl GroupByEntry {
    /// Build an entry whose `result` member serializes after the properties
    pub fn new(properties: IndexMap<String, Value>, result: QueryResult) -> Self {
        let result_position = properties.len();
        Self {
            properties,
            result,
            result_position,
        }
    }
}

impl Serialize for GroupByEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.properties.len() + 1))?;
        let position = self.result_position.min(self.properties.len());
        for (i, (key, value)) in self.properties.iter().enumerate() {
            if i == position {
                map.serialize_entry("result", &self.result)?;
            }
            map.serialize_entry(key, value)?;
        }
        if position == self.properties.len() {
            map.serialize_entry("result", &self.result)?;
        }
        map.end()
    }
}

/// Bounds of one interval
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbsoluteTimeframe {
    pub start: String,
    pub end: String,
}

/// The value computed for one interval
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalEntry {
    pub timeframe: AbsoluteTimeframe,
    pub value: QueryResult,
}

/// Which envelope a response body is expected to carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResponseShape {
    pub grouped: bool,
    pub interval: bool,
}

impl ResponseShape {
    pub const PLAIN: ResponseShape = ResponseShape {
        grouped: false,
        interval: false,
    };

    /// Work out the expected shape from the request, and for result-fetching
    /// requests from the query definition echoed back in the body.
    pub fn for_request<R>(request: &R, body: &Value) -> Self
    where
        R: KeenQueryRequest + ?Sized,
    {
        let mut shape = ResponseShape {
            grouped: request.grouped_response_expected(),
            interval: request.interval_response_expected(),
        };

        if request.retrieving_results() {
            if let Some(query) = body.get("query") {
                shape.grouped |= is_set(query.get("group_by"));
                shape.interval |= is_set(query.get("interval"));
            }
        }

        shape
    }
}

fn is_set(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}

/// Decode the `result` member of a response body
pub fn decode_response(body: &Value, shape: ResponseShape) -> Result<QueryResult> {
    let result = body
        .get("result")
        .ok_or_else(|| Error::unsupported("response has no result member"))?;

    if shape.interval {
        decode_intervals(result, shape.grouped)
    } else if shape.grouped {
        decode_groups(result)
    } else {
        QueryResult::from_json(result)
    }
}

fn as_list<'a>(value: &'a Value, what: &str) -> Result<&'a Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| Error::unsupported(format!("{} result must be a list", what)))
}

fn as_object<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| Error::unsupported(format!("{} entry must be an object", what)))
}

fn decode_groups(value: &Value) -> Result<QueryResult> {
    let groups = as_list(value, "grouped")?
        .iter()
        .map(|entry| {
            let entry = as_object(entry, "grouped")?;
            let result_position = entry
                .keys()
                .position(|key| key == "result")
                .ok_or_else(|| Error::unsupported("grouped entry has no result member"))?;

            let properties = entry
                .iter()
                .filter(|(key, _)| key.as_str() != "result")
                .map(|(key, v)| (key.clone(), v.clone()))
                .collect::<IndexMap<_, _>>();

            Ok(GroupByEntry {
                properties,
                result: QueryResult::from_json(&entry["result"])?,
                result_position,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(QueryResult::GroupBy(groups))
}

fn decode_intervals(value: &Value, grouped: bool) -> Result<QueryResult> {
    let intervals = as_list(value, "interval")?
        .iter()
        .map(|entry| {
            let entry = as_object(entry, "interval")?;

            let timeframe = entry
                .get("timeframe")
                .ok_or_else(|| Error::unsupported("interval entry has no timeframe"))?;
            let bound = |key: &str| {
                timeframe
                    .get(key)
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| {
                        Error::unsupported(format!("interval timeframe has no {} string", key))
                    })
            };
            let timeframe = AbsoluteTimeframe {
                start: bound("start")?,
                end: bound("end")?,
            };

            let value = entry
                .get("value")
                .ok_or_else(|| Error::unsupported("interval entry has no value"))?;
            let value = if grouped {
                decode_groups(value)?
            } else {
                QueryResult::from_json(value)?
            };

            Ok(IntervalEntry { timeframe, value })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(QueryResult::Interval(intervals))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{CachedDatasetRequest, SavedQueryRequest, Timeframe};
    use serde_json::json;

    #[test]
    fn test_plain_result() {
        let body = json!({ "result": 17 });
        let result = decode_response(&body, ResponseShape::PLAIN).unwrap();
        assert_eq!(result.long_value(), Some(17));
    }

    #[test]
    fn test_missing_result_member() {
        let err = decode_response(&json!({ "query": {} }), ResponseShape::PLAIN).unwrap_err();
        assert!(matches!(err, Error::UnsupportedResultShape(_)));
    }

    #[test]
    fn test_grouped_result() {
        let body: Value = serde_json::from_str(
            r#"{"result":[
                {"country":"NZ","platform":"ios","result":4},
                {"country":"AU","platform":"web","result":9}
            ]}"#,
        )
        .unwrap();
        let shape = ResponseShape {
            grouped: true,
            interval: false,
        };
        let result = decode_response(&body, shape).unwrap();
        assert!(result.is_group_by());

        let groups = result.group_by_value().unwrap();
        assert_eq!(groups.len(), 2);
        let keys: Vec<&str> = groups[0].properties.keys().map(String::as_str).collect();
        assert_eq!(keys, ["country", "platform"]);
        assert_eq!(groups[1].properties["country"].as_str(), Some("AU"));
        assert_eq!(groups[1].result.long_value(), Some(9));

        // re-serialising restores the response entries
        assert_eq!(result.to_json(), body["result"]);
    }

    #[test]
    fn test_boolean_group_key_kept_raw() {
        let body = json!({ "result": [
            { "is_premium": true, "result": 5 },
            { "is_premium": false, "result": 2 }
        ]});
        let shape = ResponseShape {
            grouped: true,
            interval: false,
        };
        let result = decode_response(&body, shape).unwrap();
        let groups = result.group_by_value().unwrap();
        assert_eq!(groups[0].properties["is_premium"], json!(true));
        assert_eq!(groups[1].properties["is_premium"], json!(false));
        assert_eq!(groups[0].result.long_value(), Some(5));
    }

    #[test]
    fn test_boolean_group_result_rejected() {
        let body = json!({ "result": [ { "country": "NZ", "result": true } ] });
        let shape = ResponseShape {
            grouped: true,
            interval: false,
        };
        let err = decode_response(&body, shape).unwrap_err();
        assert!(matches!(err, Error::UnsupportedResultShape(_)));
    }

    #[test]
    fn test_grouped_entry_keeps_result_position() {
        let text = r#"[{"result":5,"country":"NZ"},{"country":"AU","result":1,"platform":"web"}]"#;
        let body = json!({ "result": serde_json::from_str::<Value>(text).unwrap() });
        let shape = ResponseShape {
            grouped: true,
            interval: false,
        };
        let result = decode_response(&body, shape).unwrap();
        assert_eq!(serde_json::to_string(&result).unwrap(), text);
    }

    #[test]
    fn test_new_group_entry_writes_result_last() {
        let mut properties = IndexMap::new();
        properties.insert("country".to_string(), json!("NZ"));
        let entry = GroupByEntry::new(properties, QueryResult::Long(3));
        assert_eq!(
            serde_json::to_string(&entry).unwrap(),
            r#"{"country":"NZ","result":3}"#
        );
    }

    #[test]
    fn test_grouped_entry_needs_result() {
        let body = json!({ "result": [{ "country": "NZ" }] });
        let shape = ResponseShape {
            grouped: true,
            interval: false,
        };
        assert!(decode_response(&body, shape).is_err());
        assert!(decode_response(&json!({ "result": 3 }), shape).is_err());
    }

    #[test]
    fn test_interval_result() {
        let body = json!({ "result": [
            { "timeframe": { "start": "2024-01-01T00:00:00Z", "end": "2024-01-02T00:00:00Z" }, "value": 3 },
            { "timeframe": { "start": "2024-01-02T00:00:00Z", "end": "2024-01-03T00:00:00Z" }, "value": 5 }
        ]});
        let shape = ResponseShape {
            grouped: false,
            interval: true,
        };
        let result = decode_response(&body, shape).unwrap();
        let intervals = result.interval_value().unwrap();
        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[0].timeframe.start, "2024-01-01T00:00:00Z");
        assert_eq!(intervals[1].value.long_value(), Some(5));
        assert_eq!(result.to_json(), body["result"]);
    }

    #[test]
    fn test_grouped_interval_result() {
        let body = json!({ "result": [
            { "timeframe": { "start": "a", "end": "b" }, "value": [ { "item": "hat", "result": 2 } ] }
        ]});
        let shape = ResponseShape {
            grouped: true,
            interval: true,
        };
        let result = decode_response(&body, shape).unwrap();
        let groups = result.interval_value().unwrap()[0].value.group_by_value().unwrap();
        assert_eq!(groups[0].properties["item"].as_str(), Some("hat"));
        assert_eq!(groups[0].result.long_value(), Some(2));
    }

    #[test]
    fn test_interval_entry_validation() {
        let shape = ResponseShape {
            grouped: false,
            interval: true,
        };
        let no_timeframe = json!({ "result": [ { "value": 1 } ] });
        let no_end = json!({ "result": [ { "timeframe": { "start": "a" }, "value": 1 } ] });
        let no_value = json!({ "result": [ { "timeframe": { "start": "a", "end": "b" } } ] });
        for body in [no_timeframe, no_end, no_value] {
            assert!(decode_response(&body, shape).is_err(), "{body}");
        }
    }

    #[test]
    fn test_shape_from_saved_query_echo() {
        let request = SavedQueryRequest::result("by_country").unwrap();

        let body = json!({ "query": { "analysis_type": "count", "group_by": ["country"] }, "result": [] });
        assert_eq!(
            ResponseShape::for_request(&request, &body),
            ResponseShape {
                grouped: true,
                interval: false
            }
        );

        let body = json!({ "query": { "analysis_type": "count", "interval": "daily", "group_by": null }, "result": [] });
        assert_eq!(
            ResponseShape::for_request(&request, &body),
            ResponseShape {
                grouped: false,
                interval: true
            }
        );

        let body = json!({ "result": 1 });
        assert_eq!(ResponseShape::for_request(&request, &body), ResponseShape::PLAIN);
    }

    #[test]
    fn test_shape_ignores_echo_for_non_result_requests() {
        let request = SavedQueryRequest::definition("by_country").unwrap();
        let body = json!({ "query": { "group_by": "country" } });
        assert_eq!(ResponseShape::for_request(&request, &body), ResponseShape::PLAIN);
    }

    #[test]
    fn test_shape_for_dataset_results() {
        let request = CachedDatasetRequest::results(
            "ds",
            json!("u1"),
            Timeframe::relative("this_2_days").unwrap(),
        )
        .unwrap();
        let shape = ResponseShape::for_request(&request, &json!({ "result": [] }));
        assert!(shape.interval);
        assert!(!shape.grouped);
    }
}
