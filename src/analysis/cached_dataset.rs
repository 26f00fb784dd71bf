//! Cached dataset requests

use super::{
    endpoint_url, validate_resource_name, AuthKeyRequirement, HttpMethod, KeenQueryRequest,
    PersistentAnalysis,
};
use crate::error::{Error, Result};
use serde_json::{json, Value};
use url::Url;

/// Timeframe for reading cached dataset results
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timeframe {
    /// Relative timeframe such as `this_7_days` or `previous_2_weeks`
    Relative(String),
    /// Absolute ISO-8601 bounds
    Absolute { start: String, end: String },
}

impl Timeframe {
    pub fn relative(timeframe: &str) -> Result<Self> {
        if timeframe.trim().is_empty() {
            return Err(Error::invalid("a relative timeframe cannot be blank"));
        }
        Ok(Timeframe::Relative(timeframe.to_string()))
    }

    pub fn absolute(start: &str, end: &str) -> Result<Self> {
        if start.trim().is_empty() || end.trim().is_empty() {
            return Err(Error::invalid("an absolute timeframe needs a start and an end"));
        }
        Ok(Timeframe::Absolute {
            start: start.to_string(),
            end: end.to_string(),
        })
    }

    /// Parse a command-line timeframe: a JSON `{"start","end"}` object or a
    /// relative timeframe string.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if !input.starts_with('{') {
            return Self::relative(input);
        }

        let value: Value = serde_json::from_str(input)
            .map_err(|e| Error::invalid(format!("malformed absolute timeframe: {}", e)))?;
        match (
            value.get("start").and_then(Value::as_str),
            value.get("end").and_then(Value::as_str),
        ) {
            (Some(start), Some(end)) => Self::absolute(start, end),
            _ => Err(Error::invalid(
                "an absolute timeframe needs string start and end members",
            )),
        }
    }

    fn to_query_param(&self) -> String {
        match self {
            Timeframe::Relative(timeframe) => timeframe.clone(),
            Timeframe::Absolute { start, end } => json!({ "start": start, "end": end }).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Operation {
    List {
        limit: Option<u32>,
        after_name: Option<String>,
    },
    Definition,
    Results {
        index_by: Value,
        timeframe: Timeframe,
    },
    Create {
        query: Value,
        index_by: Vec<String>,
    },
    Delete,
}

/// A request against the cached datasets endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct CachedDatasetRequest {
    analysis: PersistentAnalysis,
    operation: Operation,
}

impl CachedDatasetRequest {
    /// List dataset definitions, optionally paging with `limit` and `after_name`
    pub fn list(limit: Option<u32>, after_name: Option<&str>) -> Result<Self> {
        if limit == Some(0) {
            return Err(Error::invalid("the list limit must be at least 1"));
        }
        if let Some(name) = after_name {
            validate_resource_name(Some(name))?;
        }

        Ok(Self {
            analysis: PersistentAnalysis::new(HttpMethod::Get, false, None, None)?,
            operation: Operation::List {
                limit,
                after_name: after_name.map(str::to_string),
            },
        })
    }

    /// Fetch the definition of a single dataset
    pub fn definition(name: &str) -> Result<Self> {
        Ok(Self {
            analysis: PersistentAnalysis::new(HttpMethod::Get, false, Some(name), None)?,
            operation: Operation::Definition,
        })
    }

    /// Read dataset results for one index value over a timeframe.
    ///
    /// `index_by` is either a single property value (string) or an object of
    /// index property values when the dataset is indexed by several.
    pub fn results(name: &str, index_by: Value, timeframe: Timeframe) -> Result<Self> {
        let analysis = PersistentAnalysis::new(HttpMethod::Get, false, Some(name), None)?;

        let valid_index = match &index_by {
            Value::String(s) => !s.trim().is_empty(),
            Value::Object(map) => !map.is_empty(),
            _ => false,
        };
        if !valid_index {
            return Err(Error::invalid(
                "index_by must be a non-blank string or a non-empty object",
            ));
        }

        Ok(Self {
            analysis,
            operation: Operation::Results {
                index_by,
                timeframe,
            },
        })
    }

    /// Define a new dataset. Unlike saved queries, datasets need a display name.
    pub fn create(
        name: &str,
        display_name: &str,
        query: Value,
        index_by: Vec<String>,
    ) -> Result<Self> {
        let analysis =
            PersistentAnalysis::new(HttpMethod::Put, true, Some(name), Some(display_name))?;

        let has_member = |key: &str| {
            query
                .get(key)
                .map(|v| !v.is_null())
                .unwrap_or(false)
        };
        if !has_member("analysis_type") || !has_member("interval") {
            return Err(Error::invalid(
                "a dataset query must be an object with an analysis_type and an interval",
            ));
        }

        if index_by.is_empty() || index_by.iter().any(|p| p.trim().is_empty()) {
            return Err(Error::invalid(
                "index_by must list at least one non-blank property",
            ));
        }

        Ok(Self {
            analysis,
            operation: Operation::Create { query, index_by },
        })
    }

    /// Delete a dataset
    pub fn delete(name: &str) -> Result<Self> {
        Ok(Self {
            analysis: PersistentAnalysis::new(HttpMethod::Delete, true, Some(name), None)?,
            operation: Operation::Delete,
        })
    }

    pub fn analysis(&self) -> &PersistentAnalysis {
        &self.analysis
    }
}

impl KeenQueryRequest for CachedDatasetRequest {
    fn http_method(&self) -> HttpMethod {
        self.analysis.http_method()
    }

    fn auth_key_requirement(&self) -> AuthKeyRequirement {
        self.analysis.auth_key_requirement()
    }

    fn retrieving_results(&self) -> bool {
        matches!(self.operation, Operation::Results { .. })
    }

    fn interval_response_expected(&self) -> bool {
        self.retrieving_results()
    }

    fn request_url(&self, base: &Url, project_id: &str) -> Result<Url> {
        let mut segments = vec!["projects", project_id, "datasets"];
        if let Some(name) = self.analysis.resource_name() {
            segments.push(name);
        }
        if self.retrieving_results() {
            segments.push("results");
        }
        let mut url = endpoint_url(base, segments)?;

        match &self.operation {
            Operation::List { limit, after_name } => {
                if limit.is_some() || after_name.is_some() {
                    let mut query = url.query_pairs_mut();
                    if let Some(limit) = limit {
                        query.append_pair("limit", &limit.to_string());
                    }
                    if let Some(after_name) = after_name {
                        query.append_pair("after_name", after_name);
                    }
                }
            }
            Operation::Results {
                index_by,
                timeframe,
            } => {
                url.query_pairs_mut()
                    .append_pair("index_by", &index_by.to_string())
                    .append_pair("timeframe", &timeframe.to_query_param());
            }
            _ => {}
        }

        Ok(url)
    }

    fn request_body(&self) -> Option<Value> {
        let Operation::Create { query, index_by } = &self.operation else {
            return None;
        };

        Some(json!({
            "display_name": self.analysis.display_name(),
            "query": query,
            "index_by": index_by,
        }))
    }
}
