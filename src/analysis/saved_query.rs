//! Saved query requests

use super::{
    endpoint_url, AuthKeyRequirement, HttpMethod, KeenQueryRequest, PersistentAnalysis,
};
use crate::error::{Error, Result};
use serde_json::{json, Value};
use url::Url;

/// How often the API recomputes a cached saved query, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefreshRate(u32);

impl RefreshRate {
    /// Caching disabled
    pub const NO_CACHING: RefreshRate = RefreshRate(0);
    /// Shortest allowed refresh interval (4 hours)
    pub const MIN_SECS: u32 = 4 * 60 * 60;
    /// Longest allowed refresh interval (48 hours)
    pub const MAX_SECS: u32 = 48 * 60 * 60;

    pub fn from_secs(secs: u32) -> Result<Self> {
        if secs == 0 || (Self::MIN_SECS..=Self::MAX_SECS).contains(&secs) {
            Ok(Self(secs))
        } else {
            Err(Error::invalid(format!(
                "refresh rate must be 0 or between {} and {} seconds, got {}",
                Self::MIN_SECS,
                Self::MAX_SECS,
                secs
            )))
        }
    }

    pub fn from_hours(hours: u32) -> Result<Self> {
        let secs = hours
            .checked_mul(60 * 60)
            .ok_or_else(|| Error::invalid(format!("refresh rate of {} hours overflows", hours)))?;
        Self::from_secs(secs)
    }

    pub fn as_secs(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Operation {
    ListAll,
    Definition,
    Result,
    Put { query: Value, refresh_rate: RefreshRate },
    Delete,
}

/// A request against the saved queries endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct SavedQueryRequest {
    analysis: PersistentAnalysis,
    operation: Operation,
}

impl SavedQueryRequest {
    /// List every saved query definition in the project
    pub fn list_all() -> Result<Self> {
        Ok(Self {
            analysis: PersistentAnalysis::new(HttpMethod::Get, true, None, None)?,
            operation: Operation::ListAll,
        })
    }

    /// Fetch the definition of a single saved query
    pub fn definition(name: &str) -> Result<Self> {
        Ok(Self {
            analysis: PersistentAnalysis::new(HttpMethod::Get, true, Some(name), None)?,
            operation: Operation::Definition,
        })
    }

    /// Run (or read the cached result of) a saved query
    pub fn result(name: &str) -> Result<Self> {
        Ok(Self {
            analysis: PersistentAnalysis::new(HttpMethod::Get, false, Some(name), None)?,
            operation: Operation::Result,
        })
    }

    /// Create a saved query, or replace an existing one with the same name.
    ///
    /// `query` must be a JSON object carrying at least an `analysis_type`.
    pub fn put(
        name: &str,
        display_name: Option<&str>,
        query: Value,
        refresh_rate: RefreshRate,
    ) -> Result<Self> {
        let analysis = PersistentAnalysis::new(HttpMethod::Put, true, Some(name), display_name)?;

        match query.get("analysis_type") {
            Some(Value::String(kind)) if !kind.trim().is_empty() => {}
            _ => {
                return Err(Error::invalid(
                    "a saved query definition must be an object with an analysis_type",
                ))
            }
        }

        Ok(Self {
            analysis,
            operation: Operation::Put {
                query,
                refresh_rate,
            },
        })
    }

    /// Delete a saved query
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

impl KeenQueryRequest for SavedQueryRequest {
    fn http_method(&self) -> HttpMethod {
        self.analysis.http_method()
    }

    fn auth_key_requirement(&self) -> AuthKeyRequirement {
        self.analysis.auth_key_requirement()
    }

    fn retrieving_results(&self) -> bool {
        matches!(self.operation, Operation::Result)
    }

    fn request_url(&self, base: &Url, project_id: &str) -> Result<Url> {
        let mut segments = vec!["projects", project_id, "queries", "saved"];
        if let Some(name) = self.analysis.resource_name() {
            segments.push(name);
        }
        if self.retrieving_results() {
            segments.push("result");
        }
        endpoint_url(base, segments)
    }

    fn request_body(&self) -> Option<Value> {
        let Operation::Put {
            query,
            refresh_rate,
        } = &self.operation
        else {
            return None;
        };

        // The API falls back to the resource name when no display name is stored
        let display_name = self
            .analysis
            .display_name()
            .or(self.analysis.resource_name())
            .unwrap_or_default();

        Some(json!({
            "query": query,
            "metadata": { "display_name": display_name },
            "refresh_rate": refresh_rate.as_secs(),
        }))
    }
}
