//! Persistent analysis requests
//!
//! Request construction and validation for the endpoints that manage
//! persistent analyses: saved queries and cached datasets.
//!
//! # Module Structure
//!
//! - [`saved_query`] - Saved query requests (list, definition, result, put, delete)
//! - [`cached_dataset`] - Cached dataset requests (list, definition, results, create, delete)
//!
//! Every concrete request wraps a [`PersistentAnalysis`], which enforces the
//! naming rules shared by both resource families, and implements
//! [`KeenQueryRequest`] so [`crate::keen::client::KeenClient`] can execute it.

pub mod cached_dataset;
pub mod saved_query;

use crate::error::{Error, Result};
use serde_json::Value;
use std::fmt;
use url::Url;

pub use cached_dataset::{CachedDatasetRequest, Timeframe};
pub use saved_query::{RefreshRate, SavedQueryRequest};

/// HTTP methods used by the persistent analysis endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which project key a request must be authorized with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthKeyRequirement {
    Master,
    Read,
}

impl fmt::Display for AuthKeyRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthKeyRequirement::Master => f.write_str("master key"),
            AuthKeyRequirement::Read => f.write_str("read key"),
        }
    }
}

/// Capabilities of a request the client knows how to execute
pub trait KeenQueryRequest {
    fn http_method(&self) -> HttpMethod;

    fn auth_key_requirement(&self) -> AuthKeyRequirement;

    /// Does this request retrieve a result or results?
    fn retrieving_results(&self) -> bool {
        false
    }

    fn grouped_response_expected(&self) -> bool {
        false
    }

    fn interval_response_expected(&self) -> bool {
        false
    }

    /// Full URL of the request for the given API base and project
    fn request_url(&self, base: &Url, project_id: &str) -> Result<Url>;

    /// JSON body to send, if any
    fn request_body(&self) -> Option<Value> {
        None
    }
}

/// Validated parameters shared by every persistent analysis request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistentAnalysis {
    http_method: HttpMethod,
    needs_master_key: bool,
    resource_name: Option<String>,
    display_name: Option<String>,
}

impl PersistentAnalysis {
    /// Validate and build the shared request parameters.
    ///
    /// The resource name can only be omitted for a GET request. The display
    /// name is optional, but must not be blank when given.
    pub fn new(
        http_method: HttpMethod,
        needs_master_key: bool,
        resource_name: Option<&str>,
        display_name: Option<&str>,
    ) -> Result<Self> {
        match resource_name {
            Some(name) => validate_resource_name(Some(name))?,
            None if http_method != HttpMethod::Get => {
                return Err(Error::invalid(
                    "a resource name is required for non-GET requests",
                ));
            }
            None => {}
        }

        if let Some(name) = display_name {
            validate_display_name(Some(name))?;
        }

        Ok(Self {
            http_method,
            needs_master_key,
            resource_name: resource_name.map(str::to_string),
            display_name: display_name.map(str::to_string),
        })
    }

    pub fn http_method(&self) -> HttpMethod {
        self.http_method
    }

    pub fn needs_master_key(&self) -> bool {
        self.needs_master_key
    }

    pub fn resource_name(&self) -> Option<&str> {
        self.resource_name.as_deref()
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn auth_key_requirement(&self) -> AuthKeyRequirement {
        if self.needs_master_key {
            AuthKeyRequirement::Master
        } else {
            AuthKeyRequirement::Read
        }
    }
}

/// Check a resource name against the API naming rules.
///
/// Names can only contain ASCII alphanumerics, hyphens and underscores.
/// Non-ASCII letters are rejected: the API slugifies them away, so a name
/// containing them would never address the stored analysis.
pub fn validate_resource_name(name: Option<&str>) -> Result<()> {
    let valid = match name {
        Some(name) if !name.is_empty() => name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'),
        _ => false,
    };

    if !valid {
        return Err(Error::invalid(
            "the resource name can only be comprised of alphanumerics, hyphens and underscores",
        ));
    }
    Ok(())
}

/// Check that a display name has at least one non-whitespace character.
pub fn validate_display_name(name: Option<&str>) -> Result<()> {
    match name {
        Some(name) if !name.trim().is_empty() => Ok(()),
        _ => Err(Error::invalid(
            "the display name cannot be absent, empty or whitespace only",
        )),
    }
}

/// Append path segments to the API base URL.
pub(crate) fn endpoint_url<I, S>(base: &Url, segments: I) -> Result<Url>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut url = base.clone();
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| Error::Url(format!("{} cannot be used as a base URL", base)))?;
        path.pop_if_empty().extend(segments);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_name_accepts_allowed_characters() {
        for name in ["max_signups", "daily-active-users", "Q3", "a", "_-_", "AbC123"] {
            assert!(validate_resource_name(Some(name)).is_ok(), "{name}");
        }
    }

    #[test]
    fn test_resource_name_rejects_other_characters() {
        for name in ["", "has space", "dotted.name", "slash/name", "Ñandú", "naïve", "a\n"] {
            assert!(
                matches!(validate_resource_name(Some(name)), Err(Error::InvalidArgument(_))),
                "{name:?}"
            );
        }
        assert!(validate_resource_name(None).is_err());
    }

    #[test]
    fn test_display_name_rules() {
        assert!(validate_display_name(Some("Daily Signups")).is_ok());
        assert!(validate_display_name(Some("  x  ")).is_ok());
        assert!(validate_display_name(Some("")).is_err());
        assert!(validate_display_name(Some(" \t\n ")).is_err());
        assert!(validate_display_name(None).is_err());
    }

    #[test]
    fn test_get_without_resource_name() {
        let analysis = PersistentAnalysis::new(HttpMethod::Get, false, None, None).unwrap();
        assert_eq!(analysis.resource_name(), None);
        assert_eq!(analysis.auth_key_requirement(), AuthKeyRequirement::Read);
    }

    #[test]
    fn test_non_get_requires_resource_name() {
        for method in [HttpMethod::Post, HttpMethod::Put, HttpMethod::Delete] {
            let err = PersistentAnalysis::new(method, true, None, None).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)), "{method}");
        }
    }

    #[test]
    fn test_construction_validates_names() {
        assert!(PersistentAnalysis::new(HttpMethod::Put, true, Some("bad name"), None).is_err());
        assert!(PersistentAnalysis::new(HttpMethod::Put, true, Some("ok"), Some("   ")).is_err());

        let analysis =
            PersistentAnalysis::new(HttpMethod::Put, true, Some("ok"), Some("Okay")).unwrap();
        assert_eq!(analysis.resource_name(), Some("ok"));
        assert_eq!(analysis.display_name(), Some("Okay"));
        assert_eq!(analysis.auth_key_requirement(), AuthKeyRequirement::Master);
    }

    #[test]
    fn test_auth_key_requirement_display() {
        assert_eq!(AuthKeyRequirement::Master.to_string(), "master key");
        assert_eq!(AuthKeyRequirement::Read.to_string(), "read key");
    }

    #[test]
    fn test_endpoint_url_appends_segments() {
        let base = Url::parse("https://api.keen.io/3.0").unwrap();
        let url = endpoint_url(&base, ["projects", "p1", "queries", "saved"]).unwrap();
        assert_eq!(url.as_str(), "https://api.keen.io/3.0/projects/p1/queries/saved");

        let trailing = Url::parse("http://localhost:8080/3.0/").unwrap();
        let url = endpoint_url(&trailing, ["projects", "p1"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/3.0/projects/p1");
    }
}
