//! Persistent analysis listings
//!
//! Functions for listing saved queries and cached datasets as typed summaries.

use super::client::KeenClient;
use crate::analysis::{CachedDatasetRequest, SavedQueryRequest};
use anyhow::Result;
use serde_json::Value;

fn str_field(value: &Value, pointer: &str, default: &str) -> String {
    value
        .pointer(pointer)
        .and_then(|v| v.as_str())
        .unwrap_or(default)
        .to_string()
}

/// Saved query information
#[derive(Debug, Clone, PartialEq)]
pub struct SavedQuerySummary {
    pub query_name: String,
    pub display_name: String,
    pub analysis_type: String,
    pub refresh_rate: u64,
}

impl From<&Value> for SavedQuerySummary {
    fn from(value: &Value) -> Self {
        let query_name = str_field(value, "/query_name", "-");
        Self {
            display_name: value
                .pointer("/metadata/display_name")
                .and_then(|v| v.as_str())
                .unwrap_or(&query_name)
                .to_string(),
            analysis_type: str_field(value, "/query/analysis_type", "-"),
            refresh_rate: value
                .get("refresh_rate")
                .and_then(|v| v.as_u64())
                .unwrap_or(0),
            query_name,
        }
    }
}

/// Cached dataset information
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSummary {
    pub dataset_name: String,
    pub display_name: String,
    pub index_by: Vec<String>,
    pub status: String,
}

impl From<&Value> for DatasetSummary {
    fn from(value: &Value) -> Self {
        Self {
            dataset_name: str_field(value, "/dataset_name", "-"),
            display_name: str_field(value, "/display_name", "-"),
            index_by: value
                .get("index_by")
                .and_then(|v| v.as_array())
                .map(|arr| {
                    arr.iter()
                        .filter_map(|p| p.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default(),
            status: str_field(value, "/status", "UNKNOWN"),
        }
    }
}

/// One page of dataset definitions
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetPage {
    pub datasets: Vec<DatasetSummary>,
    pub count: u64,
    /// Name to pass as `after_name` for the next page, if more remain
    pub next_after_name: Option<String>,
}

/// List every saved query in the project
pub async fn list_saved_queries(client: &KeenClient) -> Result<Vec<SavedQuerySummary>> {
    let request = SavedQueryRequest::list_all()?;
    let response = client.execute(&request).await?;

    let queries = response
        .as_array()
        .map(|arr| arr.iter().map(SavedQuerySummary::from).collect())
        .unwrap_or_default();

    Ok(queries)
}

/// List one page of cached datasets
pub async fn list_datasets(
    client: &KeenClient,
    limit: Option<u32>,
    after_name: Option<&str>,
) -> Result<DatasetPage> {
    let request = CachedDatasetRequest::list(limit, after_name)?;
    let response = client.execute(&request).await?;

    let datasets: Vec<DatasetSummary> = response
        .get("datasets")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().map(DatasetSummary::from).collect())
        .unwrap_or_default();

    let count = response
        .get("count")
        .and_then(|v| v.as_u64())
        .unwrap_or(datasets.len() as u64);

    // A next_page_url means more pages follow the last dataset listed
    let next_after_name = response
        .get("next_page_url")
        .filter(|v| !v.is_null())
        .and(datasets.last())
        .map(|d| d.dataset_name.clone());

    Ok(DatasetPage {
        datasets,
        count,
        next_after_name,
    })
}
