//! Keen Client
//!
//! Main client for the Keen API, combining project credentials and HTTP
//! functionality. Requests are validated when they are built, so the client
//! only picks the key, builds the URL and decodes the response.

use super::http::KeenHttpClient;
use super::project::KeenProject;
use crate::analysis::{HttpMethod, KeenQueryRequest};
use crate::error::Error;
use crate::result::{decode_response, QueryResult, ResponseShape};
use anyhow::{Context, Result};
use serde_json::Value;
use url::Url;

/// Default API root
pub const DEFAULT_API_URL: &str = "https://api.keen.io/3.0";

/// Main Keen client
#[derive(Clone, Debug)]
pub struct KeenClient {
    pub project: KeenProject,
    pub http: KeenHttpClient,
    base_url: Url,
}

impl KeenClient {
    /// Create a client against the public API
    pub fn new(project: KeenProject) -> Result<Self> {
        Self::with_base_url(project, DEFAULT_API_URL)
    }

    /// Create a client against another API root (proxies, test servers)
    pub fn with_base_url(project: KeenProject, base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid API URL: {}", base_url))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Url(format!("{} cannot be used as a base URL", base_url)).into());
        }

        let http = KeenHttpClient::new()?;

        Ok(Self {
            project,
            http,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Full URL a request will be sent to
    pub fn request_url<R>(&self, request: &R) -> Result<Url>
    where
        R: KeenQueryRequest + ?Sized,
    {
        Ok(request.request_url(&self.base_url, self.project.project_id())?)
    }

    /// Send a request and return the raw JSON response.
    ///
    /// Fails before any I/O if the project lacks the key the request needs.
    pub async fn execute<R>(&self, request: &R) -> Result<Value>
    where
        R: KeenQueryRequest + ?Sized,
    {
        let key = self.project.key_for(request.auth_key_requirement())?;
        let url = self.request_url(request)?;
        let body = request.request_body();

        tracing::debug!(
            "Executing {} request with {}",
            request.http_method(),
            request.auth_key_requirement()
        );

        match request.http_method() {
            HttpMethod::Get => self.http.get(&url, key).await,
            HttpMethod::Post => self.http.post(&url, key, body.as_ref()).await,
            HttpMethod::Put => self.http.put(&url, key, body.as_ref()).await,
            HttpMethod::Delete => self.http.delete(&url, key).await,
        }
    }

    /// Send a result-fetching request and decode its result
    pub async fn query_result<R>(&self, request: &R) -> Result<QueryResult>
    where
        R: KeenQueryRequest + ?Sized,
    {
        if !request.retrieving_results() {
            return Err(Error::invalid("request does not retrieve results").into());
        }

        let body = self.execute(request).await?;
        let shape = ResponseShape::for_request(request, &body);
        tracing::debug!(
            "Decoding result (grouped: {}, interval: {})",
            shape.grouped,
            shape.interval
        );

        decode_response(&body, shape).context("Failed to decode query result")
    }
}

/// Format a Keen API error for display
pub fn format_keen_error(error: &anyhow::Error) -> String {
    super::http::format_keen_error(error)
}
