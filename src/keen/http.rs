//! HTTP utilities for Keen REST API calls

use crate::analysis::HttpMethod;
use anyhow::{Context, Result};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method};
use serde_json::Value;
use url::Url;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Truncate a response body and strip control characters before logging
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| c.is_control(), "")
}

/// HTTP client wrapper for Keen API calls
#[derive(Clone, Debug)]
pub struct KeenHttpClient {
    client: Client,
}

impl KeenHttpClient {
    /// Create a new HTTP client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("keenq/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Make a GET request to the Keen API
    pub async fn get(&self, url: &Url, key: &str) -> Result<Value> {
        self.send(HttpMethod::Get, url, key, None).await
    }

    /// Make a POST request to the Keen API
    pub async fn post(&self, url: &Url, key: &str, body: Option<&Value>) -> Result<Value> {
        self.send(HttpMethod::Post, url, key, body).await
    }

    /// Make a PUT request to the Keen API
    pub async fn put(&self, url: &Url, key: &str, body: Option<&Value>) -> Result<Value> {
        self.send(HttpMethod::Put, url, key, body).await
    }

    /// Make a DELETE request to the Keen API
    pub async fn delete(&self, url: &Url, key: &str) -> Result<Value> {
        self.send(HttpMethod::Delete, url, key, None).await
    }

    /// Send a request and parse the JSON response.
    ///
    /// An empty body on success (e.g. `204 No Content` after a delete) is
    /// returned as `Value::Null`.
    pub async fn send(
        &self,
        method: HttpMethod,
        url: &Url,
        key: &str,
        body: Option<&Value>,
    ) -> Result<Value> {
        tracing::debug!("{} {}", method, url);

        let method = match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        };

        let mut request = self
            .client
            .request(method, url.clone())
            .header(AUTHORIZATION, key);

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.context("Failed to send request")?;

        let status = response.status();
        let response_body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            // Only the sanitized, truncated body is logged
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&response_body));
            return Err(anyhow::anyhow!("API request failed: {}", status));
        }

        if response_body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&response_body).context("Failed to parse response JSON")
    }
}

/// Format a Keen API error for display
pub fn format_keen_error(error: &anyhow::Error) -> String {
    let error_str = error.to_string();

    if error_str.contains("401") {
        return "Authentication failed. Check the project's read and master keys.".to_string();
    }
    if error_str.contains("403") {
        return "Permission denied. This operation may need the master key.".to_string();
    }
    if error_str.contains("404") {
        return "Resource not found.".to_string();
    }
    if error_str.contains("429") {
        return "Rate limit exceeded. Please try again later.".to_string();
    }
    if error_str.contains("400") {
        return "Invalid request. Check your parameters.".to_string();
    }
    if error_str.contains("500") || error_str.contains("503") {
        return "Keen service temporarily unavailable. Please try again.".to_string();
    }
    if error_str.contains("409") {
        return "Resource conflict. The analysis may already exist.".to_string();
    }

    if error_str.contains("API request failed") {
        return "Request failed. Check your network connection and try again.".to_string();
    }

    let sanitized = error_str
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .take(80)
        .collect::<String>();

    if sanitized.len() < error_str.len() {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let body = "x".repeat(500);
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.starts_with(&"x".repeat(MAX_LOG_BODY_LENGTH)));
        assert!(sanitized.ends_with("[truncated, 500 bytes total]"));
    }

    #[test]
    fn test_sanitize_respects_char_boundaries() {
        let body = "é".repeat(150);
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.contains("truncated, 300 bytes total"));
    }

    #[test]
    fn test_sanitize_strips_control_characters() {
        assert_eq!(sanitize_for_log("line\none\r\t"), "lineone");
    }

    #[test]
    fn test_format_keen_error() {
        let err = anyhow::anyhow!("API request failed: 404 Not Found");
        assert_eq!(format_keen_error(&err), "Resource not found.");

        let err = anyhow::anyhow!("API request failed: 401 Unauthorized");
        assert!(format_keen_error(&err).starts_with("Authentication failed"));

        let err = anyhow::anyhow!("API request failed: 418 I'm a teapot");
        assert!(format_keen_error(&err).starts_with("Request failed"));

        let err = anyhow::anyhow!("{}", "z".repeat(100));
        assert_eq!(format_keen_error(&err), format!("{}...", "z".repeat(80)));
    }
}
