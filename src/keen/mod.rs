//! Keen API interaction module
//!
//! This module provides the transport side of the SDK: project credentials,
//! the HTTP client, and the client that executes validated requests.
//!
//! # Module Structure
//!
//! - [`project`] - Project id and read/master keys
//! - [`client`] - Main Keen client for executing requests and decoding results
//! - [`http`] - HTTP utilities for REST API calls
//! - [`analyses`] - Saved query and cached dataset listings
//!
//! # Example
//!
//! ```ignore
//! use keenq::analysis::SavedQueryRequest;
//! use keenq::keen::{client::KeenClient, project::KeenProject};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let client = KeenClient::new(KeenProject::from_env()?)?;
//!     let result = client.query_result(&SavedQueryRequest::result("daily_signups")?).await?;
//!     println!("{:?}", result.long_value());
//!     Ok(())
//! }
//! ```

pub mod analyses;
pub mod client;
pub mod http;
pub mod project;
