//! Client SDK for managing Keen persistent analyses
//!
//! - [`analysis`] - Validated requests for saved queries and cached datasets
//! - [`result`] - Typed decoding of query results
//! - [`keen`] - HTTP transport, project credentials and the API client
//! - [`config`] - Persistent configuration and environment overrides

pub mod analysis;
pub mod config;
pub mod error;
pub mod keen;
pub mod result;

pub use error::{Error, Result};
