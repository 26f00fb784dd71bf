//! Keen project credentials
//!
//! A project is addressed by its id and authorized with one of two keys: the
//! read key for reading results, the master key for administrative calls.

use crate::analysis::AuthKeyRequirement;
use crate::error::{Error, Result};
use std::fmt;

/// Environment variable holding the project id
pub const PROJECT_ID_ENV: &str = "KEEN_PROJECT_ID";
/// Environment variable holding the read key
pub const READ_KEY_ENV: &str = "KEEN_READ_KEY";
/// Environment variable holding the master key
pub const MASTER_KEY_ENV: &str = "KEEN_MASTER_KEY";

/// Project id plus the keys available for it
#[derive(Clone, PartialEq, Eq)]
pub struct KeenProject {
    project_id: String,
    read_key: Option<String>,
    master_key: Option<String>,
}

impl KeenProject {
    pub fn new(
        project_id: &str,
        read_key: Option<String>,
        master_key: Option<String>,
    ) -> Result<Self> {
        if !is_valid_project_id(project_id) {
            return Err(Error::invalid(
                "a project id must be non-empty and contain only ASCII alphanumerics",
            ));
        }

        Ok(Self {
            project_id: project_id.to_string(),
            read_key: read_key.filter(|k| !k.trim().is_empty()),
            master_key: master_key.filter(|k| !k.trim().is_empty()),
        })
    }

    /// Build a project from `KEEN_PROJECT_ID`, `KEEN_READ_KEY` and `KEEN_MASTER_KEY`
    pub fn from_env() -> Result<Self> {
        let project_id = std::env::var(PROJECT_ID_ENV)
            .map_err(|_| Error::invalid(format!("{} is not set", PROJECT_ID_ENV)))?;
        Self::new(
            &project_id,
            std::env::var(READ_KEY_ENV).ok(),
            std::env::var(MASTER_KEY_ENV).ok(),
        )
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Key to authorize a request with.
    ///
    /// The master key can stand in for a missing read key, never the reverse.
    pub fn key_for(&self, requirement: AuthKeyRequirement) -> Result<&str> {
        let key = match requirement {
            AuthKeyRequirement::Master => self.master_key.as_deref(),
            AuthKeyRequirement::Read => self.read_key.as_deref().or(self.master_key.as_deref()),
        };
        key.ok_or(Error::MissingKey(requirement))
    }
}

// Keys stay out of logs and panic messages
impl fmt::Debug for KeenProject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeenProject")
            .field("project_id", &self.project_id)
            .field("read_key", &self.read_key.as_ref().map(|_| "<redacted>"))
            .field("master_key", &self.master_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Project ids are hex object ids; accept any ASCII alphanumeric id
fn is_valid_project_id(project_id: &str) -> bool {
    !project_id.is_empty() && project_id.chars().all(|c| c.is_ascii_alphanumeric())
}
