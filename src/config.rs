//! Configuration Management
//!
//! Handles persistent configuration storage for keenq and resolves the
//! effective project settings (CLI > environment > config file > default).

use crate::keen::client::DEFAULT_API_URL;
use crate::keen::project::{KeenProject, MASTER_KEY_ENV, PROJECT_ID_ENV, READ_KEY_ENV};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variable overriding the API root
pub const API_URL_ENV: &str = "KEEN_API_URL";

/// User configuration
#[derive(Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Project to address by default
    #[serde(default)]
    pub project_id: Option<String>,
    /// Read key for the default project
    #[serde(default)]
    pub read_key: Option<String>,
    /// Master key for the default project
    #[serde(default)]
    pub master_key: Option<String>,
    /// API root, for proxies or self-hosted gateways
    #[serde(default)]
    pub api_url: Option<String>,
}

// Keys stay out of logs and panic messages
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("project_id", &self.project_id)
            .field("read_key", &self.read_key.as_ref().map(|_| "<redacted>"))
            .field("master_key", &self.master_key.as_ref().map(|_| "<redacted>"))
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("keenq").join("config.json"))
    }

    /// Load configuration from the default location
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load configuration from a file, falling back to defaults if it is
    /// missing or unreadable
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    /// Save configuration to a file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;

        Ok(())
    }

    /// Overlay values from the environment
    pub fn with_env(mut self) -> Self {
        let env = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        if let Some(v) = env(PROJECT_ID_ENV) {
            self.project_id = Some(v);
        }
        if let Some(v) = env(READ_KEY_ENV) {
            self.read_key = Some(v);
        }
        if let Some(v) = env(MASTER_KEY_ENV) {
            self.master_key = Some(v);
        }
        if let Some(v) = env(API_URL_ENV) {
            self.api_url = Some(v);
        }
        self
    }

    /// Get effective API root
    pub fn effective_api_url(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }

    /// Build the project, preferring an explicit project id (from the CLI)
    pub fn project(&self, project_override: Option<&str>) -> Result<KeenProject> {
        let project_id = project_override
            .or(self.project_id.as_deref())
            .with_context(|| {
                format!(
                    "No project configured. Pass --project or set {}",
                    PROJECT_ID_ENV
                )
            })?;

        Ok(KeenProject::new(
            project_id,
            self.read_key.clone(),
            self.master_key.clone(),
        )?)
    }

    /// Set project and save
    pub fn set_project(&mut self, project_id: &str) -> Result<()> {
        self.project_id = Some(project_id.to_string());
        self.save()
    }
}
