//! Configuration for reaching the scheduler.
//!
//! Values are resolved in layers, later ones winning:
//! - built-in defaults
//! - `config.json` in the platform config directory
//! - `NOMAD_*` / `QCR_*` environment variables
//! - command-line flags

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// Configuration file name.
const CONFIG_FILE: &str = "config.json";

/// Default scheduler HTTP address.
pub const DEFAULT_ADDRESS: &str = "http://127.0.0.1:4646";

/// Get the config directory path.
fn config_dir() -> Result<PathBuf> {
    ProjectDirs::from("com", "quick-cell-reload", "quick-cell-reload")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
}

/// Scheduler connection and logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Scheduler HTTP address.
    #[serde(default = "default_address")]
    pub address: String,

    /// ACL token sent as `X-Nomad-Token`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Region forwarded as a query parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Namespace used when `--namespace` is not given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Per-request HTTP timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_address() -> String {
    DEFAULT_ADDRESS.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: default_address(),
            token: None,
            region: None,
            namespace: None,
            log_level: default_log_level(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Config {
    /// Load config from the config directory and the environment.
    pub fn load() -> Result<Self> {
        let path = config_dir()?.join(CONFIG_FILE);
        let config = Self::load_from(&path)?;
        Ok(config.with_env(|key| std::env::var(key).ok()))
    }

    /// Load config from a file, or return the default if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {:?}", path))
    }

    /// Overlay environment variables read through `lookup`.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(address) = non_empty("NOMAD_ADDR") {
            self.address = address;
        }
        if let Some(token) = non_empty("NOMAD_TOKEN") {
            self.token = Some(token);
        }
        if let Some(region) = non_empty("NOMAD_REGION") {
            self.region = Some(region);
        }
        if let Some(namespace) = non_empty("NOMAD_NAMESPACE") {
            self.namespace = Some(namespace);
        }
        if let Some(level) = non_empty("QCR_LOG_LEVEL") {
            self.log_level = level;
        }

        self
    }

    /// Apply command-line overrides.
    pub fn with_overrides(
        mut self,
        address: Option<String>,
        token: Option<String>,
        region: Option<String>,
    ) -> Self {
        if let Some(address) = address {
            self.address = address;
        }
        if token.is_some() {
            self.token = token;
        }
        if region.is_some() {
            self.region = region;
        }
        self
    }

    /// Get the scheduler address without a trailing slash.
    pub fn address(&self) -> &str {
        self.address.trim_end_matches('/')
    }
}
