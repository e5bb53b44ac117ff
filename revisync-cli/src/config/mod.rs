//! Configuration file and connection profiles

pub mod connection;

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::sync::engine::DEFAULT_BATCH_SIZE;

pub use connection::{ConnectionConfig, ConnectionRole, open_connection};

/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "REVISYNC_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub defaults: Defaults,
    pub connections: BTreeMap<String, ConnectionProfile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    pub batch_size: usize,
    /// GraphQL endpoint used by profiles that do not set their own
    pub endpoint: Option<String>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            endpoint: None,
        }
    }
}

/// A named connection, selectable with `--source <name>` / `--target <name>`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    pub endpoint: Option<String>,
    pub organization: String,
    pub project: String,
    pub branch: Option<String>,
    /// `draft`, `head` or a revision id
    pub revision: Option<String>,
    pub token: Option<String>,
}

impl Config {
    /// `$REVISYNC_CONFIG`, else `<config dir>/revisync/config.toml`
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("revisync")
            .join("config.toml")
    }

    /// Load the default config file; a missing file yields the defaults
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        if config.defaults.batch_size == 0 {
            anyhow::bail!("defaults.batch_size must be at least 1");
        }
        Ok(config)
    }

    pub fn profile(&self, name: &str) -> Option<&ConnectionProfile> {
        self.connections.get(name)
    }
}
