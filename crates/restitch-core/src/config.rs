//! Configuration management for Restitch.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Restitch configuration loaded from .git/restitch/config.toml.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
}

impl Config {
    /// Load config from a TOML file.
    ///
    /// # Errors
    /// Returns error if file can't be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to a TOML file.
    ///
    /// # Errors
    /// Returns error if serialization or write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| std::io::Error::other(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// General Restitch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Branch to compute the reference point against.
    #[serde(default = "default_base")]
    pub default_base: String,

    /// Ask for confirmation when a split would produce more pieces than
    /// this.
    #[serde(default = "default_split_threshold")]
    pub confirm_large_splits: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_base: default_base(),
            confirm_large_splits: default_split_threshold(),
        }
    }
}

fn default_base() -> String {
    "main".into()
}

const fn default_split_threshold() -> usize {
    10
}
