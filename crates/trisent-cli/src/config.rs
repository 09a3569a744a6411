//! Configuration management for the CLI
//!
//! Flags and environment variables win over the config file, which wins
//! over the built-in defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use trisent_core::PipelineConfig;

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_MODEL_DIR: &str = "models";
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// CLI configuration file contents
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Directory holding sentiment.txt and feedback.txt
    pub data_dir: Option<PathBuf>,
    /// Directory holding the model pair
    pub model_dir: Option<PathBuf>,
    /// API endpoint URL for `query`
    pub api_url: Option<String>,
}

impl Config {
    /// Load configuration from the user's config file, if any
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).context("Failed to read config file")?;

        serde_json::from_str(&content).context("Failed to parse config file")
    }

    /// Get the configuration file path
    fn config_path() -> Option<PathBuf> {
        let home = dirs_next::home_dir()?;
        Some(home.join(".config").join("trisent").join("config.json"))
    }

    /// Resolve pipeline paths, preferring explicit overrides
    pub fn pipeline(
        &self,
        data_dir: Option<PathBuf>,
        model_dir: Option<PathBuf>,
    ) -> PipelineConfig {
        let data_dir = data_dir
            .or_else(|| self.data_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let model_dir = model_dir
            .or_else(|| self.model_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_DIR));
        PipelineConfig::with_dirs(data_dir, model_dir)
    }

    pub fn api_url(&self, api_url: Option<String>) -> String {
        api_url
            .or_else(|| self.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }
}
