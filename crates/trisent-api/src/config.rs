//! Service configuration

use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;
use trisent_core::PipelineConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Listen port for the HTTP API
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Directory holding sentiment.txt and feedback.txt
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory holding the model pair
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,
}

fn default_api_port() -> u16 {
    8000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("models")
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            data_dir: default_data_dir(),
            model_dir: default_model_dir(),
        }
    }
}

impl ApiConfig {
    /// Load configuration from `TRISENT_*` environment variables
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("TRISENT"))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig::with_dirs(&self.data_dir, &self.model_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.api_port, 8000);
        let pipeline = config.pipeline();
        assert_eq!(pipeline.feedback_path, PathBuf::from("data/feedback.txt"));
        assert_eq!(pipeline.model_dir, PathBuf::from("models"));
    }
}
