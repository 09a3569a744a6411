//! Pipeline configuration

use crate::artifacts::ArtifactStore;
use crate::corpus::CorpusStore;
use crate::feedback::FeedbackStore;
use crate::models::DEFAULT_DELIMITER;
use crate::predictor::{ClassifierConfig, FeatureExtractor};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Storage locations and fit settings shared by every entry point
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Training corpus file
    #[serde(default = "default_corpus_path")]
    pub corpus_path: PathBuf,

    /// Pending feedback log
    #[serde(default = "default_feedback_path")]
    pub feedback_path: PathBuf,

    /// Directory holding the model pair
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,

    /// Label/text separator in corpus and feedback files
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    #[serde(default)]
    pub features: FeatureExtractor,

    #[serde(default)]
    pub classifier: ClassifierConfig,
}

fn default_corpus_path() -> PathBuf {
    PathBuf::from("data/sentiment.txt")
}

fn default_feedback_path() -> PathBuf {
    PathBuf::from("data/feedback.txt")
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("models")
}

fn default_delimiter() -> char {
    DEFAULT_DELIMITER
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            corpus_path: default_corpus_path(),
            feedback_path: default_feedback_path(),
            model_dir: default_model_dir(),
            delimiter: default_delimiter(),
            features: FeatureExtractor::default(),
            classifier: ClassifierConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Standard file names under a data directory and a model directory
    pub fn with_dirs(data_dir: impl AsRef<Path>, model_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            corpus_path: data_dir.join("sentiment.txt"),
            feedback_path: data_dir.join("feedback.txt"),
            model_dir: model_dir.into(),
            ..Default::default()
        }
    }

    pub fn corpus_store(&self) -> CorpusStore {
        CorpusStore::new(&self.corpus_path).with_delimiter(self.delimiter)
    }

    pub fn feedback_store(&self) -> FeedbackStore {
        FeedbackStore::new(&self.feedback_path).with_delimiter(self.delimiter)
    }

    pub fn artifact_store(&self) -> ArtifactStore {
        ArtifactStore::in_dir(&self.model_dir)
    }
}
