//! Error taxonomy for the sentiment pipeline
//!
//! Dataset-level and model-level failures are fatal to the operation that
//! raised them. Malformed individual corpus or feedback lines never surface
//! here; they are dropped where they are parsed.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// The corpus file does not exist
    #[error("Dataset not found: {}", path.display())]
    DatasetMissing { path: PathBuf },

    /// The corpus file exists but holds no valid records
    #[error("No valid training samples found in {}", path.display())]
    DatasetEmpty { path: PathBuf },

    /// Feature extraction or classifier fitting could not produce a usable model
    #[error("Training failed: {0}")]
    TrainingFailure(String),

    /// The persisted model pair is missing, corrupt or mismatched
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Caller supplied unusable input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A feedback record could not be persisted
    #[error("Failed to write feedback to {}: {source}", path.display())]
    FeedbackWriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    /// Stable machine-readable code for adapters
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::DatasetMissing { .. } => "dataset_missing",
            PipelineError::DatasetEmpty { .. } => "dataset_empty",
            PipelineError::TrainingFailure(_) => "training_failure",
            PipelineError::ModelUnavailable(_) => "model_unavailable",
            PipelineError::InvalidInput(_) => "invalid_input",
            PipelineError::FeedbackWriteFailure { .. } => "feedback_write_failure",
            PipelineError::Io(_) => "io_error",
            PipelineError::Serialization(_) => "serialization_error",
        }
    }
}
