//! Core library for three-class sentiment classification
//!
//! This crate provides:
//! - Corpus and feedback file stores
//! - TF-IDF feature extraction and multinomial logistic regression
//! - Matched-pair model artifact persistence
//! - Training and feedback-merging retrain orchestration
//! - A prediction service for the CLI and HTTP adapters
//! - Health checks and observability

pub mod artifacts;
pub mod config;
pub mod convert;
pub mod corpus;
pub mod error;
pub mod feedback;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod retrain;
pub mod training;

pub use artifacts::{ArtifactStore, ModelPair};
pub use config::PipelineConfig;
pub use corpus::{CorpusScan, CorpusStore};
pub use error::{PipelineError, Result};
pub use feedback::FeedbackStore;
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{EventLogger, PipelineMetrics};
pub use predictor::PredictionService;
pub use retrain::{RetrainOrchestrator, RetrainOutcome, RetrainState};
pub use training::{Trainer, TrainingReport};
