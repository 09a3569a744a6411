//! Retrain cycle: fold pending feedback into the corpus, then refit
//!
//! The merge is at-least-once. Once feedback is appended to the corpus and
//! the log is cleared, a training failure does not undo the merge; the
//! previous artifacts stay in place and training alone can be retried.

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::feedback::FeedbackStore;
use crate::observability::EventLogger;
use crate::training::{Trainer, TrainingReport};
use tracing::{debug, warn};

/// Progress of a retrain cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrainState {
    Idle,
    Merging,
    Training,
    Done,
    NoOp,
}

/// Result of [`RetrainOrchestrator::run`]
#[derive(Debug, Clone)]
pub enum RetrainOutcome {
    /// Nothing was pending; corpus and models untouched
    NoOp,
    Retrained {
        merged: usize,
        report: TrainingReport,
    },
}

pub struct RetrainOrchestrator {
    feedback: FeedbackStore,
    trainer: Trainer,
    state: RetrainState,
    logger: EventLogger,
}

impl RetrainOrchestrator {
    pub fn new(feedback: FeedbackStore, trainer: Trainer) -> Self {
        Self {
            feedback,
            trainer,
            state: RetrainState::Idle,
            logger: EventLogger::new("retrain"),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.feedback_store(), Trainer::from_config(config))
    }

    pub fn state(&self) -> RetrainState {
        self.state
    }

    pub fn run(&mut self) -> Result<RetrainOutcome> {
        self.state = RetrainState::Idle;

        if !self.feedback.exists() {
            self.transition(RetrainState::NoOp);
            self.logger.log_retrain(0);
            return Ok(RetrainOutcome::NoOp);
        }

        let records = self.feedback.read()?;
        if records.is_empty() {
            // Only malformed lines were pending; drain them
            self.feedback.clear()?;
            self.transition(RetrainState::NoOp);
            self.logger.log_retrain(0);
            return Ok(RetrainOutcome::NoOp);
        }

        self.transition(RetrainState::Merging);
        let merged = self.trainer.corpus().append(&records)?;
        self.feedback.clear()?;

        self.transition(RetrainState::Training);
        let report = self.trainer.run().map_err(|e| {
            warn!(
                merged = merged,
                error = %e,
                "Retraining failed after feedback was merged into the corpus"
            );
            e
        })?;

        self.transition(RetrainState::Done);
        self.logger.log_retrain(merged);
        Ok(RetrainOutcome::Retrained { merged, report })
    }

    fn transition(&mut self, next: RetrainState) {
        debug!(from = ?self.state, to = ?next, "Retrain state change");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use std::fs;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> PipelineConfig {
        PipelineConfig::with_dirs(dir.path().join("data"), dir.path().join("models"))
    }

    fn seed(config: &PipelineConfig, corpus: &str) {
        fs::create_dir_all(config.corpus_path.parent().unwrap()).unwrap();
        fs::write(&config.corpus_path, corpus).unwrap();
    }

    #[test]
    fn test_absent_feedback_is_noop() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        seed(&config, "positive|i love this\nnegative|i hate this\n");
        Trainer::from_config(&config).run().unwrap();

        let store = config.artifact_store();
        let corpus_before = fs::read(&config.corpus_path).unwrap();
        let features_before = fs::read(store.feature_path()).unwrap();
        let classifier_before = fs::read(store.classifier_path()).unwrap();

        let mut retrain = RetrainOrchestrator::from_config(&config);
        assert!(matches!(retrain.run().unwrap(), RetrainOutcome::NoOp));
        assert_eq!(retrain.state(), RetrainState::NoOp);

        assert_eq!(fs::read(&config.corpus_path).unwrap(), corpus_before);
        assert_eq!(fs::read(store.feature_path()).unwrap(), features_before);
        assert_eq!(fs::read(store.classifier_path()).unwrap(), classifier_before);
    }

    #[test]
    fn test_feedback_with_only_garbage_is_drained() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        seed(&config, "positive|good\nnegative|bad\n");
        fs::write(&config.feedback_path, "garbage\n").unwrap();

        let mut retrain = RetrainOrchestrator::from_config(&config);
        assert!(matches!(retrain.run().unwrap(), RetrainOutcome::NoOp));
        assert!(!config.feedback_store().exists());
        assert!(!config.artifact_store().exists());
    }

    #[test]
    fn test_training_failure_keeps_merge() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        seed(&config, "mixed|meh\n");
        fs::write(&config.feedback_path, "mixed|so so\n").unwrap();

        let mut retrain = RetrainOrchestrator::from_config(&config);
        let err = retrain.run().unwrap_err();
        assert!(matches!(err, PipelineError::TrainingFailure(_)));
        assert_eq!(retrain.state(), RetrainState::Training);

        assert_eq!(config.corpus_store().load().unwrap().len(), 2);
        assert!(!config.feedback_store().exists());
    }
}
