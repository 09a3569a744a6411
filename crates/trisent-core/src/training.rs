//! Training orchestration
//!
//! Loads the corpus, fits the vectorizer and classifier, and persists the
//! resulting pair. Dataset errors surface before any artifact is touched.

use crate::artifacts::ArtifactStore;
use crate::config::PipelineConfig;
use crate::corpus::CorpusStore;
use crate::error::Result;
use crate::models::Sentiment;
use crate::observability::{EventLogger, PipelineMetrics};
use crate::predictor::{ClassifierConfig, FeatureExtractor, FeatureVector};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::info;

/// Outcome of a successful training run
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub samples: usize,
    pub label_counts: BTreeMap<Sentiment, usize>,
    pub vocabulary_size: usize,
    pub iterations: usize,
    pub converged: bool,
    /// Share of corpus records the new model labels correctly
    pub training_accuracy: f64,
    pub fingerprint: String,
    pub trained_at: i64,
    pub elapsed_ms: u128,
}

/// Fits and persists a model pair from the corpus
#[derive(Clone)]
pub struct Trainer {
    corpus: CorpusStore,
    extractor: FeatureExtractor,
    classifier: ClassifierConfig,
    artifacts: ArtifactStore,
    metrics: PipelineMetrics,
    logger: EventLogger,
}

impl Trainer {
    pub fn new(
        corpus: CorpusStore,
        extractor: FeatureExtractor,
        classifier: ClassifierConfig,
        artifacts: ArtifactStore,
    ) -> Self {
        Self {
            corpus,
            extractor,
            classifier,
            artifacts,
            metrics: PipelineMetrics::new(),
            logger: EventLogger::new("trainer"),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.corpus_store(),
            config.features.clone(),
            config.classifier.clone(),
            config.artifact_store(),
        )
    }

    pub fn corpus(&self) -> &CorpusStore {
        &self.corpus
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    pub fn run(&self) -> Result<TrainingReport> {
        let result = self.train();
        if let Err(e) = &result {
            self.metrics.inc_training_failures();
            self.logger.log_training_failed(&e.to_string());
        }
        result
    }

    fn train(&self) -> Result<TrainingReport> {
        let start = Instant::now();

        info!(path = %self.corpus.path().display(), "Loading dataset");
        let records = self.corpus.load()?;
        info!(samples = records.len(), "Loaded samples");

        let texts: Vec<&str> = records.iter().map(|r| r.text.as_str()).collect();
        let labels: Vec<Sentiment> = records.iter().map(|r| r.label).collect();

        let features = self.extractor.fit(&texts)?;
        let vectors: Vec<FeatureVector> = texts.iter().map(|t| features.transform(t)).collect();

        info!(
            vocabulary_size = features.dimension(),
            "Training classifier"
        );
        let classifier = self.classifier.fit(&vectors, &labels, features.dimension())?;

        let correct = vectors
            .iter()
            .zip(&labels)
            .filter(|(v, label)| classifier.predict(v) == **label)
            .count();
        let training_accuracy = correct as f64 / records.len() as f64;

        let mut label_counts = BTreeMap::new();
        for label in &labels {
            *label_counts.entry(*label).or_insert(0) += 1;
        }

        let iterations = classifier.iterations();
        let converged = classifier.converged();
        let trained_at = chrono::Utc::now().timestamp();
        let pair = self.artifacts.save(features, classifier, trained_at)?;

        let elapsed = start.elapsed();
        self.metrics
            .observe_training(elapsed.as_secs_f64(), records.len());
        self.logger.log_training_completed(
            records.len(),
            pair.features.dimension(),
            iterations,
            converged,
            &pair.fingerprint,
        );

        Ok(TrainingReport {
            samples: records.len(),
            label_counts,
            vocabulary_size: pair.features.dimension(),
            iterations,
            converged,
            training_accuracy,
            fingerprint: pair.fingerprint,
            trained_at,
            elapsed_ms: elapsed.as_millis(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use std::fs;
    use tempfile::TempDir;

    fn trainer_in(dir: &TempDir) -> Trainer {
        Trainer::from_config(&PipelineConfig::with_dirs(
            dir.path().join("data"),
            dir.path().join("models"),
        ))
    }

    #[test]
    fn test_missing_corpus_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let trainer = trainer_in(&dir);
        let result = trainer.run();
        assert!(matches!(result, Err(PipelineError::DatasetMissing { .. })));
        assert!(!trainer.artifacts().feature_path().exists());
        assert!(!trainer.artifacts().classifier_path().exists());
    }

    #[test]
    fn test_single_class_corpus_keeps_old_artifacts() {
        let dir = TempDir::new().unwrap();
        let trainer = trainer_in(&dir);
        fs::create_dir_all(dir.path().join("data")).unwrap();
        fs::write(
            trainer.corpus().path(),
            "positive|i love this\nnegative|i hate this\n",
        )
        .unwrap();
        let first = trainer.run().unwrap();

        fs::write(trainer.corpus().path(), "mixed|meh\nmixed|so so\n").unwrap();
        assert!(matches!(trainer.run(), Err(PipelineError::TrainingFailure(_))));

        let still = trainer.artifacts().load().unwrap();
        assert_eq!(still.fingerprint, first.fingerprint);
    }

    #[test]
    fn test_report_describes_run() {
        let dir = TempDir::new().unwrap();
        let trainer = trainer_in(&dir);
        fs::create_dir_all(dir.path().join("data")).unwrap();
        fs::write(
            trainer.corpus().path(),
            "positive|great phone\nnegative|terrible phone\nmixed|okay phone\nbroken line\n",
        )
        .unwrap();

        let report = trainer.run().unwrap();
        assert_eq!(report.samples, 3);
        assert_eq!(report.label_counts.len(), 3);
        assert!(report.vocabulary_size >= 4);
        assert!(report.iterations <= 500);
        assert_eq!(report.training_accuracy, 1.0);
        assert_eq!(report.fingerprint.len(), 64);
    }
}
