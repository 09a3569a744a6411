//! End-to-end tests for the train / predict / feedback / retrain cycle

use std::fs;
use tempfile::TempDir;
use trisent_core::{
    LabeledExample, PipelineConfig, PipelineError, PredictionService, RetrainOrchestrator,
    RetrainOutcome, RetrainState, Sentiment, Trainer,
};

fn setup(corpus: &str) -> (TempDir, PipelineConfig) {
    let dir = TempDir::new().unwrap();
    let config = PipelineConfig::with_dirs(dir.path().join("data"), dir.path().join("models"));
    fs::create_dir_all(dir.path().join("data")).unwrap();
    fs::write(&config.corpus_path, corpus).unwrap();
    (dir, config)
}

#[test]
fn test_train_then_predict() {
    let (_dir, config) = setup("positive|i love this\nnegative|i hate this\n");

    Trainer::from_config(&config).run().unwrap();
    let service = PredictionService::try_load(&config.artifact_store()).unwrap();

    assert_eq!(service.predict("i love this").unwrap().label, Sentiment::Positive);
    assert_eq!(service.predict("i hate this").unwrap().label, Sentiment::Negative);
}

#[test]
fn test_blank_input_is_invalid() {
    let (_dir, config) = setup("positive|i love this\nnegative|i hate this\n");
    Trainer::from_config(&config).run().unwrap();
    let service = PredictionService::load(&config.artifact_store());

    assert!(matches!(service.predict(""), Err(PipelineError::InvalidInput(_))));
    assert!(matches!(service.predict("   "), Err(PipelineError::InvalidInput(_))));
}

#[test]
fn test_missing_corpus_fails_without_artifacts() {
    let dir = TempDir::new().unwrap();
    let config = PipelineConfig::with_dirs(dir.path().join("data"), dir.path().join("models"));

    let err = Trainer::from_config(&config).run().unwrap_err();
    assert!(matches!(err, PipelineError::DatasetMissing { .. }));
    assert!(!config.model_dir.exists());
}

#[test]
fn test_feedback_retrain_cycle() {
    let (_dir, config) = setup("positive|i love this\nnegative|i hate this\n");
    Trainer::from_config(&config).run().unwrap();
    let before = config.artifact_store().load().unwrap().fingerprint;

    let feedback = config.feedback_store();
    feedback
        .append(&LabeledExample::new(Sentiment::Mixed, "it was okay").unwrap())
        .unwrap();

    let mut retrain = RetrainOrchestrator::from_config(&config);
    let outcome = retrain.run().unwrap();
    assert_eq!(retrain.state(), RetrainState::Done);

    match outcome {
        RetrainOutcome::Retrained { merged, report } => {
            assert_eq!(merged, 1);
            assert_eq!(report.samples, 3);
            assert_ne!(report.fingerprint, before);
        }
        RetrainOutcome::NoOp => panic!("expected a retrain"),
    }

    assert_eq!(config.corpus_store().load().unwrap().len(), 3);
    assert!(!feedback.exists());

    let service = PredictionService::try_load(&config.artifact_store()).unwrap();
    assert_eq!(service.predict("it was okay").unwrap().label, Sentiment::Mixed);
}

#[test]
fn test_merge_counts_only_valid_feedback() {
    let (_dir, config) = setup("positive|great\nnegative|awful\n");
    fs::write(
        &config.feedback_path,
        "mixed|average at best\nnonsense\n\npositive|superb\n",
    )
    .unwrap();

    let mut retrain = RetrainOrchestrator::from_config(&config);
    match retrain.run().unwrap() {
        RetrainOutcome::Retrained { merged, .. } => assert_eq!(merged, 2),
        RetrainOutcome::NoOp => panic!("expected a retrain"),
    }
    assert_eq!(config.corpus_store().load().unwrap().len(), 4);
    assert!(!config.feedback_store().exists());
}

#[test]
fn test_retraining_alone_is_repeatable() {
    let (_dir, config) = setup("positive|i love this\nnegative|i hate this\nmixed|it was okay\n");
    let trainer = Trainer::from_config(&config);
    let first = trainer.run().unwrap();
    let second = trainer.run().unwrap();
    assert_eq!(first.samples, second.samples);
    assert_eq!(first.vocabulary_size, second.vocabulary_size);
}
