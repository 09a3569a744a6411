//! Local pipeline commands: train, retrain, predict, feedback

use anyhow::{Context, Result};
use tabled::Tabled;
use tracing::{debug, info};
use trisent_core::{
    LabeledExample, PipelineConfig, Prediction, PredictionService, RetrainOrchestrator,
    RetrainOutcome, Sentiment, Trainer, TrainingReport,
};

use crate::output::{
    color_confidence, color_label, format_timestamp, print_info, print_json, print_success,
    print_table, print_warning, FieldRow, OutputFormat,
};

/// Row for per-label corpus counts
#[derive(Tabled, serde::Serialize)]
struct LabelCountRow {
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Records")]
    records: usize,
}

/// Fit and save a new model pair from the corpus
pub fn train(config: &PipelineConfig, format: OutputFormat) -> Result<()> {
    info!(
        corpus = %config.corpus_path.display(),
        model_dir = %config.model_dir.display(),
        "Local training requested"
    );
    let report = Trainer::from_config(config)
        .run()
        .context("Training failed")?;
    info!(
        fingerprint = %report.fingerprint,
        samples = report.samples,
        "Local training finished"
    );

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            print_success("Training complete, model saved");
            print_report(&report);
        }
    }
    Ok(())
}

/// Merge pending feedback into the corpus and retrain
pub fn retrain(config: &PipelineConfig, format: OutputFormat) -> Result<()> {
    info!(
        feedback = %config.feedback_path.display(),
        corpus = %config.corpus_path.display(),
        "Local retrain requested"
    );
    let mut orchestrator = RetrainOrchestrator::from_config(config);
    let outcome = orchestrator.run().context("Retrain failed")?;
    match &outcome {
        RetrainOutcome::NoOp => info!("Local retrain skipped, no feedback pending"),
        RetrainOutcome::Retrained { merged, report } => info!(
            merged = *merged,
            fingerprint = %report.fingerprint,
            "Local retrain finished"
        ),
    }

    match (format, outcome) {
        (OutputFormat::Json, RetrainOutcome::NoOp) => {
            print_json(&serde_json::json!({ "status": "noop", "merged": 0 }))?
        }
        (OutputFormat::Json, RetrainOutcome::Retrained { merged, report }) => {
            print_json(&serde_json::json!({
                "status": "retrained",
                "merged": merged,
                "report": report,
            }))?
        }
        (OutputFormat::Table, RetrainOutcome::NoOp) => print_info("No feedback to retrain."),
        (OutputFormat::Table, RetrainOutcome::Retrained { merged, report }) => {
            print_success(&format!(
                "Merged {} feedback record{} and retrained",
                merged,
                if merged == 1 { "" } else { "s" }
            ));
            print_report(&report);
        }
    }
    Ok(())
}

/// Classify text with the local model pair
pub fn predict(config: &PipelineConfig, text: &str, format: OutputFormat) -> Result<()> {
    let service = PredictionService::try_load(&config.artifact_store())
        .context("No usable model; run `trisent train` first")?;
    let prediction = service.predict(text)?;
    debug!(
        label = %prediction.label,
        confidence = prediction.confidence,
        "Local prediction"
    );
    print_prediction(&prediction, format)
}

/// Record a correction for the next retrain
pub fn feedback(
    config: &PipelineConfig,
    label: &str,
    text: &str,
    format: OutputFormat,
) -> Result<()> {
    let label: Sentiment = label.parse()?;
    let record = LabeledExample::new(label, text).context("Feedback text must not be empty")?;

    let store = config.feedback_store();
    store.append(&record)?;
    info!(
        label = %label,
        path = %store.path().display(),
        "Feedback recorded"
    );

    match format {
        OutputFormat::Json => print_json(&record)?,
        OutputFormat::Table => print_success(&format!(
            "Feedback recorded as {} in {}",
            color_label(label),
            store.path().display()
        )),
    }
    Ok(())
}

pub fn print_prediction(prediction: &Prediction, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(prediction)?,
        OutputFormat::Table => {
            println!(
                "{}  {}",
                color_label(prediction.label),
                color_confidence(prediction.confidence)
            );
        }
    }
    Ok(())
}

fn print_report(report: &TrainingReport) {
    let rows = vec![
        FieldRow::new("Samples", report.samples),
        FieldRow::new("Vocabulary", report.vocabulary_size),
        FieldRow::new("Iterations", report.iterations),
        FieldRow::new("Training accuracy", format!("{:.1}%", report.training_accuracy * 100.0)),
        FieldRow::new("Fingerprint", &report.fingerprint[..12.min(report.fingerprint.len())]),
        FieldRow::new("Trained at", format_timestamp(report.trained_at)),
        FieldRow::new("Elapsed", format!("{}ms", report.elapsed_ms)),
    ];
    print_table(&rows, OutputFormat::Table);

    let counts: Vec<LabelCountRow> = report
        .label_counts
        .iter()
        .map(|(label, records)| LabelCountRow {
            label: label.to_string(),
            records: *records,
        })
        .collect();
    print_table(&counts, OutputFormat::Table);

    if !report.converged {
        print_warning(&format!(
            "Optimizer stopped at {} iterations before converging",
            report.iterations
        ));
    }
}
