//! Observability infrastructure for the sentiment pipeline
//!
//! Provides:
//! - Prometheus metrics (prediction latency, label counts, feedback, training runs)
//! - Structured event logging with tracing

use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    register_int_gauge, GaugeVec, Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for inference latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1,
];

/// Histogram buckets for training duration (in seconds)
const TRAINING_BUCKETS: &[f64] = &[0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0, 900.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<PipelineMetricsInner> = OnceLock::new();

struct PipelineMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_total: IntCounterVec,
    prediction_errors_total: IntCounterVec,
    feedback_records_total: IntCounter,
    feedback_errors_total: IntCounter,
    training_duration_seconds: Histogram,
    training_runs_total: IntCounterVec,
    corpus_records: IntGauge,
    model_info: GaugeVec,
}

impl PipelineMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "trisent_prediction_latency_seconds",
                "Time spent vectorizing and classifying one text",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_counter_vec!(
                "trisent_predictions_total",
                "Predictions served, by label",
                &["label"]
            )
            .expect("Failed to register predictions_total"),

            prediction_errors_total: register_int_counter_vec!(
                "trisent_prediction_errors_total",
                "Rejected prediction requests, by error code",
                &["code"]
            )
            .expect("Failed to register prediction_errors_total"),

            feedback_records_total: register_int_counter!(
                "trisent_feedback_records_total",
                "Feedback records appended to the feedback log"
            )
            .expect("Failed to register feedback_records_total"),

            feedback_errors_total: register_int_counter!(
                "trisent_feedback_errors_total",
                "Feedback records that could not be persisted"
            )
            .expect("Failed to register feedback_errors_total"),

            training_duration_seconds: register_histogram!(
                "trisent_training_duration_seconds",
                "Wall time of a full training run",
                TRAINING_BUCKETS.to_vec()
            )
            .expect("Failed to register training_duration_seconds"),

            training_runs_total: register_int_counter_vec!(
                "trisent_training_runs_total",
                "Training runs, by outcome",
                &["outcome"]
            )
            .expect("Failed to register training_runs_total"),

            corpus_records: register_int_gauge!(
                "trisent_corpus_records",
                "Valid records in the corpus at the last training run"
            )
            .expect("Failed to register corpus_records"),

            model_info: register_gauge_vec!(
                "trisent_model_info",
                "Information about the currently loaded model pair",
                &["fingerprint"]
            )
            .expect("Failed to register model_info"),
        }
    }
}

/// Handle to the global pipeline metrics
///
/// Clones share the same underlying Prometheus collectors.
#[derive(Clone)]
pub struct PipelineMetrics {
    _private: (),
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(PipelineMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &PipelineMetricsInner {
        GLOBAL_METRICS.get_or_init(PipelineMetricsInner::new)
    }

    pub fn observe_prediction(&self, label: &str, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
        self.inner().predictions_total.with_label_values(&[label]).inc();
    }

    pub fn inc_prediction_errors(&self, code: &str) {
        self.inner()
            .prediction_errors_total
            .with_label_values(&[code])
            .inc();
    }

    pub fn inc_feedback_records(&self) {
        self.inner().feedback_records_total.inc();
    }

    pub fn inc_feedback_errors(&self) {
        self.inner().feedback_errors_total.inc();
    }

    pub fn observe_training(&self, duration_secs: f64, corpus_records: usize) {
        self.inner().training_duration_seconds.observe(duration_secs);
        self.inner()
            .training_runs_total
            .with_label_values(&["success"])
            .inc();
        self.inner().corpus_records.set(corpus_records as i64);
    }

    pub fn inc_training_failures(&self) {
        self.inner()
            .training_runs_total
            .with_label_values(&["failure"])
            .inc();
    }

    pub fn set_model_fingerprint(&self, fingerprint: &str) {
        self.inner().model_info.reset();
        self.inner()
            .model_info
            .with_label_values(&[fingerprint])
            .set(1.0);
    }
}

/// Structured logger for pipeline events
#[derive(Clone)]
pub struct EventLogger {
    component: String,
}

impl EventLogger {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }

    pub fn log_startup(&self, version: &str, model_fingerprint: Option<&str>) {
        info!(
            event = "service_started",
            component = %self.component,
            version = %version,
            model_fingerprint = model_fingerprint.unwrap_or("none"),
            "TriSent started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            component = %self.component,
            reason = %reason,
            "TriSent shutting down"
        );
    }

    pub fn log_model_unavailable(&self, reason: &str) {
        warn!(
            event = "model_unavailable",
            component = %self.component,
            reason = %reason,
            "Model artifacts could not be loaded; predictions disabled"
        );
    }

    pub fn log_prediction(&self, label: &str, confidence: f32, elapsed_us: u128) {
        info!(
            event = "prediction_served",
            component = %self.component,
            label = %label,
            confidence = confidence,
            elapsed_us = elapsed_us as u64,
            "Prediction served"
        );
    }

    pub fn log_feedback(&self, label: &str, success: bool) {
        if success {
            info!(
                event = "feedback_recorded",
                component = %self.component,
                label = %label,
                "Feedback recorded"
            );
        } else {
            warn!(
                event = "feedback_write_failed",
                component = %self.component,
                label = %label,
                "Failed to record feedback"
            );
        }
    }

    pub fn log_training_completed(
        &self,
        samples: usize,
        vocabulary_size: usize,
        iterations: usize,
        converged: bool,
        fingerprint: &str,
    ) {
        info!(
            event = "training_completed",
            component = %self.component,
            samples = samples,
            vocabulary_size = vocabulary_size,
            iterations = iterations,
            converged = converged,
            fingerprint = %fingerprint,
            "Training complete, model saved"
        );
    }

    pub fn log_training_failed(&self, error: &str) {
        warn!(
            event = "training_failed",
            component = %self.component,
            error = %error,
            "Training failed, previous artifacts left in place"
        );
    }

    pub fn log_retrain(&self, merged: usize) {
        if merged == 0 {
            info!(
                event = "retrain_skipped",
                component = %self.component,
                "No feedback to retrain"
            );
        } else {
            info!(
                event = "retrain_completed",
                component = %self.component,
                merged = merged,
                "Feedback merged and model retrained"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_metrics_creation() {
        let metrics = PipelineMetrics::new();
        metrics.observe_prediction("positive", 0.0001);
        metrics.inc_prediction_errors("invalid_input");
        metrics.inc_feedback_records();
        metrics.observe_training(1.5, 42);
        metrics.set_model_fingerprint("abc123");
    }

    #[test]
    fn test_event_logger_creation() {
        let logger = EventLogger::new("trainer");
        assert_eq!(logger.component, "trainer");
    }
}
