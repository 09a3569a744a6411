//! Prediction service over a loaded model pair
//!
//! The pair is loaded once at construction. If loading fails the service
//! stays unavailable and every call returns the same error; a restart is
//! required to pick up new artifacts.

use crate::artifacts::{ArtifactStore, ModelPair};
use crate::error::{PipelineError, Result};
use crate::models::Prediction;
use crate::observability::PipelineMetrics;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 5;

enum ServiceState {
    Ready(Arc<ModelPair>),
    Unavailable(String),
}

/// Immutable inference context shared by the CLI and HTTP adapters
pub struct PredictionService {
    state: ServiceState,
    metrics: PipelineMetrics,
    inference_count: AtomicU64,
    slow_inference_count: AtomicU64,
}

impl PredictionService {
    /// Load the pair, keeping the failure reason if it is unavailable
    pub fn load(store: &ArtifactStore) -> Self {
        let state = match store.load() {
            Ok(pair) => ServiceState::Ready(Arc::new(pair)),
            Err(e) => {
                warn!(error = %e, "Prediction service starting without a model");
                ServiceState::Unavailable(unavailable_reason(e))
            }
        };
        Self::with_state(state)
    }

    /// Load the pair or fail with `ModelUnavailable`
    pub fn try_load(store: &ArtifactStore) -> Result<Self> {
        let pair = store.load()?;
        Ok(Self::from_pair(pair))
    }

    pub fn from_pair(pair: ModelPair) -> Self {
        Self::with_state(ServiceState::Ready(Arc::new(pair)))
    }

    fn with_state(state: ServiceState) -> Self {
        Self {
            state,
            metrics: PipelineMetrics::new(),
            inference_count: AtomicU64::new(0),
            slow_inference_count: AtomicU64::new(0),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, ServiceState::Ready(_))
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.state {
            ServiceState::Ready(_) => None,
            ServiceState::Unavailable(reason) => Some(reason),
        }
    }

    /// Fingerprint of the loaded pair
    pub fn model_fingerprint(&self) -> Option<&str> {
        match &self.state {
            ServiceState::Ready(pair) => Some(&pair.fingerprint),
            ServiceState::Unavailable(_) => None,
        }
    }

    pub fn predict(&self, text: &str) -> Result<Prediction> {
        let result = self.classify(text);
        if let Err(e) = &result {
            self.metrics.inc_prediction_errors(e.code());
        }
        result
    }

    fn classify(&self, text: &str) -> Result<Prediction> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PipelineError::InvalidInput(
                "text must not be empty".to_string(),
            ));
        }

        let pair = match &self.state {
            ServiceState::Ready(pair) => pair,
            ServiceState::Unavailable(reason) => {
                return Err(PipelineError::ModelUnavailable(reason.clone()))
            }
        };

        let start = Instant::now();
        let vector = pair.features.transform(text);
        let probabilities = pair.classifier.predict_proba(&vector);
        let label = pair.classifier.predict(&vector);
        let confidence = probabilities
            .iter()
            .find(|(class, _)| *class == label)
            .map(|(_, p)| *p as f32)
            .unwrap_or(0.0);

        let elapsed = start.elapsed();
        self.inference_count.fetch_add(1, Ordering::Relaxed);
        self.metrics
            .observe_prediction(label.as_str(), elapsed.as_secs_f64());

        if elapsed.as_millis() > MAX_INFERENCE_MS {
            self.slow_inference_count.fetch_add(1, Ordering::Relaxed);
            warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                "Inference exceeded {}ms target",
                MAX_INFERENCE_MS
            );
        } else {
            debug!(
                elapsed_us = elapsed.as_micros() as u64,
                label = %label,
                "Inference completed"
            );
        }

        Ok(Prediction::new(label, confidence))
    }

    pub fn stats(&self) -> InferenceStats {
        InferenceStats {
            total_inferences: self.inference_count.load(Ordering::Relaxed),
            slow_inferences: self.slow_inference_count.load(Ordering::Relaxed),
        }
    }
}

fn unavailable_reason(error: PipelineError) -> String {
    match error {
        PipelineError::ModelUnavailable(reason) => reason,
        other => other.to_string(),
    }
}

/// Inference statistics
#[derive(Debug, Clone)]
pub struct InferenceStats {
    pub total_inferences: u64,
    pub slow_inferences: u64,
}
