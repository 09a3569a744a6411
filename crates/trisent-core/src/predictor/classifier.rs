//! Multinomial logistic regression over sparse feature vectors
//!
//! Fitting is full-batch gradient descent on the L2-penalized softmax
//! cross-entropy. Per-sample gradient terms are accumulated in parallel on
//! the rayon pool; the call blocks until a complete model is produced.

use super::features::FeatureVector;
use crate::error::{PipelineError, Result};
use crate::models::Sentiment;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Iteration bound for the optimizer
pub const DEFAULT_MAX_ITER: usize = 500;

/// Optimizer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub max_iter: usize,
    /// Stop once every gradient component is below this magnitude
    pub tolerance: f64,
    /// Inverse regularization strength; smaller is stronger
    pub c: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            max_iter: DEFAULT_MAX_ITER,
            tolerance: 1e-4,
            c: 1.0,
        }
    }
}

/// Fitted decision boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierModel {
    /// Classes seen at fit time, in canonical order
    classes: Vec<Sentiment>,
    n_features: usize,
    /// One row of `n_features` weights per class
    weights: Vec<Vec<f64>>,
    intercepts: Vec<f64>,
    iterations: usize,
    converged: bool,
}

struct Gradient {
    weights: Vec<f64>,
    intercepts: Vec<f64>,
    loss: f64,
}

impl Gradient {
    fn zeros(n_classes: usize, n_features: usize) -> Self {
        Self {
            weights: vec![0.0; n_classes * n_features],
            intercepts: vec![0.0; n_classes],
            loss: 0.0,
        }
    }

    fn merge(mut self, other: Gradient) -> Gradient {
        for (a, b) in self.weights.iter_mut().zip(&other.weights) {
            *a += b;
        }
        for (a, b) in self.intercepts.iter_mut().zip(&other.intercepts) {
            *a += b;
        }
        self.loss += other.loss;
        self
    }
}

impl ClassifierConfig {
    /// Fit a model on `vectors` living in an `n_features`-dimensional space
    pub fn fit(
        &self,
        vectors: &[FeatureVector],
        labels: &[Sentiment],
        n_features: usize,
    ) -> Result<ClassifierModel> {
        if vectors.is_empty() {
            return Err(PipelineError::TrainingFailure("no training samples".to_string()));
        }
        if vectors.len() != labels.len() {
            return Err(PipelineError::TrainingFailure(format!(
                "{} vectors but {} labels",
                vectors.len(),
                labels.len()
            )));
        }
        if vectors
            .iter()
            .any(|v| v.max_index().is_some_and(|i| i >= n_features))
        {
            return Err(PipelineError::TrainingFailure(
                "feature index outside the vocabulary".to_string(),
            ));
        }
        if self.c <= 0.0 || !self.c.is_finite() {
            return Err(PipelineError::TrainingFailure(format!(
                "regularization strength must be positive, got {}",
                self.c
            )));
        }

        let classes: Vec<Sentiment> = Sentiment::ALL
            .into_iter()
            .filter(|class| labels.contains(class))
            .collect();
        if classes.len() < 2 {
            return Err(PipelineError::TrainingFailure(format!(
                "need at least two distinct labels, found {}",
                classes.len()
            )));
        }

        let targets: Vec<usize> = labels
            .iter()
            .map(|label| classes.iter().position(|c| c == label).unwrap_or(0))
            .collect();

        let n = vectors.len() as f64;
        let k = classes.len();
        let lambda = 1.0 / (self.c * n);

        // Softmax cross-entropy curvature is bounded by half the squared
        // input norm; the intercept contributes one extra unit.
        let max_sq_norm = vectors
            .iter()
            .map(|v| v.squared_norm() + 1.0)
            .fold(0.0_f64, f64::max);
        let step = 1.0 / (0.5 * max_sq_norm + lambda);

        let mut model = ClassifierModel {
            classes,
            n_features,
            weights: vec![vec![0.0; n_features]; k],
            intercepts: vec![0.0; k],
            iterations: 0,
            converged: false,
        };

        for iteration in 1..=self.max_iter {
            let grad = vectors
                .par_iter()
                .zip(targets.par_iter())
                .fold(
                    || Gradient::zeros(k, n_features),
                    |mut acc, (x, &y)| {
                        model.accumulate(&mut acc, x, y);
                        acc
                    },
                )
                .reduce(|| Gradient::zeros(k, n_features), Gradient::merge);

            let penalty: f64 = model
                .weights
                .iter()
                .flat_map(|row| row.iter())
                .map(|w| w * w)
                .sum::<f64>()
                * lambda
                / 2.0;
            let loss = grad.loss / n + penalty;
            if !loss.is_finite() {
                return Err(PipelineError::TrainingFailure(format!(
                    "loss diverged at iteration {}",
                    iteration
                )));
            }

            let mut max_component = 0.0_f64;
            let mut weight_steps = grad.weights;
            for (c, row) in model.weights.iter().enumerate() {
                for (j, w) in row.iter().enumerate() {
                    let g = weight_steps[c * n_features + j] / n + lambda * w;
                    max_component = max_component.max(g.abs());
                    weight_steps[c * n_features + j] = g;
                }
            }
            let intercept_steps: Vec<f64> = grad.intercepts.iter().map(|g| g / n).collect();
            for g in &intercept_steps {
                max_component = max_component.max(g.abs());
            }

            model.iterations = iteration;
            if max_component <= self.tolerance {
                model.converged = true;
                debug!(iteration, loss, "Classifier converged");
                break;
            }

            for (c, row) in model.weights.iter_mut().enumerate() {
                for (j, w) in row.iter_mut().enumerate() {
                    *w -= step * weight_steps[c * n_features + j];
                }
            }
            for (b, g) in model.intercepts.iter_mut().zip(&intercept_steps) {
                *b -= step * g;
            }
        }

        if !model.converged {
            warn!(
                max_iter = self.max_iter,
                "Classifier reached the iteration limit before converging"
            );
        }
        if model
            .weights
            .iter()
            .flatten()
            .chain(&model.intercepts)
            .any(|w| !w.is_finite())
        {
            return Err(PipelineError::TrainingFailure(
                "optimization produced non-finite weights".to_string(),
            ));
        }

        Ok(model)
    }
}

impl ClassifierModel {
    pub fn classes(&self) -> &[Sentiment] {
        &self.classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Most likely label; ties resolve to the earlier class
    pub fn predict(&self, vector: &FeatureVector) -> Sentiment {
        let scores = self.scores(vector);
        let mut best = 0;
        for (i, score) in scores.iter().enumerate() {
            if *score > scores[best] {
                best = i;
            }
        }
        self.classes[best]
    }

    /// Softmax probability per fitted class
    pub fn predict_proba(&self, vector: &FeatureVector) -> Vec<(Sentiment, f64)> {
        let probabilities = softmax(&self.scores(vector));
        self.classes.iter().copied().zip(probabilities).collect()
    }

    /// Check shape and finiteness after deserialization
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.classes.len() < 2 {
            return Err(format!("model has {} classes", self.classes.len()));
        }
        if self.weights.len() != self.classes.len() || self.intercepts.len() != self.classes.len() {
            return Err("weight rows do not match class count".to_string());
        }
        if self.weights.iter().any(|row| row.len() != self.n_features) {
            return Err("weight row length does not match feature count".to_string());
        }
        if self
            .weights
            .iter()
            .flatten()
            .chain(&self.intercepts)
            .any(|w| !w.is_finite())
        {
            return Err("model contains non-finite weights".to_string());
        }
        Ok(())
    }

    fn scores(&self, vector: &FeatureVector) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.intercepts)
            .map(|(row, b)| {
                b + vector
                    .entries()
                    .iter()
                    .filter_map(|&(i, v)| row.get(i).map(|w| w * v))
                    .sum::<f64>()
            })
            .collect()
    }

    fn accumulate(&self, acc: &mut Gradient, x: &FeatureVector, target: usize) {
        let probabilities = softmax(&self.scores(x));
        acc.loss -= probabilities[target].max(f64::MIN_POSITIVE).ln();
        for (c, p) in probabilities.iter().enumerate() {
            let coef = if c == target { p - 1.0 } else { *p };
            acc.intercepts[c] += coef;
            let row = c * self.n_features;
            for &(j, v) in x.entries() {
                acc.weights[row + j] += coef * v;
            }
        }
    }
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
