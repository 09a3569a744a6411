//! Text feature extraction
//!
//! Turns raw text into sparse TF-IDF vectors over a vocabulary of unigrams
//! and bigrams learned from the corpus. The fitted [`FeatureModel`] must be
//! reused unchanged at inference time.

use super::stop_words::is_stop_word;
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Maximum vocabulary size
pub const DEFAULT_MAX_FEATURES: usize = 5000;

/// Minimum characters for a token to count as a term
const MIN_TOKEN_CHARS: usize = 2;

/// Fit-time settings for the vectorizer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureExtractor {
    pub max_features: usize,
    /// Inclusive n-gram bounds, e.g. `(1, 2)` for unigrams and bigrams
    pub ngram_range: (usize, usize),
    pub stop_words: bool,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self {
            max_features: DEFAULT_MAX_FEATURES,
            ngram_range: (1, 2),
            stop_words: true,
        }
    }
}

#[derive(Debug)]
struct TermStats {
    total: usize,
    document_frequency: usize,
    first_seen: usize,
}

impl FeatureExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = max_features;
        self
    }

    /// Learn vocabulary and inverse document frequencies from `texts`
    pub fn fit<S: AsRef<str>>(&self, texts: &[S]) -> Result<FeatureModel> {
        if texts.is_empty() {
            return Err(PipelineError::TrainingFailure(
                "cannot fit features on an empty corpus".to_string(),
            ));
        }
        if self.ngram_range.0 == 0 || self.ngram_range.0 > self.ngram_range.1 {
            return Err(PipelineError::TrainingFailure(format!(
                "invalid n-gram range {:?}",
                self.ngram_range
            )));
        }

        let mut stats: HashMap<String, TermStats> = HashMap::new();
        for text in texts {
            let terms = analyze(text.as_ref(), self.ngram_range, self.stop_words);
            let mut seen_in_doc = HashSet::new();
            for term in terms {
                let next_rank = stats.len();
                let entry = stats.entry(term.clone()).or_insert(TermStats {
                    total: 0,
                    document_frequency: 0,
                    first_seen: next_rank,
                });
                entry.total += 1;
                if seen_in_doc.insert(term) {
                    entry.document_frequency += 1;
                }
            }
        }

        if stats.is_empty() {
            return Err(PipelineError::TrainingFailure(
                "empty vocabulary; documents contain only stop words".to_string(),
            ));
        }

        let mut ranked: Vec<(String, TermStats)> = stats.into_iter().collect();
        ranked.sort_by(|(_, a), (_, b)| {
            b.total
                .cmp(&a.total)
                .then_with(|| a.first_seen.cmp(&b.first_seen))
        });
        ranked.truncate(self.max_features);

        let n_documents = texts.len() as f64;
        let (vocabulary, idf): (Vec<String>, Vec<f64>) = ranked
            .into_iter()
            .map(|(term, s)| {
                let idf = ((1.0 + n_documents) / (1.0 + s.document_frequency as f64)).ln() + 1.0;
                (term, idf)
            })
            .unzip();

        Ok(FeatureModel::from_parts(FeatureModelParts {
            vocabulary,
            idf,
            ngram_range: self.ngram_range,
            stop_words: self.stop_words,
        }))
    }
}

/// Serialized form of a fitted vectorizer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureModelParts {
    pub vocabulary: Vec<String>,
    pub idf: Vec<f64>,
    pub ngram_range: (usize, usize),
    pub stop_words: bool,
}

/// Fitted vocabulary and term weights
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "FeatureModelParts", into = "FeatureModelParts")]
pub struct FeatureModel {
    parts: FeatureModelParts,
    index: HashMap<String, usize>,
}

impl TryFrom<FeatureModelParts> for FeatureModel {
    type Error = String;

    fn try_from(parts: FeatureModelParts) -> std::result::Result<Self, Self::Error> {
        if parts.vocabulary.len() != parts.idf.len() {
            return Err(format!(
                "vocabulary has {} terms but {} idf weights",
                parts.vocabulary.len(),
                parts.idf.len()
            ));
        }
        if parts.idf.iter().any(|w| !w.is_finite()) {
            return Err("non-finite idf weight".to_string());
        }
        let (min_n, max_n) = parts.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(format!("invalid n-gram range {:?}", parts.ngram_range));
        }
        Ok(Self::from_parts(parts))
    }
}

impl From<FeatureModel> for FeatureModelParts {
    fn from(model: FeatureModel) -> Self {
        model.parts
    }
}

impl FeatureModel {
    fn from_parts(parts: FeatureModelParts) -> Self {
        let index = parts
            .vocabulary
            .iter()
            .enumerate()
            .map(|(i, term)| (term.clone(), i))
            .collect();
        Self { parts, index }
    }

    /// Number of dimensions of every vector this model produces
    pub fn dimension(&self) -> usize {
        self.parts.vocabulary.len()
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.parts.vocabulary
    }

    pub fn term_index(&self, term: &str) -> Option<usize> {
        self.index.get(term).copied()
    }

    /// Project `text` into the fitted space; unknown terms are ignored
    pub fn transform(&self, text: &str) -> FeatureVector {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for term in analyze(text, self.parts.ngram_range, self.parts.stop_words) {
            if let Some(&i) = self.index.get(&term) {
                *counts.entry(i).or_insert(0.0) += 1.0;
            }
        }

        let mut entries: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(i, tf)| (i, tf * self.parts.idf[i]))
            .collect();
        entries.sort_unstable_by_key(|(i, _)| *i);

        let norm = entries.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, v) in &mut entries {
                *v /= norm;
            }
        }

        FeatureVector { entries }
    }
}

/// Sparse L2-normalized feature vector, entries sorted by index
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureVector {
    entries: Vec<(usize, f64)>,
}

impl FeatureVector {
    pub fn from_entries(mut entries: Vec<(usize, f64)>) -> Self {
        entries.sort_unstable_by_key(|(i, _)| *i);
        Self { entries }
    }

    pub fn entries(&self) -> &[(usize, f64)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_index(&self) -> Option<usize> {
        self.entries.last().map(|(i, _)| *i)
    }

    pub fn squared_norm(&self) -> f64 {
        self.entries.iter().map(|(_, v)| v * v).sum()
    }

    pub fn dot(&self, dense: &[f64]) -> f64 {
        self.entries.iter().map(|&(i, v)| v * dense[i]).sum()
    }
}

/// Lowercase, tokenize, drop stop words, then emit n-grams
fn analyze(text: &str, ngram_range: (usize, usize), stop_words: bool) -> Vec<String> {
    let lowered = text.to_lowercase();
    let tokens: Vec<&str> = lowered
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| t.chars().count() >= MIN_TOKEN_CHARS)
        .filter(|t| !(stop_words && is_stop_word(t)))
        .collect();

    let (min_n, max_n) = ngram_range;
    let mut terms = Vec::new();
    for n in min_n..=max_n.min(tokens.len()) {
        for window in tokens.windows(n) {
            terms.push(window.join(" "));
        }
    }
    terms
}
