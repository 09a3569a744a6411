//! Core data models for the sentiment pipeline

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default separator between label and text in corpus and feedback files
pub const DEFAULT_DELIMITER: char = '|';

/// The closed set of sentiment labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Mixed,
}

impl Sentiment {
    /// Canonical order, also used for classifier class indices
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Negative, Sentiment::Mixed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Mixed => "mixed",
        }
    }

    /// Emoji shown next to a prediction
    pub fn display_marker(&self) -> &'static str {
        match self {
            Sentiment::Positive => "😊",
            Sentiment::Negative => "😞",
            Sentiment::Mixed => "😐",
        }
    }

    /// Marker plus capitalized label, e.g. "😊 Positive"
    pub fn display_name(&self) -> &'static str {
        match self {
            Sentiment::Positive => "😊 Positive",
            Sentiment::Negative => "😞 Negative",
            Sentiment::Mixed => "😐 Mixed",
        }
    }

    /// Hex color used by presentation layers
    pub fn color(&self) -> &'static str {
        match self {
            Sentiment::Positive => "#28a745",
            Sentiment::Negative => "#dc3545",
            Sentiment::Mixed => "#ffc107",
        }
    }

    /// Map an external three-class dataset id (0 = negative, 1 = mixed, 2 = positive)
    pub fn from_class_id(id: &str) -> Option<Self> {
        match id.trim() {
            "0" => Some(Sentiment::Negative),
            "1" => Some(Sentiment::Mixed),
            "2" => Some(Sentiment::Positive),
            _ => None,
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Sentiment::Positive => 0,
            Sentiment::Negative => 1,
            Sentiment::Mixed => 2,
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not one of the three labels
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sentiment label '{0}' (expected positive, negative or mixed)")]
pub struct UnknownSentiment(pub String);

impl FromStr for Sentiment {
    type Err = UnknownSentiment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Sentiment::ALL
            .into_iter()
            .find(|label| label.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownSentiment(trimmed.to_string()))
    }
}

/// A single labeled training example
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledExample {
    pub label: Sentiment,
    pub text: String,
}

/// User correction awaiting merge into the corpus
pub type FeedbackRecord = LabeledExample;

impl LabeledExample {
    /// Build an example, normalizing the text onto a single trimmed line.
    ///
    /// Returns `None` when nothing but whitespace remains.
    pub fn new(label: Sentiment, text: &str) -> Option<Self> {
        let text = single_line(text);
        if text.is_empty() {
            return None;
        }
        Some(Self { label, text })
    }

    /// Parse a `label<delim>text` line, splitting on the first delimiter.
    ///
    /// Invalid lines yield `None`; callers drop them.
    pub fn parse_line(line: &str, delimiter: char) -> Option<Self> {
        let (label, text) = line.split_once(delimiter)?;
        let label = label.trim();
        let text = text.trim();
        if label.is_empty() || text.is_empty() {
            return None;
        }
        let label = label.parse::<Sentiment>().ok()?;
        Self::new(label, text)
    }

    pub fn to_line(&self, delimiter: char) -> String {
        format!("{}{}{}", self.label, delimiter, self.text)
    }
}

/// Parse every valid record out of a corpus-formatted text, in order
pub fn parse_records(content: &str, delimiter: char) -> Vec<LabeledExample> {
    content
        .lines()
        .filter_map(|line| LabeledExample::parse_line(line, delimiter))
        .collect()
}

fn single_line(text: &str) -> String {
    if text.contains(['\n', '\r']) {
        text.split(['\n', '\r'])
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        text.trim().to_string()
    }
}

/// Inference response shared by the HTTP and CLI adapters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub label: Sentiment,
    pub display_marker: String,
    pub confidence: f32,
}

impl Prediction {
    pub fn new(label: Sentiment, confidence: f32) -> Self {
        Self {
            label,
            display_marker: label.display_marker().to_string(),
            confidence,
        }
    }
}
