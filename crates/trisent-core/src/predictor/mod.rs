//! Sentiment prediction engine

mod classifier;
mod features;
mod inference;
mod stop_words;

pub use classifier::{ClassifierConfig, ClassifierModel, DEFAULT_MAX_ITER};
pub use features::{
    FeatureExtractor, FeatureModel, FeatureModelParts, FeatureVector, DEFAULT_MAX_FEATURES,
};
pub use inference::{InferenceStats, PredictionService};
pub use stop_words::is_stop_word;
