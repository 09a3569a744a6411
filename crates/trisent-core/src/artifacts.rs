//! Persistence of the fitted vectorizer and classifier as a matched pair
//!
//! Each half is written as a JSON envelope carrying a SHA256 checksum of its
//! payload and a fingerprint of the pair. Loading rejects corrupt files and
//! halves that came from different training runs.

use crate::corpus::ensure_parent;
use crate::error::{PipelineError, Result};
use crate::predictor::{ClassifierModel, FeatureModel};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Envelope layout version
const FORMAT_VERSION: u32 = 1;

const FEATURE_KIND: &str = "feature_model";
const CLASSIFIER_KIND: &str = "classifier_model";

/// Feature and classifier models from one training run
#[derive(Debug, Clone)]
pub struct ModelPair {
    pub features: FeatureModel,
    pub classifier: ClassifierModel,
    /// Identifies the training run; both halves carry the same value
    pub fingerprint: String,
    /// Unix timestamp of the training run
    pub trained_at: i64,
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    format_version: u32,
    kind: String,
    trained_at: i64,
    checksum: String,
    pair_fingerprint: String,
    payload: Box<RawValue>,
}

/// Fixed locations of the two model artifacts
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    feature_path: PathBuf,
    classifier_path: PathBuf,
}

impl ArtifactStore {
    pub fn new(feature_path: impl Into<PathBuf>, classifier_path: impl Into<PathBuf>) -> Self {
        Self {
            feature_path: feature_path.into(),
            classifier_path: classifier_path.into(),
        }
    }

    /// Default file names inside `model_dir`
    pub fn in_dir(model_dir: impl AsRef<Path>) -> Self {
        let dir = model_dir.as_ref();
        Self::new(dir.join("vectorizer.json"), dir.join("sentiment_model.json"))
    }

    pub fn feature_path(&self) -> &Path {
        &self.feature_path
    }

    pub fn classifier_path(&self) -> &Path {
        &self.classifier_path
    }

    /// True when both halves are present on disk
    pub fn exists(&self) -> bool {
        self.feature_path.exists() && self.classifier_path.exists()
    }

    /// Serialize a freshly fitted pair and replace both artifacts
    pub fn save(
        &self,
        features: FeatureModel,
        classifier: ClassifierModel,
        trained_at: i64,
    ) -> Result<ModelPair> {
        let feature_payload = serde_json::to_string(&features)?;
        let classifier_payload = serde_json::to_string(&classifier)?;
        let feature_checksum = compute_checksum(feature_payload.as_bytes());
        let classifier_checksum = compute_checksum(classifier_payload.as_bytes());
        let fingerprint = pair_fingerprint(&feature_checksum, &classifier_checksum);

        let feature_bytes = encode(
            FEATURE_KIND,
            feature_payload,
            feature_checksum,
            &fingerprint,
            trained_at,
        )?;
        let classifier_bytes = encode(
            CLASSIFIER_KIND,
            classifier_payload,
            classifier_checksum,
            &fingerprint,
            trained_at,
        )?;

        // Stage both halves before either replaces the live artifacts
        let feature_tmp = write_temp(&self.feature_path, &feature_bytes)?;
        let classifier_tmp = match write_temp(&self.classifier_path, &classifier_bytes) {
            Ok(path) => path,
            Err(e) => {
                let _ = fs::remove_file(&feature_tmp);
                return Err(e);
            }
        };
        self.commit(&feature_tmp, &classifier_tmp)?;

        info!(
            fingerprint = %fingerprint,
            features = %self.feature_path.display(),
            classifier = %self.classifier_path.display(),
            "Model artifacts saved"
        );

        Ok(ModelPair {
            features,
            classifier,
            fingerprint,
            trained_at,
        })
    }

    /// Move both staged halves into place, restoring the previous feature
    /// half when the classifier cannot be replaced
    fn commit(&self, feature_tmp: &Path, classifier_tmp: &Path) -> Result<()> {
        let backup = sibling(&self.feature_path, "bak")?;
        let had_previous = match fs::rename(&self.feature_path, &backup) {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => {
                discard(&[feature_tmp, classifier_tmp]);
                return Err(e.into());
            }
        };

        let renamed = fs::rename(feature_tmp, &self.feature_path)
            .and_then(|()| fs::rename(classifier_tmp, &self.classifier_path));
        let Err(e) = renamed else {
            if had_previous {
                discard(&[backup.as_path()]);
            }
            return Ok(());
        };

        discard(&[feature_tmp, classifier_tmp]);
        let restored = if had_previous {
            fs::rename(&backup, &self.feature_path)
        } else {
            fs::remove_file(&self.feature_path).or_else(|e| match e.kind() {
                ErrorKind::NotFound => Ok(()),
                _ => Err(e),
            })
        };
        if let Err(restore_err) = restored {
            warn!(
                path = %self.feature_path.display(),
                error = %restore_err,
                "Failed to restore previous vectorizer"
            );
        }
        Err(e.into())
    }

    /// Load and cross-check both halves
    pub fn load(&self) -> Result<ModelPair> {
        let feature_env = read_envelope(&self.feature_path, FEATURE_KIND)?;
        let classifier_env = read_envelope(&self.classifier_path, CLASSIFIER_KIND)?;

        let expected = pair_fingerprint(&feature_env.checksum, &classifier_env.checksum);
        if feature_env.pair_fingerprint != expected || classifier_env.pair_fingerprint != expected {
            return Err(PipelineError::ModelUnavailable(
                "vectorizer and classifier come from different training runs".to_string(),
            ));
        }

        let features: FeatureModel = serde_json::from_str(feature_env.payload.get())
            .map_err(|e| unavailable(&self.feature_path, e))?;
        let classifier: ClassifierModel = serde_json::from_str(classifier_env.payload.get())
            .map_err(|e| unavailable(&self.classifier_path, e))?;

        classifier
            .validate()
            .map_err(|e| unavailable(&self.classifier_path, e))?;
        if classifier.n_features() != features.dimension() {
            return Err(PipelineError::ModelUnavailable(format!(
                "classifier expects {} features but vectorizer produces {}",
                classifier.n_features(),
                features.dimension()
            )));
        }

        debug!(fingerprint = %expected, "Model artifacts loaded");
        Ok(ModelPair {
            features,
            classifier,
            fingerprint: expected,
            trained_at: feature_env.trained_at,
        })
    }

    /// Fingerprint recorded in the envelopes, without decoding the models
    pub fn fingerprint(&self) -> Result<String> {
        let feature_env = read_envelope(&self.feature_path, FEATURE_KIND)?;
        let classifier_env = read_envelope(&self.classifier_path, CLASSIFIER_KIND)?;
        if feature_env.pair_fingerprint != classifier_env.pair_fingerprint {
            return Err(PipelineError::ModelUnavailable(
                "vectorizer and classifier come from different training runs".to_string(),
            ));
        }
        Ok(feature_env.pair_fingerprint)
    }
}

fn encode(
    kind: &str,
    payload: String,
    checksum: String,
    fingerprint: &str,
    trained_at: i64,
) -> Result<Vec<u8>> {
    let envelope = Envelope {
        format_version: FORMAT_VERSION,
        kind: kind.to_string(),
        trained_at,
        checksum,
        pair_fingerprint: fingerprint.to_string(),
        payload: RawValue::from_string(payload)?,
    };
    Ok(serde_json::to_vec(&envelope)?)
}

fn read_envelope(path: &Path, kind: &str) -> Result<Envelope> {
    if !path.exists() {
        return Err(PipelineError::ModelUnavailable(format!(
            "artifact not found: {}",
            path.display()
        )));
    }
    let bytes = fs::read(path).map_err(|e| unavailable(path, e))?;
    let envelope: Envelope = serde_json::from_slice(&bytes).map_err(|e| unavailable(path, e))?;

    if envelope.format_version != FORMAT_VERSION {
        return Err(unavailable(
            path,
            format!("unsupported format version {}", envelope.format_version),
        ));
    }
    if envelope.kind != kind {
        return Err(unavailable(
            path,
            format!("expected {} but found {}", kind, envelope.kind),
        ));
    }
    let computed = compute_checksum(envelope.payload.get().as_bytes());
    if computed != envelope.checksum {
        return Err(unavailable(
            path,
            format!(
                "checksum mismatch: expected {}, got {}",
                envelope.checksum, computed
            ),
        ));
    }
    Ok(envelope)
}

/// Write to a sibling temp file and fsync it
fn write_temp(path: &Path, bytes: &[u8]) -> Result<PathBuf> {
    ensure_parent(path)?;
    let temp_path = sibling(path, "tmp")?;
    let mut file = File::create(&temp_path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(temp_path)
}

/// `path` with `suffix` appended to its full file name
fn sibling(path: &Path, suffix: &str) -> Result<PathBuf> {
    let mut name = path
        .file_name()
        .ok_or_else(|| {
            std::io::Error::new(
                ErrorKind::InvalidInput,
                format!("artifact path has no file name: {}", path.display()),
            )
        })?
        .to_os_string();
    name.push(".");
    name.push(suffix);
    Ok(path.with_file_name(name))
}

fn discard(paths: &[&Path]) {
    for path in paths {
        let _ = fs::remove_file(path);
    }
}

fn unavailable(path: &Path, reason: impl std::fmt::Display) -> PipelineError {
    PipelineError::ModelUnavailable(format!("{}: {}", path.display(), reason))
}

fn pair_fingerprint(feature_checksum: &str, classifier_checksum: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(feature_checksum.as_bytes());
    hasher.update(b":");
    hasher.update(classifier_checksum.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compute SHA256 checksum of data
fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sentiment;
    use crate::predictor::{ClassifierConfig, FeatureExtractor};
    use tempfile::TempDir;

    fn fit_pair(texts: &[&str], labels: &[Sentiment]) -> (FeatureModel, ClassifierModel) {
        let features = FeatureExtractor::new().fit(texts).unwrap();
        let vectors: Vec<_> = texts.iter().map(|t| features.transform(t)).collect();
        let classifier = ClassifierConfig::default()
            .fit(&vectors, labels, features.dimension())
            .unwrap();
        (features, classifier)
    }

    #[test]
    fn test_checksum_consistency() {
        let data = b"test model weights";
        assert_eq!(compute_checksum(data), compute_checksum(data));
        assert_eq!(compute_checksum(data).len(), 64);
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::in_dir(dir.path().join("models"));
        let (features, classifier) = fit_pair(
            &["great stuff", "awful stuff"],
            &[Sentiment::Positive, Sentiment::Negative],
        );

        let saved = store.save(features, classifier, 1_700_000_000).unwrap();
        assert!(store.exists());

        let loaded = store.load().unwrap();
        assert_eq!(loaded.fingerprint, saved.fingerprint);
        assert_eq!(loaded.trained_at, 1_700_000_000);
        assert_eq!(loaded.features.vocabulary(), saved.features.vocabulary());
        assert!(!dir.path().join("models/vectorizer.json.tmp").exists());
        assert!(!dir.path().join("models/vectorizer.json.bak").exists());
        assert_eq!(store.fingerprint().unwrap(), saved.fingerprint);
    }

    #[test]
    fn test_missing_artifacts() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::in_dir(dir.path());
        assert!(matches!(store.load(), Err(PipelineError::ModelUnavailable(_))));
    }

    #[test]
    fn test_mixed_training_runs_are_rejected() {
        let dir = TempDir::new().unwrap();
        let first = ArtifactStore::in_dir(dir.path().join("first"));
        let second = ArtifactStore::in_dir(dir.path().join("second"));

        let (f1, c1) = fit_pair(
            &["good day", "bad day"],
            &[Sentiment::Positive, Sentiment::Negative],
        );
        let (f2, c2) = fit_pair(
            &["fine food", "poor food"],
            &[Sentiment::Mixed, Sentiment::Negative],
        );
        first.save(f1, c1, 1).unwrap();
        second.save(f2, c2, 2).unwrap();

        fs::copy(second.classifier_path(), first.classifier_path()).unwrap();
        let err = first.load().unwrap_err();
        assert!(matches!(err, PipelineError::ModelUnavailable(_)));
    }

    #[test]
    fn test_corrupt_payload_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::in_dir(dir.path());
        let (f, c) = fit_pair(
            &["nice one", "sad one"],
            &[Sentiment::Positive, Sentiment::Negative],
        );
        store.save(f, c, 1).unwrap();

        let content = fs::read_to_string(store.feature_path()).unwrap();
        fs::write(store.feature_path(), content.replace("nice", "nicer")).unwrap();
        assert!(matches!(store.load(), Err(PipelineError::ModelUnavailable(_))));

        fs::write(store.classifier_path(), b"not json").unwrap();
        assert!(matches!(store.load(), Err(PipelineError::ModelUnavailable(_))));
    }

    #[test]
    fn test_paths_sharing_a_stem() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path().join("model.vec"), dir.path().join("model.clf"));

        let (f, c) = fit_pair(
            &["good day", "bad day"],
            &[Sentiment::Positive, Sentiment::Negative],
        );
        store.save(f, c, 1).unwrap();
        let (f, c) = fit_pair(
            &["fine food", "poor food"],
            &[Sentiment::Mixed, Sentiment::Negative],
        );
        let second = store.save(f, c, 2).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.fingerprint, second.fingerprint);
        assert_eq!(loaded.trained_at, 2);
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 2, "{:?}", leftovers);
    }

    #[test]
    fn test_failed_classifier_replace_keeps_previous_pair() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::in_dir(dir.path());
        let (f, c) = fit_pair(
            &["good day", "bad day"],
            &[Sentiment::Positive, Sentiment::Negative],
        );
        let previous = store.save(f, c, 1).unwrap();
        let vectorizer_before = fs::read(store.feature_path()).unwrap();

        // A non-empty directory cannot be replaced by a file
        let blocked = dir.path().join("blocked");
        fs::create_dir(&blocked).unwrap();
        fs::write(blocked.join("keep"), b"x").unwrap();
        let failing = ArtifactStore::new(store.feature_path(), &blocked);

        let (f, c) = fit_pair(
            &["fine food", "poor food"],
            &[Sentiment::Mixed, Sentiment::Negative],
        );
        assert!(failing.save(f, c, 2).is_err());

        assert_eq!(fs::read(store.feature_path()).unwrap(), vectorizer_before);
        assert_eq!(store.load().unwrap().fingerprint, previous.fingerprint);
        assert!(!dir.path().join("blocked.tmp").exists());
        assert!(!dir.path().join("vectorizer.json.tmp").exists());
        assert!(!dir.path().join("vectorizer.json.bak").exists());
    }

    #[test]
    fn test_failed_first_save_leaves_nothing_behind() {
        let dir = TempDir::new().unwrap();
        let blocked = dir.path().join("blocked");
        fs::create_dir(&blocked).unwrap();
        fs::write(blocked.join("keep"), b"x").unwrap();
        let store = ArtifactStore::new(dir.path().join("vectorizer.json"), &blocked);

        let (f, c) = fit_pair(
            &["nice one", "sad one"],
            &[Sentiment::Positive, Sentiment::Negative],
        );
        assert!(store.save(f, c, 1).is_err());
        assert!(!store.feature_path().exists());
        assert!(matches!(store.load(), Err(PipelineError::ModelUnavailable(_))));
    }

    #[test]
    fn test_swapped_files_are_rejected() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::in_dir(dir.path());
        let (f, c) = fit_pair(
            &["nice one", "sad one"],
            &[Sentiment::Positive, Sentiment::Negative],
        );
        store.save(f, c, 1).unwrap();

        let swapped = ArtifactStore::new(store.classifier_path(), store.feature_path());
        assert!(matches!(swapped.load(), Err(PipelineError::ModelUnavailable(_))));
    }
}
