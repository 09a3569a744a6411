//! Persistent labeled corpus
//!
//! One record per line, `label<delim>text`. Malformed lines are skipped on
//! load; a missing file or a file with no valid record is fatal.

use crate::error::{PipelineError, Result};
use crate::models::{LabeledExample, Sentiment, DEFAULT_DELIMITER};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Reads and extends the training corpus file
#[derive(Debug, Clone)]
pub struct CorpusStore {
    path: PathBuf,
    delimiter: char,
}

impl CorpusStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: DEFAULT_DELIMITER,
        }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load all valid records in file order
    pub fn load(&self) -> Result<Vec<LabeledExample>> {
        let content = self.read_lossy()?;
        let mut dropped = 0usize;
        let records: Vec<LabeledExample> = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| {
                let parsed = LabeledExample::parse_line(line, self.delimiter);
                if parsed.is_none() {
                    dropped += 1;
                }
                parsed
            })
            .collect();

        if records.is_empty() {
            return Err(PipelineError::DatasetEmpty {
                path: self.path.clone(),
            });
        }

        debug!(
            path = %self.path.display(),
            records = records.len(),
            dropped = dropped,
            "Corpus loaded"
        );
        Ok(records)
    }

    /// Append records after a separating blank line, preserving their order
    pub fn append(&self, records: &[LabeledExample]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        ensure_parent(&self.path)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer)?;
        for record in records {
            writeln!(writer, "{}", record.to_line(self.delimiter))?;
        }
        writer.flush()?;
        writer.get_ref().sync_all()?;

        info!(
            path = %self.path.display(),
            appended = records.len(),
            "Appended records to corpus"
        );
        Ok(records.len())
    }

    /// Create or truncate the corpus with the given records
    pub fn write(&self, records: &[LabeledExample]) -> Result<usize> {
        ensure_parent(&self.path)?;

        let mut writer = BufWriter::new(File::create(&self.path)?);
        for record in records {
            writeln!(writer, "{}", record.to_line(self.delimiter))?;
        }
        writer.flush()?;

        info!(
            path = %self.path.display(),
            records = records.len(),
            "Wrote corpus"
        );
        Ok(records.len())
    }

    /// Line-level statistics for debugging a corpus file
    pub fn scan(&self, preview: usize) -> Result<CorpusScan> {
        let content = self.read_lossy()?;
        let mut scan = CorpusScan::default();

        for line in content.lines() {
            scan.total_lines += 1;
            if line.trim().is_empty() {
                scan.blank_lines += 1;
                continue;
            }
            match LabeledExample::parse_line(line, self.delimiter) {
                Some(record) => {
                    scan.valid_records += 1;
                    *scan.label_counts.entry(record.label).or_default() += 1;
                    if scan.preview.len() < preview {
                        scan.preview.push(record);
                    }
                }
                None => scan.invalid_lines += 1,
            }
        }

        Ok(scan)
    }

    fn read_lossy(&self) -> Result<String> {
        if !self.path.exists() {
            return Err(PipelineError::DatasetMissing {
                path: self.path.clone(),
            });
        }
        let bytes = fs::read(&self.path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Summary produced by [`CorpusStore::scan`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct CorpusScan {
    pub total_lines: usize,
    pub blank_lines: usize,
    pub valid_records: usize,
    pub invalid_lines: usize,
    pub label_counts: BTreeMap<Sentiment, usize>,
    pub preview: Vec<LabeledExample>,
}

pub(crate) fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_with(dir: &TempDir, content: &[u8]) -> CorpusStore {
        let path = dir.path().join("sentiment.txt");
        fs::write(&path, content).unwrap();
        CorpusStore::new(path)
    }

    #[test]
    fn test_missing_corpus() {
        let dir = TempDir::new().unwrap();
        let store = CorpusStore::new(dir.path().join("absent.txt"));
        assert!(matches!(store.load(), Err(PipelineError::DatasetMissing { .. })));
    }

    #[test]
    fn test_empty_corpus() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, b"\n\nnot a valid line\n|no label\n");
        assert!(matches!(store.load(), Err(PipelineError::DatasetEmpty { .. })));
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let store = store_with(
            &dir,
            b"positive|i love this\nnot a valid line\nnegative|i hate this\n",
        );
        let records = store.load().unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, b"positive|caf\xe9 was great\nnegative|bad\n");
        let records = store.load().unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].text.starts_with("caf"));
    }

    #[test]
    fn test_custom_delimiter() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, b"mixed\tok | fine\n").with_delimiter('\t');
        let records = store.load().unwrap();
        assert_eq!(records[0].text, "ok | fine");
    }

    #[test]
    fn test_append_preserves_existing_content() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, b"positive|i love this\nnegative|i hate this\n");
        let before = fs::read_to_string(store.path()).unwrap();

        let added = vec![LabeledExample::new(Sentiment::Mixed, "it was okay").unwrap()];
        assert_eq!(store.append(&added).unwrap(), 1);

        let after = fs::read_to_string(store.path()).unwrap();
        assert!(after.starts_with(&before));
        assert_eq!(&after[before.len()..], "\nmixed|it was okay\n");
        assert_eq!(store.load().unwrap().len(), 3);
    }

    #[test]
    fn test_append_nothing_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, b"positive|x y\n");
        assert_eq!(store.append(&[]).unwrap(), 0);
        assert_eq!(fs::read(store.path()).unwrap(), b"positive|x y\n");
    }

    #[test]
    fn test_round_trip_of_valid_records() {
        let dir = TempDir::new().unwrap();
        let original = store_with(
            &dir,
            b"positive| great | really\n\ngarbage\nmixed|so-so\nNEGATIVE|awful\n",
        );
        let loaded = original.load().unwrap();

        let copy = CorpusStore::new(dir.path().join("copy.txt"));
        copy.write(&loaded).unwrap();
        assert_eq!(copy.load().unwrap(), loaded);
    }

    #[test]
    fn test_scan_counts_lines() {
        let dir = TempDir::new().unwrap();
        let store = store_with(
            &dir,
            b"positive|a good day\n\nbroken\nnegative|a bad day\npositive|nice\n",
        );
        let scan = store.scan(2).unwrap();
        assert_eq!(scan.total_lines, 5);
        assert_eq!(scan.blank_lines, 1);
        assert_eq!(scan.invalid_lines, 1);
        assert_eq!(scan.valid_records, 3);
        assert_eq!(scan.label_counts[&Sentiment::Positive], 2);
        assert_eq!(scan.preview.len(), 2);
    }
}
