//! Append-only log of user corrections
//!
//! Same line format as the corpus. The file's presence means corrections are
//! pending. There is no locking: a single writer is assumed, concurrent
//! appends may interleave and a `clear` racing an `append` can lose a record.

use crate::corpus::ensure_parent;
use crate::error::{PipelineError, Result};
use crate::models::{parse_records, FeedbackRecord, DEFAULT_DELIMITER};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct FeedbackStore {
    path: PathBuf,
    delimiter: char,
}

impl FeedbackStore {
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

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Valid pending records; an absent log reads as empty
    pub fn read(&self) -> Result<Vec<FeedbackRecord>> {
        if !self.exists() {
            return Ok(Vec::new());
        }
        let bytes = fs::read(&self.path)?;
        let content = String::from_utf8_lossy(&bytes);
        Ok(parse_records(&content, self.delimiter))
    }

    pub fn append(&self, record: &FeedbackRecord) -> Result<()> {
        self.write_line(&record.to_line(self.delimiter))
            .map_err(|source| PipelineError::FeedbackWriteFailure {
                path: self.path.clone(),
                source,
            })?;

        debug!(
            path = %self.path.display(),
            label = %record.label,
            "Feedback appended"
        );
        Ok(())
    }

    /// Delete the log; already absent is fine
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "Feedback log cleared");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_line(&self, line: &str) -> io::Result<()> {
        ensure_parent(&self.path)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)
    }
}
