//! Conversion of three-class tabular datasets into corpus records
//!
//! Expects a CSV with a header row, a text column and a numeric class id
//! column (0 = negative, 1 = mixed, 2 = positive).

use crate::error::{PipelineError, Result};
use crate::models::{LabeledExample, Sentiment};
use serde::Serialize;
use std::io::Read;
use tracing::debug;

/// Column positions in the source CSV
#[derive(Debug, Clone, Copy)]
pub struct CsvLayout {
    pub text_column: usize,
    pub label_column: usize,
}

impl Default for CsvLayout {
    fn default() -> Self {
        Self {
            text_column: 1,
            label_column: 2,
        }
    }
}

/// Converted records plus row accounting
#[derive(Debug, Clone, Default, Serialize)]
pub struct Conversion {
    pub records: Vec<LabeledExample>,
    pub rows_read: usize,
    pub skipped: usize,
}

/// Convert CSV rows; rows that are short, blank or carry an unknown id are dropped
pub fn convert_csv<R: Read>(reader: R, layout: CsvLayout) -> Result<Conversion> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let needed = layout.text_column.max(layout.label_column) + 1;
    let mut conversion = Conversion::default();

    for row in csv_reader.byte_records() {
        let row = row.map_err(|e| PipelineError::InvalidInput(format!("unreadable CSV: {}", e)))?;
        conversion.rows_read += 1;

        if row.len() < needed {
            conversion.skipped += 1;
            continue;
        }
        let text = String::from_utf8_lossy(&row[layout.text_column]).to_lowercase();
        let label = String::from_utf8_lossy(&row[layout.label_column]);

        match Sentiment::from_class_id(&label).and_then(|label| LabeledExample::new(label, &text)) {
            Some(record) => conversion.records.push(record),
            None => conversion.skipped += 1,
        }
    }

    debug!(
        rows_read = conversion.rows_read,
        written = conversion.records.len(),
        skipped = conversion.skipped,
        "CSV conversion finished"
    );
    Ok(conversion)
}
