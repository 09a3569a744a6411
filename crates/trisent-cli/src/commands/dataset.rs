//! Dataset commands: CSV conversion and corpus inspection

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tabled::Tabled;
use trisent_core::convert::{convert_csv, CsvLayout};
use trisent_core::{CorpusStore, PipelineConfig};

use crate::output::{
    format_timestamp, print_json, print_success, print_table, print_warning, FieldRow,
    OutputFormat,
};

#[derive(Tabled)]
struct PreviewRow {
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Text")]
    text: String,
}

#[derive(Debug, Serialize)]
struct ConversionSummary {
    output: String,
    rows_read: usize,
    written: usize,
    skipped: usize,
    appended: bool,
}

/// Convert a three-class CSV dataset into corpus records
pub fn convert(
    input: &Path,
    output: &Path,
    layout: CsvLayout,
    append: bool,
    format: OutputFormat,
) -> Result<()> {
    let file = File::open(input)
        .with_context(|| format!("Failed to open input file {}", input.display()))?;
    let conversion = convert_csv(BufReader::new(file), layout)?;

    let corpus = CorpusStore::new(output);
    let written = if append {
        corpus.append(&conversion.records)?
    } else {
        corpus.write(&conversion.records)?
    };

    let summary = ConversionSummary {
        output: output.display().to_string(),
        rows_read: conversion.rows_read,
        written,
        skipped: conversion.skipped,
        appended: append,
    };

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Table => {
            print_success(&format!(
                "Wrote {} records to {}",
                summary.written, summary.output
            ));
            if summary.skipped > 0 {
                print_warning(&format!(
                    "Skipped {} of {} rows (short, blank or unknown class id)",
                    summary.skipped, summary.rows_read
                ));
            }
        }
    }
    Ok(())
}

/// Summarize the corpus, pending feedback and model artifacts
pub fn inspect(config: &PipelineConfig, preview: usize, format: OutputFormat) -> Result<()> {
    let scan = config.corpus_store().scan(preview)?;
    let pending = config.feedback_store().read()?.len();
    let artifacts = config.artifact_store();
    let model = artifacts.load().ok();

    if let OutputFormat::Json = format {
        return print_json(&serde_json::json!({
            "corpus": scan,
            "pending_feedback": pending,
            "model": model.as_ref().map(|pair| serde_json::json!({
                "fingerprint": pair.fingerprint,
                "trained_at": pair.trained_at,
                "vocabulary_size": pair.features.dimension(),
            })),
        }));
    }

    println!("{}", "Corpus".bold());
    let mut rows = vec![
        FieldRow::new("Path", config.corpus_path.display()),
        FieldRow::new("Total lines", scan.total_lines),
        FieldRow::new("Valid records", scan.valid_records),
        FieldRow::new("Invalid lines", scan.invalid_lines),
        FieldRow::new("Blank lines", scan.blank_lines),
    ];
    for (label, count) in &scan.label_counts {
        rows.push(FieldRow::new(&format!("  {}", label), count));
    }
    rows.push(FieldRow::new("Pending feedback", pending));
    print_table(&rows, OutputFormat::Table);

    match &model {
        Some(pair) => println!(
            "Model: {} (trained {}, {} terms)",
            pair.fingerprint[..12.min(pair.fingerprint.len())].cyan(),
            format_timestamp(pair.trained_at),
            pair.features.dimension()
        ),
        None if artifacts.exists() => print_warning("Model artifacts present but unusable"),
        None => print_warning("No trained model"),
    }

    if !scan.preview.is_empty() {
        println!("\n{}", format!("First {} records", scan.preview.len()).bold());
        let preview_rows: Vec<PreviewRow> = scan
            .preview
            .iter()
            .map(|record| PreviewRow {
                label: record.label.to_string(),
                text: truncate(&record.text, 60),
            })
            .collect();
        let table = tabled::Table::new(preview_rows)
            .with(tabled::settings::Style::rounded())
            .to_string();
        println!("{}", table);
    }

    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
