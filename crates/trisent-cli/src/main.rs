//! TriSent CLI
//!
//! Trains and retrains the sentiment model, classifies text locally or
//! through a running API, records feedback and prepares datasets.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{dataset, pipeline, remote};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use trisent_core::convert::CsvLayout;

/// TriSent CLI
#[derive(Parser)]
#[command(name = "trisent")]
#[command(author, version, about = "CLI for the TriSent sentiment pipeline", long_about = None)]
pub struct Cli {
    /// Directory holding sentiment.txt and feedback.txt
    #[arg(long, global = true, env = "TRISENT_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Directory holding the model artifacts
    #[arg(long, global = true, env = "TRISENT_MODEL_DIR")]
    pub model_dir: Option<PathBuf>,

    /// API endpoint URL used by `query` (can also be set via TRISENT_API_URL)
    #[arg(long, global = true, env = "TRISENT_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, global = true, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train a model from the corpus
    Train,

    /// Merge pending feedback into the corpus and retrain
    Retrain,

    /// Classify text with the local model
    Predict {
        /// Text to classify
        text: String,
    },

    /// Record a corrected label for the next retrain
    Feedback {
        /// Correct label (positive, negative or mixed)
        #[arg(long, short)]
        label: String,

        /// Text that was misclassified
        text: String,
    },

    /// Convert a three-class CSV dataset into corpus format
    Convert {
        /// Source CSV file (header row, numeric class ids)
        #[arg(long, short)]
        input: PathBuf,

        /// Corpus file to write
        #[arg(long, short)]
        output: PathBuf,

        /// Zero-based column holding the text
        #[arg(long, default_value_t = 1)]
        text_column: usize,

        /// Zero-based column holding the class id (0 negative, 1 mixed, 2 positive)
        #[arg(long, default_value_t = 2)]
        label_column: usize,

        /// Append to the output instead of replacing it
        #[arg(long)]
        append: bool,
    },

    /// Show corpus statistics, pending feedback and model status
    Inspect {
        /// Number of records to preview
        #[arg(long, default_value_t = 5)]
        preview: usize,
    },

    /// Classify text through a running API
    Query {
        /// Text to classify
        text: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Human-readable logs on stderr so stdout stays clean for output
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = config::Config::load()?;
    let pipeline_config = settings.pipeline(cli.data_dir, cli.model_dir);
    let format = cli.format;

    match cli.command {
        Commands::Train => pipeline::train(&pipeline_config, format)?,
        Commands::Retrain => pipeline::retrain(&pipeline_config, format)?,
        Commands::Predict { text } => pipeline::predict(&pipeline_config, &text, format)?,
        Commands::Feedback { label, text } => {
            pipeline::feedback(&pipeline_config, &label, &text, format)?
        }
        Commands::Convert {
            input,
            output,
            text_column,
            label_column,
            append,
        } => {
            let layout = CsvLayout {
                text_column,
                label_column,
            };
            dataset::convert(&input, &output, layout, append, format)?
        }
        Commands::Inspect { preview } => dataset::inspect(&pipeline_config, preview, format)?,
        Commands::Query { text } => {
            let client = client::ApiClient::new(&settings.api_url(cli.api_url))?;
            remote::query(&client, &text, format).await?
        }
    }

    Ok(())
}
