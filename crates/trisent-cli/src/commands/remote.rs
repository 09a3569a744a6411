//! Commands that talk to a running trisent-api

use anyhow::Result;

use crate::client::ApiClient;
use crate::commands::pipeline::print_prediction;
use crate::output::OutputFormat;

/// Classify text through the HTTP API
pub async fn query(client: &ApiClient, text: &str, format: OutputFormat) -> Result<()> {
    let prediction = client.predict(text).await?;
    print_prediction(&prediction, format)
}
