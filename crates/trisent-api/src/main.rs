//! TriSent API - HTTP prediction and feedback service
//!
//! Loads the model pair once at startup. Without a loadable pair the
//! service still starts, reports not-ready and answers predictions with 503.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use trisent_api::{api, config::ApiConfig};
use trisent_core::{EventLogger, HealthRegistry, PipelineMetrics, PredictionService};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting trisent-api");

    let config = ApiConfig::load()?;
    let pipeline = config.pipeline();
    info!(
        data_dir = %config.data_dir.display(),
        model_dir = %config.model_dir.display(),
        "API configured"
    );

    let predictor = PredictionService::load(&pipeline.artifact_store());
    if let Some(fingerprint) = predictor.model_fingerprint() {
        PipelineMetrics::new().set_model_fingerprint(fingerprint);
    }

    let logger = EventLogger::new("api");
    logger.log_startup(SERVICE_VERSION, predictor.model_fingerprint());

    let app_state = Arc::new(api::AppState::new(
        predictor,
        pipeline.feedback_store(),
        HealthRegistry::new(),
    ));
    app_state.init_health().await;

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        result = api_handle => {
            result??;
        }
        _ = tokio::signal::ctrl_c() => {
            logger.log_shutdown("SIGINT received");
            info!("Shutting down");
        }
    }

    Ok(())
}
