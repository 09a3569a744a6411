//! HTTP API for prediction, feedback capture, health checks and Prometheus metrics

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use trisent_core::{
    health::components, ComponentStatus, EventLogger, FeedbackStore, HealthRegistry,
    LabeledExample, PipelineError, PipelineMetrics, PredictionService, Sentiment,
    UnknownSentiment,
};

/// Shared application state
pub struct AppState {
    pub predictor: PredictionService,
    pub feedback: FeedbackStore,
    pub health_registry: HealthRegistry,
    pub metrics: PipelineMetrics,
    pub logger: EventLogger,
}

impl AppState {
    pub fn new(
        predictor: PredictionService,
        feedback: FeedbackStore,
        health_registry: HealthRegistry,
    ) -> Self {
        Self {
            predictor,
            feedback,
            health_registry,
            metrics: PipelineMetrics::new(),
            logger: EventLogger::new("api"),
        }
    }

    /// Register components and report model availability
    ///
    /// A missing model leaves the process live but not ready.
    pub async fn init_health(&self) {
        self.health_registry.register(components::FEEDBACK_LOG).await;
        match self.predictor.unavailable_reason() {
            None => self.health_registry.register(components::MODEL).await,
            Some(reason) => {
                self.logger.log_model_unavailable(reason);
                self.health_registry
                    .set_degraded(components::MODEL, reason)
                    .await
            }
        }
        self.health_registry.set_ready(true).await;
    }
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub label: String,
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Error wrapper mapping pipeline failures onto HTTP statuses
pub struct ApiError(PipelineError);

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            PipelineError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PipelineError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorResponse {
            error: self.0.to_string(),
            code: self.0.code().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| PipelineError::InvalidInput(e.body_text()).into())
}

/// Classify one text
async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = json_body(payload)?;
    let start = Instant::now();
    let prediction = state.predictor.predict(&request.text)?;

    state.logger.log_prediction(
        prediction.label.as_str(),
        prediction.confidence,
        start.elapsed().as_micros(),
    );
    Ok(Json(prediction))
}

/// Record a user correction for the next retrain cycle
async fn feedback(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FeedbackRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = json_body(payload)?;
    let label: Sentiment = request
        .label
        .parse()
        .map_err(|e: UnknownSentiment| PipelineError::InvalidInput(e.to_string()))?;
    let record = LabeledExample::new(label, &request.text)
        .ok_or_else(|| PipelineError::InvalidInput("text must not be empty".to_string()))?;

    let store = state.feedback.clone();
    let path = store.path().to_path_buf();
    let written = tokio::task::spawn_blocking(move || store.append(&record))
        .await
        .unwrap_or_else(|e| {
            Err(PipelineError::FeedbackWriteFailure {
                path,
                source: std::io::Error::new(std::io::ErrorKind::Other, e),
            })
        });

    match written {
        Ok(()) => {
            state.metrics.inc_feedback_records();
            state.logger.log_feedback(label.as_str(), true);
            state
                .health_registry
                .set_healthy(components::FEEDBACK_LOG)
                .await;
            Ok((
                StatusCode::CREATED,
                Json(FeedbackResponse {
                    status: "recorded".to_string(),
                }),
            ))
        }
        Err(e) => {
            state.metrics.inc_feedback_errors();
            state.logger.log_feedback(label.as_str(), false);
            state
                .health_registry
                .set_degraded(components::FEEDBACK_LOG, e.to_string())
                .await;
            Err(e.into())
        }
    }
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 only with a loaded model
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            e.to_string().into_bytes(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/feedback", post(feedback))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
