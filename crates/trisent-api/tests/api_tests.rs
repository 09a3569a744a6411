//! Integration tests for the prediction API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use trisent_api::api::{create_router, AppState};
use trisent_core::{HealthRegistry, PipelineConfig, PredictionService, Trainer};

const CORPUS: &str = "positive|i love this\nnegative|i hate this\nmixed|it was okay\n";

fn pipeline(dir: &TempDir) -> PipelineConfig {
    let config = PipelineConfig::with_dirs(dir.path().join("data"), dir.path().join("models"));
    fs::create_dir_all(dir.path().join("data")).unwrap();
    config
}

async fn setup_app(trained: bool) -> (TempDir, PipelineConfig, Router) {
    let dir = TempDir::new().unwrap();
    let config = pipeline(&dir);
    if trained {
        fs::write(&config.corpus_path, CORPUS).unwrap();
        Trainer::from_config(&config).run().unwrap();
    }

    let state = Arc::new(AppState::new(
        PredictionService::load(&config.artifact_store()),
        config.feedback_store(),
        HealthRegistry::new(),
    ));
    state.init_health().await;
    (dir, config, create_router(state))
}

async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

fn as_json(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}

#[tokio::test]
async fn test_predict_returns_label_and_marker() {
    let (_dir, _config, app) = setup_app(true).await;

    let (status, body) = send(app, "POST", "/predict", Some(json!({"text": "i love this"}))).await;
    assert_eq!(status, StatusCode::OK);

    let body = as_json(&body);
    assert_eq!(body["label"], "positive");
    assert_eq!(body["display_marker"], "😊");
    assert!(body["confidence"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn test_predict_blank_text_is_unprocessable() {
    let (_dir, _config, app) = setup_app(true).await;

    let (status, body) = send(app, "POST", "/predict", Some(json!({"text": "   "}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(as_json(&body)["code"], "invalid_input");
}

#[tokio::test]
async fn test_predict_missing_field_is_unprocessable() {
    let (_dir, _config, app) = setup_app(true).await;

    let (status, body) = send(app, "POST", "/predict", Some(json!({"message": "hi"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(as_json(&body)["code"], "invalid_input");
}

#[tokio::test]
async fn test_predict_without_model_is_unavailable() {
    let (_dir, _config, app) = setup_app(false).await;

    let (status, body) = send(app, "POST", "/predict", Some(json!({"text": "i love this"}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(as_json(&body)["code"], "model_unavailable");
}

#[tokio::test]
async fn test_feedback_is_recorded() {
    let (_dir, config, app) = setup_app(true).await;

    let (status, body) = send(
        app,
        "POST",
        "/feedback",
        Some(json!({"label": "Mixed", "text": "not bad\nnot great"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(as_json(&body)["status"], "recorded");

    let contents = fs::read_to_string(&config.feedback_path).unwrap();
    assert_eq!(contents, "mixed|not bad not great\n");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_feedback_is_recorded() {
    let (_dir, config, app) = setup_app(true).await;

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let app = app.clone();
            tokio::spawn(async move {
                let body = json!({"label": "positive", "text": format!("review {}", i)});
                send(app, "POST", "/feedback", Some(body)).await.0
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::CREATED);
    }

    let contents = fs::read_to_string(&config.feedback_path).unwrap();
    assert_eq!(contents.lines().count(), 16);
    assert!(contents.lines().all(|line| line.starts_with("positive|review ")));
}

#[tokio::test]
async fn test_feedback_write_failure_is_reported() {
    let (_dir, config, app) = setup_app(true).await;
    fs::create_dir_all(config.feedback_path.join("blocked")).unwrap();

    let (status, body) = send(
        app.clone(),
        "POST",
        "/feedback",
        Some(json!({"label": "negative", "text": "nope"})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(as_json(&body)["code"], "feedback_write_failure");

    let (status, body) = send(app, "GET", "/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        as_json(&body)["components"]["feedback_log"]["status"],
        "degraded"
    );
}

#[tokio::test]
async fn test_feedback_unknown_label_is_rejected() {
    let (_dir, config, app) = setup_app(true).await;

    let (status, body) = send(
        app,
        "POST",
        "/feedback",
        Some(json!({"label": "ecstatic", "text": "wow"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(as_json(&body)["code"], "invalid_input");
    assert!(!config.feedback_path.exists());
}

#[tokio::test]
async fn test_feedback_accepted_without_model() {
    let (_dir, config, app) = setup_app(false).await;

    let (status, _) = send(
        app,
        "POST",
        "/feedback",
        Some(json!({"label": "negative", "text": "terrible"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(config.feedback_path.exists());
}

#[tokio::test]
async fn test_healthz_and_readyz_with_model() {
    let (_dir, _config, app) = setup_app(true).await;

    let (status, body) = send(app.clone(), "GET", "/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(as_json(&body)["status"], "healthy");

    let (status, body) = send(app, "GET", "/readyz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(as_json(&body)["ready"], true);
}

#[tokio::test]
async fn test_not_ready_without_model() {
    let (_dir, _config, app) = setup_app(false).await;

    let (status, _) = send(app.clone(), "GET", "/healthz", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(app, "GET", "/readyz", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let body = as_json(&body);
    assert_eq!(body["ready"], false);
    assert!(body["reason"].is_string());
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (_dir, _config, app) = setup_app(true).await;

    let (_, _) = send(app.clone(), "POST", "/predict", Some(json!({"text": "i hate this"}))).await;
    let (status, body) = send(app, "GET", "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);

    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("trisent_predictions_total"));
}
