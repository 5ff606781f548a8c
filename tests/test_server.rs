//! Integration test: inference endpoint

use axum::body::Body;
use axum::http::{Request, StatusCode};
use model_tournament::data::{Dataset, StandardScaler};
use model_tournament::server::{create_router, AppState, ServerConfig};
use model_tournament::storage::{save_json, ArtifactStore, LocalArtifactStore, MODEL_ARTIFACT, SCALER_ARTIFACT};
use model_tournament::training::{LinearRegression, Regressor, TrainedModel};
use ndarray::{Array1, Array2};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        models_dir: std::path::PathBuf::from("/nonexistent/models"),
    }
}

/// co2 = 10 * temperature + 2 * humidity + 400, fitted on scaled features
fn artifacts() -> (TrainedModel, StandardScaler) {
    let x = Array2::from_shape_fn((30, 2), |(i, j)| if j == 0 { 15.0 + (i % 10) as f64 } else { 30.0 + ((i * 7) % 11) as f64 });
    let y = Array1::from_shape_fn(30, |i| 10.0 * x[[i, 0]] + 2.0 * x[[i, 1]] + 400.0);
    let ds = Dataset::new(vec!["temperature".into(), "humidity".into()], "co2", x, y).unwrap();

    let scaler = StandardScaler::fit(&ds, false).unwrap();
    let scaled = scaler.transform(&ds).unwrap();
    let mut model = LinearRegression::new();
    model.fit(scaled.features(), scaled.target()).unwrap();
    (TrainedModel::from(model), scaler)
}

fn loaded_app() -> axum::Router {
    let (model, scaler) = artifacts();
    let state = Arc::new(AppState::new(test_config(), Some(model), Some(scaler)));
    create_router(state)
}

fn empty_app() -> axum::Router {
    create_router(Arc::new(AppState::new(test_config(), None, None)))
}

async fn post_predict(app: axum::Router, body: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/predict")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 64).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_predict_success() {
    let (status, body) = post_predict(loaded_app(), r#"{"temperature": 20.0, "humidity": 35.0}"#).await;
    assert_eq!(status, StatusCode::OK);
    let prediction = body["prediction"].as_f64().unwrap();
    assert!((prediction - 670.0).abs() < 1e-6, "got {}", prediction);
}

#[tokio::test]
async fn test_predict_accepts_numeric_strings_and_extra_fields() {
    let (status, body) = post_predict(
        loaded_app(),
        r#"{"humidity": "35", "temperature": 20, "timestamp": "2024-01-01"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!((body["prediction"].as_f64().unwrap() - 670.0).abs() < 1e-6);
}

#[tokio::test]
async fn test_missing_features() {
    let (status, body) = post_predict(loaded_app(), r#"{"temperature": 20.0}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required features");
    assert_eq!(body["missing"], json!(["humidity"]));
}

#[tokio::test]
async fn test_non_numeric_feature() {
    let (status, body) = post_predict(loaded_app(), r#"{"temperature": "warm", "humidity": 35}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Invalid data type for one or more features. All features must be numeric."
    );
    assert!(body["details"].as_str().unwrap().contains("temperature"));
}

#[tokio::test]
async fn test_empty_input() {
    for payload in ["", "{}", "null"] {
        let (status, body) = post_predict(loaded_app(), payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload {:?}", payload);
        assert_eq!(body["error"], "No input data received");
    }
}

#[tokio::test]
async fn test_malformed_json() {
    let (status, body) = post_predict(loaded_app(), r#"{"temperature": 20.0,"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Failed to parse JSON"));

    let (status, _) = post_predict(loaded_app(), "[1, 2]").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_predict_without_artifacts() {
    let (status, body) = post_predict(empty_app(), r#"{"temperature": 20.0, "humidity": 35.0}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Model or scaler not loaded" }));
}

#[tokio::test]
async fn test_scaler_model_mismatch_is_prediction_error() {
    // Model fitted on two features, scaler on three
    let (model, _) = artifacts();
    let x = Array2::from_shape_fn((10, 3), |(i, j)| (i + j * 3) as f64);
    let y = Array1::from_shape_fn(10, |i| i as f64);
    let ds = Dataset::new(vec!["a".into(), "b".into(), "c".into()], "y", x, y).unwrap();
    let scaler = StandardScaler::fit(&ds, false).unwrap();

    let app = create_router(Arc::new(AppState::new(test_config(), Some(model), Some(scaler))));
    let (status, body) = post_predict(app, r#"{"a": 1, "b": 2, "c": 3}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to make prediction");
    assert!(body["details"].is_string());
}

#[tokio::test]
async fn test_health_reports_loaded_artifacts() {
    let response = loaded_app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 64).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["model_loaded"], true);
    assert_eq!(body["scaler_loaded"], true);
    assert_eq!(body["features"], json!(["temperature", "humidity"]));
}

#[tokio::test]
async fn test_unknown_route_and_method() {
    let response = loaded_app()
        .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = loaded_app()
        .oneshot(Request::builder().uri("/predict").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_state_loads_from_models_dir() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = LocalArtifactStore::new(dir.path());
    let (model, scaler) = artifacts();
    store.save(MODEL_ARTIFACT, &model.to_bytes().unwrap()).unwrap();
    save_json(&store, SCALER_ARTIFACT, &scaler).unwrap();

    let config = ServerConfig {
        models_dir: dir.path().to_path_buf(),
        ..test_config()
    };
    let state = AppState::load(config);
    assert!(state.is_ready());

    let app = create_router(Arc::new(state));
    let (status, body) = post_predict(app, r#"{"temperature": 20.0, "humidity": 35.0}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert!((body["prediction"].as_f64().unwrap() - 670.0).abs() < 1e-6);
}

#[tokio::test]
async fn test_state_load_tolerates_missing_artifacts() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = ServerConfig {
        models_dir: dir.path().to_path_buf(),
        ..test_config()
    };
    let state = AppState::load(config);
    assert!(state.model.is_none());
    assert!(state.scaler.is_none());
    assert!(!state.is_ready());
}
