//! Error responses for the inference endpoint

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("No input data received")]
    NoInput,

    #[error("Failed to parse JSON: {0}")]
    InvalidJson(String),

    #[error("Missing required features: {0:?}")]
    MissingFeatures(Vec<String>),

    #[error("Invalid data type: {0}")]
    InvalidType(String),

    #[error("Model or scaler not loaded")]
    NotLoaded,

    #[error("Failed to scale input data: {0}")]
    Scaling(String),

    #[error("Failed to make prediction: {0}")]
    Prediction(String),
}

impl IntoResponse for InferenceError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            InferenceError::NoInput => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "No input data received" }),
            ),
            InferenceError::InvalidJson(detail) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": format!("Failed to parse JSON: {}", detail) }),
            ),
            InferenceError::MissingFeatures(missing) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Missing required features", "missing": missing }),
            ),
            InferenceError::InvalidType(detail) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": "Invalid data type for one or more features. All features must be numeric.",
                    "details": detail,
                }),
            ),
            InferenceError::NotLoaded => {
                tracing::error!("Prediction requested but model or scaler is not loaded");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Model or scaler not loaded" }),
                )
            }
            InferenceError::Scaling(detail) => {
                tracing::error!(detail = %detail, "Scaling failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": "Failed to scale input data. Check feature count and types.",
                        "details": detail,
                    }),
                )
            }
            InferenceError::Prediction(detail) => {
                tracing::error!(detail = %detail, "Prediction failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Failed to make prediction", "details": detail }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, InferenceError>;
