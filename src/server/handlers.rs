//! HTTP request handlers

use std::sync::Arc;
use axum::{body::Bytes, extract::State, Json};
use ndarray::Array1;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::training::Regressor;

use super::error::{InferenceError, Result};
use super::state::AppState;

/// Coerce a JSON value to a number. Numeric strings are accepted.
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Pull the expected features out of the request in scaler order
fn extract_features(input: &Map<String, Value>, expected: &[String]) -> Result<Array1<f64>> {
    let missing: Vec<String> = expected
        .iter()
        .filter(|name| !input.contains_key(name.as_str()))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(InferenceError::MissingFeatures(missing));
    }

    let mut values = Vec::with_capacity(expected.len());
    for name in expected {
        let raw = &input[name.as_str()];
        let value = numeric(raw).ok_or_else(|| {
            InferenceError::InvalidType(format!("feature '{}' has non-numeric value {}", name, raw))
        })?;
        values.push(value);
    }
    Ok(Array1::from_vec(values))
}

/// Predict the target for a single JSON object of named features
pub async fn predict(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>> {
    let (Some(model), Some(scaler)) = (&state.model, &state.scaler) else {
        return Err(InferenceError::NotLoaded);
    };

    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(InferenceError::NoInput);
    }
    let body: Value = serde_json::from_slice(&body).map_err(|e| InferenceError::InvalidJson(e.to_string()))?;
    let input = match body {
        Value::Object(map) if !map.is_empty() => map,
        Value::Object(_) | Value::Null => return Err(InferenceError::NoInput),
        other => {
            return Err(InferenceError::InvalidJson(format!(
                "expected a JSON object, got {}",
                other
            )))
        }
    };

    let features = extract_features(&input, scaler.feature_names())?;
    let scaled = scaler
        .transform_row(features.view())
        .map_err(|e| InferenceError::Scaling(e.to_string()))?;

    let prediction = model
        .predict(&scaled)
        .map_err(|e| InferenceError::Prediction(e.to_string()))?;
    let value = prediction
        .first()
        .copied()
        .filter(|v| v.is_finite())
        .ok_or_else(|| InferenceError::Prediction("model returned no finite prediction".to_string()))?;

    debug!(prediction = value, "Served prediction");
    Ok(Json(json!({ "prediction": value })))
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": if state.is_ready() { "ok" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
        "model_loaded": state.model.is_some(),
        "scaler_loaded": state.scaler.is_some(),
        "model_kind": state.model.as_ref().map(|m| m.kind()),
        "features": state.expected_features(),
        "uptime_secs": (chrono::Utc::now() - state.started_at).num_seconds(),
    }))
}
