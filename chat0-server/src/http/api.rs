//! REST API handlers

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status of the server
    pub status: String,
    /// Server version
    pub version: String,
    /// Seconds since server started
    pub uptime_seconds: i64,
}

/// Health check endpoint
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
    })
}

/// One entry of the model catalog
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    pub provider: String,
    /// Header the client must send its key in
    pub credential_header: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

/// Response for listing models
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelListResponse {
    pub models: Vec<ModelInfo>,
}

/// List the models this server can dispatch, in catalog order
pub async fn list_models(State(state): State<Arc<AppState>>) -> Json<ModelListResponse> {
    let models = state
        .registry
        .models()
        .iter()
        .map(|m| ModelInfo {
            name: m.display_name.clone(),
            provider: m.provider.clone(),
            credential_header: m.credential_header.clone(),
            max_output_tokens: m.max_output_tokens,
        })
        .collect();

    Json(ModelListResponse { models })
}
