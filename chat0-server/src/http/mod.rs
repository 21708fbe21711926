//! HTTP server module

mod api;
mod chat;
mod completion;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub use api::{HealthResponse, ModelInfo, ModelListResponse};

/// Create the HTTP router with all routes configured
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(api::health))
        .route("/api/models", get(api::list_models))
        .route("/api/chat", post(chat::chat))
        .route("/api/completion", post(completion::completion))
        // Browser clients send per-provider key headers cross-origin.
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
