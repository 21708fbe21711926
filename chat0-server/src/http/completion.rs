//! One-shot completion endpoint used for thread titles and message summaries

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use tracing::{debug, info, warn};

use chat0_core::SummaryRequest;
use chat0_models::providers::{ChatRequest, Message};

use crate::error::ApiError;
use crate::prompts::TITLE_SYSTEM_PROMPT;
use crate::state::AppState;
use crate::stream::error_text;

/// `POST /api/completion`
///
/// Answers `200 text/plain` with the generated text, which may be empty.
pub async fn completion(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<SummaryRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body.map_err(|rejection| {
        debug!(error = %rejection.body_text(), "rejected completion body");
        ApiError::InvalidBody
    })?;

    let (descriptor, handle) = state.dispatch(&state.summary_model, &headers)?;
    info!(
        model = %descriptor.display_name,
        thread_id = %body.thread_id,
        message_id = %body.message_id,
        is_title = body.is_title,
        "generating summary"
    );

    let request = ChatRequest::new(
        &descriptor.provider_model_id,
        vec![Message::user(body.prompt)],
    )
    .system(TITLE_SYSTEM_PROMPT)
    .max_tokens_opt(descriptor.max_output_tokens);

    let response = handle.complete(request).await.map_err(|e| {
        warn!(model = %descriptor.display_name, error = %e, "summary generation failed");
        ApiError::Upstream(error_text(&e))
    })?;

    let text = response.content.as_text();
    Ok((
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        )],
        text.trim().to_string(),
    )
        .into_response())
}
