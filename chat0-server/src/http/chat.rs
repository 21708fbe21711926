//! Streaming chat endpoint

use std::sync::Arc;

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, trace};

use chat0_core::ChatApiRequest;
use chat0_core::protocol::{UI_STREAM_HEADER, UI_STREAM_VERSION};
use chat0_models::providers::{ChatRequest, normalize_messages};

use crate::error::ApiError;
use crate::prompts::CHAT_SYSTEM_PROMPT;
use crate::state::AppState;
use crate::stream::{PumpConfig, spawn_pump};

/// `POST /api/chat`
///
/// Validation failures answer with a JSON error status; once the stream
/// response starts, failures are reported in-band.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<ChatApiRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body.map_err(|rejection| {
        debug!(error = %rejection.body_text(), "rejected chat body");
        ApiError::InvalidBody
    })?;
    trace!(body = ?body, "chat request");

    let (descriptor, handle) = state.dispatch(&body.model, &headers)?;
    let messages = normalize_messages(body.messages, handle.kind());
    info!(
        model = %descriptor.display_name,
        provider = %handle.kind(),
        thread_id = body.id.as_deref().unwrap_or("-"),
        messages = messages.len(),
        "streaming chat"
    );

    let request = ChatRequest::new(&descriptor.provider_model_id, messages)
        .system(CHAT_SYSTEM_PROMPT)
        .max_tokens_opt(descriptor.max_output_tokens);

    let rx = spawn_pump(
        handle,
        request,
        PumpConfig {
            timeout: state.request_timeout,
            smoothing_delay: state.smoothing_delay,
        },
        state.shutdown.child_token(),
        &state.tasks,
    );

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream")),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            (
                header::HeaderName::from_static(UI_STREAM_HEADER),
                HeaderValue::from_static(UI_STREAM_VERSION),
            ),
        ],
        Body::from_stream(ReceiverStream::new(rx)),
    )
        .into_response())
}
