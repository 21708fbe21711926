//! Shared test utilities for chat0-server integration tests
//!
//! `MockProvider` is a local axum app speaking both the OpenAI-compatible
//! and the Gemini streaming APIs. Its behavior is chosen by upstream model id:
//!
//! | model id          | behavior                                        |
//! |-------------------|-------------------------------------------------|
//! | `x-ai/grok-4`     | reasoning, then an echo of the request shape    |
//! | `gpt-4o`          | echo of the request shape                       |
//! | `openai/gpt-5`    | partial text, then an in-stream error payload   |
//! | `openai/gpt-4.1`  | HTTP 500 with an error object                   |
//! | `z-ai/glm-4.5`    | endless slow stream, flags when it is dropped   |
//! | Gemini models     | "Kyoto Itinerary"                               |

#![allow(dead_code)]

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use chat0_core::UiStreamEvent;
use chat0_models::ModelRegistry;
use chat0_models::providers::ProviderEndpoints;
use chat0_server::{AppState, Chat0Server, ServerConfig};

/// Recorded traffic of the mock provider
#[derive(Default)]
pub struct MockProvider {
    pub requests: Mutex<Vec<Value>>,
    pub slow_stream_dropped: AtomicBool,
}

impl MockProvider {
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }

    pub fn dropped(&self) -> bool {
        self.slow_stream_dropped.load(Ordering::SeqCst)
    }
}

struct DropFlag(Arc<MockProvider>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.slow_stream_dropped.store(true, Ordering::SeqCst);
    }
}

fn sse(body: String) -> Response {
    ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
}

fn openai_frame(delta: Value) -> String {
    format!("data: {}\n\n", json!({"choices": [{"delta": delta}]}))
}

/// Part types of the last user message, as the provider received them.
fn last_user_part_types(messages: &[Value]) -> Vec<String> {
    let Some(last) = messages.iter().rev().find(|m| m["role"] == "user") else {
        return Vec::new();
    };
    match &last["content"] {
        Value::String(_) => vec!["text".to_string()],
        Value::Array(parts) => parts
            .iter()
            .map(|p| p["type"].as_str().unwrap_or("?").to_string())
            .collect(),
        _ => Vec::new(),
    }
}

async fn openai_completions(
    State(mock): State<Arc<MockProvider>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    mock.requests.lock().unwrap().push(body.clone());

    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !auth.starts_with("Bearer ") || auth.len() <= "Bearer ".len() {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": {"message": "No auth credentials found"}})),
        )
            .into_response();
    }

    let messages = body["messages"].as_array().cloned().unwrap_or_default();
    let first_role = messages
        .first()
        .and_then(|m| m["role"].as_str())
        .unwrap_or("none")
        .to_string();
    let echo = format!(
        "first {first_role} parts {}",
        last_user_part_types(&messages).join("+")
    );

    match body["model"].as_str().unwrap_or_default() {
        "x-ai/grok-4" => {
            let mut out = openai_frame(json!({"reasoning": "Thinking it over. "}));
            out.push_str(&openai_frame(json!({"content": echo})));
            out.push_str(&format!(
                "data: {}\n\n",
                json!({"choices": [{"delta": {}, "finish_reason": "stop"}]})
            ));
            out.push_str("data: [DONE]\n\n");
            sse(out)
        }
        "openai/gpt-5" => {
            let mut out = openai_frame(json!({"content": "partial answer "}));
            out.push_str(&format!(
                "data: {}\n\n",
                json!({"error": {"message": "upstream overloaded", "code": 502}})
            ));
            sse(out)
        }
        "openai/gpt-4.1" => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": {"message": "model overloaded"}})),
        )
            .into_response(),
        "z-ai/glm-4.5" => {
            let flag = DropFlag(mock.clone());
            let stream = futures::stream::unfold(flag, |flag| async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Some((
                    Ok::<_, Infallible>(openai_frame(json!({"content": "tick "}))),
                    flag,
                ))
            });
            (
                [(header::CONTENT_TYPE, "text/event-stream")],
                Body::from_stream(stream),
            )
                .into_response()
        }
        _ => {
            let mut out = openai_frame(json!({"content": echo}));
            out.push_str("data: [DONE]\n\n");
            sse(out)
        }
    }
}

async fn gemini_generate(
    State(mock): State<Arc<MockProvider>>,
    Path(rest): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    mock.requests.lock().unwrap().push(json!({"path": rest, "body": body}));

    if headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()) != Some("g-key") {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"error": {"code": 403, "message": "API key not valid"}})),
        )
            .into_response();
    }

    let frames = [
        json!({"candidates": [{"content": {"role": "model", "parts": [{"text": "  Kyoto "}]}}]}),
        json!({"candidates": [{"content": {"role": "model", "parts": [{"text": "Itinerary\n"}]}, "finishReason": "STOP"}]}),
    ];
    sse(frames.iter().map(|f| format!("data: {f}\r\n\r\n")).collect())
}

/// Spawn the mock provider; returns it and its base URL
pub async fn spawn_mock_provider() -> (Arc<MockProvider>, String) {
    let mock = Arc::new(MockProvider::default());
    let router = Router::new()
        .route("/chat/completions", post(openai_completions))
        .route("/models/*rest", post(gemini_generate))
        .with_state(mock.clone());
    let addr = spawn_router(router).await;
    (mock, format!("http://{addr}"))
}

async fn spawn_router(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Gateway state pointed at `provider_base`, without output pacing
pub fn test_state(provider_base: &str) -> AppState {
    AppState::new(ModelRegistry::builtin())
        .with_endpoints(ProviderEndpoints::all(provider_base))
        .with_smoothing_delay(Duration::ZERO)
}

/// Spawns a gateway in a background task, returns its base URL
pub async fn spawn_gateway(state: AppState) -> String {
    let server = Chat0Server::with_state(ServerConfig::default(), Arc::new(state));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = server.run_with_listener(listener).await;
    });

    // Brief delay to ensure server is accepting connections
    tokio::time::sleep(Duration::from_millis(10)).await;

    format!("http://{addr}")
}

/// Mock provider plus a gateway in front of it
pub async fn setup() -> (Arc<MockProvider>, String) {
    let (mock, provider_base) = spawn_mock_provider().await;
    let gateway = spawn_gateway(test_state(&provider_base)).await;
    (mock, gateway)
}

/// Decode a UI message stream body; also reports whether `[DONE]` was seen
pub fn parse_events(body: &str) -> (Vec<UiStreamEvent>, bool) {
    let mut events = Vec::new();
    for frame in body.split("\n\n").filter(|f| !f.is_empty()) {
        let data = frame.strip_prefix("data: ").expect("frame without data prefix");
        if data == "[DONE]" {
            return (events, true);
        }
        events.push(UiStreamEvent::from_data(data).expect("undecodable event"));
    }
    (events, false)
}

/// Concatenated text deltas
pub fn text_of(events: &[UiStreamEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            UiStreamEvent::TextDelta { delta, .. } => Some(delta.as_str()),
            _ => None,
        })
        .collect()
}

/// Concatenated reasoning deltas
pub fn reasoning_of(events: &[UiStreamEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            UiStreamEvent::ReasoningDelta { delta, .. } => Some(delta.as_str()),
            _ => None,
        })
        .collect()
}

/// A chat body for `model` with one user message
pub fn chat_body(model: &str, parts: Value) -> Value {
    json!({
        "id": "thread-1",
        "model": model,
        "messages": [{"id": "u1", "role": "user", "parts": parts}]
    })
}
