//! OpenAI-compatible chat completions, used for OpenAI and OpenRouter.
//!
//! Both speak `POST {base}/chat/completions` with bearer auth and stream
//! `data:` events carrying `choices[].delta`. OpenRouter additionally
//! accepts `input_audio` parts and reports reasoning in `delta.reasoning`.

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use super::sse::data_events;
use super::{
    ChatRequest, ChatStream, Content, ContentPart, Message, Role, StopReason, StreamChunk, Usage,
    describe_error, upstream_error,
};
use crate::auth::ApiKey;
use crate::{Error, ProviderKind, Result};

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: WireContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum WireContent {
    Text(String),
    Parts(Vec<Value>),
}

#[derive(Debug, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

fn wire_messages(request: &ChatRequest) -> Vec<WireMessage> {
    let system = request.system.iter().map(|s| WireMessage {
        role: "system",
        content: WireContent::Text(s.clone()),
    });
    let history = request.messages.iter().filter_map(wire_message);
    system.chain(history).collect()
}

fn wire_message(message: &Message) -> Option<WireMessage> {
    let role = match message.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => {
            debug!("skipping tool message, tool calls are not supported");
            return None;
        }
    };
    let content = match (&message.content, message.role) {
        (Content::Parts(parts), Role::User) => {
            let parts: Vec<Value> = parts
                .iter()
                .filter(|p| {
                    matches!(
                        p,
                        ContentPart::Text { .. }
                            | ContentPart::ImageRef { .. }
                            | ContentPart::InlineAudio { .. }
                    )
                })
                .map(ContentPart::to_value)
                .collect();
            if parts.is_empty() {
                WireContent::Text(String::new())
            } else {
                WireContent::Parts(parts)
            }
        }
        (content, _) => WireContent::Text(content.as_text()),
    };
    Some(WireMessage { role, content })
}

fn stop_reason(reason: &str) -> StopReason {
    match reason {
        "stop" => StopReason::EndTurn,
        "length" => StopReason::MaxTokens,
        "content_filter" => StopReason::ContentFilter,
        "tool_calls" | "function_call" => StopReason::ToolUse,
        _ => StopReason::Other,
    }
}

/// Decode one `data:` payload. Returns `None` for keep-alive style chunks.
fn parse_chunk(data: &str) -> Result<Option<StreamChunk>> {
    let chunk: CompletionChunk = serde_json::from_str(data)?;
    if let Some(error) = chunk.error {
        return Err(Error::ProviderApi(describe_error(&error)));
    }

    let mut out = StreamChunk {
        usage: chunk
            .usage
            .map(|u| Usage::new(u.prompt_tokens, u.completion_tokens)),
        ..Default::default()
    };
    if let Some(choice) = chunk.choices.into_iter().next() {
        out.reasoning = choice.delta.reasoning.or(choice.delta.reasoning_content);
        out.delta = choice.delta.content;
        out.stop_reason = choice.finish_reason.as_deref().map(stop_reason);
    }
    Ok((!out.is_empty()).then_some(out))
}

// ────────────────────────────────────────────────────────────────────────────
// OpenAiClient
// ────────────────────────────────────────────────────────────────────────────

/// Streaming client for an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: ApiKey,
    kind: ProviderKind,
}

impl OpenAiClient {
    /// Create a client for `kind` (OpenAI or OpenRouter) rooted at `base_url`.
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: ApiKey,
        kind: ProviderKind,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            kind,
        }
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Open a streaming completion.
    pub async fn stream(&self, request: ChatRequest) -> Result<ChatStream> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = CompletionRequest {
            model: &request.model,
            messages: wire_messages(&request),
            stream: true,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };
        trace!(body = %serde_json::to_string(&body)?, "chat completion request");
        debug!(provider = %self.kind, model = %request.model, "opening completion stream");

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(upstream_error(self.kind.as_str(), response).await);
        }

        let stream = data_events(response).filter_map(|event| async move {
            match event {
                Ok(data) => parse_chunk(&data).transpose(),
                Err(e) => Some(Err(e)),
            }
        });
        Ok(Box::pin(stream))
    }
}
