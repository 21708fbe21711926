//! Wire contract between chat clients and the chat0 server.
//!
//! The streaming endpoint speaks the AI SDK "UI message stream": one JSON
//! event per server-sent event, terminated by `data: [DONE]`.

use serde::{Deserialize, Serialize};

use chat0_models::providers::{Message, StopReason};

/// Header announcing the UI message stream protocol version.
pub const UI_STREAM_HEADER: &str = "x-vercel-ai-ui-message-stream";
/// Protocol version sent in [`UI_STREAM_HEADER`].
pub const UI_STREAM_VERSION: &str = "v1";
/// Final frame of every stream.
pub const DONE_FRAME: &str = "data: [DONE]\n\n";

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatApiRequest {
    /// Thread id, informational.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display name of the selected model.
    pub model: String,
    /// Full conversation history, oldest first.
    pub messages: Vec<Message>,
}

/// Body of `POST /api/completion`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    /// Text to summarize, usually the user's message.
    pub prompt: String,
    pub thread_id: String,
    pub message_id: String,
    /// Whether the result also becomes the thread title.
    #[serde(default)]
    pub is_title: bool,
}

/// One event of the UI message stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UiStreamEvent {
    Start {
        #[serde(rename = "messageId", default, skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
    },
    StartStep,
    TextStart {
        id: String,
    },
    TextDelta {
        id: String,
        delta: String,
    },
    TextEnd {
        id: String,
    },
    ReasoningStart {
        id: String,
    },
    ReasoningDelta {
        id: String,
        delta: String,
    },
    ReasoningEnd {
        id: String,
    },
    FinishStep,
    Finish {
        #[serde(rename = "finishReason", default, skip_serializing_if = "Option::is_none")]
        finish_reason: Option<String>,
    },
    Error {
        #[serde(rename = "errorText")]
        error_text: String,
    },
    /// Event types this client does not act on.
    #[serde(other)]
    Unknown,
}

impl UiStreamEvent {
    /// Frame the event as a server-sent event.
    pub fn to_frame(&self) -> serde_json::Result<String> {
        Ok(format!("data: {}\n\n", serde_json::to_string(self)?))
    }

    /// Decode the JSON payload of one `data:` line.
    pub fn from_data(data: &str) -> serde_json::Result<Self> {
        serde_json::from_str(data)
    }
}

/// `finishReason` value for a provider stop reason.
pub fn finish_reason(reason: StopReason) -> &'static str {
    match reason {
        StopReason::EndTurn => "stop",
        StopReason::MaxTokens => "length",
        StopReason::ContentFilter => "content-filter",
        StopReason::ToolUse => "tool-calls",
        StopReason::Other => "other",
    }
}
