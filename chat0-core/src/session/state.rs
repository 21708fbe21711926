//! Session status, observer events and message accumulation

use serde::{Deserialize, Serialize};

use chat0_models::providers::{Content, ContentPart};

use crate::store::ChatMessage;

/// Status of a chat session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatStatus {
    /// Ready for input
    #[default]
    Idle,
    /// Request sent, nothing received yet
    Submitted,
    /// Receiving the assistant message
    Streaming,
    /// The last turn failed
    Error,
    /// The last turn completed
    Done,
}

impl ChatStatus {
    /// Whether a turn is in flight.
    pub fn is_active(self) -> bool {
        matches!(self, ChatStatus::Submitted | ChatStatus::Streaming)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChatStatus::Idle => "idle",
            ChatStatus::Submitted => "submitted",
            ChatStatus::Streaming => "streaming",
            ChatStatus::Error => "error",
            ChatStatus::Done => "done",
        }
    }
}

impl std::fmt::Display for ChatStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events published to session observers
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StatusChanged(ChatStatus),
    /// A message entered the in-memory list.
    MessageAppended(ChatMessage),
    TextDelta { message_id: String, delta: String },
    ReasoningDelta { message_id: String, delta: String },
    /// A message left the in-memory list (regenerate).
    MessageRemoved(String),
    /// The current turn failed with this message.
    Error(String),
    /// Transient, non-blocking notice.
    Notice(String),
    TitleUpdated(String),
}

/// Which channel a delta belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeltaKind {
    Text,
    Reasoning,
}

/// Append a delta to the trailing part of the same kind, or start a new part.
pub(crate) fn append_delta(content: &mut Content, kind: DeltaKind, delta: &str) {
    if let Content::Text(text) = content {
        let parts = if text.is_empty() {
            Vec::new()
        } else {
            vec![ContentPart::text(std::mem::take(text))]
        };
        *content = Content::Parts(parts);
    }
    let Content::Parts(parts) = content else {
        return;
    };

    match (parts.last_mut(), kind) {
        (Some(ContentPart::Text { text }), DeltaKind::Text)
        | (Some(ContentPart::Reasoning { text }), DeltaKind::Reasoning) => text.push_str(delta),
        (_, DeltaKind::Text) => parts.push(ContentPart::text(delta)),
        (_, DeltaKind::Reasoning) => parts.push(ContentPart::Reasoning {
            text: delta.to_string(),
        }),
    }
}
