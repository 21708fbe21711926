//! Per-provider filtering of user message parts.
//!
//! Providers reject parts they cannot ingest, so unsupported parts are
//! dropped before dispatch instead of failing the whole request.

use tracing::{debug, warn};

use super::{Content, ContentPart, Message, Role};
use crate::ProviderKind;

/// Drop user-message parts the target provider cannot accept.
///
/// Plain-string content and non-user messages pass through unchanged. Kept
/// parts keep their order, and normalizing twice gives the same result.
pub fn normalize_messages(messages: Vec<Message>, provider: ProviderKind) -> Vec<Message> {
    messages
        .into_iter()
        .map(|message| normalize_message(message, provider))
        .collect()
}

fn normalize_message(mut message: Message, provider: ProviderKind) -> Message {
    if message.role != Role::User {
        return message;
    }
    if let Content::Parts(parts) = message.content {
        message.content = Content::Parts(
            parts
                .into_iter()
                .filter(|part| keep_part(part, provider))
                .collect(),
        );
    }
    message
}

fn keep_part(part: &ContentPart, provider: ProviderKind) -> bool {
    match part {
        ContentPart::Text { .. } => true,
        ContentPart::ImageRef { url } => {
            if url.is_empty() {
                debug!(%provider, "dropping image part with empty url");
            }
            !url.is_empty()
        }
        ContentPart::InlineAudio { data, .. } => {
            if !provider.accepts_inline_audio() {
                debug!(%provider, "dropping audio part, provider does not accept inline audio");
                false
            } else if data.is_empty() {
                debug!(%provider, "dropping audio part with empty payload");
                false
            } else {
                true
            }
        }
        ContentPart::Reasoning { .. } => {
            debug!(%provider, "dropping reasoning part from user message");
            false
        }
        ContentPart::Unknown(raw) => {
            warn!(%provider, part = %raw, "dropping unrecognized content part");
            false
        }
    }
}
