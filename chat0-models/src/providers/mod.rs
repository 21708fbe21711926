//! Provider transports and the types they share.
//!
//! Every supported provider is reached through a [`ChatModelHandle`]; callers
//! build one per request with [`build_handle`], normalize the conversation
//! with [`normalize_messages`], then stream or complete.
//!
//! # Example
//!
//! ```ignore
//! use chat0_models::providers::{build_handle, normalize_messages, ChatRequest, ProviderEndpoints};
//!
//! let handle = build_handle(descriptor, key, client, &ProviderEndpoints::default())?;
//! let messages = normalize_messages(messages, handle.kind());
//! let mut stream = handle.stream(ChatRequest::new(&descriptor.provider_model_id, messages)).await?;
//! ```

mod dispatch;
mod google;
mod normalize;
mod openai;
mod sse;
mod types;

use std::pin::Pin;

use serde_json::Value;
use tokio_stream::Stream;

pub use dispatch::{
    ChatModelHandle, DEFAULT_GOOGLE_BASE_URL, DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENROUTER_BASE_URL,
    ProviderEndpoints, build_handle,
};
pub use google::GoogleClient;
pub use normalize::normalize_messages;
pub use openai::OpenAiClient;
pub use sse::SseDecoder;
pub use types::*;

use crate::{Error, Result};

/// A stream of chat response chunks for streaming responses.
///
/// This is a pinned, boxed stream that yields [`StreamChunk`] items or errors.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>;

/// Human-readable text for an arbitrary error payload.
///
/// A string is used as is, an object with a textual `message` yields that
/// message, `null` yields `unknown error`, and anything else is rendered as
/// JSON.
///
/// ```
/// use chat0_models::providers::describe_error;
/// use serde_json::json;
///
/// assert_eq!(describe_error(&json!("boom")), "boom");
/// assert_eq!(describe_error(&json!({"message": "quota"})), "quota");
/// assert_eq!(describe_error(&json!(null)), "unknown error");
/// assert_eq!(describe_error(&json!({"code": 3})), r#"{"code":3}"#);
/// ```
pub fn describe_error(value: &Value) -> String {
    match value {
        Value::Null => "unknown error".to_string(),
        Value::String(s) => s.clone(),
        Value::Object(map) => match map.get("message") {
            Some(Value::String(message)) => message.clone(),
            _ => value.to_string(),
        },
        other => other.to_string(),
    }
}

/// Turn a non-2xx provider response into an error carrying status and detail.
pub(crate) async fn upstream_error(provider: &str, response: reqwest::Response) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail = match serde_json::from_str::<Value>(&body) {
        Ok(Value::Object(mut map)) if map.contains_key("error") => {
            describe_error(&map.remove("error").unwrap_or(Value::Null))
        }
        Ok(value @ Value::Object(_)) => describe_error(&value),
        _ => body,
    };
    Error::ProviderApi(format!("{provider} API returned {status}: {detail}"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn describe_error_handles_each_shape() {
        assert_eq!(describe_error(&json!("plain")), "plain");
        assert_eq!(describe_error(&json!({"message": "bad key", "code": 401})), "bad key");
        assert_eq!(describe_error(&Value::Null), "unknown error");
        assert_eq!(describe_error(&json!(42)), "42");
        assert_eq!(describe_error(&json!({"message": 7})), r#"{"message":7}"#);
        assert_eq!(describe_error(&json!([1, 2])), "[1,2]");
    }
}
