//! Client side of the chat0 HTTP API.
//!
//! [`ChatTransport`] opens the streaming chat endpoint and yields decoded
//! [`UiStreamEvent`]s; [`CompletionTransport`] performs the one-shot summary
//! call. [`HttpTransport`] implements both over reqwest and [`MockTransport`]
//! replays scripted responses for tests.

mod http;
mod mock;

use std::pin::Pin;

use async_trait::async_trait;
use thiserror::Error;
use tokio_stream::Stream;

use crate::protocol::{ChatApiRequest, SummaryRequest, UiStreamEvent};

pub use http::HttpTransport;
pub use mock::{MockChat, MockTransport, text_response};

/// Decoded events of one chat response.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<UiStreamEvent, TransportError>> + Send>>;

/// A request header carrying a provider credential.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialHeader {
    pub name: String,
    pub value: String,
}

impl CredentialHeader {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl std::fmt::Debug for CredentialHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialHeader")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Errors from talking to the chat0 server
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Stream interrupted: {0}")]
    Stream(String),

    #[error("Malformed event: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Opens streaming chat responses.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Post the conversation and return the response event stream.
    async fn open(
        &self,
        request: ChatApiRequest,
        credential: Option<CredentialHeader>,
    ) -> Result<EventStream, TransportError>;
}

/// Performs one-shot summary completions.
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    /// Post a summary request and return the generated text.
    async fn complete(
        &self,
        request: SummaryRequest,
        credential: Option<CredentialHeader>,
    ) -> Result<String, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_header_debug_is_redacted() {
        let header = CredentialHeader::new("X-Google-API-Key", "AIza-secret");
        let debug = format!("{header:?}");
        assert!(debug.contains("X-Google-API-Key"));
        assert!(!debug.contains("AIza-secret"));
    }

    #[test]
    fn rejected_display_includes_status() {
        let err = TransportError::Rejected {
            status: 401,
            message: "API key not found".into(),
        };
        assert_eq!(err.to_string(), "Request rejected (401): API key not found");
    }
}
