//! reqwest-backed transport for a running chat0 server.

use async_stream::try_stream;
use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use serde_json::Value;
use tracing::{debug, trace};

use chat0_models::providers::{SseDecoder, describe_error};

use super::{ChatTransport, CompletionTransport, CredentialHeader, EventStream, TransportError};
use crate::protocol::{ChatApiRequest, SummaryRequest, UiStreamEvent};

/// Talks to `{base_url}/api/chat` and `{base_url}/api/completion`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<T: serde::Serialize>(
        &self,
        path: &str,
        body: &T,
        credential: Option<CredentialHeader>,
    ) -> Result<reqwest::Response, TransportError> {
        let mut request = self.client.post(format!("{}{}", self.base_url, path)).json(body);
        if let Some(header) = credential {
            request = request.header(header.name, header.value);
        }
        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(rejection(response).await)
        }
    }
}

/// Build a `Rejected` error from an `{"error": ...}` body, falling back to raw text.
async fn rejection(response: reqwest::Response) -> TransportError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<Value>(&body) {
        Ok(Value::Object(map)) if map.contains_key("error") => {
            describe_error(map.get("error").unwrap_or(&Value::Null))
        }
        _ if body.is_empty() => format!("HTTP {status}"),
        _ => body,
    };
    TransportError::Rejected { status, message }
}

/// Decode a response body into UI stream events.
fn ui_events(
    response: reqwest::Response,
) -> impl Stream<Item = Result<UiStreamEvent, TransportError>> + Send {
    try_stream! {
        let mut body = response.bytes_stream();
        let mut decoder = SseDecoder::new();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| TransportError::Stream(e.to_string()))?;
            for data in decoder.push(&chunk) {
                trace!(data = %data, "ui stream event");
                yield UiStreamEvent::from_data(&data)?;
            }
            if decoder.is_done() {
                break;
            }
        }
        for data in decoder.finish() {
            yield UiStreamEvent::from_data(&data)?;
        }
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn open(
        &self,
        request: ChatApiRequest,
        credential: Option<CredentialHeader>,
    ) -> Result<EventStream, TransportError> {
        debug!(model = %request.model, messages = request.messages.len(), "opening chat stream");
        let response = self.post("/api/chat", &request, credential).await?;

        Ok(Box::pin(ui_events(response)))
    }
}

#[async_trait]
impl CompletionTransport for HttpTransport {
    async fn complete(
        &self,
        request: SummaryRequest,
        credential: Option<CredentialHeader>,
    ) -> Result<String, TransportError> {
        debug!(thread_id = %request.thread_id, is_title = request.is_title, "requesting summary");
        let response = self.post("/api/completion", &request, credential).await?;
        response
            .text()
            .await
            .map_err(|e| TransportError::Stream(e.to_string()))
    }
}
