//! Selection of the provider transport for a model descriptor.

use futures_util::StreamExt;
use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ChatRequest, ChatResponse, ChatStream, Content, GoogleClient, OpenAiClient, Usage};
use crate::auth::ApiKey;
use crate::{Error, ModelDescriptor, ProviderKind, Result};

/// Default Gemini API base URL.
pub const DEFAULT_GOOGLE_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Default OpenAI API base URL.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
/// Default OpenRouter API base URL.
pub const DEFAULT_OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Base URLs for each provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderEndpoints {
    pub google: String,
    pub openai: String,
    pub openrouter: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            google: DEFAULT_GOOGLE_BASE_URL.to_string(),
            openai: DEFAULT_OPENAI_BASE_URL.to_string(),
            openrouter: DEFAULT_OPENROUTER_BASE_URL.to_string(),
        }
    }
}

impl ProviderEndpoints {
    /// Point every provider at the same base URL.
    pub fn all(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            google: base_url.clone(),
            openai: base_url.clone(),
            openrouter: base_url,
        }
    }

    /// Base URL for a provider.
    pub fn base_url(&self, kind: ProviderKind) -> &str {
        match kind {
            ProviderKind::Google => &self.google,
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::OpenRouter => &self.openrouter,
        }
    }
}

/// A ready-to-call model bound to one provider and credential.
#[derive(Debug, Clone)]
pub enum ChatModelHandle {
    Google(GoogleClient),
    OpenAi(OpenAiClient),
    OpenRouter(OpenAiClient),
}

/// Build the transport for `descriptor`.
///
/// # Errors
///
/// - `Error::UnsupportedProvider` if the descriptor names an unknown provider
/// - `Error::InvalidApiKey` if the key cannot be sent as a header value
pub fn build_handle(
    descriptor: &ModelDescriptor,
    credential: ApiKey,
    client: reqwest::Client,
    endpoints: &ProviderEndpoints,
) -> Result<ChatModelHandle> {
    let kind = descriptor.provider_kind()?;
    HeaderValue::from_str(credential.expose_secret()).map_err(|_| Error::InvalidApiKey)?;

    let base_url = endpoints.base_url(kind);
    debug!(model = %descriptor.display_name, provider = %kind, "dispatching");

    Ok(match kind {
        ProviderKind::Google => ChatModelHandle::Google(GoogleClient::new(client, base_url, credential)),
        ProviderKind::OpenAi => {
            ChatModelHandle::OpenAi(OpenAiClient::new(client, base_url, credential, kind))
        }
        ProviderKind::OpenRouter => {
            ChatModelHandle::OpenRouter(OpenAiClient::new(client, base_url, credential, kind))
        }
    })
}

impl ChatModelHandle {
    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::Google(_) => ProviderKind::Google,
            Self::OpenAi(_) => ProviderKind::OpenAi,
            Self::OpenRouter(_) => ProviderKind::OpenRouter,
        }
    }

    /// Open a streaming completion.
    pub async fn stream(&self, request: ChatRequest) -> Result<ChatStream> {
        match self {
            Self::Google(client) => client.stream(request).await,
            Self::OpenAi(client) | Self::OpenRouter(client) => client.stream(request).await,
        }
    }

    /// Run a completion to the end and return the collected text.
    pub async fn complete(&self, request: ChatRequest) -> Result<ChatResponse> {
        let mut stream = self.stream(request).await?;
        let mut text = String::new();
        let mut stop_reason = None;
        let mut usage = Usage::default();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if let Some(delta) = chunk.delta {
                text.push_str(&delta);
            }
            if chunk.stop_reason.is_some() {
                stop_reason = chunk.stop_reason;
            }
            if let Some(u) = chunk.usage {
                usage = u;
            }
        }

        Ok(ChatResponse {
            content: Content::Text(text),
            stop_reason,
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(provider: &str) -> ModelDescriptor {
        let mut d = ModelDescriptor::new("Test", ProviderKind::Google, "m");
        d.provider = provider.to_string();
        d
    }

    #[test]
    fn builds_one_handle_per_provider() {
        let endpoints = ProviderEndpoints::default();
        for kind in ProviderKind::ALL {
            let handle = build_handle(
                &descriptor(kind.as_str()),
                ApiKey::new("k"),
                reqwest::Client::new(),
                &endpoints,
            )
            .unwrap();
            assert_eq!(handle.kind(), kind);
        }
    }

    #[test]
    fn unknown_provider_is_unsupported() {
        let err = build_handle(
            &descriptor("mistral"),
            ApiKey::new("k"),
            reqwest::Client::new(),
            &ProviderEndpoints::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnsupportedProvider(p) if p == "mistral"));
    }

    #[test]
    fn key_with_newline_is_rejected() {
        let err = build_handle(
            &descriptor("openai"),
            ApiKey::new("bad\nkey"),
            reqwest::Client::new(),
            &ProviderEndpoints::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidApiKey));
    }

    #[test]
    fn handles_use_configured_base_urls() {
        let endpoints = ProviderEndpoints {
            openrouter: "http://127.0.0.1:9/v1/".to_string(),
            ..Default::default()
        };
        let handle = build_handle(
            &descriptor("openrouter"),
            ApiKey::new("k"),
            reqwest::Client::new(),
            &endpoints,
        )
        .unwrap();
        let ChatModelHandle::OpenRouter(client) = handle else {
            panic!("expected openrouter handle");
        };
        assert_eq!(client.base_url(), "http://127.0.0.1:9/v1");
    }

    #[test]
    fn default_endpoints() {
        let endpoints = ProviderEndpoints::default();
        assert_eq!(endpoints.base_url(ProviderKind::Google), DEFAULT_GOOGLE_BASE_URL);
        assert_eq!(endpoints.base_url(ProviderKind::OpenAi), DEFAULT_OPENAI_BASE_URL);
        assert_eq!(endpoints.base_url(ProviderKind::OpenRouter), DEFAULT_OPENROUTER_BASE_URL);
    }
}
