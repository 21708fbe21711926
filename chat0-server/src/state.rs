//! Shared application state for the chat0 server

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use chat0_models::auth::ApiKey;
use chat0_models::providers::{ChatModelHandle, ProviderEndpoints, build_handle};
use chat0_models::{ModelDescriptor, ModelRegistry};

use crate::error::ApiError;

/// Default model used for `/api/completion`.
pub const DEFAULT_SUMMARY_MODEL: &str = "Gemini 2.5 Flash";

/// Shared application state accessible by all handlers
#[derive(Clone)]
pub struct AppState {
    /// Display name to provider mapping
    pub registry: Arc<ModelRegistry>,
    /// Base URL per provider
    pub endpoints: ProviderEndpoints,
    /// HTTP client shared by every provider call
    pub client: reqwest::Client,
    /// Model that writes titles and summaries
    pub summary_model: String,
    /// Ceiling on the duration of one streamed response
    pub request_timeout: Duration,
    /// Pause between word-sized output increments
    pub smoothing_delay: Duration,
    /// Cancelled when the server shuts down
    pub shutdown: CancellationToken,
    /// Tracks response pumps so shutdown can wait for them
    pub tasks: TaskTracker,
    /// When the server started
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create state over a registry with default endpoints and limits
    pub fn new(registry: ModelRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            endpoints: ProviderEndpoints::default(),
            client: reqwest::Client::new(),
            summary_model: DEFAULT_SUMMARY_MODEL.to_string(),
            request_timeout: Duration::from_secs(60),
            smoothing_delay: Duration::from_millis(10),
            shutdown: CancellationToken::new(),
            tasks: TaskTracker::new(),
            started_at: Utc::now(),
        }
    }

    pub fn with_endpoints(mut self, endpoints: ProviderEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_summary_model(mut self, name: impl Into<String>) -> Self {
        self.summary_model = name.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_smoothing_delay(mut self, delay: Duration) -> Self {
        self.smoothing_delay = delay;
        self
    }

    /// Returns how long the server has been running
    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }

    /// Resolve a model and build its provider handle from the request headers.
    ///
    /// A descriptor naming an unknown provider is rejected first. The
    /// credential is read from the descriptor's header; an absent or empty
    /// value fails before any provider is contacted.
    pub fn dispatch(
        &self,
        model: &str,
        headers: &HeaderMap,
    ) -> Result<(ModelDescriptor, ChatModelHandle), ApiError> {
        let descriptor = self.registry.resolve(model)?.clone();
        descriptor.provider_kind()?;

        let key = headers
            .get(descriptor.credential_header.as_str())
            .map(|value| value.to_str().map_err(|_| ApiError::InvalidCredential))
            .transpose()?
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(ApiError::MissingCredential)?;

        let handle = build_handle(
            &descriptor,
            ApiKey::new(key),
            self.client.clone(),
            &self.endpoints,
        )?;
        Ok((descriptor, handle))
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(ModelRegistry::builtin())
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;
    use chat0_models::ProviderKind;

    use super::*;

    #[test]
    fn test_app_state_new() {
        let state = AppState::default();
        assert!(state.uptime_seconds() >= 0);
        assert_eq!(state.summary_model, DEFAULT_SUMMARY_MODEL);
        assert_eq!(state.request_timeout, Duration::from_secs(60));
    }

    #[test]
    fn dispatch_unknown_model() {
        let state = AppState::default();
        let err = state.dispatch("Foo Model", &HeaderMap::new()).unwrap_err();
        assert!(matches!(err, ApiError::UnknownModel(name) if name == "Foo Model"));
    }

    #[test]
    fn dispatch_requires_non_empty_credential() {
        let state = AppState::default();
        assert!(matches!(
            state.dispatch("GPT-4o", &HeaderMap::new()),
            Err(ApiError::MissingCredential)
        ));

        let mut headers = HeaderMap::new();
        headers.insert("x-openai-api-key", HeaderValue::from_static(""));
        assert!(matches!(
            state.dispatch("GPT-4o", &headers),
            Err(ApiError::MissingCredential)
        ));
    }

    #[test]
    fn dispatch_reads_descriptor_header() {
        let state = AppState::default();
        let mut headers = HeaderMap::new();
        headers.insert("x-openrouter-api-key", HeaderValue::from_static("or-key"));

        let (descriptor, handle) = state.dispatch("Grok-4", &headers).unwrap();
        assert_eq!(descriptor.provider_model_id, "x-ai/grok-4");
        assert_eq!(handle.kind(), ProviderKind::OpenRouter);

        // A key for another provider does not count.
        assert!(matches!(
            state.dispatch("GPT-4o", &headers),
            Err(ApiError::MissingCredential)
        ));
    }

    #[test]
    fn dispatch_unsupported_provider_is_client_error() {
        let registry = ModelRegistry::new().with_models([ModelDescriptor {
            display_name: "Local".into(),
            provider: "ollama".into(),
            provider_model_id: "llama3".into(),
            credential_header: "X-Local-Key".into(),
            max_output_tokens: None,
        }]);
        let state = AppState::new(registry);
        let mut headers = HeaderMap::new();
        headers.insert("x-local-key", HeaderValue::from_static("k"));

        assert!(matches!(
            state.dispatch("Local", &headers),
            Err(ApiError::UnsupportedProvider)
        ));
    }

    #[test]
    fn dispatch_unknown_provider_without_header_is_client_error() {
        let registry = ModelRegistry::new().with_models([ModelDescriptor {
            display_name: "Local".into(),
            provider: "ollama".into(),
            provider_model_id: "llama3".into(),
            credential_header: String::new(),
            max_output_tokens: None,
        }]);
        let state = AppState::new(registry);

        let err = state.dispatch("Local", &HeaderMap::new()).unwrap_err();
        assert!(matches!(err, ApiError::UnsupportedProvider));
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }
}
