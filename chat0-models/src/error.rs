//! Error types for model management.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during model operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Display name not present in the registry.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// Descriptor names a provider with no transport.
    #[error("unsupported model provider: {0}")]
    UnsupportedProvider(String),

    /// Credentials not found for provider.
    #[error("credentials not found for provider: {0}")]
    CredentialsNotFound(String),

    /// API key contains bytes that cannot be sent in a header.
    #[error("invalid API key format")]
    InvalidApiKey,

    /// Provider answered with an error status or an in-stream error payload.
    #[error("provider API error: {0}")]
    ProviderApi(String),

    /// Request failed.
    #[error("request failed: {0}")]
    Request(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formats_correctly() {
        let err = Error::ModelNotFound("Foo Model".to_string());
        assert_eq!(err.to_string(), "model not found: Foo Model");

        let err = Error::UnsupportedProvider("anthropic".to_string());
        assert_eq!(err.to_string(), "unsupported model provider: anthropic");
    }

    #[test]
    fn error_from_serde_json() {
        let json_err: serde_json::Error = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
