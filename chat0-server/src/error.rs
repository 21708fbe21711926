//! Server error types

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Errors that can occur running the chat0 server
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to the specified address
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}

/// Errors returned to HTTP clients before a response stream opens
///
/// Each variant owns its status code and JSON body. Once streaming has begun,
/// failures travel in-band as `error` events instead.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request body")]
    InvalidBody,

    #[error("unknown model {0}")]
    UnknownModel(String),

    #[error("missing API key")]
    MissingCredential,

    #[error("malformed API key")]
    InvalidCredential,

    #[error("unsupported model provider")]
    UnsupportedProvider,

    /// Provider failed a non-streamed completion.
    #[error("upstream failure: {0}")]
    Upstream(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidBody | ApiError::UnknownModel(_) | ApiError::UnsupportedProvider => {
                StatusCode::BAD_REQUEST
            }
            ApiError::MissingCredential | ApiError::InvalidCredential => StatusCode::UNAUTHORIZED,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> serde_json::Value {
        match self {
            ApiError::InvalidBody => json!({"error": "Invalid request body"}),
            ApiError::UnknownModel(name) => {
                json!({"error": "Unknown or unsupported model", "received": name})
            }
            ApiError::MissingCredential => json!({"error": "API key not found"}),
            ApiError::InvalidCredential => json!({"error": "Invalid API key"}),
            ApiError::UnsupportedProvider => json!({"error": "Unsupported model provider"}),
            ApiError::Upstream(text) => json!({"error": text}),
            ApiError::Internal(_) => json!({"error": "Internal Server Error"}),
        }
    }
}

impl From<chat0_models::Error> for ApiError {
    fn from(err: chat0_models::Error) -> Self {
        use chat0_models::Error;

        match err {
            Error::ModelNotFound(name) => ApiError::UnknownModel(name),
            Error::UnsupportedProvider(_) => ApiError::UnsupportedProvider,
            Error::CredentialsNotFound(_) => ApiError::MissingCredential,
            Error::InvalidApiKey => ApiError::InvalidCredential,
            Error::ProviderApi(text) => ApiError::Upstream(text),
            Error::Request(text) => ApiError::Upstream(text),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            tracing::error!(error = %detail, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        (self.status(), Json(self.body())).into_response()
    }
}
