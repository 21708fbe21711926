//! Error types for chat0-core

use thiserror::Error;

use crate::store::StoreError;
use crate::transport::TransportError;

/// Errors returned by [`crate::session::ChatSession`] operations
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("A response is already in progress")]
    Busy,

    #[error("No assistant message to regenerate")]
    NothingToRegenerate,

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// In-band error event from the server.
    #[error("Stream error: {0}")]
    Stream(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_converts() {
        let err: SessionError = TransportError::Connect("refused".into()).into();
        assert!(matches!(err, SessionError::Transport(_)));
        assert_eq!(err.to_string(), "Transport error: Connection failed: refused");
    }

    #[test]
    fn store_error_converts() {
        let err: SessionError = StoreError::ThreadNotFound("t1".into()).into();
        assert!(matches!(err, SessionError::Store(_)));
    }
}
