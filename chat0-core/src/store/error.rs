//! Store error types

use thiserror::Error;

/// Errors for local chat history operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}
