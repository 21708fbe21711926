//! Durable local chat history.
//!
//! Threads, their append-only messages, and per-message summaries. The
//! [`ChatStore`] trait is what the chat session and title deriver write
//! through; [`SqliteChatStore`] is the on-disk implementation.

mod error;
mod migrations;
mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chat0_models::providers::{Content, Message, Role};

pub use error::StoreError;
pub use migrations::Migrator;
pub use sqlite::SqliteChatStore;

/// A conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A message as kept in local history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: Content,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a message with a fresh id, timestamped now.
    pub fn new(role: Role, content: impl Into<Content>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    /// The message as sent to the chat endpoint.
    pub fn to_request_message(&self) -> Message {
        Message {
            id: Some(self.id.clone()),
            role: self.role,
            content: self.content.clone(),
        }
    }
}

/// A short summary of one message, used as its navigator label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSummary {
    pub thread_id: String,
    pub message_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Local history operations used by the chat session.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Create an untitled thread.
    async fn create_thread(&self, id: &str) -> Result<(), StoreError>;

    /// Append a message to a thread.
    async fn create_message(&self, thread_id: &str, message: &ChatMessage) -> Result<(), StoreError>;

    /// Set a thread's title.
    async fn update_thread(&self, thread_id: &str, title: &str) -> Result<(), StoreError>;

    /// Record a summary for a message.
    async fn create_message_summary(
        &self,
        thread_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<(), StoreError>;

    async fn get_thread(&self, id: &str) -> Result<Option<Thread>, StoreError>;

    /// Messages of a thread in append order.
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ChatMessage>, StoreError>;

    async fn list_message_summaries(&self, thread_id: &str) -> Result<Vec<MessageSummary>, StoreError>;
}
