//! chat0-core: client-side core for the chat0 gateway
//!
//! This crate provides the pieces a chat client is built from:
//!
//! - **Wire protocol** - [`protocol`] request bodies and the UI message stream events
//! - **Transport** - [`transport::HttpTransport`] talks to a running server,
//!   [`transport::MockTransport`] replays scripted responses
//! - **Chat session** - [`ChatSession`] keeps one thread's messages and streams replies
//! - **Titles** - [`title::TitleDeriver`] names new threads, with a local fallback
//! - **Store** - [`store::SqliteChatStore`] keeps threads, messages and summaries
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use chat0_core::store::SqliteChatStore;
//! use chat0_core::title::TitleDeriver;
//! use chat0_core::transport::HttpTransport;
//! use chat0_core::{ChatSession, SessionDeps};
//! use chat0_models::ModelRegistry;
//! use chat0_models::auth::EnvCredentials;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(SqliteChatStore::open("chat0.db")?);
//!     let transport = Arc::new(HttpTransport::new("http://127.0.0.1:7743"));
//!     let registry = Arc::new(ModelRegistry::builtin());
//!     let summary_model = registry.resolve("Gemini 2.5 Flash")?.clone();
//!
//!     let deps = SessionDeps {
//!         store: store.clone(),
//!         chat: transport.clone(),
//!         titles: TitleDeriver::new(transport, store, Arc::new(EnvCredentials), summary_model),
//!         credentials: Arc::new(EnvCredentials),
//!         registry,
//!     };
//!     let session = ChatSession::open("thread-1", "GPT-4o", deps).await?;
//!     session.send("Plan my trip to Kyoto").await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────┐
//! │                    ChatSession                     │
//! │  ┌──────────────┐ ┌────────────────┐ ┌───────────┐ │
//! │  │ ChatTransport│ │  TitleDeriver  │ │ ChatStore │ │
//! │  │  /api/chat   │ │ /api/completion│ │  SQLite   │ │
//! │  └──────────────┘ └────────────────┘ └───────────┘ │
//! └────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod protocol;
pub mod session;
pub mod store;
pub mod title;
pub mod transport;

// Re-export key types for convenience
pub use error::SessionError;
pub use protocol::{ChatApiRequest, SummaryRequest, UiStreamEvent};
pub use session::{ChatSession, ChatStatus, SessionDeps, SessionEvent, TurnOutcome};
pub use store::{ChatMessage, ChatStore, SqliteChatStore, StoreError, Thread};
pub use title::{TitleDeriver, TitleOutcome, fallback_title};
pub use transport::{
    ChatTransport, CompletionTransport, CredentialHeader, HttpTransport, TransportError,
};
