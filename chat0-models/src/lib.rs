//! Model management for chat0.
//!
//! This crate provides:
//! - Model registry mapping display names to provider descriptors
//! - Credential sources for per-provider API keys
//! - Message normalization and provider dispatch
//! - Streaming transports for Google, OpenAI and OpenRouter
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   ModelRegistry                     │
//! │          display name  ──►  ModelDescriptor         │
//! └─────────────────────────────────────────────────────┘
//!                          │ build_handle
//!                          ▼
//! ┌─────────────────────────────────────────────────────┐
//! │                  ChatModelHandle                    │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐  │
//! │  │   Google    │  │   OpenAI    │  │ OpenRouter  │  │
//! │  │   (SSE)     │  │   (SSE)     │  │   (SSE)     │  │
//! │  └─────────────┘  └─────────────┘  └─────────────┘  │
//! └─────────────────────────────────────────────────────┘
//! ```

mod error;
mod types;

pub mod auth;
pub mod providers;
pub mod registry;

pub use error::{Error, Result};
pub use registry::ModelRegistry;
pub use types::{ModelDescriptor, ProviderKind};
