//! Core types for model management.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// The closed set of upstream providers a descriptor may name.
///
/// # Examples
///
/// ```
/// use chat0_models::ProviderKind;
///
/// let kind: ProviderKind = "openrouter".parse().unwrap();
/// assert_eq!(kind, ProviderKind::OpenRouter);
/// assert_eq!(kind.as_str(), "openrouter");
/// assert!("anthropic".parse::<ProviderKind>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Google Gemini (`generativelanguage.googleapis.com`).
    Google,
    /// OpenAI chat completions.
    #[serde(rename = "openai")]
    OpenAi,
    /// OpenRouter, OpenAI-compatible proxy for many vendors.
    #[serde(rename = "openrouter")]
    OpenRouter,
}

impl ProviderKind {
    /// All known providers, in catalog order.
    pub const ALL: [ProviderKind; 3] = [Self::Google, Self::OpenAi, Self::OpenRouter];

    /// Provider identifier as it appears in descriptors and configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::OpenAi => "openai",
            Self::OpenRouter => "openrouter",
        }
    }

    /// Request header a client uses to send this provider's key.
    pub fn default_credential_header(&self) -> &'static str {
        match self {
            Self::Google => "X-Google-API-Key",
            Self::OpenAi => "X-OpenAI-API-Key",
            Self::OpenRouter => "X-OpenRouter-API-Key",
        }
    }

    /// Environment variable consulted by [`EnvCredentials`](crate::auth::EnvCredentials).
    pub fn env_var(&self) -> &'static str {
        match self {
            Self::Google => "GOOGLE_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
            Self::OpenRouter => "OPENROUTER_API_KEY",
        }
    }

    /// Whether user messages may carry inline audio parts.
    pub fn accepts_inline_audio(&self) -> bool {
        matches!(self, Self::OpenRouter)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(Self::Google),
            "openai" => Ok(Self::OpenAi),
            "openrouter" => Ok(Self::OpenRouter),
            other => Err(Error::UnsupportedProvider(other.to_string())),
        }
    }
}

/// A selectable model, keyed by its display name.
///
/// The provider is kept as a plain string so that configuration may name
/// providers this build has no transport for; those fail at dispatch time
/// with [`Error::UnsupportedProvider`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Human-readable name, unique within a registry.
    #[serde(rename = "name")]
    pub display_name: String,
    /// Provider identifier (`google`, `openai`, `openrouter`).
    pub provider: String,
    /// Model identifier sent upstream.
    #[serde(rename = "model_id")]
    pub provider_model_id: String,
    /// Request header carrying the caller's key for this model.
    #[serde(default)]
    pub credential_header: String,
    /// Output token cap forwarded to the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

impl ModelDescriptor {
    /// Create a descriptor using the provider's default credential header.
    pub fn new(display_name: &str, provider: ProviderKind, provider_model_id: &str) -> Self {
        Self {
            display_name: display_name.to_string(),
            provider: provider.as_str().to_string(),
            provider_model_id: provider_model_id.to_string(),
            credential_header: provider.default_credential_header().to_string(),
            max_output_tokens: None,
        }
    }

    /// Set the output token cap.
    pub fn max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    /// Override the credential header.
    pub fn credential_header(mut self, header: &str) -> Self {
        self.credential_header = header.to_string();
        self
    }

    /// Parse the provider string.
    pub fn provider_kind(&self) -> crate::Result<ProviderKind> {
        self.provider.parse()
    }
}
