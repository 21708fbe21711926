//! Credential sources for provider API keys.
//!
//! Keys are supplied by the caller per request and never written to disk.
//! A [`CredentialSource`] answers "which key do I send for this provider",
//! from memory ([`StaticCredentials`]) or from the process environment
//! ([`EnvCredentials`]).
//!
//! # Example
//!
//! ```
//! use chat0_models::auth::{CredentialSource, StaticCredentials};
//!
//! let creds = StaticCredentials::new().with_key("google", "AIza-test");
//! assert_eq!(creds.get_key("google").unwrap().expose_secret(), "AIza-test");
//! assert!(creds.get_key("openai").is_none());
//! ```

use std::collections::HashMap;
use std::env;

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::ProviderKind;

/// A secure API key that prevents accidental logging.
///
/// The key is wrapped in `SecretString` which:
/// - Implements `Debug` as `"[REDACTED]"`
/// - Zeroizes memory on drop
/// - Requires explicit `.expose_secret()` to access the value
#[derive(Clone)]
pub struct ApiKey(SecretString);

impl ApiKey {
    /// Create a new API key from a string.
    pub fn new(key: impl Into<String>) -> Self {
        Self(SecretString::from(key.into()))
    }

    /// Expose the secret key value.
    ///
    /// Use sparingly - only when actually sending to an API.
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }

    /// Whether the key is empty or whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.expose_secret().trim().is_empty()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ApiKey([REDACTED])")
    }
}

impl From<String> for ApiKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for ApiKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Looks up the key to send for a provider.
pub trait CredentialSource: Send + Sync {
    /// Returns the key for `provider` (`google`, `openai`, `openrouter`), if any.
    fn get_key(&self, provider: &str) -> Option<ApiKey>;
}

/// In-memory keys, typically entered by the user for this session.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    keys: HashMap<String, ApiKey>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key for a provider.
    pub fn with_key(mut self, provider: &str, key: impl Into<ApiKey>) -> Self {
        self.set(provider, key);
        self
    }

    /// Set or replace a key.
    pub fn set(&mut self, provider: &str, key: impl Into<ApiKey>) {
        self.keys.insert(provider.to_string(), key.into());
    }
}

impl CredentialSource for StaticCredentials {
    fn get_key(&self, provider: &str) -> Option<ApiKey> {
        self.keys.get(provider).filter(|k| !k.is_blank()).cloned()
    }
}

/// Keys read from `GOOGLE_API_KEY`, `OPENAI_API_KEY` and `OPENROUTER_API_KEY`.
///
/// The environment is read on every lookup; unset or empty variables yield
/// no key.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentials;

impl EnvCredentials {
    /// Providers that currently have a non-empty variable set.
    pub fn available(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .into_iter()
            .filter(|kind| self.get_key(kind.as_str()).is_some())
            .collect()
    }
}

impl CredentialSource for EnvCredentials {
    fn get_key(&self, provider: &str) -> Option<ApiKey> {
        let kind: ProviderKind = provider.parse().ok()?;
        let value = env::var(kind.env_var()).ok()?;
        if value.trim().is_empty() {
            return None;
        }
        debug!(provider, "retrieved API key from environment");
        Some(ApiKey::new(value))
    }
}
