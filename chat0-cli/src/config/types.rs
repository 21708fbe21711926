use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use chat0_models::providers::{
    DEFAULT_GOOGLE_BASE_URL, DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENROUTER_BASE_URL,
    ProviderEndpoints,
};
use chat0_models::{ModelDescriptor, ModelRegistry};
use chat0_server::DEFAULT_SUMMARY_MODEL;

/// Default port for the chat0 server
pub const DEFAULT_PORT: u16 = 7743;
/// Default host for the chat0 server
pub const DEFAULT_HOST: &str = "127.0.0.1";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
const DEFAULT_SMOOTHING_DELAY_MS: u64 = 10;
const DEFAULT_CLIENT_MODEL: &str = "Gemini 2.5 Flash";

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawChat0Config {
    #[serde(default)]
    pub server: RawServerConfig,

    #[serde(default)]
    pub providers: RawProvidersConfig,

    #[serde(default)]
    pub summary: RawSummaryConfig,

    #[serde(default)]
    pub client: RawClientConfig,

    /// Extra model descriptors, added on top of the built-in catalog
    #[serde(default)]
    pub models: Vec<ModelDescriptor>,
}

/// Server config as stored in TOML (optional fields for proper merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub request_timeout_secs: Option<u64>,
    pub smoothing_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawProvidersConfig {
    pub google_base_url: Option<String>,
    pub openai_base_url: Option<String>,
    pub openrouter_base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawSummaryConfig {
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawClientConfig {
    pub server_url: Option<String>,
    pub model: Option<String>,
    pub database: Option<PathBuf>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Chat0Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub providers: ProvidersConfig,

    #[serde(default)]
    pub summary: SummaryConfig,

    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub models: Vec<ModelDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the gateway binds to
    pub host: String,

    /// Port for the chat0 server
    pub port: u16,

    /// Ceiling on one streamed response
    pub request_timeout_secs: u64,

    /// Pause between word-sized output increments
    pub smoothing_delay_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            smoothing_delay_ms: DEFAULT_SMOOTHING_DELAY_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvidersConfig {
    pub google_base_url: String,
    pub openai_base_url: String,
    pub openrouter_base_url: String,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            google_base_url: DEFAULT_GOOGLE_BASE_URL.to_string(),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            openrouter_base_url: DEFAULT_OPENROUTER_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryConfig {
    /// Display name of the model behind `/api/completion`
    pub model: String,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_SUMMARY_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the gateway `chat0 chat` talks to
    pub server_url: String,

    /// Model selected for new conversations
    pub model: String,

    /// Local conversation history
    pub database: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: format!("http://{DEFAULT_HOST}:{DEFAULT_PORT}"),
            model: DEFAULT_CLIENT_MODEL.to_string(),
            database: chat0_paths::database_path(),
        }
    }
}

impl Chat0Config {
    /// Built-in catalog plus configured models; configured entries win on name clashes
    pub fn registry(&self) -> ModelRegistry {
        ModelRegistry::builtin().with_models(self.models.iter().cloned())
    }

    pub fn endpoints(&self) -> ProviderEndpoints {
        ProviderEndpoints {
            google: self.providers.google_base_url.clone(),
            openai: self.providers.openai_base_url.clone(),
            openrouter: self.providers.openrouter_base_url.clone(),
        }
    }

    pub fn server_config(&self) -> chat0_server::ServerConfig {
        chat0_server::ServerConfig {
            host: self.server.host.clone(),
            port: self.server.port,
            request_timeout: Duration::from_secs(self.server.request_timeout_secs),
            smoothing_delay: Duration::from_millis(self.server.smoothing_delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_llama() -> ModelDescriptor {
        ModelDescriptor {
            display_name: "Local Llama".to_string(),
            provider: "openai".to_string(),
            provider_model_id: "llama-3.1-8b".to_string(),
            credential_header: String::new(),
            max_output_tokens: None,
        }
    }

    #[test]
    fn test_default_values() {
        let config = Chat0Config::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.server.request_timeout_secs, 60);
        assert_eq!(config.server.smoothing_delay_ms, 10);
        assert_eq!(config.summary.model, "Gemini 2.5 Flash");
        assert_eq!(config.client.server_url, "http://127.0.0.1:7743");
        assert_eq!(config.client.model, "Gemini 2.5 Flash");
        assert!(config.client.database.ends_with("chat0.db"));
        assert!(config.models.is_empty());
        assert_eq!(config.endpoints(), ProviderEndpoints::default());
    }

    #[test]
    fn test_server_config_conversion() {
        let mut config = Chat0Config::default();
        config.server.request_timeout_secs = 5;
        config.server.smoothing_delay_ms = 0;

        let server = config.server_config();
        assert_eq!(server.addr(), "127.0.0.1:7743");
        assert_eq!(server.request_timeout, Duration::from_secs(5));
        assert!(server.smoothing_delay.is_zero());
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = Chat0Config::default();
        config.server.port = 8080;
        config.client.model = "Grok-4".to_string();
        config.models.push(local_llama());

        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Chat0Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.server.port, 8080);
        assert_eq!(parsed.client.model, "Grok-4");
        assert_eq!(parsed.models, config.models);
    }

    #[test]
    fn test_raw_config_partial_parsing() {
        let toml_str = r#"
[server]
port = 9000

[[models]]
name = "Local Llama"
provider = "openai"
model_id = "llama-3.1-8b"
"#;
        let raw: RawChat0Config = toml::from_str(toml_str).unwrap();

        // Only port was set in [server]
        assert_eq!(raw.server.port, Some(9000));
        assert!(raw.server.host.is_none());
        assert!(raw.summary.model.is_none());
        assert_eq!(raw.models, vec![local_llama()]);
    }

    #[test]
    fn test_raw_config_empty_uses_none() {
        let raw: RawChat0Config = toml::from_str("").unwrap();

        assert!(raw.server.port.is_none());
        assert!(raw.providers.google_base_url.is_none());
        assert!(raw.client.database.is_none());
        assert!(raw.models.is_empty());
    }

    #[test]
    fn test_configured_models_extend_registry() {
        let mut config = Chat0Config::default();
        config.models.push(local_llama());

        let registry = config.registry();
        assert_eq!(registry.len(), 17);
        let local = registry.resolve("Local Llama").unwrap();
        assert_eq!(local.credential_header, "X-OpenAI-API-Key");
    }
}
