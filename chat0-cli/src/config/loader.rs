use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use super::types::{
    Chat0Config, ClientConfig, ProvidersConfig, RawChat0Config, RawClientConfig,
    RawProvidersConfig, RawServerConfig, RawSummaryConfig, ServerConfig, SummaryConfig,
};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<Chat0Config> {
        let user_path = Self::user_config_path();
        let project_path = Self::project_config_path();
        Self::load_layers(&[user_path.as_path(), project_path.as_path()])
    }

    /// Merge the files in order; missing files are skipped
    pub fn load_layers(paths: &[&Path]) -> Result<Chat0Config> {
        let mut raw = RawChat0Config::default();
        for path in paths {
            if let Some(layer) = Self::read_layer(path)? {
                raw = Self::merge_raw(raw, layer);
            }
        }
        Ok(Self::finalize(raw))
    }

    fn read_layer(path: &Path) -> Result<Option<RawChat0Config>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let layer = toml::from_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        debug!(path = %path.display(), "loaded config layer");
        Ok(Some(layer))
    }

    /// Get user config path (`$XDG_CONFIG_HOME/chat0/config.toml`)
    pub fn user_config_path() -> PathBuf {
        chat0_paths::config_file()
    }

    /// Get project config path
    /// Can be overridden with CHAT0_PROJECT_CONFIG_DIR env var (useful for isolated tests)
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("CHAT0_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".chat0/config.toml")
        }
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawChat0Config, overlay: RawChat0Config) -> RawChat0Config {
        RawChat0Config {
            server: RawServerConfig {
                host: overlay.server.host.or(base.server.host),
                port: overlay.server.port.or(base.server.port),
                request_timeout_secs: overlay
                    .server
                    .request_timeout_secs
                    .or(base.server.request_timeout_secs),
                smoothing_delay_ms: overlay
                    .server
                    .smoothing_delay_ms
                    .or(base.server.smoothing_delay_ms),
            },
            providers: RawProvidersConfig {
                google_base_url: overlay
                    .providers
                    .google_base_url
                    .or(base.providers.google_base_url),
                openai_base_url: overlay
                    .providers
                    .openai_base_url
                    .or(base.providers.openai_base_url),
                openrouter_base_url: overlay
                    .providers
                    .openrouter_base_url
                    .or(base.providers.openrouter_base_url),
            },
            summary: RawSummaryConfig {
                model: overlay.summary.model.or(base.summary.model),
            },
            client: RawClientConfig {
                server_url: overlay.client.server_url.or(base.client.server_url),
                model: overlay.client.model.or(base.client.model),
                database: overlay.client.database.or(base.client.database),
            },
            // Later layers are inserted last, so they replace same-named entries
            models: base.models.into_iter().chain(overlay.models).collect(),
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawChat0Config) -> Chat0Config {
        let server = ServerConfig::default();
        let providers = ProvidersConfig::default();
        let summary = SummaryConfig::default();
        let client = ClientConfig::default();

        Chat0Config {
            server: ServerConfig {
                host: raw.server.host.unwrap_or(server.host),
                port: raw.server.port.unwrap_or(server.port),
                request_timeout_secs: raw
                    .server
                    .request_timeout_secs
                    .unwrap_or(server.request_timeout_secs),
                smoothing_delay_ms: raw
                    .server
                    .smoothing_delay_ms
                    .unwrap_or(server.smoothing_delay_ms),
            },
            providers: ProvidersConfig {
                google_base_url: raw
                    .providers
                    .google_base_url
                    .unwrap_or(providers.google_base_url),
                openai_base_url: raw
                    .providers
                    .openai_base_url
                    .unwrap_or(providers.openai_base_url),
                openrouter_base_url: raw
                    .providers
                    .openrouter_base_url
                    .unwrap_or(providers.openrouter_base_url),
            },
            summary: SummaryConfig {
                model: raw.summary.model.unwrap_or(summary.model),
            },
            client: ClientConfig {
                server_url: raw.client.server_url.unwrap_or(client.server_url),
                model: raw.client.model.unwrap_or(client.model),
                database: raw.client.database.unwrap_or(client.database),
            },
            models: raw.models,
        }
    }
}
