//! Model registry for resolving display names to descriptors.
//!
//! The registry is built once at startup from the built-in catalog plus any
//! descriptors from configuration, then shared read-only.

use tracing::debug;

use crate::{Error, ModelDescriptor, ProviderKind, Result};

/// Catalog of selectable models in insertion order.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: Vec<ModelDescriptor>,
}

impl ModelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in catalog.
    pub fn builtin() -> Self {
        Self {
            models: builtin_models(),
        }
    }

    /// Add descriptors, replacing any existing entry with the same display name.
    pub fn with_models(mut self, models: impl IntoIterator<Item = ModelDescriptor>) -> Self {
        for model in models {
            self.insert(model);
        }
        self
    }

    /// Insert or replace a descriptor.
    ///
    /// An empty credential header is filled from the provider's default when
    /// the provider is known.
    pub fn insert(&mut self, mut model: ModelDescriptor) {
        if model.credential_header.is_empty()
            && let Ok(kind) = model.provider_kind()
        {
            model.credential_header = kind.default_credential_header().to_string();
        }

        match self
            .models
            .iter_mut()
            .find(|m| m.display_name == model.display_name)
        {
            Some(existing) => {
                debug!(model = %model.display_name, "replacing model descriptor");
                *existing = model;
            }
            None => self.models.push(model),
        }
    }

    /// Look up a descriptor by display name.
    ///
    /// # Errors
    ///
    /// Returns `Error::ModelNotFound` for names not in the catalog.
    pub fn resolve(&self, display_name: &str) -> Result<&ModelDescriptor> {
        self.models
            .iter()
            .find(|m| m.display_name == display_name)
            .ok_or_else(|| Error::ModelNotFound(display_name.to_string()))
    }

    /// All descriptors in insertion order.
    pub fn models(&self) -> &[ModelDescriptor] {
        &self.models
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

fn builtin_models() -> Vec<ModelDescriptor> {
    use ProviderKind::{Google, OpenAi, OpenRouter};

    vec![
        ModelDescriptor::new("Deepseek R1 0528", OpenRouter, "deepseek/deepseek-r1-0528:free"),
        ModelDescriptor::new("Deepseek V3", OpenRouter, "deepseek/deepseek-chat-v3-0324:free"),
        ModelDescriptor::new("Gemini 2.5 Pro", Google, "gemini-2.5-pro"),
        ModelDescriptor::new("Gemini 2.5 Flash", Google, "gemini-2.5-flash"),
        ModelDescriptor::new("GPT-4o", OpenAi, "gpt-4o"),
        ModelDescriptor::new("GPT-4.1-mini", OpenAi, "gpt-4.1-mini"),
        ModelDescriptor::new("GLM 4.5", OpenRouter, "z-ai/glm-4.5"),
        ModelDescriptor::new("GLM 4.5 air (free)", OpenRouter, "z-ai/glm-4.5-air:free"),
        ModelDescriptor::new("GPT 4.1", OpenRouter, "openai/gpt-4.1"),
        ModelDescriptor::new("Grok-4", OpenRouter, "x-ai/grok-4"),
        ModelDescriptor::new("Claude Sonnet 4", OpenRouter, "anthropic/claude-sonnet-4"),
        ModelDescriptor::new("Claude Opus 4.1", OpenRouter, "anthropic/claude-opus-4.1"),
        ModelDescriptor::new("GPT-5 (Chat)", OpenRouter, "openai/gpt-5-chat").max_output_tokens(128_000),
        ModelDescriptor::new("GPT-5", OpenRouter, "openai/gpt-5").max_output_tokens(128_000),
        ModelDescriptor::new("GPT-5 Mini", OpenRouter, "openai/gpt-5-mini").max_output_tokens(128_000),
        ModelDescriptor::new("GPT-5 Nano", OpenRouter, "openai/gpt-5-nano").max_output_tokens(128_000),
    ]
}
