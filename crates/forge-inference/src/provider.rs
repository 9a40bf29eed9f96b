//! Provider registry: where each [`AiProvider`] lives and which model it uses.
//!
//! ```text
//! ANTHROPIC → https://api.anthropic.com              (Messages API)
//! OPENAI    → https://api.openai.com/v1              (chat completions)
//! GOOGLE    → https://generativelanguage.googleapis.com/v1beta/openai
//! MISTRAL   → https://api.mistral.ai/v1
//! COHERE    → https://api.cohere.ai/compatibility/v1
//! ```
//!
//! Every entry can be overridden with `<PROVIDER>_BASE_URL` and
//! `<PROVIDER>_MODEL`. The registry owns one pooled HTTP client; backends are
//! cheap per-request values bound to the caller's API key.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use tracing::info;

use forge_core::{AiProvider, Error, Result};

use crate::anthropic::{AnthropicBackend, AnthropicConfig};
use crate::backend::ChatBackend;
use crate::openai::{OpenAIBackend, OpenAIConfig};

/// Default whole-request timeout for chat calls.
pub const DEFAULT_CHAT_TIMEOUT_SECS: u64 = 30;

/// Default `max_tokens` sent upstream.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Wire protocol a provider speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderApi {
    AnthropicMessages,
    OpenAiCompatible,
}

/// Endpoint and model for one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub api: ProviderApi,
    pub base_url: String,
    pub model: String,
}

impl ProviderSettings {
    /// Built-in settings for a provider.
    pub fn default_for(provider: AiProvider) -> Self {
        let (api, base_url, model) = match provider {
            AiProvider::Anthropic => (
                ProviderApi::AnthropicMessages,
                crate::anthropic::DEFAULT_ANTHROPIC_URL,
                crate::anthropic::DEFAULT_ANTHROPIC_MODEL,
            ),
            AiProvider::Openai => (
                ProviderApi::OpenAiCompatible,
                crate::openai::DEFAULT_OPENAI_URL,
                crate::openai::DEFAULT_OPENAI_MODEL,
            ),
            AiProvider::Google => (
                ProviderApi::OpenAiCompatible,
                "https://generativelanguage.googleapis.com/v1beta/openai",
                "gemini-2.0-flash",
            ),
            AiProvider::Mistral => (
                ProviderApi::OpenAiCompatible,
                "https://api.mistral.ai/v1",
                "mistral-small-latest",
            ),
            AiProvider::Cohere => (
                ProviderApi::OpenAiCompatible,
                "https://api.cohere.ai/compatibility/v1",
                "command-r-plus",
            ),
        };
        Self {
            api,
            base_url: base_url.to_string(),
            model: model.to_string(),
        }
    }
}

/// Routes chat requests to provider backends.
#[derive(Clone)]
pub struct ProviderRegistry {
    client: Client,
    settings: HashMap<AiProvider, ProviderSettings>,
    timeout: Duration,
    max_tokens: u32,
}

impl ProviderRegistry {
    /// Registry with built-in endpoints and the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        let settings = AiProvider::ALL
            .into_iter()
            .map(|p| (p, ProviderSettings::default_for(p)))
            .collect();

        Ok(Self {
            client,
            settings,
            timeout,
            max_tokens: DEFAULT_MAX_TOKENS,
        })
    }

    /// Registry configured from `CHAT_TIMEOUT_SECS`, `CHAT_MAX_TOKENS`,
    /// `<PROVIDER>_BASE_URL` and `<PROVIDER>_MODEL`.
    pub fn from_env() -> Result<Self> {
        let timeout_secs = std::env::var("CHAT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_CHAT_TIMEOUT_SECS);

        let mut registry = Self::new(Duration::from_secs(timeout_secs))?;

        if let Some(max_tokens) = std::env::var("CHAT_MAX_TOKENS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            registry.max_tokens = max_tokens;
        }

        for provider in AiProvider::ALL {
            if let Ok(url) = std::env::var(format!("{}_BASE_URL", provider.as_str())) {
                registry = registry.with_base_url(provider, url);
            }
            if let Ok(model) = std::env::var(format!("{}_MODEL", provider.as_str())) {
                registry = registry.with_model(provider, model);
            }
        }

        for provider in AiProvider::ALL {
            let s = registry.settings(provider);
            info!(
                subsystem = "inference",
                component = "registry",
                provider = %provider,
                base_url = %s.base_url,
                model = %s.model,
                "Chat provider configured"
            );
        }
        Ok(registry)
    }

    /// Override a provider's base URL.
    pub fn with_base_url(mut self, provider: AiProvider, url: impl Into<String>) -> Self {
        let url = url.into();
        if !url.trim().is_empty() {
            self.entry(provider).base_url = url;
        }
        self
    }

    /// Override a provider's default model.
    pub fn with_model(mut self, provider: AiProvider, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.trim().is_empty() {
            self.entry(provider).model = model;
        }
        self
    }

    /// Override the `max_tokens` sent upstream.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn entry(&mut self, provider: AiProvider) -> &mut ProviderSettings {
        self.settings
            .entry(provider)
            .or_insert_with(|| ProviderSettings::default_for(provider))
    }

    /// Settings for a provider, falling back to the built-in defaults.
    pub fn settings(&self, provider: AiProvider) -> ProviderSettings {
        self.settings
            .get(&provider)
            .cloned()
            .unwrap_or_else(|| ProviderSettings::default_for(provider))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    /// Backend for `provider` authenticated with the caller's key.
    pub fn backend(&self, provider: AiProvider, api_key: &str) -> Box<dyn ChatBackend> {
        let settings = self.settings(provider);
        match settings.api {
            ProviderApi::AnthropicMessages => Box::new(AnthropicBackend::new(
                self.client.clone(),
                AnthropicConfig {
                    base_url: settings.base_url,
                    api_key: api_key.to_string(),
                    model: settings.model,
                },
            )),
            ProviderApi::OpenAiCompatible => Box::new(OpenAIBackend::new(
                self.client.clone(),
                OpenAIConfig {
                    provider,
                    base_url: settings.base_url,
                    api_key: api_key.to_string(),
                    model: settings.model,
                },
            )),
        }
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("settings", &self.settings)
            .field("timeout", &self.timeout)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}
