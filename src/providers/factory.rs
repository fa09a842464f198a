use crate::config::{IngestConfig, ProviderConfig};
use crate::providers::{AnthropicProvider, CompletionProvider, OpenAIProvider};
use std::error::Error;

pub struct ProviderFactory;

impl ProviderFactory {
    /// Create a provider instance from configuration
    pub fn create(
        provider_name: &str,
        config: &ProviderConfig,
    ) -> Result<Box<dyn CompletionProvider>, Box<dyn Error + Send + Sync>> {
        if !config.enabled {
            return Err(format!(
                "Provider '{}' is not enabled in configuration",
                provider_name
            )
            .into());
        }

        match provider_name {
            "openai" => Ok(Box::new(OpenAIProvider::new(config)?)),
            "anthropic" => Ok(Box::new(AnthropicProvider::new(config)?)),
            _ => Err(format!("Unknown provider: {}", provider_name).into()),
        }
    }

    /// Build the configured default provider.
    ///
    /// A default provider missing from the `providers` table runs with
    /// default settings and an API key taken from the environment.
    pub fn get_default_provider(
        config: &IngestConfig,
    ) -> Result<Box<dyn CompletionProvider>, Box<dyn Error + Send + Sync>> {
        Self::create(&config.default_provider, &config.default_provider_config())
    }

    /// List all available provider names
    pub fn available_providers() -> Vec<&'static str> {
        vec!["openai", "anthropic"]
    }
}
