use std::sync::Arc;

use crate::config::{FetcherConfig, IngestConfig};
use crate::error::IngestError;
use crate::handoff::{self, HandoffStore};
use crate::normalizer::Normalizer;
use crate::pipelines::IngestPipeline;
use crate::providers::{CompletionProvider, ProviderFactory};
use crate::relay::{self, LogRelay, Relay};
use crate::url_to_recipe::fetchers::RequestFetcher;

/// Builder for wiring an [`IngestPipeline`] from explicit collaborators.
///
/// Anything not set falls back to the configuration given with
/// [`PipelineBuilder::config`], or to defaults: an in-memory store, a logging
/// relay and the configured default completion provider.
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<IngestConfig>,
    fetcher: Option<FetcherConfig>,
    store: Option<Arc<dyn HandoffStore>>,
    relay: Option<Arc<dyn Relay>>,
    provider: Option<Arc<dyn CompletionProvider>>,
}

impl PipelineBuilder {
    /// Use `config` for every collaborator not set explicitly.
    ///
    /// # Example
    /// ```
    /// use recipe_ingest::{IngestConfig, IngestPipeline};
    ///
    /// let builder = IngestPipeline::builder().config(IngestConfig::default());
    /// ```
    pub fn config(mut self, config: IngestConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Override the page fetcher settings
    ///
    /// # Example
    /// ```
    /// use recipe_ingest::{FetcherConfig, IngestPipeline};
    ///
    /// let builder = IngestPipeline::builder().fetcher(FetcherConfig {
    ///     timeout_secs: Some(30),
    ///     ..FetcherConfig::default()
    /// });
    /// ```
    pub fn fetcher(mut self, fetcher: FetcherConfig) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Use an existing handoff store
    ///
    /// # Example
    /// ```
    /// use std::sync::Arc;
    /// use std::time::Duration;
    /// use recipe_ingest::{IngestPipeline, MemoryStore};
    ///
    /// let store = Arc::new(MemoryStore::new("temp", Duration::from_secs(3600)));
    /// let builder = IngestPipeline::builder().store(store);
    /// ```
    pub fn store(mut self, store: Arc<dyn HandoffStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use an existing relay
    pub fn relay(mut self, relay: Arc<dyn Relay>) -> Self {
        self.relay = Some(relay);
        self
    }

    /// Use an existing completion provider instead of building one from configuration
    ///
    /// # Example
    /// ```
    /// use std::sync::Arc;
    /// use recipe_ingest::{IngestPipeline, OpenAIProvider};
    ///
    /// let provider = OpenAIProvider::with_base_url(
    ///     "your-api-key".to_string(),
    ///     "https://api.openai.com".to_string(),
    ///     "gpt-4o".to_string(),
    /// );
    /// let builder = IngestPipeline::builder().provider(Arc::new(provider));
    /// ```
    pub fn provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Build the pipeline
    ///
    /// # Errors
    /// Returns `IngestError::Builder` if:
    /// - the HTTP client cannot be built
    /// - the redis backend is selected without a URL
    /// - no completion provider is set and the configured one cannot be created
    pub fn build(self) -> Result<IngestPipeline, IngestError> {
        let config = self.config.unwrap_or_default();

        let fetcher_config = self.fetcher.unwrap_or_else(|| config.fetcher.clone());
        let fetcher = RequestFetcher::new(&fetcher_config)
            .map_err(|e| IngestError::Builder(format!("Failed to create fetcher: {}", e)))?;

        let store = match self.store {
            Some(store) => store,
            None => handoff::from_config(&config.store)?,
        };

        let relay = self.relay.unwrap_or_else(|| relay::from_config(&config.relay));

        let provider = match self.provider {
            Some(provider) => provider,
            None => {
                let provider = ProviderFactory::get_default_provider(&config).map_err(|e| {
                    IngestError::Builder(format!("Failed to create provider: {}", e))
                })?;
                Arc::from(provider)
            }
        };

        Ok(IngestPipeline::new(
            Arc::new(fetcher),
            store,
            relay,
            Normalizer::new(provider),
        ))
    }
}

impl IngestPipeline {
    /// Creates a new builder for wiring a pipeline
    ///
    /// # Example
    /// ```
    /// use recipe_ingest::IngestPipeline;
    ///
    /// let builder = IngestPipeline::builder();
    /// ```
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Build a pipeline entirely from configuration.
    pub fn from_config(config: IngestConfig) -> Result<Self, IngestError> {
        Self::builder().config(config).build()
    }

    /// A pipeline that logs instead of relaying, for local runs.
    pub fn local(provider: Arc<dyn CompletionProvider>) -> Result<Self, IngestError> {
        Self::builder()
            .provider(provider)
            .relay(Arc::new(LogRelay))
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProviderConfig, StoreBackend, StoreConfig};
    use crate::providers::OpenAIProvider;
    use std::collections::HashMap;

    fn provider() -> Arc<dyn CompletionProvider> {
        Arc::new(OpenAIProvider::with_base_url(
            "test-key".to_string(),
            "http://localhost".to_string(),
            "gpt-4o".to_string(),
        ))
    }

    #[test]
    fn test_build_with_explicit_provider() {
        assert!(IngestPipeline::builder().provider(provider()).build().is_ok());
        assert!(IngestPipeline::local(provider()).is_ok());
    }

    #[test]
    fn test_build_from_config_provider() {
        let mut providers = HashMap::new();
        providers.insert(
            "anthropic".to_string(),
            ProviderConfig {
                api_key: Some("test-key".to_string()),
                ..ProviderConfig::default()
            },
        );
        let config = IngestConfig {
            default_provider: "anthropic".to_string(),
            providers,
            ..IngestConfig::default()
        };
        assert!(IngestPipeline::from_config(config).is_ok());
    }

    #[test]
    fn test_build_rejects_unknown_provider() {
        let config = IngestConfig {
            default_provider: "nonexistent".to_string(),
            ..IngestConfig::default()
        };
        match IngestPipeline::from_config(config) {
            Err(IngestError::Builder(message)) => assert!(message.contains("Unknown provider")),
            Err(other) => panic!("expected builder error, got {other:?}"),
            Ok(_) => panic!("expected builder error"),
        }
    }

    #[test]
    fn test_build_rejects_redis_without_url() {
        let config = IngestConfig {
            store: StoreConfig {
                backend: StoreBackend::Redis,
                ..StoreConfig::default()
            },
            ..IngestConfig::default()
        };
        let result = IngestPipeline::builder()
            .config(config)
            .provider(provider())
            .build();
        assert!(matches!(result, Err(IngestError::Builder(_))));
    }
}
