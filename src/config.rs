use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;

use crate::url_to_recipe::fetchers::BROWSER_USER_AGENT;

/// Main ingestion configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Completion provider used for normalization
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// Map of provider name to provider configuration
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub relay: RelayConfig,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            providers: HashMap::new(),
            fetcher: FetcherConfig::default(),
            store: StoreConfig::default(),
            relay: RelayConfig::default(),
        }
    }
}

/// Configuration for a specific completion provider
#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    /// Whether this provider is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Model identifier (e.g., "gpt-4o", "claude-3-5-sonnet-20241022")
    #[serde(default = "default_model")]
    pub model: String,
    /// Temperature for generation (0.0-1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// API key for authentication (can also be set via environment variable)
    pub api_key: Option<String>,
    /// Base URL for API endpoint (for custom or proxy endpoints)
    pub base_url: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            api_key: None,
            base_url: None,
        }
    }
}

/// Page fetcher settings
#[derive(Debug, Deserialize, Clone)]
pub struct FetcherConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Accept self-signed and otherwise invalid TLS certificates
    #[serde(default = "default_enabled")]
    pub accept_invalid_certs: bool,
    /// Request timeout in seconds; unset means no timeout
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            accept_invalid_certs: true,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Redis,
}

/// Handoff store settings
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Connection URL, required for the redis backend
    pub url: Option<String>,
    /// Key prefix, keys are `{prefix}:{session_id}:{key}`
    #[serde(default = "default_store_prefix")]
    pub prefix: String,
    /// Expiry applied to every write
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            url: None,
            prefix: default_store_prefix(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

/// Relay endpoints; without them events are only logged
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RelayConfig {
    /// Receives phase events
    pub events_url: Option<String>,
    /// Receives the final clean record
    pub publish_url: Option<String>,
}

// Default value functions
fn default_provider() -> String {
    "openai".to_string()
}

fn default_enabled() -> bool {
    true
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_temperature() -> f32 {
    0.0
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_user_agent() -> String {
    BROWSER_USER_AGENT.to_string()
}

fn default_store_prefix() -> String {
    "temp".to_string()
}

fn default_ttl_secs() -> u64 {
    3600
}

impl IngestConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables with RECIPE_INGEST__ prefix
    /// 2. config.toml file in current directory
    /// 3. Default values
    ///
    /// Environment variable format: RECIPE_INGEST__PROVIDERS__OPENAI__API_KEY
    pub fn load() -> Result<Self, ConfigError> {
        load_config()
    }

    /// Configuration of the default provider, or defaults when it is not listed.
    pub fn default_provider_config(&self) -> ProviderConfig {
        self.providers
            .get(&self.default_provider)
            .cloned()
            .unwrap_or_default()
    }
}

/// Load configuration from file and environment variables
pub fn load_config() -> Result<IngestConfig, ConfigError> {
    let settings = Config::builder()
        // Optional config file (can be missing)
        .add_source(File::with_name("config").required(false))
        // Use double underscore for nested: RECIPE_INGEST__STORE__BACKEND
        .add_source(
            Environment::with_prefix("RECIPE_INGEST")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        assert_eq!(default_provider(), "openai");
        assert_eq!(default_model(), "gpt-4o");
        assert_eq!(default_max_tokens(), 2000);
        assert_eq!(default_store_prefix(), "temp");
        assert_eq!(default_ttl_secs(), 3600);
    }

    #[test]
    fn test_fetcher_defaults_are_permissive() {
        let fetcher = FetcherConfig::default();
        assert!(fetcher.accept_invalid_certs);
        assert!(fetcher.timeout_secs.is_none());
        assert!(fetcher.user_agent.starts_with("Mozilla/5.0"));
    }

    #[test]
    fn test_deserialize_from_toml() {
        let toml = r#"
            default_provider = "anthropic"

            [providers.anthropic]
            model = "claude-3-5-sonnet-20241022"
            api_key = "test-key"

            [store]
            backend = "redis"
            url = "redis://127.0.0.1/"

            [relay]
            events_url = "http://relay.local/events"
        "#;
        let config: IngestConfig = Config::builder()
            .add_source(File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.default_provider, "anthropic");
        let provider = config.default_provider_config();
        assert_eq!(provider.model, "claude-3-5-sonnet-20241022");
        assert!(provider.enabled);
        assert_eq!(provider.api_key.as_deref(), Some("test-key"));
        assert_eq!(config.store.backend, StoreBackend::Redis);
        assert_eq!(config.store.prefix, "temp");
        assert_eq!(config.store.ttl_secs, 3600);
        assert_eq!(
            config.relay.events_url.as_deref(),
            Some("http://relay.local/events")
        );
        assert!(config.relay.publish_url.is_none());
    }

    #[test]
    fn test_missing_provider_falls_back_to_defaults() {
        let config = IngestConfig::default();
        let provider = config.default_provider_config();
        assert_eq!(provider.model, "gpt-4o");
        assert!(provider.api_key.is_none());
    }
}
