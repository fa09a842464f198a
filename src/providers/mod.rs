mod anthropic;
mod factory;
mod open_ai;
mod prompt;

pub use anthropic::AnthropicProvider;
pub use factory::ProviderFactory;
pub use open_ai::OpenAIProvider;
pub use prompt::{INGREDIENTS_PROMPT, NUTRITION_PROMPT};

use async_trait::async_trait;
use serde_json::Value;
use std::error::Error;

/// Content returned by a completion capability.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// Free text, expected to hold a JSON array
    Text(String),
    /// Content the provider already delivered as structured JSON
    Json(Value),
}

impl Completion {
    /// Interpret a provider's message content; blank or null content is no completion.
    pub fn from_content(content: &Value) -> Option<Self> {
        match content {
            Value::Null => None,
            Value::String(text) if text.trim().is_empty() => None,
            Value::String(text) => Some(Completion::Text(text.clone())),
            other => Some(Completion::Json(other.clone())),
        }
    }
}

/// Unified trait for all completion providers
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Get the provider name (e.g., "openai", "anthropic")
    fn provider_name(&self) -> &str;

    /// Run one completion with a fixed system instruction and a user turn.
    ///
    /// `Ok(None)` means the provider answered without content.
    async fn complete(
        &self,
        system: &str,
        user: &str,
    ) -> Result<Option<Completion>, Box<dyn Error + Send + Sync>>;
}
