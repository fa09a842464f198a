pub mod builder;
pub mod config;
pub mod error;
pub mod handoff;
pub mod model;
pub mod normalizer;
pub mod pipelines;
pub mod providers;
pub mod relay;
pub mod url_to_recipe;

use log::debug;

// Re-export main types
pub use builder::PipelineBuilder;
pub use config::{FetcherConfig, IngestConfig, ProviderConfig, RelayConfig, StoreConfig};
pub use error::{FetchError, IngestError, NormalizeError, NotFoundError, StoreError};
pub use handoff::{HandoffStore, MemoryStore, RedisStore};
pub use model::{
    CleanRecord, NormalizedIngredient, NormalizedNutrient, Phase, PhaseEvent, RawExtraction,
    RawRecord, RecipeInfo, Submission,
};
pub use normalizer::Normalizer;
pub use pipelines::{IngestPipeline, PipelineError, PipelineState, Stage};
pub use providers::{AnthropicProvider, CompletionProvider, OpenAIProvider, ProviderFactory};
pub use relay::{HttpRelay, LogRelay, Relay};
pub use url_to_recipe::fetchers::{RecipeDocument, RequestFetcher};

/// Fetch `url` and extract its raw recipe data without normalizing it.
///
/// # Example
/// ```no_run
/// # #[tokio::main]
/// # async fn main() -> Result<(), recipe_ingest::IngestError> {
/// let raw = recipe_ingest::fetch_recipe("https://example.com/cake").await?;
/// println!("{}: {} ingredients", raw.name, raw.ingredients.len());
/// # Ok(())
/// # }
/// ```
pub async fn fetch_recipe(url: &str) -> Result<RawExtraction, IngestError> {
    fetch_recipe_with_config(url, &FetcherConfig::default()).await
}

/// Same as [`fetch_recipe`] with explicit fetcher settings.
pub async fn fetch_recipe_with_config(
    url: &str,
    config: &FetcherConfig,
) -> Result<RawExtraction, IngestError> {
    let fetcher = RequestFetcher::new(config)?;
    let body = fetcher.fetch_html(url).await?;
    let raw = pipelines::scrape::extract_page(url, &body)?;
    debug!("{:#?}", raw);
    Ok(raw)
}

/// Run the full pipeline for one URL with configuration from the environment.
///
/// # Example
/// ```no_run
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
/// let record = recipe_ingest::ingest("https://example.com/cake", "user-1", "session-1").await?;
/// println!("{}", serde_json::to_string_pretty(&record)?);
/// # Ok(())
/// # }
/// ```
pub async fn ingest(
    url: &str,
    user_id: &str,
    session_id: &str,
) -> Result<CleanRecord, Box<dyn std::error::Error + Send + Sync>> {
    let submission = Submission::new(user_id, session_id, url)?;
    let pipeline = IngestPipeline::from_config(IngestConfig::load()?)?;
    Ok(pipeline.run(&submission).await?)
}
