use log::{debug, info};

use super::{IngestPipeline, PipelineError, PipelineState, Stage};
use crate::error::{IngestError, NotFoundError};
use crate::handoff::{self, INGREDIENTS_KEY, RAW_RECORD_KEY, RECIPE_INFO_KEY};
use crate::model::{Phase, PhaseEvent, RawExtraction, RawRecord, RecipeInfo, Submission};
use crate::url_to_recipe::fetchers::RecipeDocument;
use crate::url_to_recipe::html::extractors::extract_raw;

/// Parse `body` and run every extraction on it.
///
/// The parsed tree never leaves this function, so callers stay `Send`.
pub fn extract_page(url: &str, body: &str) -> Result<RawExtraction, NotFoundError> {
    let document = RecipeDocument::parse(url, body);
    extract_raw(&document)
}

impl IngestPipeline {
    /// Fetch and extract a submission, hand the raw record to the store and
    /// announce it.
    ///
    /// Returns the event that drives the normalize stage.
    pub async fn scrape(&self, submission: &Submission) -> Result<PhaseEvent, PipelineError> {
        let session_id = submission.session_id.as_str();

        let body = self
            .fetcher
            .fetch_html(&submission.url)
            .await
            .map_err(|e| Stage::Fetch.failed(e))?;
        self.set_state(session_id, &PipelineState::Fetched)
            .await
            .map_err(|e| Stage::Fetch.failed(e))?;

        let raw = extract_page(&submission.url, &body).map_err(|e| Stage::Extract.failed(e))?;
        debug!(
            "Extracted {} ingredient lines and {} nutrition fields from {}",
            raw.ingredients.len(),
            raw.nutrition.len(),
            submission.url
        );

        self.hand_off(submission, raw)
            .await
            .map_err(|e| Stage::Extract.failed(e))
    }

    async fn hand_off(
        &self,
        submission: &Submission,
        raw: RawExtraction,
    ) -> Result<PhaseEvent, IngestError> {
        let session_id = submission.session_id.as_str();
        let store = self.store.as_ref();

        let info = RecipeInfo {
            name: raw.name.clone(),
            image: raw.image.clone(),
            video_url: raw.video_url.clone(),
        };
        handoff::save_record(store, session_id, RECIPE_INFO_KEY, &info).await?;
        handoff::save_record(store, session_id, INGREDIENTS_KEY, &raw.ingredients).await?;

        let record = RawRecord::new(submission, raw);
        handoff::save_record(store, session_id, RAW_RECORD_KEY, &record).await?;
        self.set_state(session_id, &PipelineState::Extracted).await?;

        let event = PhaseEvent {
            user_id: submission.user_id.clone(),
            session_id: submission.session_id.clone(),
            recipe_name: record.recipe_name,
            redis_key: RAW_RECORD_KEY.to_string(),
            phase: Phase::NormalizeReady,
        };
        self.relay.emit(&event).await?;
        info!("Raw record ready for normalization: {}", session_id);
        Ok(event)
    }
}
