use log::{info, warn};

use super::{IngestPipeline, PipelineError, PipelineState, Stage};
use crate::error::IngestError;
use crate::handoff::{self, CLEAN_RECORD_KEY};
use crate::model::{CleanRecord, Phase, PhaseEvent, RawRecord, CLEAN_BUCKET};

impl IngestPipeline {
    /// Normalize the raw record named by `event` and publish the clean record.
    ///
    /// Only `chat_gpt_ingest` events are accepted, and only while the session
    /// is at `Extracted` or has no recorded state. Fails with `MissingRecord`
    /// when the raw record is absent or expired.
    pub async fn normalize(&self, event: &PhaseEvent) -> Result<CleanRecord, PipelineError> {
        self.accept(event)
            .await
            .map_err(|e| Stage::Normalize.failed(e))?;
        self.normalize_accepted(event).await
    }

    /// Run the normalize stage for an event received from another process,
    /// recording a failure the same way a full run does.
    ///
    /// A rejected event leaves the session's recorded state untouched.
    pub async fn handle_event(&self, event: &PhaseEvent) -> Result<CleanRecord, PipelineError> {
        if let Err(e) = self.accept(event).await {
            warn!("Ignoring event for session {}: {}", event.session_id, e);
            return Err(Stage::Normalize.failed(e));
        }

        let result = self.normalize_accepted(event).await;
        if let Err(failure) = &result {
            self.record_failure(&event.user_id, &event.session_id, failure)
                .await;
        }
        result
    }

    async fn accept(&self, event: &PhaseEvent) -> Result<(), IngestError> {
        if event.phase != Phase::NormalizeReady {
            return Err(IngestError::UnexpectedPhase(event.phase));
        }
        match self.state(&event.session_id).await? {
            None | Some(PipelineState::Extracted) => Ok(()),
            Some(state) => Err(IngestError::OutOfOrder {
                session_id: event.session_id.clone(),
                state,
            }),
        }
    }

    async fn normalize_accepted(&self, event: &PhaseEvent) -> Result<CleanRecord, PipelineError> {
        let session_id = event.session_id.as_str();

        let raw: RawRecord =
            handoff::load_record(self.store.as_ref(), session_id, &event.redis_key)
                .await
                .map_err(|e| Stage::Normalize.failed(e))?
                .ok_or_else(|| {
                    Stage::Normalize.failed(IngestError::MissingRecord(format!(
                        "{}:{}",
                        session_id, event.redis_key
                    )))
                })?;

        let ingredients = self
            .normalizer
            .normalize_ingredients(&raw.recipe_ingredients_raw)
            .await
            .map_err(|e| Stage::Normalize.failed(e))?;
        info!("Ingredients successfully processed");
        let nutrition = self
            .normalizer
            .normalize_nutrition(&raw.recipe_nutrition_raw)
            .await
            .map_err(|e| Stage::Normalize.failed(e))?;
        info!("Nutrition successfully processed");
        self.set_state(session_id, &PipelineState::Normalized)
            .await
            .map_err(|e| Stage::Normalize.failed(e))?;

        let clean = CleanRecord {
            user_id: event.user_id.clone(),
            session_id: event.session_id.clone(),
            recipe_url: raw.recipe_url,
            recipe_name: event.recipe_name.clone(),
            recipe_image: raw.recipe_image,
            recipe_video_url: raw.recipe_video_url,
            recipe_ingredients_clean: ingredients,
            recipe_nutrition_clean: nutrition,
            bucket: CLEAN_BUCKET.to_string(),
        };

        self.persist(&clean)
            .await
            .map_err(|e| Stage::Persist.failed(e))?;
        Ok(clean)
    }

    /// Publish the clean record, then store it. Nothing is stored when the
    /// publish fails.
    async fn persist(&self, clean: &CleanRecord) -> Result<(), IngestError> {
        let session_id = clean.session_id.as_str();
        self.relay.publish(clean).await?;
        handoff::save_record(self.store.as_ref(), session_id, CLEAN_RECORD_KEY, clean).await?;
        self.set_state(session_id, &PipelineState::Persisted).await?;
        info!("Clean record persisted for session: {}", session_id);
        Ok(())
    }
}
