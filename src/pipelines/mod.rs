//! Per-submission pipeline: fetch, extract, normalize, persist.
//!
//! Every transition is recorded under the session's `state` key. A failure
//! stops the run and records `Failed { stage, reason }`; no clean record is
//! written for a failed submission.

use std::fmt;
use std::sync::Arc;

use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::IngestError;
use crate::handoff::{self, HandoffStore, STATE_KEY, SUBMISSION_KEY};
use crate::model::{CleanRecord, Submission};
use crate::normalizer::Normalizer;
use crate::relay::Relay;
use crate::url_to_recipe::fetchers::RequestFetcher;

pub mod normalize;
pub mod scrape;

/// The component whose call moves a submission to its next state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fetch,
    Extract,
    Normalize,
    Persist,
}

impl Stage {
    pub fn failed(self, source: impl Into<IngestError>) -> PipelineError {
        PipelineError {
            stage: self,
            source: source.into(),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Extract => "extract",
            Stage::Normalize => "normalize",
            Stage::Persist => "persist",
        };
        f.write_str(name)
    }
}

/// Recorded state of one submission.
///
/// States are only ever entered in order; `Failed` is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PipelineState {
    Received,
    Fetched,
    Extracted,
    Normalized,
    Persisted,
    Failed { stage: Stage, reason: String },
}

impl PipelineState {
    /// Stage that runs from this state, `None` once terminal.
    pub fn next_stage(&self) -> Option<Stage> {
        match self {
            PipelineState::Received => Some(Stage::Fetch),
            PipelineState::Fetched => Some(Stage::Extract),
            PipelineState::Extracted => Some(Stage::Normalize),
            PipelineState::Normalized => Some(Stage::Persist),
            PipelineState::Persisted | PipelineState::Failed { .. } => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.next_stage().is_none()
    }
}

/// A submission stopped at `stage`.
#[derive(Error, Debug)]
#[error("{stage} stage failed: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: IngestError,
}

/// Scrape-and-normalize pipeline with injected collaborators.
///
/// Cheap to share: every collaborator sits behind an `Arc`, and runs for
/// different sessions touch disjoint store keys.
#[derive(Clone)]
pub struct IngestPipeline {
    fetcher: Arc<RequestFetcher>,
    store: Arc<dyn HandoffStore>,
    relay: Arc<dyn Relay>,
    normalizer: Normalizer,
}

impl IngestPipeline {
    pub fn new(
        fetcher: Arc<RequestFetcher>,
        store: Arc<dyn HandoffStore>,
        relay: Arc<dyn Relay>,
        normalizer: Normalizer,
    ) -> Self {
        Self {
            fetcher,
            store,
            relay,
            normalizer,
        }
    }

    pub fn store(&self) -> &Arc<dyn HandoffStore> {
        &self.store
    }

    /// Run one submission from `Received` to `Persisted`.
    ///
    /// On failure the `Failed` state is recorded and reported to the relay
    /// before the error is returned.
    pub async fn run(&self, submission: &Submission) -> Result<CleanRecord, PipelineError> {
        info!(
            "Processing {} for session {}",
            submission.url, submission.session_id
        );
        let result = self.drive(submission).await;
        if let Err(failure) = &result {
            self.record_failure(&submission.user_id, &submission.session_id, failure)
                .await;
        }
        result
    }

    /// Run every submission on its own task and collect results in input order.
    pub async fn run_all(
        &self,
        submissions: Vec<Submission>,
    ) -> Vec<Result<CleanRecord, PipelineError>> {
        let handles: Vec<_> = submissions
            .into_iter()
            .map(|submission| {
                let pipeline = self.clone();
                tokio::spawn(async move { pipeline.run(&submission).await })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                // Tasks are never aborted, so a join error is a panic in `run`.
                Err(join_error) => std::panic::resume_unwind(join_error.into_panic()),
            }
        }
        results
    }

    /// Current recorded state of a session, if any.
    pub async fn state(&self, session_id: &str) -> Result<Option<PipelineState>, IngestError> {
        Ok(handoff::load_record(self.store.as_ref(), session_id, STATE_KEY).await?)
    }

    async fn drive(&self, submission: &Submission) -> Result<CleanRecord, PipelineError> {
        self.receive(submission)
            .await
            .map_err(|e| Stage::Fetch.failed(e))?;
        let event = self.scrape(submission).await?;
        self.normalize(&event).await
    }

    async fn receive(&self, submission: &Submission) -> Result<(), IngestError> {
        let session_id = submission.session_id.as_str();
        handoff::save_record(self.store.as_ref(), session_id, SUBMISSION_KEY, submission).await?;
        self.set_state(session_id, &PipelineState::Received).await
    }

    /// Record `Failed` for the session and report it to the relay.
    ///
    /// Problems while recording are logged; the original failure stands.
    async fn record_failure(&self, user_id: &str, session_id: &str, failure: &PipelineError) {
        error!(
            "Session {} stopped at {} stage: {}",
            session_id, failure.stage, failure.source
        );
        let state = PipelineState::Failed {
            stage: failure.stage,
            reason: failure.source.to_string(),
        };
        if let Err(e) = self.set_state(session_id, &state).await {
            warn!("Could not record failure for {}: {}", session_id, e);
        }
        if let Err(e) = self
            .relay
            .report_failure(user_id, session_id, failure)
            .await
        {
            warn!("Could not report failure for {}: {}", session_id, e);
        }
    }

    async fn set_state(
        &self,
        session_id: &str,
        state: &PipelineState,
    ) -> Result<(), IngestError> {
        handoff::save_record(self.store.as_ref(), session_id, STATE_KEY, state).await?;
        Ok(())
    }
}
