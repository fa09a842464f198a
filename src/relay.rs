use std::sync::Arc;

use async_trait::async_trait;
use log::{error, info};
use reqwest::Client;
use serde::Serialize;
use serde_json::json;

use crate::config::RelayConfig;
use crate::error::IngestError;
use crate::model::{CleanRecord, PhaseEvent};
use crate::pipelines::PipelineError;

/// Outbound side of the pipeline: phase events, clean records and failures.
#[async_trait]
pub trait Relay: Send + Sync {
    /// Signal that a session moved to a new phase.
    async fn emit(&self, event: &PhaseEvent) -> Result<(), IngestError>;

    /// Hand the final clean record to downstream consumers.
    async fn publish(&self, record: &CleanRecord) -> Result<(), IngestError>;

    /// Report a submission that stopped at a failing stage.
    async fn report_failure(
        &self,
        user_id: &str,
        session_id: &str,
        failure: &PipelineError,
    ) -> Result<(), IngestError> {
        error!(
            "Pipeline failed for user {} session {}: {}",
            user_id, session_id, failure
        );
        Ok(())
    }
}

/// Relay that only logs; used when no endpoints are configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogRelay;

#[async_trait]
impl Relay for LogRelay {
    async fn emit(&self, event: &PhaseEvent) -> Result<(), IngestError> {
        info!(
            "Phase {:?} for session {} (key {})",
            event.phase, event.session_id, event.redis_key
        );
        Ok(())
    }

    async fn publish(&self, record: &CleanRecord) -> Result<(), IngestError> {
        info!(
            "Clean record for session {}: {} ingredients, {} nutrients",
            record.session_id,
            record.recipe_ingredients_clean.len(),
            record.recipe_nutrition_clean.len()
        );
        Ok(())
    }
}

/// Relay that POSTs JSON payloads to configured endpoints.
///
/// An endpoint left unset is logged instead of sent.
pub struct HttpRelay {
    client: Client,
    events_url: Option<String>,
    publish_url: Option<String>,
}

impl HttpRelay {
    pub fn new(events_url: Option<String>, publish_url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            events_url,
            publish_url,
        }
    }

    async fn post<T>(&self, url: &str, payload: &T) -> Result<(), IngestError>
    where
        T: Serialize + ?Sized,
    {
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| IngestError::Relay(format!("failed to reach {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Relay call to {} failed: {}, {}", url, status, body);
            return Err(IngestError::Relay(format!("{url} answered {status}: {body}")));
        }
        Ok(())
    }
}

#[async_trait]
impl Relay for HttpRelay {
    async fn emit(&self, event: &PhaseEvent) -> Result<(), IngestError> {
        match &self.events_url {
            Some(url) => {
                self.post(url, event).await?;
                info!("Phase event sent for session: {}", event.session_id);
                Ok(())
            }
            None => LogRelay.emit(event).await,
        }
    }

    async fn publish(&self, record: &CleanRecord) -> Result<(), IngestError> {
        match &self.publish_url {
            Some(url) => {
                self.post(url, record).await?;
                info!("Clean record published for session: {}", record.session_id);
                Ok(())
            }
            None => LogRelay.publish(record).await,
        }
    }

    async fn report_failure(
        &self,
        user_id: &str,
        session_id: &str,
        failure: &PipelineError,
    ) -> Result<(), IngestError> {
        error!(
            "Pipeline failed for user {} session {}: {}",
            user_id, session_id, failure
        );
        let Some(url) = &self.events_url else {
            return Ok(());
        };
        let payload = json!({
            "user_id": user_id,
            "session_id": session_id,
            "phase": "failed",
            "stage": failure.stage,
            "reason": failure.source.to_string(),
        });
        self.post(url, &payload).await
    }
}

/// Pick the relay described by `config`.
pub fn from_config(config: &RelayConfig) -> Arc<dyn Relay> {
    if config.events_url.is_none() && config.publish_url.is_none() {
        Arc::new(LogRelay)
    } else {
        Arc::new(HttpRelay::new(
            config.events_url.clone(),
            config.publish_url.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::model::Phase;
    use crate::pipelines::Stage;
    use mockito::{Matcher, Server};

    fn event() -> PhaseEvent {
        PhaseEvent {
            user_id: "u1".to_string(),
            session_id: "s1".to_string(),
            recipe_name: "Test Cake".to_string(),
            redis_key: "processed_html".to_string(),
            phase: Phase::NormalizeReady,
        }
    }

    #[tokio::test]
    async fn test_emit_posts_event() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/events")
            .match_body(Matcher::Json(json!({
                "user_id": "u1",
                "session_id": "s1",
                "recipe_name": "Test Cake",
                "redis_key": "processed_html",
                "phase": "chat_gpt_ingest"
            })))
            .with_status(200)
            .create();

        let relay = HttpRelay::new(Some(format!("{}/events", server.url())), None);
        relay.emit(&event()).await.unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn test_emit_rejected_status() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/events")
            .with_status(503)
            .with_body("unavailable")
            .create();

        let relay = HttpRelay::new(Some(format!("{}/events", server.url())), None);
        match relay.emit(&event()).await {
            Err(IngestError::Relay(message)) => assert!(message.contains("503")),
            other => panic!("expected relay error, got {other:?}"),
        }
        mock.assert();
    }

    #[tokio::test]
    async fn test_failure_report_payload() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/events")
            .match_body(Matcher::PartialJson(json!({
                "session_id": "s1",
                "phase": "failed",
                "stage": "fetch"
            })))
            .with_status(200)
            .create();

        let relay = HttpRelay::new(Some(format!("{}/events", server.url())), None);
        let failure = PipelineError {
            stage: Stage::Fetch,
            source: IngestError::Fetch(FetchError::Status {
                url: "http://x".to_string(),
                status: reqwest::StatusCode::NOT_FOUND,
            }),
        };
        relay.report_failure("u1", "s1", &failure).await.unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn test_missing_endpoint_logs() {
        let relay = HttpRelay::new(None, None);
        assert!(relay.emit(&event()).await.is_ok());
    }
}
