use std::time::Duration;

use async_trait::async_trait;
use log::{info, warn};
use ::redis::AsyncCommands;
use serde_json::Value;

use super::{handoff_key, HandoffStore};
use crate::error::StoreError;

/// Redis-backed store; every write is `SET key value EX ttl`.
pub struct RedisStore {
    client: ::redis::Client,
    prefix: String,
    ttl: Duration,
}

impl RedisStore {
    /// Validate the connection URL. No connection is made until first use.
    pub fn open(url: &str, prefix: impl Into<String>, ttl: Duration) -> Result<Self, StoreError> {
        let client = ::redis::Client::open(url)?;
        Ok(Self {
            client,
            prefix: prefix.into(),
            ttl,
        })
    }

    async fn connection(&self) -> Result<::redis::aio::MultiplexedConnection, StoreError> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }
}

#[async_trait]
impl HandoffStore for RedisStore {
    async fn save(&self, session_id: &str, key: &str, value: &Value) -> Result<(), StoreError> {
        let full_key = handoff_key(&self.prefix, session_id, key);
        let payload = serde_json::to_string(value)?;
        let mut conn = self.connection().await?;
        let _: () = conn
            .set_ex(&full_key, payload, self.ttl.as_secs().max(1))
            .await?;
        info!("Data saved to Redis with key: {}", full_key);
        Ok(())
    }

    async fn load(&self, session_id: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let full_key = handoff_key(&self.prefix, session_id, key);
        let mut conn = self.connection().await?;
        let payload: Option<String> = conn.get(&full_key).await?;
        match payload {
            Some(payload) => {
                info!("Data retrieved from Redis with key: {}", full_key);
                Ok(Some(serde_json::from_str(&payload)?))
            }
            None => {
                warn!("No data found in Redis for key: {}", full_key);
                Ok(None)
            }
        }
    }
}
