//! Key-value handoff between pipeline stages.
//!
//! Records are JSON values stored under `{prefix}:{session_id}:{key}` and
//! expire a fixed time after each write. Writes are last-write-wins.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::{StoreBackend, StoreConfig};
use crate::error::{IngestError, StoreError};

mod memory;
mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

/// Logical key of the accepted submission.
pub const SUBMISSION_KEY: &str = "submission";
/// Logical key of the scraped name, image and video.
pub const RECIPE_INFO_KEY: &str = "recipe_info";
/// Logical key of the raw ingredient lines.
pub const INGREDIENTS_KEY: &str = "ingredients";
/// Logical key of the merged raw record.
pub const RAW_RECORD_KEY: &str = "processed_html";
/// Logical key of the clean record.
pub const CLEAN_RECORD_KEY: &str = "clean_processed_data";
/// Logical key of the submission's pipeline state.
pub const STATE_KEY: &str = "state";

/// Compose the full store key for a session's logical key.
pub fn handoff_key(prefix: &str, session_id: &str, key: &str) -> String {
    format!("{prefix}:{session_id}:{key}")
}

#[async_trait]
pub trait HandoffStore: Send + Sync {
    /// Write `value`, replacing any previous record and restarting its expiry.
    async fn save(&self, session_id: &str, key: &str, value: &Value) -> Result<(), StoreError>;

    /// Read a record; `None` when it was never written or has expired.
    async fn load(&self, session_id: &str, key: &str) -> Result<Option<Value>, StoreError>;
}

/// Serialize and save a typed record.
pub async fn save_record<T>(
    store: &dyn HandoffStore,
    session_id: &str,
    key: &str,
    record: &T,
) -> Result<(), StoreError>
where
    T: Serialize + ?Sized,
{
    let value = serde_json::to_value(record)?;
    store.save(session_id, key, &value).await
}

/// Load and deserialize a typed record.
pub async fn load_record<T>(
    store: &dyn HandoffStore,
    session_id: &str,
    key: &str,
) -> Result<Option<T>, StoreError>
where
    T: DeserializeOwned,
{
    match store.load(session_id, key).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Build the store selected by `config`.
pub fn from_config(config: &StoreConfig) -> Result<Arc<dyn HandoffStore>, IngestError> {
    let ttl = Duration::from_secs(config.ttl_secs);
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new(config.prefix.clone(), ttl))),
        StoreBackend::Redis => {
            let url = config.url.as_deref().ok_or_else(|| {
                IngestError::Builder("store.url is required for the redis backend".to_string())
            })?;
            let store = RedisStore::open(url, config.prefix.clone(), ttl)?;
            Ok(Arc::new(store))
        }
    }
}
