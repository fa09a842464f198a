use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::{handoff_key, HandoffStore};
use crate::error::StoreError;

struct Entry {
    expires_at: Instant,
    payload: String,
}

/// Process-local store with the same key layout and expiry as Redis.
///
/// Values are kept serialized so a load sees exactly what a remote store
/// would return. Expired records are dropped on the next write.
pub struct MemoryStore {
    prefix: String,
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new(prefix: impl Into<String>, ttl: Duration) -> Self {
        Self {
            prefix: prefix.into(),
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Full keys of all live records, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.expires_at > now)
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl HandoffStore for MemoryStore {
    async fn save(&self, session_id: &str, key: &str, value: &Value) -> Result<(), StoreError> {
        let full_key = handoff_key(&self.prefix, session_id, key);
        let payload = serde_json::to_string(value)?;
        let now = Instant::now();
        let entry = Entry {
            expires_at: now + self.ttl,
            payload,
        };

        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        if entries.len() < before {
            debug!("Dropped {} expired records", before - entries.len());
        }
        entries.insert(full_key.clone(), entry);
        drop(entries);
        info!("Data saved to store with key: {}", full_key);
        Ok(())
    }

    async fn load(&self, session_id: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let full_key = handoff_key(&self.prefix, session_id, key);
        let mut entries = self.entries.lock().await;

        let payload = match entries.get(&full_key) {
            Some(entry) if entry.expires_at > Instant::now() => entry.payload.clone(),
            Some(_) => {
                debug!("Record expired: {}", full_key);
                entries.remove(&full_key);
                warn!("No data found in store for key: {}", full_key);
                return Ok(None);
            }
            None => {
                warn!("No data found in store for key: {}", full_key);
                return Ok(None);
            }
        };
        drop(entries);

        info!("Data retrieved from store with key: {}", full_key);
        Ok(Some(serde_json::from_str(&payload)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_save_and_load() {
        let store = MemoryStore::new("temp", Duration::from_secs(3600));
        store.save("s1", "ingredients", &json!(["1 cup sugar"])).await.unwrap();

        assert_eq!(
            store.load("s1", "ingredients").await.unwrap(),
            Some(json!(["1 cup sugar"]))
        );
        assert_eq!(store.keys().await, vec!["temp:s1:ingredients"]);
    }

    #[tokio::test]
    async fn test_sessions_are_partitioned() {
        let store = MemoryStore::new("temp", Duration::from_secs(3600));
        store.save("a", "state", &json!("Fetched")).await.unwrap();
        store.save("b", "state", &json!("Received")).await.unwrap();

        assert_eq!(store.load("a", "state").await.unwrap(), Some(json!("Fetched")));
        assert_eq!(store.load("b", "state").await.unwrap(), Some(json!("Received")));
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let store = MemoryStore::new("temp", Duration::from_secs(3600));
        store.save("s1", "state", &json!(1)).await.unwrap();
        store.save("s1", "state", &json!(2)).await.unwrap();
        assert_eq!(store.load("s1", "state").await.unwrap(), Some(json!(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_records_expire() {
        let store = MemoryStore::new("temp", Duration::from_secs(3600));
        store.save("s1", "processed_html", &json!({"a": 1})).await.unwrap();

        tokio::time::advance(Duration::from_secs(3599)).await;
        assert!(store.load("s1", "processed_html").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(store.load("s1", "processed_html").await.unwrap().is_none());
        assert!(store.keys().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_sweeps_expired_records() {
        let store = MemoryStore::new("temp", Duration::from_secs(3600));
        for i in 0..1000 {
            let session = format!("session-{i}");
            store.save(&session, "ingredients", &json!([i])).await.unwrap();
        }

        tokio::time::advance(Duration::from_secs(7200)).await;
        store.save("fresh", "state", &json!("Received")).await.unwrap();

        assert_eq!(store.entries.lock().await.len(), 1);
        assert_eq!(store.keys().await, vec!["temp:fresh:state"]);
    }
}
