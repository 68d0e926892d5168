use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;

use crate::{CalendarEvent, Result};

#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn set_raw(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()>;
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn delete(&self, key: &str) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

#[async_trait]
pub trait Cache: CacheBackend {
    async fn set<T>(&self, key: &str, value: &T, ttl: Duration) -> Result<()>
    where
        T: Serialize + Send + Sync,
    {
        let value_bytes = serde_json::to_vec(value)
            .map_err(|e| crate::Error::Cache(format!("Failed to serialize value: {e}")))?;

        self.set_raw(key, &value_bytes, ttl).await
    }

    async fn get<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        if let Some(raw) = self.get_raw(key).await? {
            let value = serde_json::from_slice::<T>(&raw)
                .map_err(|e| crate::Error::Cache(format!("Failed to deserialize value: {e}")))?;

            Ok(Some(value))
        } else {
            Ok(None)
        }
    }
}

/// Every [`CacheBackend`] gets the typed helpers for free
impl<T: CacheBackend> Cache for T {}

/// Keeps fetched event lists per practice
#[derive(Clone)]
pub struct CacheManager<C: CacheBackend> {
    cache: C,
    ttl: Duration,
}

impl<C: CacheBackend> CacheManager<C> {
    pub fn new(cache: C, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    pub fn events_cache_key(practice_id: &str) -> String {
        format!("events:{practice_id}")
    }

    pub async fn cache_events(&self, practice_id: &str, events: &[CalendarEvent]) -> Result<()> {
        let key = Self::events_cache_key(practice_id);
        self.cache.set(&key, &events, self.ttl).await
    }

    pub async fn cached_events(&self, practice_id: &str) -> Result<Option<Vec<CalendarEvent>>> {
        let key = Self::events_cache_key(practice_id);
        self.cache.get(&key).await
    }

    pub async fn invalidate_events(&self, practice_id: &str) -> Result<()> {
        let key = Self::events_cache_key(practice_id);
        self.cache.delete(&key).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.cache.clear().await
    }
}

/// Process-local cache, mostly for tests and one-shot tools
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, (Instant, Vec<u8>)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn set_raw(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let expires_at = Instant::now() + ttl;
        self.entries
            .write()
            .await
            .insert(key.to_string(), (expires_at, value.to_vec()));
        Ok(())
    }

    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some((expires_at, _)) if *expires_at <= Instant::now() => {
                entries.remove(key);
                Ok(None)
            }
            Some((_, data)) => Ok(Some(data.clone())),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> CalendarEvent {
        CalendarEvent {
            id: "evt-1".to_string(),
            practice_id: "praxis-1".to_string(),
            title: "Teambesprechung".to_string(),
            start_date: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn caches_and_invalidates_event_lists() {
        let manager = CacheManager::new(MemoryCache::new(), Duration::from_secs(60));

        assert!(manager.cached_events("praxis-1").await.unwrap().is_none());

        manager.cache_events("praxis-1", &[sample()]).await.unwrap();
        let cached = manager.cached_events("praxis-1").await.unwrap().unwrap();
        assert_eq!(cached, vec![sample()]);
        assert!(manager.cached_events("praxis-2").await.unwrap().is_none());

        manager.invalidate_events("praxis-1").await.unwrap();
        assert!(manager.cached_events("praxis-1").await.unwrap().is_none());
    }

    #[test]
    fn expired_entries_are_dropped() {
        let cache = MemoryCache::new();
        tokio_test::block_on(async {
            cache.set_raw("k", b"v", Duration::ZERO).await.unwrap();
            assert!(cache.get_raw("k").await.unwrap().is_none());

            cache.set_raw("k", b"v", Duration::from_secs(60)).await.unwrap();
            assert_eq!(cache.get_raw("k").await.unwrap(), Some(b"v".to_vec()));

            cache.clear().await.unwrap();
            assert!(cache.get_raw("k").await.unwrap().is_none());
        });
    }

    #[tokio::test]
    async fn corrupt_entries_surface_as_cache_errors() {
        let cache = MemoryCache::new();
        cache
            .set_raw("events:praxis-1", b"not json", Duration::from_secs(60))
            .await
            .unwrap();
        let manager = CacheManager::new(cache, Duration::from_secs(60));

        assert!(matches!(
            manager.cached_events("praxis-1").await,
            Err(crate::Error::Cache(_))
        ));
    }
}
