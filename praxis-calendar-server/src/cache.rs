use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, aio::MultiplexedConnection};

use praxis_calendar_core::{Error, Result, cache::CacheBackend};

const DEFAULT_NAMESPACE: &str = "praxis_calendar";

fn redis_error(action: &'static str) -> impl FnOnce(redis::RedisError) -> Error {
    move |e| Error::Cache(format!("Redis {action} failed: {e}"))
}

/// Event-list cache shared by every server replica
#[derive(Clone)]
pub struct RedisCache {
    conn: MultiplexedConnection,
    namespace: String,
}

impl RedisCache {
    pub async fn connect(redis_url: &str, namespace: Option<String>) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| Error::Config(format!("Invalid REDIS_URL: {e}")))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(redis_error("connect"))?;

        let namespace = namespace.unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
        tracing::info!(namespace = %namespace, "Connected to Redis cache");

        Ok(Self { conn, namespace })
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:{key}", self.namespace)
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn set_raw(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        // SETEX rejects a zero expiry; a zero TTL means "do not cache"
        let seconds = ttl.as_secs();
        if seconds == 0 {
            return Ok(());
        }

        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(self.namespaced(key), value, seconds)
            .await
            .map_err(redis_error("SETEX"))
    }

    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        conn.get(self.namespaced(key))
            .await
            .map_err(redis_error("GET"))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(self.namespaced(key))
            .await
            .map_err(redis_error("DEL"))
    }

    async fn clear(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let stale: Vec<String> = conn
            .keys(self.namespaced("*"))
            .await
            .map_err(redis_error("KEYS"))?;

        if stale.is_empty() {
            return Ok(());
        }

        tracing::debug!(count = stale.len(), "Clearing Redis cache entries");
        conn.del::<_, ()>(stale).await.map_err(redis_error("DEL"))
    }
}
