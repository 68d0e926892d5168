use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    path::PathBuf,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;

use praxis_calendar_core::{Error, Result, cache::CacheBackend};

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Entry header: expiry timestamp (8 bytes) followed by write timestamp (8 bytes)
const HEADER_SIZE: usize = 16;

fn create_cache_entry(data: &[u8], ttl: Duration) -> Vec<u8> {
    let now = now_secs();
    let expires_at = now + ttl.as_secs();

    let mut entry = Vec::with_capacity(HEADER_SIZE + data.len());
    entry.extend_from_slice(&expires_at.to_le_bytes());
    entry.extend_from_slice(&now.to_le_bytes());
    entry.extend_from_slice(data);
    entry
}

/// Payload of a still valid entry, `None` once expired
fn parse_cache_entry(raw: &[u8]) -> Result<Option<&[u8]>> {
    let (header, data) = raw
        .split_at_checked(HEADER_SIZE)
        .ok_or_else(|| Error::Cache("Invalid cache entry format".to_string()))?;

    let expires_at = u64::from_le_bytes(
        header[0..8]
            .try_into()
            .map_err(|_| Error::Cache("Invalid expiry header".to_string()))?,
    );

    Ok((now_secs() <= expires_at).then_some(data))
}

/// Event lists cached on disk between CLI runs
#[derive(Debug, Clone)]
pub struct FileCache {
    cache_dir: PathBuf,
}

impl FileCache {
    pub fn new(cache_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&cache_dir)
            .map_err(|e| Error::Config(format!("Failed to create cache directory: {e}")))?;

        Ok(Self { cache_dir })
    }

    pub fn with_default_dir(app_name: &str) -> Result<Self> {
        Self::new(default_cache_dir(app_name)?)
    }

    fn cache_file_path(&self, key: &str) -> PathBuf {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);

        self.cache_dir.join(format!("{:x}.json", hasher.finish()))
    }
}

fn default_cache_dir(app_name: &str) -> Result<PathBuf> {
    let base = if cfg!(target_os = "macos") {
        std::env::var_os("HOME").map(|home| PathBuf::from(home).join("Library").join("Caches"))
    } else if cfg!(target_os = "windows") {
        std::env::var_os("LOCALAPPDATA").map(PathBuf::from)
    } else {
        std::env::var_os("XDG_CACHE_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".cache")))
    };

    base.map(|dir| dir.join(app_name))
        .ok_or_else(|| Error::Config("Cannot determine cache directory".to_string()))
}

#[async_trait]
impl CacheBackend for FileCache {
    async fn set_raw(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let entry = create_cache_entry(value, ttl);

        tokio::fs::write(self.cache_file_path(key), entry)
            .await
            .map_err(|e| Error::Cache(format!("Failed to write cache file: {e}")))
    }

    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let file_path = self.cache_file_path(key);

        let content = match tokio::fs::read(&file_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::Cache(format!("Failed to read cache file: {e}"))),
        };

        match parse_cache_entry(&content) {
            Ok(Some(data)) => Ok(Some(data.to_vec())),
            // Expired or corrupt
            _ => {
                let _ = tokio::fs::remove_file(file_path).await;
                Ok(None)
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.cache_file_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Cache(format!("Failed to delete cache file: {e}"))),
        }
    }

    async fn clear(&self) -> Result<()> {
        let mut entries = tokio::fs::read_dir(&self.cache_dir)
            .await
            .map_err(|e| Error::Cache(format!("Failed to read cache directory: {e}")))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::Cache(format!("Failed to read directory entry: {e}")))?
        {
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                let _ = tokio::fs::remove_file(path).await;
            }
        }

        Ok(())
    }
}
