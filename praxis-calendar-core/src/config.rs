use std::{env, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 60;

/// Connection settings for the remote event store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base URL, e.g. `https://store.example.com/api`
    pub base_url: String,
    /// Sent as bearer token when present
    pub api_key: Option<String>,
    pub timeout: Duration,
    /// How long fetched event lists stay cached
    pub cache_ttl: Duration,
}

impl StoreConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        }
    }

    /// Reads `EVENT_STORE_URL`, `EVENT_STORE_API_KEY`,
    /// `EVENT_STORE_TIMEOUT_SECS` and `EVENTS_CACHE_TTL_SECS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let base_url = get("EVENT_STORE_URL")
            .ok_or_else(|| Error::Config("EVENT_STORE_URL is required".to_string()))?;
        let mut config = Self::new(base_url);
        config.api_key = get("EVENT_STORE_API_KEY");

        if let Some(raw) = get("EVENT_STORE_TIMEOUT_SECS") {
            config.timeout = Duration::from_secs(parse_secs("EVENT_STORE_TIMEOUT_SECS", &raw)?);
        }
        if let Some(raw) = get("EVENTS_CACHE_TTL_SECS") {
            config.cache_ttl = Duration::from_secs(parse_secs("EVENTS_CACHE_TTL_SECS", &raw)?);
        }

        Ok(config)
    }
}

fn parse_secs(name: &str, raw: &str) -> Result<u64> {
    raw.parse()
        .map_err(|_| Error::Config(format!("{name} must be a number of seconds, got '{raw}'")))
}
