use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Result;
use praxis_calendar_core::prelude::*;
use tokio::net::TcpListener;

use crate::{cache::RedisCache, handlers::create_app};

pub async fn start_server(config: StoreConfig, redis_url: String) -> Result<()> {
    let store = HttpEventStore::new(&config)?;
    let cache = RedisCache::connect(&redis_url, None).await?;
    let service = CalendarService::new(store, CacheManager::new(cache, config.cache_ttl));

    let app = create_app(Arc::new(service));

    // 3000 unless PORT says otherwise
    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(3000);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(store = %config.base_url, "Praxis calendar server starting on {}", addr);

    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
