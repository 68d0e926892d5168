mod cache;
mod handlers;
mod server;

use std::env;

use anyhow::{Context, Result};
use praxis_calendar_core::config::StoreConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "praxis_calendar_server=info,praxis_calendar_core=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = StoreConfig::from_env().context("invalid event store configuration")?;

    let redis_url = env::var("REDIS_URL")
        .map_err(|_| anyhow::anyhow!("REDIS_URL environment variable is required"))?;

    server::start_server(config, redis_url).await
}
