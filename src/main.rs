use response_replay::api::{create_router, AppState, ReplayState};
use response_replay::config::Settings;
use response_replay::observability::{
    init_logging, init_metrics, redact_url_credentials, HealthChecker, LogConfig,
};
use response_replay::replay::{InMemoryTaggedCache, RedisTaggedCache, ReplayStore, TaggedCache};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = Settings::new()?;
    init_logging(&LogConfig::from(&settings.application));
    info!("Configuration loaded");

    let metrics_handle = init_metrics()?;

    let (cache, redis_client): (Arc<dyn TaggedCache>, Option<redis::Client>) =
        match &settings.redis.url {
            Some(url) => {
                info!("Connecting to Redis at {}...", redact_url_credentials(url));
                RedisTaggedCache::validate_tag(&settings.replay.tag)?;
                let client = redis::Client::open(url.as_str())?;
                let mut con = client.get_multiplexed_async_connection().await?;
                let _: () = redis::cmd("PING").query_async(&mut con).await?;
                info!("Redis connection established");

                let cache: Arc<dyn TaggedCache> = Arc::new(
                    RedisTaggedCache::new(client.clone(), &settings.replay.key_prefix)
                        .with_ttl(settings.replay.ttl_seconds()),
                );
                (cache, Some(client))
            }
            None => {
                warn!("No Redis URL configured; replay records are kept in process memory");
                let cache: Arc<dyn TaggedCache> = Arc::new(InMemoryTaggedCache::new());
                (cache, None)
            }
        };

    let store = ReplayStore::new(cache).with_tag(&settings.replay.tag);
    let replay = ReplayState::from_settings(store, &settings.replay)?;
    let state = AppState::new(replay, Arc::new(HealthChecker::new(redis_client)))
        .with_metrics(metrics_handle);

    let listener = tokio::net::TcpListener::bind(settings.bind_address()).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
}
