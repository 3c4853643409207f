use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use snaplink::{
    cache::{Cache, MemoryCache, RedisCache},
    config::AppConfig,
    db::{LinkStore, MemoryStore, SqliteStore},
    handlers,
    useragent::WootheeClassifier,
    AppState, LinkEngine,
};

const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

// ── Entry point ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present; env vars may already be set
    dotenvy::dotenv().ok();

    // Initialise structured logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "snaplink=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env()?;
    tracing::info!("Starting snaplink on {}", config.bind_addr());
    tracing::info!("Base URL: {}", config.base_url);

    // Durable store
    let store: Arc<dyn LinkStore> = if config.uses_memory_store() {
        tracing::warn!("Using in-memory store; links will not survive a restart");
        Arc::new(MemoryStore::new())
    } else {
        let store = SqliteStore::connect(&config.database_url, config.db_max_connections)
            .await
            .with_context(|| format!("failed to open database {}", config.database_url))?;
        Arc::new(store)
    };

    // Cache
    let cache: Arc<dyn Cache> = match &config.redis_url {
        Some(url) => {
            let cache = RedisCache::connect(url)
                .await
                .context("failed to connect to Redis (check REDIS_URL)")?;
            tracing::info!("Cache: redis");
            Arc::new(cache)
        }
        None => {
            tracing::info!("Cache: in-process");
            let cache = MemoryCache::new();
            cache.spawn_sweeper(CACHE_SWEEP_INTERVAL);
            Arc::new(cache)
        }
    };

    let engine = LinkEngine::new(store, cache, Arc::new(WootheeClassifier));
    let bind_addr = config.bind_addr();

    let state = Arc::new(AppState { engine, config });
    let app = handlers::router(state);

    // ── Serve ──────────────────────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
