//! Caching HTTP proxy
//!
//! Serves browser clients that cannot call the catalog API or the lyric providers
//! directly:
//! - `GET /health`
//! - `GET /api/lyrics?artist=&title=` runs the resolver
//! - `GET /api/*` forwards to the catalog API
//!
//! Successful responses are cached for a short TTL, marked with `x-cache`.

pub mod cache;
pub mod middleware;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::lyrics::Resolver;
use crate::lyrics::resolver::LyricsSource;
use cache::{Clock, ResponseCache, SystemClock, TtlCache};

pub struct AppState {
    /// Catalog API base URL, without trailing slash.
    pub upstream: String,
    pub http: reqwest::Client,
    pub lyrics: Arc<dyn LyricsSource>,
    pub cache: Arc<dyn ResponseCache>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(
        cfg: &Config,
        lyrics: Arc<dyn LyricsSource>,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(cfg.providers.user_agent.as_str())
            .timeout(Duration::from_secs(cfg.upstream.timeout_secs))
            .build()
            .context("build upstream http client")?;
        let cache = TtlCache::new(
            cfg.cache.capacity,
            Duration::from_secs(cfg.cache.ttl_secs),
            Arc::clone(&clock),
        );

        Ok(Self {
            upstream: cfg.upstream.catalog_url.trim_end_matches('/').to_string(),
            http,
            lyrics,
            cache: Arc::new(cache),
            clock,
        })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/api/lyrics", get(routes::lyrics))
        .route("/api/{*rest}", get(routes::passthrough))
        .fallback(routes::not_found)
        .layer(axum::middleware::from_fn(middleware::cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(cfg: &Config) -> anyhow::Result<()> {
    let resolver = Resolver::from_config(cfg)?;
    let state = AppState::new(cfg, Arc::new(resolver), Arc::new(SystemClock))?;
    let app = router(Arc::new(state));

    let address = format!("{}:{}", cfg.server.host, cfg.server.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("bind {address}"))?;
    info!(
        "lyrics proxy listening on {address} (upstream {})",
        cfg.upstream.catalog_url
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serve http")?;
    info!("lyrics proxy stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("ctrl-c handler unavailable: {e}");
        std::future::pending::<()>().await;
    }
}
