use std::sync::Arc;
use std::time::Duration;

use server::analysis_service::AnalysisService;
use server::backend::{ReviewCoordinator, ReviewService};
use server::clients::{lichess::LichessClient, review::ReviewClient};
use server::config::Config;
use server::position_cache::PositionCache;
use server::routes;

use anyhow::Context;
use axum::{
    http::HeaderValue,
    routing::{get, post},
    Extension, Router,
};
use review_engine::{AnalysisCache, GameReviewer, StockfishEngine};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env();

    let lichess = LichessClient::new(&config).context("Failed to build Lichess client")?;

    // Engine processes start on first use
    tracing::info!(path = %config.engine.stockfish_path, "Using Stockfish");
    let engine = StockfishEngine::new(config.engine.clone());
    let limits = engine.limits();
    let reviewer = Arc::new(GameReviewer::new(engine, limits));

    let position_analysis = Arc::new(AnalysisService::new(
        PositionCache::new(config.position_cache_ttl),
        lichess.clone(),
        StockfishEngine::new(config.engine.clone()),
        limits,
    ));

    // Drop expired position evaluations hourly
    tokio::spawn({
        let service = Arc::clone(&position_analysis);
        async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(3600));
            loop {
                ticker.tick().await;
                match service.cache().purge_expired() {
                    0 => {}
                    n => tracing::info!("Purged {} expired position evaluations", n),
                }
            }
        }
    });

    let backend = match &config.review_backend_url {
        Some(url) => ReviewService::Remote(
            ReviewClient::new(url).context("Failed to build review client")?,
        ),
        None => ReviewService::Local(reviewer.clone()),
    };
    tracing::info!(backend = backend.kind(), "Game reviews configured");

    let coordinator = Arc::new(ReviewCoordinator::new(
        Arc::new(backend),
        Arc::new(AnalysisCache::new()),
        config.coordinator,
    ));

    // CORS
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    let cors = match &config.cors_origins {
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|o| match o.parse() {
                    Ok(v) => Some(v),
                    Err(_) => {
                        tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            cors.allow_origin(AllowOrigin::list(origins))
        }
        None => cors.allow_origin(Any),
    };

    let app = Router::new()
        // Health
        .route("/health", get(routes::health::health_check))
        // Position analysis
        .route("/api/analysis/position", post(routes::analysis::analyze_position))
        .route("/api/analysis/batch", post(routes::analysis::analyze_batch))
        .route("/api/analysis/game-review", post(routes::analysis::game_review))
        // Coordinated reviews
        .route(
            "/api/review",
            get(routes::review::get_review).post(routes::review::request_review),
        )
        .route("/api/review/progress", get(routes::review::review_progress))
        // PGN or Lichess URL accuracy
        .route("/games/analyze", post(routes::games::analyze_game))
        // Shared state
        .layer(Extension(lichess))
        .layer(Extension(reviewer))
        .layer(Extension(position_analysis))
        .layer(Extension(coordinator))
        .layer(CompressionLayer::new())
        .layer(cors);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
