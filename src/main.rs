use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vigil::config::Config;
use vigil::services::{RefreshEngine, SnapshotCache};
use vigil::{api, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vigil=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Arc::new(Config::from_env());
    info!("Starting Vigil server on {}:{}", config.host, config.port);
    info!(
        symbols = config.symbols.len(),
        finnhub = config.use_finnhub && config.finnhub_api_key.is_some(),
        polygon = config.use_polygon && config.polygon_api_key.is_some(),
        "source configuration"
    );

    let cache = Arc::new(SnapshotCache::new(config.symbols.clone()));
    let refresher = Arc::new(RefreshEngine::new(config.clone(), cache.clone()));

    let state = AppState {
        config: config.clone(),
        cache,
        refresher,
    };

    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the router
    let app = Router::new()
        .merge(api::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start the server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Vigil server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
