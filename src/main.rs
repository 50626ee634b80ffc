use std::sync::Arc;

use checkout_pricing::{
    config::AppConfig,
    create_router,
    pricing::{memory::InMemoryCatalog, PricingEngine},
    AppState,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Checkout pricing - Starting...");

    let config = AppConfig::from_env()?;

    let catalog = if config.snapshot_path.exists() {
        tracing::info!("Loading catalog snapshot from {}", config.snapshot_path.display());
        InMemoryCatalog::load(&config.snapshot_path).await?
    } else {
        tracing::warn!(
            "Catalog snapshot {} not found, starting with an empty catalog",
            config.snapshot_path.display()
        );
        InMemoryCatalog::new()
    };

    let engine = PricingEngine::from_catalog(Arc::new(catalog), config.cache_ttl);
    if let Err(e) = engine.warm_cache().await {
        tracing::warn!("Failed to warm reference cache: {}", e);
    }

    let state = AppState::new(engine);
    let metrics = state.engine.metrics().clone();
    let app = create_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Checkout pricing is running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    metrics.log_summary();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}
