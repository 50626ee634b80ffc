// Checkout pricing service
// Router and shared state for the pricing API

pub mod config;
pub mod error;
pub mod pricing;

use std::sync::Arc;

use axum::{
    http::Uri,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use error::ApiError;
use pricing::{
    handlers::{calculate_handler, catalog_handler, metrics_handler},
    PricingEngine,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<PricingEngine>,
}

impl AppState {
    pub fn new(engine: PricingEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn fallback(uri: Uri) -> ApiError {
    ApiError::NotFound {
        resource: "route".to_string(),
        id: uri.path().to_string(),
    }
}

pub fn create_router(state: AppState) -> Router {
    // Allow all origins, methods, and headers
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/pricing/calculate", post(calculate_handler))
        .route("/api/pricing/catalog", post(catalog_handler))
        .route("/api/pricing/metrics", get(metrics_handler))
        .fallback(fallback)
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(state)
}

#[cfg(test)]
mod tests;
