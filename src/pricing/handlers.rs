// HTTP handlers for the pricing endpoints

use axum::{extract::State, Json};
use validator::Validate;

use crate::error::ApiError;
use crate::pricing::{
    metrics::MetricsSummary,
    output::{CatalogPrice, PricingOutput},
    request::{CatalogRequest, PricingRequest},
};
use crate::AppState;

/// Handler for POST /api/pricing/calculate
/// Prices a basket with discounts, promo code and bonuses
pub async fn calculate_handler(
    State(state): State<AppState>,
    Json(request): Json<PricingRequest>,
) -> Result<Json<PricingOutput>, ApiError> {
    request.validate()?;
    tracing::debug!("Calculating basket with {} offers", request.offers.len());

    let output = state.engine.calculate(&request).await?;
    Ok(Json(output))
}

/// Handler for POST /api/pricing/catalog
/// Product-card prices for a list of offers
pub async fn catalog_handler(
    State(state): State<AppState>,
    Json(request): Json<CatalogRequest>,
) -> Result<Json<Vec<CatalogPrice>>, ApiError> {
    request.validate()?;

    let prices = state.engine.calculate_catalog_prices(&request).await?;
    Ok(Json(prices))
}

/// Handler for GET /api/pricing/metrics
pub async fn metrics_handler(State(state): State<AppState>) -> Json<MetricsSummary> {
    Json(state.engine.metrics().summary())
}
