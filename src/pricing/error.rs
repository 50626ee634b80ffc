// Error types for the pricing engine
// Configuration errors reject discount writes; inapplicability is never an error

use axum::http::StatusCode;
use thiserror::Error;

use crate::pricing::types::DiscountId;

/// Main error type for the pricing engine
///
/// A pricing run only fails when a collaborator fails as a whole. Discounts that
/// do not apply, offers without a price and unknown promo codes are handled by
/// the calculators without raising an error.
#[derive(Debug, Error)]
pub enum PricingError {
    /// Malformed discount value, type, date range or relation shape
    #[error("Invalid discount configuration: {0}")]
    InvalidDiscount(String),

    /// Malformed bonus rule
    #[error("Invalid bonus configuration: {0}")]
    InvalidBonus(String),

    /// Malformed promo code record
    #[error("Invalid promo code configuration: {0}")]
    InvalidPromoCode(String),

    /// Invalid pricing options or snapshot content
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Required reference data is missing
    #[error("Configuration not found: {0}")]
    ConfigurationNotFound(String),

    /// A synergy link points at an unknown discount
    #[error("Discount not found: {0}")]
    DiscountNotFound(DiscountId),

    /// A lookup collaborator failed as a whole
    #[error("Lookup failed: {0}")]
    Lookup(String),

    /// Request validation failed at the HTTP boundary
    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias for pricing operations
pub type PricingResult<T> = Result<T, PricingError>;

impl From<validator::ValidationErrors> for PricingError {
    fn from(err: validator::ValidationErrors) -> Self {
        PricingError::ValidationError(err.to_string())
    }
}

impl PricingError {
    /// Machine-readable code used in API error responses
    pub fn error_code(&self) -> &'static str {
        match self {
            PricingError::InvalidDiscount(_) => "INVALID_DISCOUNT",
            PricingError::InvalidBonus(_) => "INVALID_BONUS",
            PricingError::InvalidPromoCode(_) => "INVALID_PROMO_CODE",
            PricingError::InvalidConfiguration(_) => "INVALID_CONFIGURATION",
            PricingError::ConfigurationNotFound(_) => "CONFIGURATION_NOT_FOUND",
            PricingError::DiscountNotFound(_) => "DISCOUNT_NOT_FOUND",
            PricingError::Lookup(_) => "LOOKUP_FAILED",
            PricingError::ValidationError(_) => "VALIDATION_ERROR",
            PricingError::JsonError(_) => "JSON_ERROR",
            PricingError::IoError(_) => "IO_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            PricingError::InvalidDiscount(_)
            | PricingError::InvalidBonus(_)
            | PricingError::InvalidPromoCode(_)
            | PricingError::ValidationError(_)
            | PricingError::JsonError(_) => StatusCode::BAD_REQUEST,
            PricingError::DiscountNotFound(_) | PricingError::ConfigurationNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            PricingError::InvalidConfiguration(_)
            | PricingError::Lookup(_)
            | PricingError::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
