// API error envelope
// Every failed request is answered with the same JSON body

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::pricing::PricingError;

/// Error returned by the HTTP handlers
#[derive(Debug)]
pub enum ApiError {
    /// Request DTO failed its `validator` rules (400)
    Invalid(validator::ValidationErrors),

    /// No route or resource under the given id (404)
    NotFound { resource: String, id: String },

    /// Failure raised by the pricing engine; status follows the error kind
    Pricing(PricingError),
}

/// JSON body of every error response
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error_code: String,
    pub message: String,
    /// Per-field validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// RFC 3339
    pub timestamp: String,
}

impl ErrorBody {
    fn new(error_code: &str, message: impl Into<String>, details: Option<serde_json::Value>) -> Self {
        Self {
            error_code: error_code.to_string(),
            message: message.into(),
            details,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Invalid(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Pricing(err) => err.status_code(),
        }
    }

    /// Body for this error; server-side failures are logged in full and
    /// answered with a generic message
    fn body(&self) -> ErrorBody {
        match self {
            ApiError::Invalid(errors) => {
                debug!("Rejected request: {}", errors);
                let details = serde_json::to_value(errors).ok();
                ErrorBody::new("VALIDATION_ERROR", "Request validation failed", details)
            }
            ApiError::NotFound { resource, id } => {
                debug!("No {} at {}", resource, id);
                ErrorBody::new("NOT_FOUND", format!("{} {} not found", resource, id), None)
            }
            ApiError::Pricing(err) if err.status_code().is_server_error() => {
                error!("Pricing failed: {}", err);
                ErrorBody::new(err.error_code(), "An internal server error occurred", None)
            }
            ApiError::Pricing(err) => {
                warn!("Pricing request rejected: {}", err);
                ErrorBody::new(err.error_code(), err.to_string(), None)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.body())).into_response()
    }
}

impl From<PricingError> for ApiError {
    fn from(error: PricingError) -> Self {
        ApiError::Pricing(error)
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::Invalid(errors)
    }
}
