//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding to the client. All route handlers return
//! `Result<T, AppError>`; every error body is JSON with an explicit kind and
//! a human-readable message.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::identity::IdentityError;
use crate::service::CartError;

/// Application-level error type for the cart service.
#[derive(Debug, Error)]
pub enum AppError {
    /// A cart operation failed.
    #[error("cart error: {0}")]
    Cart(#[from] CartError),

    /// The caller is not authenticated.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Identity verification could not be performed.
    #[error("identity service unavailable: {0}")]
    IdentityUnavailable(String),

    /// Bad request from client.
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidToken => Self::Unauthorized("invalid token".to_owned()),
            IdentityError::Unavailable(msg) => Self::IdentityUnavailable(msg),
        }
    }
}

impl AppError {
    /// Stable machine-readable error kind for response bodies.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Cart(err) => match err {
                CartError::InvalidArgument(_) => "invalid_argument",
                CartError::NotFound => "not_found",
                CartError::ItemNotFound => "item_not_found",
                CartError::ProductNotFound => "product_not_found",
                CartError::InvalidProductData(_) => "invalid_product_data",
                CartError::OutOfStock => "out_of_stock",
                CartError::InsufficientStock { .. } => "insufficient_stock",
                CartError::Conflict => "conflict",
                CartError::UpstreamUnavailable(_) => "upstream_unavailable",
                CartError::Persistence(_) => "persistence_failure",
            },
            Self::Unauthorized(_) => "unauthorized",
            Self::IdentityUnavailable(_) => "upstream_unavailable",
            Self::BadRequest(_) => "bad_request",
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Cart(err) => match err {
                CartError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
                CartError::NotFound
                | CartError::ItemNotFound
                | CartError::ProductNotFound => StatusCode::NOT_FOUND,
                CartError::OutOfStock
                | CartError::InsufficientStock { .. }
                | CartError::Conflict => StatusCode::CONFLICT,
                CartError::InvalidProductData(_) => StatusCode::BAD_GATEWAY,
                CartError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                CartError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::IdentityUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server-side failures to Sentry
        if matches!(
            self,
            Self::Cart(CartError::Persistence(_) | CartError::UpstreamUnavailable(_))
                | Self::IdentityUnavailable(_)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Cart(CartError::Persistence(_)) => "Internal server error".to_owned(),
            other => other.to_string(),
        };

        let mut body = json!({
            "error": {
                "kind": self.kind(),
                "message": message,
            }
        });
        if let Self::Cart(CartError::InsufficientStock { available }) = &self {
            body["error"]["available"] = json!(available);
        }

        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::from(CartError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(CartError::InvalidArgument("userId is required".to_owned())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(CartError::InsufficientStock { available: 2 }).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(CartError::UpstreamUnavailable("timeout".to_owned())).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::Unauthorized("no token provided".to_owned()).status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_kind_strings_are_stable() {
        assert_eq!(AppError::from(CartError::OutOfStock).kind(), "out_of_stock");
        assert_eq!(
            AppError::from(CartError::ItemNotFound).kind(),
            "item_not_found"
        );
        assert_eq!(
            AppError::IdentityUnavailable("down".to_owned()).kind(),
            "upstream_unavailable"
        );
    }
}
