//! Authentication extractor.
//!
//! Resolves the `Authorization: Bearer` credential through the identity
//! service before a handler runs. Handlers receive only the resolved user
//! identifier; the raw token never reaches cart logic.

use axum::{extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};

use quince_core::UserId;

use crate::error::AppError;
use crate::state::AppState;

/// Extractor that requires a verified bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     AuthenticatedUser(user_id): AuthenticatedUser,
/// ) -> impl IntoResponse {
///     format!("Hello, {user_id}!")
/// }
/// ```
pub struct AuthenticatedUser(pub UserId);

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|header| header.strip_prefix("Bearer "))
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::Unauthorized("no token provided".to_owned()))?;

        let identity = state.identity().verify(token).await?;
        if !identity.is_valid {
            return Err(AppError::Unauthorized("invalid token".to_owned()));
        }

        let user_id = UserId::new(identity.entity_id);
        if user_id.is_empty() {
            return Err(AppError::Unauthorized(
                "token resolves to no entity".to_owned(),
            ));
        }

        Ok(Self(user_id))
    }
}
