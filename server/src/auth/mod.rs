//! Bearer token authentication.
//!
//! The token is the user id itself. Every collection route checks it
//! against the `{user_id}` path segment.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::AppError;

/// Authenticated user extracted from the `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
}

impl AuthUser {
    /// Allow access to `user_id`'s collection only.
    pub fn authorize(&self, user_id: &str) -> Result<(), AppError> {
        if self.user_id == user_id {
            Ok(())
        } else {
            tracing::warn!(token_user = %self.user_id, user_id = %user_id, "Rejected cross-user access");
            Err(AppError::Forbidden)
        }
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AppError::Unauthorized("Missing authorization header"))?
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid authorization header format"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AppError::Unauthorized("Invalid authorization header format"))?
            .trim();

        if token.is_empty() {
            return Err(AppError::Unauthorized("Empty bearer token"));
        }

        Ok(AuthUser {
            user_id: token.to_string(),
        })
    }
}
