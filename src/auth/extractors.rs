use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::info;

use crate::auth::{authority::TokenAuthority, claims::AccessClaims};
use crate::error::AppError;

/// Verified access-token claims of the caller.
pub struct AuthUser(pub AccessClaims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<TokenAuthority>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let tokens = Arc::<TokenAuthority>::from_ref(state);

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        // Expect "Bearer <token>"
        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .ok_or(AppError::Unauthorized)?;

        match tokens.verify_access_token(token.trim()) {
            Ok(claims) => Ok(AuthUser(claims)),
            Err(e) => {
                info!(error = %e, "access token rejected");
                Err(AppError::Unauthorized)
            }
        }
    }
}
