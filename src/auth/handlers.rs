use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        claims::Principal,
        dto::{LoginRequest, MeResponse, RefreshRequest, TokenResponse},
        extractors::AuthUser,
        password::verify_password,
    },
    error::AppError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

async fn issue_pair(state: &AppState, principal: &Principal) -> Result<TokenResponse, AppError> {
    let access_token = state.tokens.issue_access_token(principal)?;
    let refresh_token = state.tokens.issue_refresh_token(principal.id).await?;
    Ok(TokenResponse {
        access_token,
        refresh_token,
        token_type: "Bearer".into(),
        expires_in: state.tokens.access_ttl().as_secs(),
    })
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let username = payload.username.trim();
    if username.is_empty() || payload.password.is_empty() {
        return Err(AppError::BadRequest("username and password are required".into()));
    }

    let Some(user) = state.principals.find_by_username(username).await? else {
        warn!(username, "login unknown username");
        return Err(AppError::Unauthorized);
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = user.id, "login invalid password");
        return Err(AppError::Unauthorized);
    }

    let principal = user
        .principal()
        .ok_or_else(|| anyhow::anyhow!("user id {} out of range", user.id))?;
    let pair = issue_pair(&state, &principal).await?;

    info!(user_id = principal.id, "user logged in");
    Ok(Json(pair))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let user_id = state
        .tokens
        .validate_refresh_token(&payload.refresh_token)
        .await?;

    let Some(principal) = state
        .principals
        .find_by_id(user_id)
        .await?
        .and_then(|u| u.principal())
    else {
        warn!(user_id, "refresh for unknown user");
        return Err(AppError::Unauthorized);
    };

    // the new refresh token supersedes the presented one
    let pair = issue_pair(&state, &principal).await?;
    info!(user_id, "tokens refreshed");
    Ok(Json(pair))
}

#[instrument(skip(state, claims))]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<StatusCode, AppError> {
    state.tokens.revoke_refresh_token(claims.user_id).await?;
    info!(user_id = claims.user_id, "user logged out");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(claims))]
pub async fn get_me(AuthUser(claims): AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        id: claims.user_id,
        username: claims.username,
        role: claims.role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_response_serialization() {
        let response = TokenResponse {
            access_token: "a".into(),
            refresh_token: "r".into(),
            token_type: "Bearer".into(),
            expires_in: 900,
        };
        let json = serde_json::to_value(&response).expect("serialize");
        assert_eq!(json["token_type"], "Bearer");
        assert_eq!(json["expires_in"], 900);
    }
}
