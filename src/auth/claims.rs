use serde::{Deserialize, Serialize};

pub const REFRESH_TOKEN_TYPE: &str = "refresh";

/// The authenticated identity tokens are issued for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: u64,
    pub username: String,
    pub role: String,
}

/// Payload of a short-lived access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub user_id: u64,
    pub username: String,
    pub role: String,
    pub iss: String,
    pub sub: String, // username
    pub aud: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

/// Payload of a refresh token. `jti` keeps two tokens minted in the same second distinct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub user_id: u64,
    pub exp: i64,
    pub token_type: String,
    pub jti: String,
}

/// Refresh payload as read back from an untrusted token; every field is checked by hand.
#[derive(Debug, Deserialize)]
pub(crate) struct PresentedRefreshClaims {
    #[serde(default)]
    pub user_id: Option<serde_json::Value>,
    #[serde(default)]
    pub token_type: Option<String>,
}
