use std::{sync::Arc, time::Duration};

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::auth::claims::{
    AccessClaims, PresentedRefreshClaims, Principal, RefreshClaims, REFRESH_TOKEN_TYPE,
};
use crate::auth::error::TokenError;
use crate::config::JwtConfig;
use crate::datastore::KeyValueCache;

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Cache key holding the single live refresh token of a user.
pub fn refresh_token_key(user_id: u64) -> String {
    format!("refresh_token:{user_id}")
}

fn ttl_secs(count: i64, unit_secs: u64) -> Result<Duration, TokenError> {
    u64::try_from(count)
        .ok()
        .and_then(|n| n.checked_mul(unit_secs))
        .filter(|secs| i64::try_from(*secs).is_ok())
        .map(Duration::from_secs)
        .ok_or_else(|| TokenError::Signing(format!("token ttl out of range: {count}")))
}

fn expires_at(now: i64, ttl: Duration) -> Result<i64, TokenError> {
    i64::try_from(ttl.as_secs())
        .ok()
        .and_then(|secs| now.checked_add(secs))
        .ok_or_else(|| TokenError::Signing("token expiry out of range".into()))
}

fn rejected(err: TokenError) -> TokenError {
    info!(error = %err, "refresh token rejected");
    err
}

/// Issues access/refresh token pairs and tracks the live refresh token per user.
pub struct TokenAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
    cache: Arc<dyn KeyValueCache>,
}

impl TokenAuthority {
    pub fn new(cfg: &JwtConfig, cache: Arc<dyn KeyValueCache>) -> Result<Self, TokenError> {
        cfg.validate().map_err(TokenError::Signing)?;
        let access_ttl = ttl_secs(cfg.access_ttl_minutes, 60)?;
        let refresh_ttl = ttl_secs(cfg.refresh_ttl_days, 24 * 60 * 60)?;
        Ok(Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            access_ttl,
            refresh_ttl,
            cache,
        })
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    fn sign<T: serde::Serialize>(&self, claims: &T) -> Result<String, TokenError> {
        encode(&Header::new(ALGORITHM), claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn issue_access_token(&self, principal: &Principal) -> Result<String, TokenError> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = AccessClaims {
            user_id: principal.id,
            username: principal.username.clone(),
            role: principal.role.clone(),
            iss: self.issuer.clone(),
            sub: principal.username.clone(),
            aud: self.audience.clone(),
            iat: now,
            nbf: now,
            exp: expires_at(now, self.access_ttl)?,
        };
        let token = self.sign(&claims)?;
        debug!(user_id = principal.id, role = %principal.role, "access token signed");
        Ok(token)
    }

    /// Signs a refresh token and makes it the user's only live one.
    ///
    /// The token is only returned once the cache write succeeded; a signed but
    /// unstored token is never handed out.
    pub async fn issue_refresh_token(&self, user_id: u64) -> Result<String, TokenError> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = RefreshClaims {
            user_id,
            exp: expires_at(now, self.refresh_ttl)?,
            token_type: REFRESH_TOKEN_TYPE.to_string(),
            jti: format!("{:032x}", rand::random::<u128>()),
        };
        let token = self.sign(&claims)?;

        self.cache
            .set(&refresh_token_key(user_id), &token, self.refresh_ttl)
            .await?;
        debug!(user_id, "refresh token issued");
        Ok(token)
    }

    /// Returns the user id of a refresh token that is well signed, unexpired,
    /// of refresh type and still the one stored for its user.
    pub async fn validate_refresh_token(&self, token: &str) -> Result<u64, TokenError> {
        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);

        let claims = decode::<PresentedRefreshClaims>(token, &self.decoding, &validation)
            .map_err(|e| rejected(e.into()))?
            .claims;

        if claims.token_type.as_deref() != Some(REFRESH_TOKEN_TYPE) {
            return Err(rejected(TokenError::InvalidToken(
                "not a refresh token".into(),
            )));
        }

        let user_id = claims
            .user_id
            .as_ref()
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| {
                rejected(TokenError::InvalidToken(
                    "missing or malformed user_id".into(),
                ))
            })?;

        let stored = match self.cache.get(&refresh_token_key(user_id)).await? {
            Some(stored) => stored,
            None => {
                info!(user_id, "refresh token not found");
                return Err(TokenError::NotFound);
            }
        };

        if stored != token {
            warn!(user_id, "superseded or revoked refresh token presented; possible replay");
            return Err(TokenError::Revoked);
        }

        Ok(user_id)
    }

    /// Idempotent; only a transport failure is an error.
    pub async fn revoke_refresh_token(&self, user_id: u64) -> Result<(), TokenError> {
        self.cache.delete(&refresh_token_key(user_id)).await?;
        info!(user_id, "refresh token revoked");
        Ok(())
    }

    /// Stateless check of an access token: signature, algorithm, time window, issuer, audience.
    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.validate_nbf = true;
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "aud", "sub"]);

        let data = decode::<AccessClaims>(token, &self.decoding, &validation)?;
        debug!(user_id = data.claims.user_id, "access token verified");
        Ok(data.claims)
    }
}
