use thiserror::Error;

use crate::datastore::CacheError;

#[derive(Debug, Error)]
pub enum TokenError {
    /// Key or algorithm misconfiguration.
    #[error("failed to sign token: {0}")]
    Signing(String),

    #[error("refresh token store failure: {0}")]
    Persistence(#[from] CacheError),

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("refresh token not found")]
    NotFound,

    #[error("refresh token has been revoked")]
    Revoked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenErrorKind {
    Signing,
    Persistence,
    InvalidToken,
    NotFound,
    Revoked,
}

impl TokenError {
    pub fn kind(&self) -> TokenErrorKind {
        match self {
            TokenError::Signing(_) => TokenErrorKind::Signing,
            TokenError::Persistence(_) => TokenErrorKind::Persistence,
            TokenError::InvalidToken(_) => TokenErrorKind::InvalidToken,
            TokenError::NotFound => TokenErrorKind::NotFound,
            TokenError::Revoked => TokenErrorKind::Revoked,
        }
    }

    /// Failures the client caused; all of them get the same 401.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self.kind(),
            TokenErrorKind::InvalidToken | TokenErrorKind::NotFound | TokenErrorKind::Revoked
        )
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::InvalidToken("token expired".into()),
            ErrorKind::ImmatureSignature => TokenError::InvalidToken("token not yet valid".into()),
            ErrorKind::InvalidAlgorithm => {
                TokenError::InvalidToken("unexpected signing algorithm".into())
            }
            ErrorKind::InvalidSignature => TokenError::InvalidToken("bad signature".into()),
            _ => TokenError::InvalidToken(e.to_string()),
        }
    }
}
