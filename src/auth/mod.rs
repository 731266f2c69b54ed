use crate::state::AppState;
use axum::Router;

pub mod authority;
pub mod claims;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod password;
pub mod repo;
pub mod repo_types;

pub use authority::TokenAuthority;
pub use claims::Principal;
pub use error::{TokenError, TokenErrorKind};

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::me_routes())
}
