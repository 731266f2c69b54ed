use std::sync::Arc;

use anyhow::Context;
use axum::extract::FromRef;

use crate::auth::{
    authority::TokenAuthority,
    repo::{PgPrincipalStore, PrincipalStore},
};
use crate::config::{AppConfig, CacheBackend};
use crate::datastore::{postgres, KeyValueCache, MemoryCache, RedisClient};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub principals: Arc<dyn PrincipalStore>,
    pub tokens: Arc<TokenAuthority>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let db = postgres::connect(&config.database).await?;
        let principals = Arc::new(PgPrincipalStore::new(db)) as Arc<dyn PrincipalStore>;

        let cache: Arc<dyn KeyValueCache> = match config.cache_backend {
            CacheBackend::Redis => Arc::new(RedisClient::connect(&config.redis).await?),
            CacheBackend::Memory => {
                tracing::warn!("using in-process cache; refresh tokens will not survive restarts");
                Arc::new(MemoryCache::new())
            }
        };

        let tokens = TokenAuthority::new(&config.jwt, cache).context("configure token authority")?;

        Ok(Self::from_parts(Arc::new(config), principals, Arc::new(tokens)))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        principals: Arc<dyn PrincipalStore>,
        tokens: Arc<TokenAuthority>,
    ) -> Self {
        Self {
            config,
            principals,
            tokens,
        }
    }
}

impl FromRef<AppState> for Arc<TokenAuthority> {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}
