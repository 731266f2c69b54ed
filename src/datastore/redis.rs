use std::{future::Future, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client, IntoConnectionInfo, RedisResult};
use tracing::{debug, info};

use crate::config::RedisConfig;
use crate::datastore::cache::{CacheError, KeyValueCache};

/// Redis-backed cache client. Clones share one multiplexed connection.
#[derive(Clone)]
pub struct RedisClient {
    conn: ConnectionManager,
    timeout: Duration,
}

impl RedisClient {
    /// Connects and pings; an unreachable server fails startup.
    pub async fn connect(cfg: &RedisConfig) -> anyhow::Result<Self> {
        let mut info = format!("redis://{}/{}", cfg.addr, cfg.db)
            .into_connection_info()
            .context("parse redis address")?;
        info.redis.password = cfg.password.clone();

        let timeout = Duration::from_millis(cfg.timeout_ms);
        let client = Client::open(info).context("construct redis client")?;
        let conn = tokio::time::timeout(timeout, ConnectionManager::new(client))
            .await
            .context("redis connect timed out")?
            .context("failed to connect to redis")?;

        let client = Self { conn, timeout };
        client.ping().await.context("failed to connect to redis")?;
        info!(addr = %cfg.addr, db = cfg.db, "redis connected");
        Ok(client)
    }

    async fn run<T, F>(&self, op: F) -> Result<T, CacheError>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match tokio::time::timeout(self.timeout, op).await {
            Ok(res) => res.map_err(CacheError::from),
            Err(_) => Err(CacheError::Timeout(self.timeout)),
        }
    }

    pub async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let pong: String = self
            .run(redis::cmd("PING").query_async(&mut conn))
            .await?;
        debug!(reply = %pong, "redis ping");
        Ok(())
    }

    pub async fn incr(&self, key: &str) -> Result<i64, CacheError> {
        let mut conn = self.conn.clone();
        self.run(conn.incr(key, 1)).await
    }

    pub async fn decr(&self, key: &str) -> Result<i64, CacheError> {
        let mut conn = self.conn.clone();
        self.run(conn.decr(key, 1)).await
    }

    /// Returns false when the key does not exist.
    pub async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        self.run(conn.expire(key, ttl.as_secs() as i64)).await
    }

    /// `None` when the key is missing or has no expiry.
    pub async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError> {
        let mut conn = self.conn.clone();
        let secs: i64 = self.run(conn.ttl(key)).await?;
        Ok((secs >= 0).then(|| Duration::from_secs(secs as u64)))
    }

    pub async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let mut conn = self.conn.clone();
        self.run(conn.keys(pattern)).await
    }

    pub async fn flush_db(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        self.run(redis::cmd("FLUSHDB").query_async(&mut conn)).await
    }
}

#[async_trait]
impl KeyValueCache for RedisClient {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        if ttl.is_zero() {
            self.run(conn.set(key, value)).await
        } else {
            // SET EX has second granularity; never round a sub-second ttl down to zero
            let secs = ttl.as_secs().max(1);
            self.run(conn.set_ex(key, value, secs)).await
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        self.run(conn.get(key)).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        self.run(conn.del(key)).await
    }
}
