use std::{path::PathBuf, str::FromStr};

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Full connection string; takes precedence over the individual fields.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub max_connections: u32,
    /// SQL files executed in order right after connecting.
    pub scripts: Vec<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub addr: String,
    pub password: Option<String>,
    pub db: i64,
    pub timeout_ms: u64,
}

/// One week.
pub const MAX_ACCESS_TTL_MINUTES: i64 = 7 * 24 * 60;
/// Ten years.
pub const MAX_REFRESH_TTL_DAYS: i64 = 3650;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
}

impl JwtConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.secret.trim().is_empty() {
            return Err("jwt secret must not be empty".into());
        }
        if self.access_ttl_minutes <= 0 {
            return Err("access token ttl must be positive".into());
        }
        if self.refresh_ttl_days <= 0 {
            return Err("refresh token ttl must be positive".into());
        }
        if self.access_ttl_minutes > MAX_ACCESS_TTL_MINUTES {
            return Err(format!(
                "access token ttl must not exceed {MAX_ACCESS_TTL_MINUTES} minutes"
            ));
        }
        if self.refresh_ttl_days > MAX_REFRESH_TTL_DAYS {
            return Err(format!(
                "refresh token ttl must not exceed {MAX_REFRESH_TTL_DAYS} days"
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    pub filter: String,
    pub format: LogFormat,
    /// Directory for `app.log` and `error.log`; stdout only when unset.
    pub dir: Option<PathBuf>,
    pub app_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub per_second: u32,
    pub burst: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Redis,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub cache_backend: CacheBackend,
    pub jwt: JwtConfig,
    pub log: LogConfig,
    pub rate_limit: RateLimitConfig,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let server = ServerConfig {
            host: env_string("APP_HOST", "0.0.0.0"),
            port: env_or("APP_PORT", 8080),
        };

        let database = DatabaseConfig {
            url: env_opt("DATABASE_URL"),
            host: env_string("DB_HOST", "localhost"),
            port: env_or("DB_PORT", 5432),
            user: env_string("DB_USER", "postgres"),
            password: env_string("DB_PASSWORD", ""),
            name: env_string("DB_NAME", "postgres"),
            max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            scripts: env_opt("DB_SCRIPTS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(PathBuf::from)
                        .collect()
                })
                .unwrap_or_default(),
        };

        let redis = RedisConfig {
            addr: env_string("REDIS_ADDR", "127.0.0.1:6379"),
            password: env_opt("REDIS_PASSWORD"),
            db: env_or("REDIS_DB", 0),
            timeout_ms: env_or("REDIS_TIMEOUT_MS", 2000),
        };

        let cache_backend = match env_string("CACHE_BACKEND", "redis").as_str() {
            "memory" => CacheBackend::Memory,
            "redis" => CacheBackend::Redis,
            other => anyhow::bail!("unknown CACHE_BACKEND {other:?}"),
        };

        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is required")?,
            issuer: env_string("JWT_ISSUER", "app-server"),
            audience: env_string("JWT_AUDIENCE", "app-server-clients"),
            access_ttl_minutes: env_or("JWT_ACCESS_EXPIRY_MINUTES", 15),
            refresh_ttl_days: env_or("JWT_REFRESH_EXPIRY_DAYS", 7),
        };
        jwt.validate().map_err(anyhow::Error::msg)?;

        let log = LogConfig {
            filter: env_string("RUST_LOG", "app_server=info,tower_http=info"),
            format: match env_string("LOG_FORMAT", "json").as_str() {
                "pretty" => LogFormat::Pretty,
                _ => LogFormat::Json,
            },
            dir: match std::env::var("LOG_DIR") {
                Ok(v) if v.is_empty() => None,
                Ok(v) => Some(PathBuf::from(v)),
                Err(_) => Some(PathBuf::from("logs")),
            },
            app_name: env_string("APP_NAME", "app-server"),
        };

        let rate_limit = RateLimitConfig {
            per_second: env_or("RATE_LIMIT_PER_SECOND", 20),
            burst: env_or("RATE_LIMIT_BURST", 40),
        };

        Ok(Self {
            server,
            database,
            redis,
            cache_backend,
            jwt,
            log,
            rate_limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_everything_but_the_secret() {
        temp_env::with_vars(
            [
                ("JWT_SECRET", Some("s3cret")),
                ("DB_SCRIPTS", Some("sql/a.sql, sql/b.sql,")),
                ("APP_PORT", None),
                ("CACHE_BACKEND", None),
                ("LOG_DIR", None),
                ("JWT_ACCESS_EXPIRY_MINUTES", None),
                ("JWT_REFRESH_EXPIRY_DAYS", None),
            ],
            || {
                let cfg = AppConfig::from_env().expect("config loads");
                assert_eq!(cfg.server.port, 8080);
                assert_eq!(cfg.jwt.access_ttl_minutes, 15);
                assert_eq!(cfg.jwt.refresh_ttl_days, 7);
                assert_eq!(cfg.cache_backend, CacheBackend::Redis);
                assert_eq!(cfg.log.dir, Some(PathBuf::from("logs")));
                assert_eq!(
                    cfg.database.scripts,
                    vec![PathBuf::from("sql/a.sql"), PathBuf::from("sql/b.sql")]
                );
            },
        );
    }

    #[test]
    fn missing_secret_is_an_error() {
        temp_env::with_var_unset("JWT_SECRET", || {
            let err = AppConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("JWT_SECRET"));
        });
    }

    #[test]
    fn blank_secret_fails_validation() {
        temp_env::with_vars(
            [("JWT_SECRET", Some("   ")), ("CACHE_BACKEND", None)],
            || {
                assert!(AppConfig::from_env().is_err());
            },
        );
    }

    #[test]
    fn validate_rejects_non_positive_ttls() {
        let mut jwt = JwtConfig {
            secret: "k".into(),
            issuer: "i".into(),
            audience: "a".into(),
            access_ttl_minutes: 0,
            refresh_ttl_days: 1,
        };
        assert!(jwt.validate().is_err());
        jwt.access_ttl_minutes = 5;
        jwt.refresh_ttl_days = -1;
        assert!(jwt.validate().is_err());
        jwt.refresh_ttl_days = 1;
        assert!(jwt.validate().is_ok());
    }

    #[test]
    fn validate_rejects_oversized_ttls() {
        let mut jwt = JwtConfig {
            secret: "k".into(),
            issuer: "i".into(),
            audience: "a".into(),
            access_ttl_minutes: MAX_ACCESS_TTL_MINUTES,
            refresh_ttl_days: MAX_REFRESH_TTL_DAYS,
        };
        assert!(jwt.validate().is_ok());
        jwt.refresh_ttl_days = i64::MAX / 1000;
        assert!(jwt.validate().is_err());
        jwt.refresh_ttl_days = MAX_REFRESH_TTL_DAYS + 1;
        assert!(jwt.validate().is_err());
        jwt.refresh_ttl_days = 1;
        jwt.access_ttl_minutes = MAX_ACCESS_TTL_MINUTES + 1;
        assert!(jwt.validate().is_err());
    }
}
