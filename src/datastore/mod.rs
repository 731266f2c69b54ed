pub mod cache;
pub mod postgres;
pub mod redis;

pub use cache::{CacheError, KeyValueCache, MemoryCache};
pub use self::redis::RedisClient;
