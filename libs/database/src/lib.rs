//! Connectors for the catalog's backing stores
//!
//! Redis carries the cache and the write locks, MongoDB is the
//! authoritative store. Both connectors retry with exponential backoff so a
//! process can start before its dependencies are ready.
//!
//! # Features
//!
//! - `redis` (default) - Redis `ConnectionManager`
//! - `mongodb` (default) - MongoDB `Client`
//! - `config` - `core_config::FromEnv` for the connection configs
//!
//! ```ignore
//! use database::{mongodb, redis, RetryConfig};
//!
//! let retry = RetryConfig::new().with_max_retries(5);
//! let conn = redis::connect_with_retry(&redis::RedisConfig::from_env()?, &retry).await?;
//! let client = mongodb::connect_with_retry(&mongodb::MongoConfig::from_env()?, &retry).await?;
//! ```

pub mod error;
pub mod retry;

#[cfg(feature = "redis")]
pub mod redis;

#[cfg(feature = "mongodb")]
pub mod mongodb;

pub use error::{DatabaseError, DatabaseResult};
pub use retry::{retry_with_backoff, RetryConfig};

/// Result of a connectivity probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthStatus {
    pub healthy: bool,
    pub message: Option<String>,
    pub response_time_ms: u64,
}

impl HealthStatus {
    pub fn healthy(response_time_ms: u64) -> Self {
        Self {
            healthy: true,
            message: None,
            response_time_ms,
        }
    }

    pub fn unhealthy(message: impl Into<String>, response_time_ms: u64) -> Self {
        Self {
            healthy: false,
            message: Some(message.into()),
            response_time_ms,
        }
    }
}
