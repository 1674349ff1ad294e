//! Redis connection for the cache and lock store

use std::time::Instant;

#[cfg(feature = "config")]
use core_config::{env_first, ConfigError, FromEnv};
use redis::Client;
use tracing::{info, instrument};

use crate::{retry_with_backoff, DatabaseError, DatabaseResult, HealthStatus, RetryConfig};

pub use redis::aio::ConnectionManager;

#[derive(Clone, Debug)]
pub struct RedisConfig {
    /// e.g. `redis://:password@cache:6379/0`
    pub url: String,
}

impl RedisConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self::new("redis://127.0.0.1:6379")
    }
}

/// `REDIS_URL`, falling back to `REDIS_HOST`
#[cfg(feature = "config")]
impl FromEnv for RedisConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(env_first(&["REDIS_URL", "REDIS_HOST"])?))
    }
}

/// Open a `ConnectionManager` and verify it with `PING`.
///
/// The manager reconnects on its own after transient failures and is cheap
/// to clone into every component.
#[instrument(skip(config))]
pub async fn connect(config: &RedisConfig) -> DatabaseResult<ConnectionManager> {
    let client = Client::open(config.url.as_str())?;
    let mut manager = ConnectionManager::new(client).await?;
    ping(&mut manager).await?;

    info!("Connected to Redis");
    Ok(manager)
}

pub async fn connect_with_retry(
    config: &RedisConfig,
    retry: &RetryConfig,
) -> DatabaseResult<ConnectionManager> {
    retry_with_backoff(|| connect(config), retry).await
}

async fn ping(conn: &mut ConnectionManager) -> DatabaseResult<()> {
    let reply: String = redis::cmd("PING").query_async(conn).await?;
    if reply != "PONG" {
        return Err(DatabaseError::ConnectionFailed(format!(
            "unexpected PING reply: {reply}"
        )));
    }
    Ok(())
}

pub async fn check_health(conn: &ConnectionManager) -> HealthStatus {
    let started = Instant::now();
    let mut conn = conn.clone();
    let result = ping(&mut conn).await;
    let elapsed = started.elapsed().as_millis() as u64;

    match result {
        Ok(()) => HealthStatus::healthy(elapsed),
        Err(e) => HealthStatus::unhealthy(e.to_string(), elapsed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_points_at_localhost() {
        assert_eq!(RedisConfig::default().url, "redis://127.0.0.1:6379");
    }

    #[tokio::test]
    async fn test_connect_rejects_malformed_url() {
        let result = connect(&RedisConfig::new("not-a-redis-url")).await;
        assert!(matches!(result, Err(DatabaseError::Redis(_))));
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_from_env_falls_back_to_redis_host() {
        temp_env::with_vars(
            [("REDIS_URL", None), ("REDIS_HOST", Some("redis://cache:6379"))],
            || {
                let config = RedisConfig::from_env().unwrap();
                assert_eq!(config.url, "redis://cache:6379");
            },
        );
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_from_env_missing() {
        temp_env::with_vars_unset(["REDIS_URL", "REDIS_HOST"], || {
            let err = RedisConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("REDIS_URL or REDIS_HOST"));
        });
    }
}
