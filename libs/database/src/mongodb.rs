//! MongoDB connection for the authoritative catalog store

use std::time::{Duration, Instant};

#[cfg(feature = "config")]
use core_config::{env_first, env_parse, ConfigError, FromEnv};
use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::Client;
use tracing::{info, instrument};

use crate::{retry_with_backoff, DatabaseResult, HealthStatus, RetryConfig};

pub use mongodb::{Collection, Database};

#[derive(Clone, Debug)]
pub struct MongoConfig {
    /// `mongodb://[user:pass@]host[:port][/?options]`
    pub url: String,
    pub database: String,
    /// Reported to the server in its connection logs
    pub app_name: Option<String>,
    pub max_pool_size: u32,
    pub connect_timeout: Duration,
    pub server_selection_timeout: Duration,
}

impl MongoConfig {
    pub fn new(url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: database.into(),
            ..Self::default()
        }
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            url: "mongodb://localhost:27017".to_string(),
            database: "inventory".to_string(),
            app_name: None,
            max_pool_size: 100,
            connect_timeout: Duration::from_secs(10),
            server_selection_timeout: Duration::from_secs(30),
        }
    }
}

/// Environment variables:
/// - `MONGODB_URL`, `MONGO_URL` or `MONGO_URI` (required)
/// - `MONGODB_DATABASE` or `MONGO_DATABASE` (required)
/// - `MONGODB_APP_NAME`
/// - `MONGODB_MAX_POOL_SIZE` (default: 100)
/// - `MONGODB_CONNECT_TIMEOUT_SECS` (default: 10)
/// - `MONGODB_SERVER_SELECTION_TIMEOUT_SECS` (default: 30)
#[cfg(feature = "config")]
impl FromEnv for MongoConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            url: env_first(&["MONGODB_URL", "MONGO_URL", "MONGO_URI"])?,
            database: env_first(&["MONGODB_DATABASE", "MONGO_DATABASE"])?,
            app_name: std::env::var("MONGODB_APP_NAME").ok(),
            max_pool_size: env_parse("MONGODB_MAX_POOL_SIZE", defaults.max_pool_size)?,
            connect_timeout: Duration::from_secs(env_parse(
                "MONGODB_CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout.as_secs(),
            )?),
            server_selection_timeout: Duration::from_secs(env_parse(
                "MONGODB_SERVER_SELECTION_TIMEOUT_SECS",
                defaults.server_selection_timeout.as_secs(),
            )?),
        })
    }
}

/// Build a pooled client and verify it with a `ping` against the database
#[instrument(skip(config), fields(database = %config.database))]
pub async fn connect(config: &MongoConfig) -> DatabaseResult<Client> {
    let mut options = ClientOptions::parse(&config.url).await?;
    options.max_pool_size = Some(config.max_pool_size);
    options.connect_timeout = Some(config.connect_timeout);
    options.server_selection_timeout = Some(config.server_selection_timeout);
    options.app_name = config.app_name.clone();

    let client = Client::with_options(options)?;
    client
        .database(&config.database)
        .run_command(doc! { "ping": 1 })
        .await?;

    info!("Connected to MongoDB");
    Ok(client)
}

pub async fn connect_with_retry(config: &MongoConfig, retry: &RetryConfig) -> DatabaseResult<Client> {
    retry_with_backoff(|| connect(config), retry).await
}

pub async fn check_health(db: &Database) -> HealthStatus {
    let started = Instant::now();
    let result = db.run_command(doc! { "ping": 1 }).await;
    let elapsed = started.elapsed().as_millis() as u64;

    match result {
        Ok(_) => HealthStatus::healthy(elapsed),
        Err(e) => HealthStatus::unhealthy(e.to_string(), elapsed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_keeps_pool_defaults() {
        let config = MongoConfig::new("mongodb://store:27017", "catalog").with_app_name("catalog-admin");
        assert_eq!(config.database, "catalog");
        assert_eq!(config.max_pool_size, 100);
        assert_eq!(config.app_name.as_deref(), Some("catalog-admin"));
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_from_env_accepts_legacy_names() {
        temp_env::with_vars(
            [
                ("MONGODB_URL", None),
                ("MONGO_URL", None),
                ("MONGO_URI", Some("mongodb://store:27017")),
                ("MONGODB_DATABASE", None),
                ("MONGO_DATABASE", Some("inventory")),
                ("MONGODB_CONNECT_TIMEOUT_SECS", Some("3")),
            ],
            || {
                let config = MongoConfig::from_env().unwrap();
                assert_eq!(config.url, "mongodb://store:27017");
                assert_eq!(config.database, "inventory");
                assert_eq!(config.connect_timeout, Duration::from_secs(3));
            },
        );
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_from_env_invalid_pool_size() {
        temp_env::with_vars(
            [
                ("MONGODB_URL", Some("mongodb://store:27017")),
                ("MONGODB_DATABASE", Some("inventory")),
                ("MONGODB_MAX_POOL_SIZE", Some("lots")),
            ],
            || {
                let err = MongoConfig::from_env().unwrap_err();
                assert!(err.to_string().contains("MONGODB_MAX_POOL_SIZE"));
            },
        );
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_from_env_requires_database() {
        temp_env::with_vars(
            [
                ("MONGODB_URL", Some("mongodb://store:27017")),
                ("MONGODB_DATABASE", None),
                ("MONGO_DATABASE", None),
            ],
            || {
                let err = MongoConfig::from_env().unwrap_err();
                assert!(err.to_string().contains("MONGODB_DATABASE"));
            },
        );
    }
}
