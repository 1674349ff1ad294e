//! Catalog configuration
//!
//! Environment variables (in addition to the Redis and MongoDB ones read by
//! `database::redis::RedisConfig` and `database::mongodb::MongoConfig`):
//! - `CATALOG_CACHE_TTL_SECS` (default: 600)
//! - `CATALOG_LOCK_TTL_SECS` (default: 30)
//! - `CATALOG_REQUEST_TIMEOUT_MS` (default: 5000)
//! - `CATALOG_LOCK_SCOPE` (`operation` | `entity`, default: `operation`)
//! - `CATALOG_PRODUCTS_COLLECTION` (default: `products`)
//! - `CATALOG_CATEGORIES_COLLECTION` (default: `categories`)

use std::time::Duration;

use core_config::{env_or_default, env_parse, ConfigError, FromEnv};
use database::mongodb::MongoConfig;
use database::redis::RedisConfig;
use strum::{Display, EnumString};

/// Granularity of write locks.
///
/// `Operation` keys locks by `(kind, operation, id)`, so an `update` and a
/// `delete` on the same id do not exclude each other. `Entity` collapses the
/// operation part so every write on an id is serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LockScope {
    #[default]
    Operation,
    Entity,
}

/// Runtime knobs shared by the repositories and the stock adjuster
#[derive(Debug, Clone)]
pub struct CatalogSettings {
    /// TTL of entity and collection cache entries
    pub cache_ttl: Duration,
    /// TTL of write locks, independent of request deadlines
    pub lock_ttl: Duration,
    /// Budget shared by the lock, store and cache-read calls of one
    /// repository operation; cleanup calls and each stock increment get
    /// their own
    pub request_timeout: Duration,
    pub lock_scope: LockScope,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(600),
            lock_ttl: Duration::from_secs(30),
            request_timeout: Duration::from_millis(5000),
            lock_scope: LockScope::Operation,
        }
    }
}

impl CatalogSettings {
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_lock_ttl(mut self, ttl: Duration) -> Self {
        self.lock_ttl = ttl;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_lock_scope(mut self, scope: LockScope) -> Self {
        self.lock_scope = scope;
        self
    }
}

impl FromEnv for CatalogSettings {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let lock_scope = env_or_default("CATALOG_LOCK_SCOPE", "operation")
            .parse()
            .map_err(|e: strum::ParseError| ConfigError::ParseError {
                key: "CATALOG_LOCK_SCOPE".to_string(),
                details: e.to_string(),
            })?;

        Ok(Self {
            cache_ttl: Duration::from_secs(env_parse(
                "CATALOG_CACHE_TTL_SECS",
                defaults.cache_ttl.as_secs(),
            )?),
            lock_ttl: Duration::from_secs(env_parse(
                "CATALOG_LOCK_TTL_SECS",
                defaults.lock_ttl.as_secs(),
            )?),
            request_timeout: Duration::from_millis(env_parse(
                "CATALOG_REQUEST_TIMEOUT_MS",
                defaults.request_timeout.as_millis() as u64,
            )?),
            lock_scope,
        })
    }
}

/// Everything needed to connect the catalog core to its backing stores
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub redis: RedisConfig,
    pub mongo: MongoConfig,
    pub products_collection: String,
    pub categories_collection: String,
    pub settings: CatalogSettings,
}

impl FromEnv for CatalogConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            redis: RedisConfig::from_env()?,
            mongo: MongoConfig::from_env()?,
            products_collection: env_or_default("CATALOG_PRODUCTS_COLLECTION", "products"),
            categories_collection: env_or_default("CATALOG_CATEGORIES_COLLECTION", "categories"),
            settings: CatalogSettings::from_env()?,
        })
    }
}
