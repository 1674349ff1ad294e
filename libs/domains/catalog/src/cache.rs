//! Cache store abstraction
//!
//! A key → string store with per-key expiration. Values are opaque to the
//! store; callers serialize and deserialize, and treat anything they cannot
//! parse as a miss.

use std::time::Duration;

use async_trait::async_trait;
use observability::CatalogMetrics;
use serde::{de::DeserializeOwned, Serialize};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{before, within, CatalogResult};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get a value; expired and absent keys both read as `None`
    async fn get(&self, key: &str) -> CatalogResult<Option<String>>;

    /// Set a value that expires after `ttl`
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CatalogResult<()>;

    /// Delete a key; deleting an absent key succeeds
    async fn delete(&self, key: &str) -> CatalogResult<()>;
}

/// Read and decode a cached value, degrading every failure to a miss.
pub(crate) async fn read_json<T: DeserializeOwned>(
    cache: &dyn CacheStore,
    key: &str,
    deadline: Instant,
) -> Option<T> {
    let raw = match before(deadline, "cache_get", cache.get(key)).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!(key, error = %e, "Cache read failed, falling back to store");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(key, error = %e, "Discarding malformed cache entry");
            None
        }
    }
}

/// Best-effort cache population after a store read.
pub(crate) async fn write_json<T: Serialize + ?Sized>(
    cache: &dyn CacheStore,
    key: &str,
    value: &T,
    ttl: Duration,
    deadline: Instant,
) {
    let payload = match serde_json::to_string(value) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(key, error = %e, "Failed to serialize value for cache");
            return;
        }
    };

    if let Err(e) = before(deadline, "cache_set", cache.set(key, &payload, ttl)).await {
        warn!(key, error = %e, "Failed to populate cache");
    }
}

/// Delete every key, logging (not returning) failures.
///
/// A failed delete leaves a stale entry that is bounded by its TTL.
pub(crate) async fn invalidate(
    cache: &dyn CacheStore,
    kind: &'static str,
    keys: &[&str],
    timeout: Duration,
) {
    for key in keys {
        match within(timeout, "cache_delete", cache.delete(key)).await {
            Ok(()) => debug!(key, "Cache entry invalidated"),
            Err(e) => {
                CatalogMetrics::record_invalidation_failure(kind);
                warn!(key, error = %e, "Cache invalidation failed; entry stays until TTL");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatalogError;
    use crate::models::{CatalogEntity, NewProduct, Product};

    const TIMEOUT: Duration = Duration::from_secs(1);

    #[tokio::test]
    async fn test_read_json_treats_malformed_value_as_miss() {
        let mut cache = MockCacheStore::new();
        cache
            .expect_get()
            .returning(|_| Ok(Some("{not json".to_string())));

        let value: Option<Product> = read_json(&cache, "product:x", Instant::now() + TIMEOUT).await;
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_read_json_treats_cache_error_as_miss() {
        let mut cache = MockCacheStore::new();
        cache
            .expect_get()
            .returning(|_| Err(CatalogError::Cache("connection refused".to_string())));

        let value: Option<Product> = read_json(&cache, "product:x", Instant::now() + TIMEOUT).await;
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_write_json_swallows_cache_error() {
        let product = Product::new(NewProduct {
            name: "Bolt".to_string(),
            price: 5,
            ..Default::default()
        });
        let key = Product::cache_key(product.id);
        let expected_key = key.clone();

        let mut cache = MockCacheStore::new();
        cache
            .expect_set()
            .withf(move |key, value, ttl| {
                key == expected_key && value.contains("Bolt") && *ttl == Duration::from_secs(60)
            })
            .times(1)
            .returning(|_, _, _| Err(CatalogError::Cache("read only replica".to_string())));

        write_json(
            &cache,
            &key,
            &product,
            Duration::from_secs(60),
            Instant::now() + TIMEOUT,
        )
        .await;
    }

    #[tokio::test]
    async fn test_invalidate_continues_after_failure() {
        let mut cache = MockCacheStore::new();
        cache
            .expect_delete()
            .withf(|key| key == "product:a")
            .times(1)
            .returning(|_| Err(CatalogError::Cache("timeout".to_string())));
        cache
            .expect_delete()
            .withf(|key| key == "products:all")
            .times(1)
            .returning(|_| Ok(()));

        invalidate(&cache, "product", &["product:a", "products:all"], TIMEOUT).await;
    }
}
