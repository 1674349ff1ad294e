//! Bulk stock adjustment
//!
//! Each product gets its own atomic increment; there is no transaction
//! across products. A failure stops the batch and leaves earlier writes
//! applied.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use observability::CatalogMetrics;
use serde::Deserialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::cache::{self, CacheStore};
use crate::config::CatalogSettings;
use crate::error::{within, CatalogError, CatalogResult};
use crate::models::{CatalogEntity, Product};
use crate::store::StockStore;

/// Requested change to one product's stock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct StockUpdate {
    pub quantity: u32,
    pub increment: bool,
}

impl StockUpdate {
    pub fn increment(quantity: u32) -> Self {
        Self {
            quantity,
            increment: true,
        }
    }

    pub fn decrement(quantity: u32) -> Self {
        Self {
            quantity,
            increment: false,
        }
    }

    /// Signed delta applied to the stored stock
    pub fn delta(&self) -> i64 {
        let quantity = i64::from(self.quantity);
        if self.increment {
            quantity
        } else {
            -quantity
        }
    }
}

pub struct StockAdjuster {
    store: Arc<dyn StockStore>,
    cache: Arc<dyn CacheStore>,
    settings: CatalogSettings,
}

impl StockAdjuster {
    pub fn new(
        store: Arc<dyn StockStore>,
        cache: Arc<dyn CacheStore>,
        settings: CatalogSettings,
    ) -> Self {
        Self {
            store,
            cache,
            settings,
        }
    }

    /// Apply every update and invalidate the affected cache keys.
    ///
    /// The list key is dropped again after the batch, success or not, since
    /// a concurrent reader may have repopulated it mid-batch.
    #[instrument(skip(self, updates), fields(count = updates.len()))]
    pub async fn bulk_adjust(&self, updates: &HashMap<Uuid, StockUpdate>) -> CatalogResult<()> {
        if updates.is_empty() {
            return Ok(());
        }

        let started = Instant::now();

        let mut ids: Vec<Uuid> = updates.keys().copied().collect();
        ids.sort();

        let product_keys: Vec<String> = ids.iter().map(|id| Product::cache_key(*id)).collect();
        let mut stale: Vec<&str> = product_keys.iter().map(String::as_str).collect();
        stale.push(Product::LIST_KEY);
        self.invalidate(&stale).await;

        let result = self.apply(&ids, updates).await;

        self.invalidate(&[Product::LIST_KEY]).await;

        CatalogMetrics::record_stock_adjustment(
            updates.len(),
            result.is_ok(),
            started.elapsed().as_secs_f64(),
        );

        match &result {
            Ok(()) => info!(count = updates.len(), "Stock adjusted"),
            Err(e) => warn!(error = %e, "Bulk stock adjustment stopped early"),
        }
        result
    }

    async fn apply(&self, ids: &[Uuid], updates: &HashMap<Uuid, StockUpdate>) -> CatalogResult<()> {
        let mut applied = 0;
        for id in ids {
            let Some(update) = updates.get(id) else {
                continue;
            };

            let outcome = within(
                self.settings.request_timeout,
                "increment_stock",
                self.store.increment_stock(*id, update.delta()),
            )
            .await;

            match outcome {
                Ok(true) => applied += 1,
                Ok(false) => warn!(product_id = %id, "Stock update matched no product"),
                Err(e) => {
                    return Err(CatalogError::PartialBulk {
                        applied,
                        source: Box::new(e),
                    })
                }
            }
        }
        Ok(())
    }

    async fn invalidate(&self, keys: &[&str]) {
        cache::invalidate(
            self.cache.as_ref(),
            Product::KIND,
            keys,
            self.settings.request_timeout,
        )
        .await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::cache::MockCacheStore;
    use crate::memory::{MemoryCache, MemoryStore};
    use crate::models::NewProduct;

    fn product(name: &str, stock: i64) -> Product {
        Product::new(NewProduct {
            name: name.to_string(),
            price: 100,
            stock,
            ..Default::default()
        })
    }

    /// Fails every increment after the first `healthy` ones
    struct FlakyStockStore {
        healthy: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl StockStore for FlakyStockStore {
        async fn increment_stock(&self, _id: Uuid, _delta: i64) -> CatalogResult<bool> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.healthy {
                Ok(true)
            } else {
                Err(CatalogError::Database("write conflict".to_string()))
            }
        }
    }

    #[test]
    fn test_delta_sign() {
        assert_eq!(StockUpdate::increment(3).delta(), 3);
        assert_eq!(StockUpdate::decrement(5).delta(), -5);
        assert_eq!(StockUpdate::decrement(u32::MAX).delta(), -i64::from(u32::MAX));
    }

    #[tokio::test]
    async fn test_empty_batch_touches_nothing() {
        let cache = MockCacheStore::new();
        let adjuster = StockAdjuster::new(
            Arc::new(MemoryStore::<Product>::new()),
            Arc::new(cache),
            CatalogSettings::default(),
        );

        assert!(adjuster.bulk_adjust(&HashMap::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_bulk_adjust_applies_and_invalidates() {
        let p1 = product("P1", 10);
        let p2 = product("P2", 5);
        let store = Arc::new(MemoryStore::with_entities([p1.clone(), p2.clone()]));
        let cache = Arc::new(MemoryCache::new());

        let ttl = Duration::from_secs(60);
        for key in [
            Product::cache_key(p1.id),
            Product::cache_key(p2.id),
            Product::LIST_KEY.to_string(),
        ] {
            cache.set(&key, "{}", ttl).await.unwrap();
        }

        let adjuster = StockAdjuster::new(store.clone(), cache.clone(), CatalogSettings::default());
        let updates = HashMap::from([
            (p1.id, StockUpdate::increment(3)),
            (p2.id, StockUpdate::decrement(5)),
        ]);
        adjuster.bulk_adjust(&updates).await.unwrap();

        assert_eq!(store.snapshot(p1.id).unwrap().stock, 13);
        assert_eq!(store.snapshot(p2.id).unwrap().stock, 0);
        assert!(!cache.contains(&Product::cache_key(p1.id)));
        assert!(!cache.contains(&Product::cache_key(p2.id)));
        assert!(!cache.contains(Product::LIST_KEY));
    }

    #[tokio::test]
    async fn test_decrement_past_zero_leaves_negative_stock() {
        let p1 = product("P1", 2);
        let store = Arc::new(MemoryStore::with_entities([p1.clone()]));
        let adjuster = StockAdjuster::new(
            store.clone(),
            Arc::new(MemoryCache::new()),
            CatalogSettings::default(),
        );

        let updates = HashMap::from([(p1.id, StockUpdate::decrement(5))]);
        adjuster.bulk_adjust(&updates).await.unwrap();
        assert_eq!(store.snapshot(p1.id).unwrap().stock, -3);
    }

    #[tokio::test]
    async fn test_unknown_product_is_skipped() {
        let p1 = product("P1", 1);
        let store = Arc::new(MemoryStore::with_entities([p1.clone()]));
        let adjuster = StockAdjuster::new(
            store.clone(),
            Arc::new(MemoryCache::new()),
            CatalogSettings::default(),
        );

        let updates = HashMap::from([
            (p1.id, StockUpdate::increment(1)),
            (Uuid::now_v7(), StockUpdate::increment(1)),
        ]);
        adjuster.bulk_adjust(&updates).await.unwrap();
        assert_eq!(store.snapshot(p1.id).unwrap().stock, 2);
    }

    #[tokio::test]
    async fn test_failure_reports_applied_and_drops_list_key_again() {
        let store = Arc::new(FlakyStockStore {
            healthy: 1,
            calls: AtomicUsize::new(0),
        });

        let mut cache = MockCacheStore::new();
        // 3 product keys + list key before, list key again after
        cache.expect_delete().times(5).returning(|_| Ok(()));

        let adjuster = StockAdjuster::new(store.clone(), Arc::new(cache), CatalogSettings::default());
        let updates = HashMap::from([
            (Uuid::now_v7(), StockUpdate::increment(1)),
            (Uuid::now_v7(), StockUpdate::increment(1)),
            (Uuid::now_v7(), StockUpdate::increment(1)),
        ]);

        let err = adjuster.bulk_adjust(&updates).await.unwrap_err();
        assert!(matches!(
            err,
            CatalogError::PartialBulk { applied: 1, ref source } if matches!(**source, CatalogError::Database(_))
        ));
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }
}
