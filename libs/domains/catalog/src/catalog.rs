//! Component wiring
//!
//! Backends are created once and shared by every component through
//! `Arc<dyn Trait>`; nothing is global.

use std::sync::Arc;

use database::{DatabaseError, HealthStatus, RetryConfig};
use tracing::info;

use crate::cache::CacheStore;
use crate::config::{CatalogConfig, CatalogSettings};
use crate::lock::LockStore;
use crate::memory::{MemoryCache, MemoryStore};
use crate::models::{Category, Product};
use crate::mongodb::MongoEntityStore;
use crate::redis::RedisCache;
use crate::repository::{CategoryRepository, ProductRepository};
use crate::stock::StockAdjuster;
use crate::store::{EntityStore, StockStore};

/// Shared backend handles the components are built from
#[derive(Clone)]
pub struct CatalogBackends {
    pub cache: Arc<dyn CacheStore>,
    pub locks: Arc<dyn LockStore>,
    pub products: Arc<dyn EntityStore<Product>>,
    pub categories: Arc<dyn EntityStore<Category>>,
    pub stock: Arc<dyn StockStore>,
}

/// Optional connectivity probes, present only for network backends
#[derive(Clone)]
enum Probes {
    None,
    Network {
        redis: database::redis::ConnectionManager,
        mongo: database::mongodb::Database,
    },
}

/// Probe results for both backing stores
#[derive(Debug, Clone)]
pub struct CatalogHealth {
    pub cache: HealthStatus,
    pub store: HealthStatus,
}

impl CatalogHealth {
    pub fn is_healthy(&self) -> bool {
        self.cache.healthy && self.store.healthy
    }
}

pub struct Catalog {
    pub products: ProductRepository,
    pub categories: CategoryRepository,
    pub stock: StockAdjuster,
    cache: Arc<dyn CacheStore>,
    probes: Probes,
}

impl Catalog {
    pub fn from_backends(backends: CatalogBackends, settings: CatalogSettings) -> Self {
        Self {
            products: ProductRepository::new(
                backends.products,
                backends.cache.clone(),
                backends.locks.clone(),
                settings.clone(),
            ),
            categories: CategoryRepository::new(
                backends.categories,
                backends.cache.clone(),
                backends.locks,
                settings.clone(),
            ),
            stock: StockAdjuster::new(backends.stock, backends.cache.clone(), settings),
            cache: backends.cache,
            probes: Probes::None,
        }
    }

    /// Connect to Redis and MongoDB (with retry) and wire every component
    pub async fn connect(config: &CatalogConfig) -> Result<Self, DatabaseError> {
        let retry = RetryConfig::default();

        let redis = database::redis::connect_with_retry(&config.redis, &retry).await?;
        let client = database::mongodb::connect_with_retry(&config.mongo, &retry).await?;
        let db = client.database(&config.mongo.database);

        let cache = RedisCache::new(redis.clone());
        let products = MongoEntityStore::<Product>::with_collection(&db, &config.products_collection);
        let categories =
            MongoEntityStore::<Category>::with_collection(&db, &config.categories_collection);

        let backends = CatalogBackends {
            cache: Arc::new(cache.clone()),
            locks: Arc::new(cache),
            products: Arc::new(products.clone()),
            categories: Arc::new(categories),
            stock: Arc::new(products),
        };

        info!(
            database = %config.mongo.database,
            lock_scope = %config.settings.lock_scope,
            "Catalog wired to Redis and MongoDB"
        );

        let mut catalog = Self::from_backends(backends, config.settings.clone());
        catalog.probes = Probes::Network { redis, mongo: db };
        Ok(catalog)
    }

    /// Fully in-process catalog, seeded with `products` and `categories`
    pub fn in_memory(
        settings: CatalogSettings,
        products: impl IntoIterator<Item = Product>,
        categories: impl IntoIterator<Item = Category>,
    ) -> Self {
        let cache = Arc::new(MemoryCache::new());
        let product_store = Arc::new(MemoryStore::with_entities(products));

        Self::from_backends(
            CatalogBackends {
                cache: cache.clone(),
                locks: cache,
                products: product_store.clone(),
                categories: Arc::new(MemoryStore::with_entities(categories)),
                stock: product_store,
            },
            settings,
        )
    }

    /// Raw cache handle, for operator tooling such as manual invalidation
    pub fn cache(&self) -> &dyn CacheStore {
        self.cache.as_ref()
    }

    pub async fn health(&self) -> CatalogHealth {
        match &self.probes {
            Probes::None => CatalogHealth {
                cache: HealthStatus::healthy(0),
                store: HealthStatus::healthy(0),
            },
            Probes::Network { redis, mongo } => CatalogHealth {
                cache: database::redis::check_health(redis).await,
                store: database::mongodb::check_health(mongo).await,
            },
        }
    }
}
