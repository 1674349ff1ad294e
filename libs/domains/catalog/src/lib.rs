//! Catalog consistency core
//!
//! Keeps a Redis cache consistent with the MongoDB catalog under concurrent
//! writers, serializes conflicting writes through a distributed lock and
//! answers product queries from the cached collection snapshot.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  Catalog (wiring)                                        │
//! │  ┌─────────────────────┐  ┌────────────┐  ┌───────────┐  │
//! │  │ CatalogRepository<E>│  │ QueryEngine│  │  Stock    │  │
//! │  │ cache-aside + locks │◄─┤ (snapshot) │  │ Adjuster  │  │
//! │  └──┬────────┬─────┬───┘  └────────────┘  └──┬─────┬──┘  │
//! └─────┼────────┼─────┼─────────────────────────┼─────┼─────┘
//!       ▼        ▼     ▼                         ▼     ▼
//!   LockStore CacheStore EntityStore<E>    StockStore CacheStore
//!       │        │          │                  │
//!       └─Redis──┘       MongoDB ──────────────┘
//! ```
//!
//! # Keys
//!
//! - `<kind>:<id>` single entity, e.g. `product:0190...`
//! - `<kind>s:all` collection snapshot, e.g. `products:all`
//! - `lock:<kind>:<operation>:<id>` write lock
//!
//! # Example
//!
//! ```rust,ignore
//! use core_config::FromEnv;
//! use domain_catalog::{Catalog, CatalogConfig, InMemoryQueryEngine, ProductQuery};
//!
//! let catalog = Catalog::connect(&CatalogConfig::from_env()?).await?;
//! let page = catalog
//!     .products
//!     .query(&InMemoryQueryEngine, &ProductQuery::default())
//!     .await?;
//! ```

pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod lock;
pub mod memory;
pub mod models;
pub mod mongodb;
pub mod query;
pub mod redis;
pub mod repository;
pub mod stock;
pub mod store;

pub use self::cache::CacheStore;
pub use self::catalog::{Catalog, CatalogBackends, CatalogHealth};
pub use self::config::{CatalogConfig, CatalogSettings, LockScope};
pub use self::error::{CatalogError, CatalogResult};
pub use self::lock::{DistributedLock, LockStore, WriteOperation};
pub use self::memory::{MemoryCache, MemoryStore};
pub use self::models::{CatalogEntity, Category, Lookup, NewCategory, NewProduct, Product};
pub use self::mongodb::MongoEntityStore;
pub use self::query::{
    InMemoryQueryEngine, Page, ProductFilter, ProductQuery, ProductQueryEngine, ProductSort,
    SortField, SortOrder,
};
pub use self::redis::RedisCache;
pub use self::repository::{CatalogRepository, CategoryRepository, ProductRepository};
pub use self::stock::{StockAdjuster, StockUpdate};
pub use self::store::{EntityStore, StockStore};
