//! Authoritative persistence interfaces
//!
//! Implementations can use different storage backends; `mongodb.rs` is the
//! production one and `memory.rs` backs tests and local tooling.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::CatalogResult;
use crate::models::CatalogEntity;

/// Persistence for one entity kind, keyed by id
#[async_trait]
pub trait EntityStore<E: CatalogEntity>: Send + Sync {
    /// Insert a new entity
    async fn insert(&self, entity: &E) -> CatalogResult<()>;

    /// Get an entity by id; `None` is the store's not-found signal
    async fn find_by_id(&self, id: Uuid) -> CatalogResult<Option<E>>;

    /// Load the whole collection
    async fn find_all(&self) -> CatalogResult<Vec<E>>;

    /// Replace an existing entity; returns `false` when no entity matched
    async fn replace(&self, entity: &E) -> CatalogResult<bool>;

    /// Delete by id; returns `false` when no entity matched
    async fn delete(&self, id: Uuid) -> CatalogResult<bool>;
}

/// Atomic per-product stock increments
#[async_trait]
pub trait StockStore: Send + Sync {
    /// Add `delta` (possibly negative) to a product's stock in one write.
    ///
    /// There is no floor: a decrement larger than the current stock leaves
    /// it negative. Returns `false` when no product matched.
    async fn increment_stock(&self, id: Uuid, delta: i64) -> CatalogResult<bool>;
}
