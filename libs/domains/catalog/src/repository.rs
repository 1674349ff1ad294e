//! Cache-aside catalog repository
//!
//! Reads check `<kind>:<id>` (or `<kind>s:all`) first, fall back to the
//! store on a miss and repopulate the cache. Writes take a scoped distributed
//! lock, mutate the store, then delete the stale cache keys before
//! returning.

use std::sync::Arc;

use observability::CatalogMetrics;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::cache::{self, CacheStore};
use crate::config::CatalogSettings;
use crate::error::{before, within, CatalogError, CatalogResult};
use crate::lock::{DistributedLock, LockStore, WriteOperation};
use crate::models::{CatalogEntity, Category, Lookup, Product};
use crate::query::{Page, ProductQuery, ProductQueryEngine};
use crate::store::EntityStore;

/// Repository for one entity kind
pub struct CatalogRepository<E: CatalogEntity> {
    store: Arc<dyn EntityStore<E>>,
    cache: Arc<dyn CacheStore>,
    locks: Arc<dyn LockStore>,
    settings: CatalogSettings,
}

pub type ProductRepository = CatalogRepository<Product>;
pub type CategoryRepository = CatalogRepository<Category>;

impl<E: CatalogEntity> Clone for CatalogRepository<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: Arc::clone(&self.cache),
            locks: Arc::clone(&self.locks),
            settings: self.settings.clone(),
        }
    }
}

impl<E: CatalogEntity> CatalogRepository<E> {
    pub fn new(
        store: Arc<dyn EntityStore<E>>,
        cache: Arc<dyn CacheStore>,
        locks: Arc<dyn LockStore>,
        settings: CatalogSettings,
    ) -> Self {
        Self {
            store,
            cache,
            locks,
            settings,
        }
    }

    pub fn settings(&self) -> &CatalogSettings {
        &self.settings
    }

    /// Insert a new entity under the `create` lock and drop the list snapshot
    #[instrument(skip(self, entity), fields(kind = E::KIND, id = %entity.id()))]
    pub async fn create(&self, entity: &E) -> CatalogResult<()> {
        let deadline = self.deadline();
        let lock = self.lock(WriteOperation::Create, entity.id(), deadline).await?;

        let result = before(deadline, "insert", self.store.insert(entity)).await;
        if result.is_ok() {
            self.invalidate(&[E::LIST_KEY]).await;
        }

        self.unlock(&lock).await;
        self.finish(WriteOperation::Create, result)
    }

    /// Replace an existing entity under the `update` lock and drop both keys
    #[instrument(skip(self, entity), fields(kind = E::KIND, id = %entity.id()))]
    pub async fn update(&self, entity: &E) -> CatalogResult<()> {
        let id = entity.id();
        let deadline = self.deadline();
        let lock = self.lock(WriteOperation::Update, id, deadline).await?;

        let result = match before(deadline, "replace", self.store.replace(entity)).await {
            Ok(true) => {
                let key = E::cache_key(id);
                self.invalidate(&[E::LIST_KEY, key.as_str()]).await;
                Ok(())
            }
            Ok(false) => Err(CatalogError::NotFound(id)),
            Err(e) => Err(e),
        };

        self.unlock(&lock).await;
        self.finish(WriteOperation::Update, result)
    }

    /// Delete by id under the `delete` lock and drop both keys.
    ///
    /// Deleting an id that does not exist is not an error.
    #[instrument(skip(self), fields(kind = E::KIND))]
    pub async fn delete(&self, id: Uuid) -> CatalogResult<()> {
        let deadline = self.deadline();
        let lock = self.lock(WriteOperation::Delete, id, deadline).await?;

        let result = before(deadline, "delete", self.store.delete(id))
            .await
            .map(|deleted| {
                if !deleted {
                    debug!(%id, "Delete matched no entity");
                }
            });
        if result.is_ok() {
            let key = E::cache_key(id);
            self.invalidate(&[E::LIST_KEY, key.as_str()]).await;
        }

        self.unlock(&lock).await;
        self.finish(WriteOperation::Delete, result)
    }

    /// Cache-aside single lookup
    #[instrument(skip(self), fields(kind = E::KIND))]
    pub async fn find_by_id(&self, id: Uuid) -> CatalogResult<Lookup<E>> {
        let deadline = self.deadline();
        let key = E::cache_key(id);

        if let Some(entity) = cache::read_json::<E>(self.cache.as_ref(), &key, deadline).await {
            CatalogMetrics::record_cache_lookup(E::KIND, true);
            debug!(key = %key, "Cache hit");
            return Ok(Lookup::Found(entity));
        }
        CatalogMetrics::record_cache_lookup(E::KIND, false);

        let found = before(deadline, "find_by_id", self.store.find_by_id(id)).await?;

        match found {
            Some(entity) => {
                cache::write_json(
                    self.cache.as_ref(),
                    &key,
                    &entity,
                    self.settings.cache_ttl,
                    deadline,
                )
                .await;
                Ok(Lookup::Found(entity))
            }
            None => Ok(Lookup::NotFound),
        }
    }

    /// Cache-aside full collection snapshot
    #[instrument(skip(self), fields(kind = E::KIND))]
    pub async fn find_all(&self) -> CatalogResult<Vec<E>> {
        let deadline = self.deadline();

        if let Some(entities) =
            cache::read_json::<Vec<E>>(self.cache.as_ref(), E::LIST_KEY, deadline).await
        {
            CatalogMetrics::record_cache_lookup(E::KIND, true);
            return Ok(entities);
        }
        CatalogMetrics::record_cache_lookup(E::KIND, false);

        let entities = before(deadline, "find_all", self.store.find_all()).await?;

        cache::write_json(
            self.cache.as_ref(),
            E::LIST_KEY,
            &entities,
            self.settings.cache_ttl,
            deadline,
        )
        .await;

        debug!(count = entities.len(), "Loaded collection from store");
        Ok(entities)
    }

    /// Budget shared by the main path of one operation
    fn deadline(&self) -> Instant {
        Instant::now() + self.settings.request_timeout
    }

    async fn lock(
        &self,
        operation: WriteOperation,
        id: Uuid,
        deadline: Instant,
    ) -> CatalogResult<DistributedLock> {
        let lock = DistributedLock::scoped(
            E::KIND,
            operation,
            id,
            self.settings.lock_scope,
            self.settings.lock_ttl,
        );

        let acquired = before(deadline, "lock_acquire", lock.acquire(self.locks.as_ref())).await?;

        if !acquired {
            CatalogMetrics::record_lock_contention(E::KIND, &operation.to_string());
            warn!(key = lock.key(), "Write rejected: lock held by another writer");
            return Err(CatalogError::Locked {
                key: lock.key().to_string(),
            });
        }
        Ok(lock)
    }

    /// Release never fails the write; an unreleased lock expires with its TTL.
    ///
    /// Cleanup gets its own limit so an exhausted operation budget does not
    /// leave the lock or stale cache entries behind.
    async fn unlock(&self, lock: &DistributedLock) {
        if let Err(e) = within(
            self.settings.request_timeout,
            "lock_release",
            lock.release(self.locks.as_ref()),
        )
        .await
        {
            warn!(key = lock.key(), error = %e, "Failed to release lock; it will expire");
        }
    }

    async fn invalidate(&self, keys: &[&str]) {
        cache::invalidate(
            self.cache.as_ref(),
            E::KIND,
            keys,
            self.settings.request_timeout,
        )
        .await;
    }

    fn finish(&self, operation: WriteOperation, result: CatalogResult<()>) -> CatalogResult<()> {
        CatalogMetrics::record_write(E::KIND, &operation.to_string(), result.is_ok());
        result
    }
}

impl ProductRepository {
    /// Answer a filtered, sorted, paginated query over the product snapshot
    #[instrument(skip(self, engine))]
    pub async fn query(
        &self,
        engine: &dyn ProductQueryEngine,
        query: &ProductQuery,
    ) -> CatalogResult<Page<Product>> {
        let products = self.find_all().await?;
        Ok(engine.query(products, query))
    }
}
