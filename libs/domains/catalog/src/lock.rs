//! Distributed write locks on top of the cache store
//!
//! Acquire is a single set-if-absent with TTL, release is an atomic
//! compare-and-delete. There is no retry and no waiting: contention is
//! reported to the caller immediately.

use std::time::Duration;

use async_trait::async_trait;
use strum::{Display, EnumString};
use tracing::debug;
use uuid::Uuid;

use crate::config::LockScope;
use crate::error::CatalogResult;

/// Backend primitives a distributed lock needs
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Set `key` to `token` with `ttl` only if `key` is absent.
    ///
    /// Returns `false` when someone else holds the key.
    async fn try_acquire(&self, key: &str, token: &str, ttl: Duration) -> CatalogResult<bool>;

    /// Delete `key` only if it still holds `token`, as one atomic step.
    ///
    /// Returns whether the key was deleted.
    async fn release(&self, key: &str, token: &str) -> CatalogResult<bool>;
}

/// Write operations that take a lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum WriteOperation {
    Create,
    Update,
    Delete,
}

/// A lock on one catalog write scope, owned through a per-acquisition token
#[derive(Debug, Clone)]
pub struct DistributedLock {
    key: String,
    token: String,
    ttl: Duration,
}

impl DistributedLock {
    /// Build the lock for a write on `(kind, operation, id)`.
    ///
    /// With `LockScope::Entity` the operation segment is `write`, so all
    /// writers on the same id share one key.
    pub fn scoped(
        kind: &str,
        operation: WriteOperation,
        id: Uuid,
        scope: LockScope,
        ttl: Duration,
    ) -> Self {
        let segment = match scope {
            LockScope::Operation => operation.to_string(),
            LockScope::Entity => "write".to_string(),
        };
        Self::new(format!("lock:{}:{}:{}", kind, segment, id), ttl)
    }

    /// Lock an arbitrary key with a fresh random token
    pub fn new(key: impl Into<String>, ttl: Duration) -> Self {
        Self {
            key: key.into(),
            token: Uuid::new_v4().to_string(),
            ttl,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Try once to take the lock
    pub async fn acquire(&self, store: &dyn LockStore) -> CatalogResult<bool> {
        let acquired = store.try_acquire(&self.key, &self.token, self.ttl).await?;
        debug!(key = %self.key, acquired, "Lock acquire attempted");
        Ok(acquired)
    }

    /// Release the lock if this handle still owns it
    pub async fn release(&self, store: &dyn LockStore) -> CatalogResult<bool> {
        let released = store.release(&self.key, &self.token).await?;
        if !released {
            debug!(key = %self.key, "Lock already expired or taken over");
        }
        Ok(released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatalogError;
    use crate::memory::MemoryCache;

    const TTL: Duration = Duration::from_secs(30);

    #[test]
    fn test_scoped_key_per_operation() {
        let id = Uuid::nil();
        let lock = DistributedLock::scoped("product", WriteOperation::Update, id, LockScope::Operation, TTL);
        assert_eq!(
            lock.key(),
            "lock:product:update:00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_scoped_key_per_entity() {
        let id = Uuid::nil();
        let update = DistributedLock::scoped("category", WriteOperation::Update, id, LockScope::Entity, TTL);
        let delete = DistributedLock::scoped("category", WriteOperation::Delete, id, LockScope::Entity, TTL);
        assert_eq!(update.key(), delete.key());
        assert!(update.key().starts_with("lock:category:write:"));
    }

    #[test]
    fn test_each_handle_gets_its_own_token() {
        let a = DistributedLock::new("lock:product:create:x", TTL);
        let b = DistributedLock::new("lock:product:create:x", TTL);
        assert_ne!(a.token, b.token);
    }

    #[tokio::test]
    async fn test_second_acquire_is_contention() {
        let store = MemoryCache::new();
        let first = DistributedLock::new("lock:product:create:1", TTL);
        let second = DistributedLock::new("lock:product:create:1", TTL);

        assert!(first.acquire(&store).await.unwrap());
        assert!(!second.acquire(&store).await.unwrap());
    }

    #[tokio::test]
    async fn test_release_requires_owning_token() {
        let store = MemoryCache::new();
        let owner = DistributedLock::new("lock:product:delete:1", TTL);
        let intruder = DistributedLock::new("lock:product:delete:1", TTL);

        assert!(owner.acquire(&store).await.unwrap());
        assert!(!intruder.release(&store).await.unwrap());
        assert!(store.contains("lock:product:delete:1"));

        assert!(owner.release(&store).await.unwrap());
        assert!(!store.contains("lock:product:delete:1"));
        assert!(intruder.acquire(&store).await.unwrap());
    }

    #[tokio::test]
    async fn test_lock_expires_after_ttl() {
        let store = MemoryCache::new();
        let crashed = DistributedLock::new("lock:product:update:1", Duration::from_millis(20));
        let next = DistributedLock::new("lock:product:update:1", TTL);

        assert!(crashed.acquire(&store).await.unwrap());
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(next.acquire(&store).await.unwrap());
    }

    #[tokio::test]
    async fn test_acquire_surfaces_backend_error() {
        let mut store = MockLockStore::new();
        store
            .expect_try_acquire()
            .times(1)
            .returning(|_, _, _| Err(CatalogError::Cache("connection refused".to_string())));

        let lock = DistributedLock::new("lock:product:create:1", TTL);
        assert!(matches!(lock.acquire(&store).await, Err(CatalogError::Cache(_))));
    }

    #[tokio::test]
    async fn test_release_presents_acquired_token() {
        let lock = DistributedLock::new("lock:product:create:1", TTL);
        let token = lock.token.clone();

        let mut store = MockLockStore::new();
        store
            .expect_release()
            .withf(move |key, presented| key == "lock:product:create:1" && presented == token)
            .times(1)
            .returning(|_, _| Ok(true));

        assert!(lock.release(&store).await.unwrap());
    }
}
