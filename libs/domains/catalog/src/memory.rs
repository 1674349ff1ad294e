//! In-process backends
//!
//! `MemoryCache` honors the same contracts as Redis (TTL expiry, set-if-absent,
//! atomic compare-and-delete) and `MemoryStore` stands in for MongoDB. Both
//! are safe to share between tasks.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use uuid::Uuid;

use crate::cache::CacheStore;
use crate::error::{CatalogError, CatalogResult};
use crate::lock::LockStore;
use crate::models::{CatalogEntity, Product};
use crate::store::{EntityStore, StockStore};

fn poisoned() -> CatalogError {
    CatalogError::Cache("in-memory state poisoned".to_string())
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// In-memory cache and lock store
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> CatalogResult<MutexGuard<'_, HashMap<String, Entry>>> {
        self.entries.lock().map_err(|_| poisoned())
    }

    /// Whether `key` currently holds a live (unexpired) value
    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries()
            .map(|entries| entries.get(key).is_some_and(|entry| entry.is_live(now)))
            .unwrap_or(false)
    }

    /// Raw live value, bypassing the trait (for inspection)
    pub fn peek(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        self.entries().ok().and_then(|entries| {
            entries
                .get(key)
                .filter(|entry| entry.is_live(now))
                .map(|entry| entry.value.clone())
        })
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> CatalogResult<Option<String>> {
        let now = Instant::now();
        let mut entries = self.entries()?;
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CatalogResult<()> {
        let entry = Entry {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        };
        self.entries()?.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> CatalogResult<()> {
        self.entries()?.remove(key);
        Ok(())
    }
}

#[async_trait]
impl LockStore for MemoryCache {
    async fn try_acquire(&self, key: &str, token: &str, ttl: Duration) -> CatalogResult<bool> {
        let now = Instant::now();
        let mut entries = self.entries()?;
        if entries.get(key).is_some_and(|entry| entry.is_live(now)) {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: token.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(true)
    }

    async fn release(&self, key: &str, token: &str) -> CatalogResult<bool> {
        let now = Instant::now();
        let mut entries = self.entries()?;
        let owned = entries
            .get(key)
            .is_some_and(|entry| entry.is_live(now) && entry.value == token);
        if owned {
            entries.remove(key);
        }
        Ok(owned)
    }
}

/// In-memory entity store that counts the reads it serves
#[derive(Debug)]
pub struct MemoryStore<E> {
    entities: Mutex<BTreeMap<Uuid, E>>,
    reads: AtomicUsize,
}

impl<E> Default for MemoryStore<E> {
    fn default() -> Self {
        Self {
            entities: Mutex::new(BTreeMap::new()),
            reads: AtomicUsize::new(0),
        }
    }
}

impl<E: CatalogEntity> MemoryStore<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store directly, bypassing locks and cache
    pub fn with_entities(entities: impl IntoIterator<Item = E>) -> Self {
        let store = Self::default();
        if let Ok(mut map) = store.entities.lock() {
            map.extend(entities.into_iter().map(|entity| (entity.id(), entity)));
        }
        store
    }

    /// Number of `find_by_id` / `find_all` calls served so far
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Current stored copy, without counting a read
    pub fn snapshot(&self, id: Uuid) -> Option<E> {
        self.entities
            .lock()
            .ok()
            .and_then(|map| map.get(&id).cloned())
    }

    fn entities(&self) -> CatalogResult<MutexGuard<'_, BTreeMap<Uuid, E>>> {
        self.entities
            .lock()
            .map_err(|_| CatalogError::Database("in-memory state poisoned".to_string()))
    }
}

#[async_trait]
impl<E: CatalogEntity> EntityStore<E> for MemoryStore<E> {
    async fn insert(&self, entity: &E) -> CatalogResult<()> {
        let mut map = self.entities()?;
        if map.contains_key(&entity.id()) {
            return Err(CatalogError::Database(format!(
                "duplicate key: {} {}",
                E::KIND,
                entity.id()
            )));
        }
        map.insert(entity.id(), entity.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> CatalogResult<Option<E>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.entities()?.get(&id).cloned())
    }

    async fn find_all(&self) -> CatalogResult<Vec<E>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.entities()?.values().cloned().collect())
    }

    async fn replace(&self, entity: &E) -> CatalogResult<bool> {
        let mut map = self.entities()?;
        match map.get_mut(&entity.id()) {
            Some(slot) => {
                *slot = entity.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> CatalogResult<bool> {
        Ok(self.entities()?.remove(&id).is_some())
    }
}

#[async_trait]
impl StockStore for MemoryStore<Product> {
    async fn increment_stock(&self, id: Uuid, delta: i64) -> CatalogResult<bool> {
        let mut map = self.entities()?;
        match map.get_mut(&id) {
            Some(product) => {
                product.stock += delta;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
