//! Shared test fixtures for the catalog crates
//!
//! - `TestRedis`: Redis container behind a `ConnectionManager` (feature: "redis")
//! - `TestMongo`: MongoDB container with a fresh database (feature: "mongodb")
//! - `TestDataBuilder`: deterministic ids and names derived from a test name
//!
//! Container tests need a Docker daemon; mark them `#[ignore]` and run them
//! with `cargo test -- --ignored`.
//!
//! ```rust,ignore
//! use test_utils::TestRedis;
//!
//! #[tokio::test]
//! #[ignore]
//! async fn my_redis_test() {
//!     let redis = TestRedis::new().await;
//!     let cache = RedisCache::new(redis.connection());
//! }
//! ```

use uuid::Uuid;

#[cfg(feature = "redis")]
mod redis;

#[cfg(feature = "mongodb")]
mod mongodb;

#[cfg(feature = "redis")]
pub use self::redis::TestRedis;

#[cfg(feature = "mongodb")]
pub use self::mongodb::TestMongo;

/// Deterministic test data, seeded from the test name
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// The `n`th id for this test; stable across runs
    pub fn id(&self, n: u64) -> Uuid {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&self.seed.to_le_bytes());
        bytes[8..].copy_from_slice(&n.to_le_bytes());
        Uuid::from_bytes(bytes)
    }

    /// e.g. `test-product-1234-main`
    pub fn name(&self, prefix: &str, suffix: &str) -> String {
        format!("test-{}-{}-{}", prefix, self.seed, suffix)
    }

    /// Database name unique to this test, safe for MongoDB
    pub fn database_name(&self) -> String {
        format!("catalog_test_{:x}", self.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_builder_is_deterministic() {
        let a = TestDataBuilder::from_test_name("my_test");
        let b = TestDataBuilder::from_test_name("my_test");
        assert_eq!(a.id(1), b.id(1));
        assert_eq!(a.name("product", "main"), b.name("product", "main"));
        assert_eq!(a.database_name(), b.database_name());
    }

    #[test]
    fn test_data_builder_ids_differ_by_index_and_test() {
        let a = TestDataBuilder::from_test_name("test1");
        let b = TestDataBuilder::from_test_name("test2");
        assert_ne!(a.id(1), a.id(2));
        assert_ne!(a.id(1), b.id(1));
    }
}
