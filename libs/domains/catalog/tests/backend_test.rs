//! Backend tests against real Redis and MongoDB containers
//!
//! Require Docker: `cargo test -p domain_catalog -- --ignored`

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use domain_catalog::*;
use test_utils::{TestDataBuilder, TestMongo, TestRedis};

fn product(name: &str, price: i64, stock: i64) -> Product {
    Product::new(NewProduct {
        name: name.to_string(),
        price,
        stock,
        category: "tools".to_string(),
        ..Default::default()
    })
}

// ============================================================================
// Redis cache and lock store
// ============================================================================

#[tokio::test]
#[ignore] // Requires Docker
async fn test_redis_cache_set_get_delete_and_expiry() {
    let redis = TestRedis::new().await;
    let cache = RedisCache::new(redis.connection());

    cache.set("product:a", "{}", Duration::from_secs(60)).await.unwrap();
    assert_eq!(cache.get("product:a").await.unwrap(), Some("{}".to_string()));

    cache.delete("product:a").await.unwrap();
    cache.delete("product:a").await.unwrap();
    assert_eq!(cache.get("product:a").await.unwrap(), None);

    cache.set("product:b", "{}", Duration::from_millis(50)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(cache.get("product:b").await.unwrap(), None);
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_redis_lock_ownership() {
    let redis = TestRedis::new().await;
    let store = RedisCache::new(redis.connection());
    let ttl = Duration::from_secs(30);

    let owner = DistributedLock::new("lock:product:update:1", ttl);
    let rival = DistributedLock::new("lock:product:update:1", ttl);

    assert!(owner.acquire(&store).await.unwrap());
    assert!(!rival.acquire(&store).await.unwrap());
    assert!(!rival.release(&store).await.unwrap());
    assert!(owner.release(&store).await.unwrap());
    assert!(rival.acquire(&store).await.unwrap());
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_redis_lock_expires() {
    let redis = TestRedis::new().await;
    let store = RedisCache::new(redis.connection());

    let crashed = DistributedLock::new("lock:product:delete:1", Duration::from_millis(50));
    assert!(crashed.acquire(&store).await.unwrap());
    tokio::time::sleep(Duration::from_millis(150)).await;

    let next = DistributedLock::new("lock:product:delete:1", Duration::from_secs(30));
    assert!(next.acquire(&store).await.unwrap());
}

// ============================================================================
// MongoDB entity store
// ============================================================================

#[tokio::test]
#[ignore] // Requires Docker
async fn test_mongo_store_crud_and_increment() {
    let mongo = TestMongo::new().await;
    let builder = TestDataBuilder::from_test_name("mongo_store_crud");
    let db = mongo.database(&builder.database_name());
    let store = MongoEntityStore::<Product>::products(&db);

    let mut axe = product("Axe", 1000, 4);
    store.insert(&axe).await.unwrap();
    assert!(store.insert(&axe).await.is_err(), "duplicate _id must be rejected");

    assert_eq!(store.find_by_id(axe.id).await.unwrap(), Some(axe.clone()));

    axe.price = 1200;
    assert!(store.replace(&axe).await.unwrap());
    assert!(!store.replace(&product("Ghost", 1, 1)).await.unwrap());

    assert!(store.increment_stock(axe.id, -4).await.unwrap());
    let stored = store.find_by_id(axe.id).await.unwrap().unwrap();
    assert_eq!(stored.stock, 0);
    assert_eq!(stored.price, 1200);

    assert_eq!(store.find_all().await.unwrap().len(), 1);
    assert!(store.delete(axe.id).await.unwrap());
    assert!(!store.delete(axe.id).await.unwrap());
}

// ============================================================================
// Full stack
// ============================================================================

#[tokio::test]
#[ignore] // Requires Docker
async fn test_full_stack_bulk_adjust_and_query() {
    let redis = TestRedis::new().await;
    let mongo = TestMongo::new().await;
    let builder = TestDataBuilder::from_test_name("full_stack");
    let db = mongo.database(&builder.database_name());

    let cache = Arc::new(RedisCache::new(redis.connection()));
    let products = Arc::new(MongoEntityStore::<Product>::products(&db));

    let catalog = Catalog::from_backends(
        CatalogBackends {
            cache: cache.clone(),
            locks: cache,
            products: products.clone(),
            categories: Arc::new(MongoEntityStore::<Category>::categories(&db)),
            stock: products,
        },
        CatalogSettings::default(),
    );

    let p1 = product("P1", 10, 10);
    let p2 = product("P2", 5, 5);
    catalog.products.create(&p1).await.unwrap();
    catalog.products.create(&p2).await.unwrap();

    let page = catalog
        .products
        .query(
            &InMemoryQueryEngine,
            &ProductQuery::default().with_sort(ProductSort::parse("price", "desc")),
        )
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.items[0].name, "P1");

    let updates = HashMap::from([
        (p1.id, StockUpdate::increment(3)),
        (p2.id, StockUpdate::decrement(5)),
    ]);
    catalog.stock.bulk_adjust(&updates).await.unwrap();

    assert_eq!(catalog.cache().get(Product::LIST_KEY).await.unwrap(), None);
    let p1 = catalog.products.find_by_id(p1.id).await.unwrap().found_or(p1.id).unwrap();
    let p2 = catalog.products.find_by_id(p2.id).await.unwrap().found_or(p2.id).unwrap();
    assert_eq!(p1.stock, 13);
    assert_eq!(p2.stock, 0);
}
