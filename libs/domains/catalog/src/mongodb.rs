//! MongoDB implementation of the entity and stock stores

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, spec::BinarySubtype, Binary, Bson, Document},
    Collection, Database,
};
use tracing::instrument;
use uuid::Uuid;

use crate::error::CatalogResult;
use crate::models::{CatalogEntity, Category, Product};
use crate::store::{EntityStore, StockStore};

/// MongoDB collection holding one entity kind
pub struct MongoEntityStore<E: CatalogEntity> {
    collection: Collection<E>,
}

impl<E: CatalogEntity> Clone for MongoEntityStore<E> {
    fn clone(&self) -> Self {
        Self {
            collection: self.collection.clone(),
        }
    }
}

impl<E: CatalogEntity> MongoEntityStore<E> {
    /// Use a custom collection name
    pub fn with_collection(db: &Database, collection_name: &str) -> Self {
        Self {
            collection: db.collection::<E>(collection_name),
        }
    }
}

impl MongoEntityStore<Product> {
    pub fn products(db: &Database) -> Self {
        Self::with_collection(db, "products")
    }
}

impl MongoEntityStore<Category> {
    pub fn categories(db: &Database) -> Self {
        Self::with_collection(db, "categories")
    }
}

/// `{ "_id": <id> }` matching the stored entity id.
///
/// The driver writes entities with the raw (non human-readable) serializer,
/// which stores a `Uuid` as generic binary, not as a string.
fn id_filter(id: Uuid) -> Document {
    let id = Bson::Binary(Binary {
        subtype: BinarySubtype::Generic,
        bytes: id.as_bytes().to_vec(),
    });
    doc! { "_id": id }
}

fn stock_increment(delta: i64) -> Document {
    doc! { "$inc": { "stock": delta } }
}

#[async_trait]
impl<E: CatalogEntity> EntityStore<E> for MongoEntityStore<E> {
    #[instrument(skip(self, entity), fields(kind = E::KIND, id = %entity.id()))]
    async fn insert(&self, entity: &E) -> CatalogResult<()> {
        self.collection.insert_one(entity).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(kind = E::KIND))]
    async fn find_by_id(&self, id: Uuid) -> CatalogResult<Option<E>> {
        let entity = self.collection.find_one(id_filter(id)).await?;
        Ok(entity)
    }

    #[instrument(skip(self), fields(kind = E::KIND))]
    async fn find_all(&self) -> CatalogResult<Vec<E>> {
        let cursor = self.collection.find(doc! {}).await?;
        let entities: Vec<E> = cursor.try_collect().await?;
        Ok(entities)
    }

    #[instrument(skip(self, entity), fields(kind = E::KIND, id = %entity.id()))]
    async fn replace(&self, entity: &E) -> CatalogResult<bool> {
        let result = self
            .collection
            .replace_one(id_filter(entity.id()), entity)
            .await?;
        Ok(result.matched_count > 0)
    }

    #[instrument(skip(self), fields(kind = E::KIND))]
    async fn delete(&self, id: Uuid) -> CatalogResult<bool> {
        let result = self.collection.delete_one(id_filter(id)).await?;
        Ok(result.deleted_count > 0)
    }
}

#[async_trait]
impl StockStore for MongoEntityStore<Product> {
    #[instrument(skip(self))]
    async fn increment_stock(&self, id: Uuid, delta: i64) -> CatalogResult<bool> {
        let result = self
            .collection
            .update_one(id_filter(id), stock_increment(delta))
            .await?;
        Ok(result.matched_count > 0)
    }
}
