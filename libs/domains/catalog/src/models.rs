use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

/// An entity kind governed by the catalog cache and lock scheme.
///
/// The kind name drives every key the core touches:
/// `<kind>:<id>` for single entities, `<kind>s:all` for the collection
/// snapshot and `lock:<kind>:<operation>:<id>` for write locks.
pub trait CatalogEntity:
    Serialize + DeserializeOwned + Clone + Send + Sync + Unpin + 'static
{
    /// Singular kind name, e.g. `product`
    const KIND: &'static str;

    /// Key of the cached full-collection snapshot, e.g. `products:all`
    const LIST_KEY: &'static str;

    fn id(&self) -> Uuid;

    fn cache_key(id: Uuid) -> String {
        format!("{}:{}", Self::KIND, id)
    }
}

/// Product entity - stored in MongoDB, cached as JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier (stored as _id in MongoDB)
    #[serde(rename = "_id", alias = "id")]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Price in cents (for precision); non-negative by convention, not enforced
    pub price: i64,
    /// Current stock quantity; bulk decrements may drive it below zero
    pub stock: i64,
    #[serde(default)]
    pub image_url: String,
    /// Free-form category label
    #[serde(default)]
    pub category: String,
}

/// Input for creating a new product
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: i64,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub category: String,
}

impl Product {
    /// Create a new product, assigning its id
    pub fn new(input: NewProduct) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: input.name,
            description: input.description,
            price: input.price,
            stock: input.stock,
            image_url: input.image_url,
            category: input.category,
        }
    }
}

impl CatalogEntity for Product {
    const KIND: &'static str = "product";
    const LIST_KEY: &'static str = "products:all";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// Category entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "_id", alias = "id")]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Category {
    pub fn new(input: NewCategory) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: input.name,
            description: input.description,
        }
    }
}

impl CatalogEntity for Category {
    const KIND: &'static str = "category";
    const LIST_KEY: &'static str = "categories:all";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// Result of a single-entity lookup.
///
/// Absence is a value here, not an error: transport and decoding failures
/// travel separately as `Err(CatalogError)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> Lookup<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::NotFound => None,
        }
    }

    /// Convert absence into `CatalogError::NotFound` for callers that need a value
    pub fn found_or(self, id: Uuid) -> crate::error::CatalogResult<T> {
        self.into_option()
            .ok_or(crate::error::CatalogError::NotFound(id))
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Lookup::Found(value),
            None => Lookup::NotFound,
        }
    }
}
