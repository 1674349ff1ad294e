use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// Another writer holds the lock for this (kind, operation, id) scope
    #[error("Resource is locked: {key}")]
    Locked { key: String },

    #[error("Entity not found: {0}")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deadline exceeded during {0}")]
    Timeout(&'static str),

    /// Earlier writes in the batch stay applied; there is no rollback
    #[error("Bulk stock adjustment failed after {applied} applied writes: {source}")]
    PartialBulk {
        applied: usize,
        source: Box<CatalogError>,
    },
}

pub type CatalogResult<T> = Result<T, CatalogError>;

impl From<mongodb::error::Error> for CatalogError {
    fn from(err: mongodb::error::Error) -> Self {
        CatalogError::Database(err.to_string())
    }
}

impl From<redis::RedisError> for CatalogError {
    fn from(err: redis::RedisError) -> Self {
        CatalogError::Cache(err.to_string())
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Serialization(err.to_string())
    }
}

/// Run a backend call under its own `limit`.
pub(crate) async fn within<T, F>(limit: Duration, operation: &'static str, call: F) -> CatalogResult<T>
where
    F: Future<Output = CatalogResult<T>>,
{
    before(Instant::now() + limit, operation, call).await
}

/// Run a backend call that must finish by `deadline`.
///
/// Calls on the main path of one operation share a single deadline.
pub(crate) async fn before<T, F>(deadline: Instant, operation: &'static str, call: F) -> CatalogResult<T>
where
    F: Future<Output = CatalogResult<T>>,
{
    tokio::time::timeout_at(deadline, call)
        .await
        .map_err(|_| CatalogError::Timeout(operation))?
}
