use async_trait::async_trait;
use bson::{oid::ObjectId, Bson, Document};
use serde_json::Value;
use thiserror::Error;

/// Errors from the document datastore
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),
}

/// Skip/limit window of a find. A limit of 0 returns every match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub skip: u64,
    pub limit: u64,
}

/// Document datastore the handlers talk to.
///
/// Filters are documents of top-level equality matches. Implementations are
/// shared across requests and must synchronize internally.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        page: Page,
    ) -> Result<Vec<Document>, DatabaseError>;

    async fn count(&self, collection: &str, filter: Document) -> Result<u64, DatabaseError>;

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, DatabaseError>;

    /// Insert a document and return its `_id`, generating one when absent.
    async fn insert(&self, collection: &str, document: Document) -> Result<ObjectId, DatabaseError>;

    /// `$set` the given fields on the first match; returns the matched count.
    async fn update(
        &self,
        collection: &str,
        filter: Document,
        set: Document,
    ) -> Result<u64, DatabaseError>;

    /// Delete the first match; returns the deleted count.
    async fn delete(&self, collection: &str, filter: Document) -> Result<u64, DatabaseError>;

    async fn ping(&self) -> Result<(), DatabaseError>;
}

/// JSON view of a stored document (relaxed extended JSON).
pub fn document_to_json(document: Document) -> Value {
    Bson::Document(document).into_relaxed_extjson()
}
