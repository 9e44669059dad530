use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bson::{oid::ObjectId, Document};
use tokio::sync::RwLock;
use tracing::debug;

use super::store::{DatabaseError, DocumentStore, Page};
use crate::models::keys::ID_KEY;

/// In-process store keeping collections in insertion order.
#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<HashMap<String, Vec<Document>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(document: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(key, expected)| document.get(key) == Some(expected))
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        page: Page,
    ) -> Result<Vec<Document>, DatabaseError> {
        let collections = self.collections.read().await;
        let found = collections
            .get(collection)
            .map(|documents| {
                let matching = documents
                    .iter()
                    .filter(|document| matches(document, &filter))
                    .skip(page.skip as usize)
                    .cloned();
                if page.limit == 0 {
                    matching.collect()
                } else {
                    matching.take(page.limit as usize).collect()
                }
            })
            .unwrap_or_default();
        Ok(found)
    }

    async fn count(&self, collection: &str, filter: Document) -> Result<u64, DatabaseError> {
        let collections = self.collections.read().await;
        let count = collections
            .get(collection)
            .map(|documents| documents.iter().filter(|d| matches(d, &filter)).count())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, DatabaseError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|documents| documents.iter().find(|d| matches(d, &filter)).cloned()))
    }

    async fn insert(&self, collection: &str, mut document: Document) -> Result<ObjectId, DatabaseError> {
        let id = match document.get_object_id(ID_KEY) {
            Ok(id) => id,
            Err(_) => {
                let id = ObjectId::new();
                document.insert(ID_KEY, id);
                id
            }
        };

        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection.to_string()).or_default();
        if documents.iter().any(|d| d.get_object_id(ID_KEY).ok() == Some(id)) {
            return Err(DatabaseError::QueryError(format!(
                "duplicate _id {} in {}",
                id, collection
            )));
        }
        documents.push(document);
        debug!("Inserted {} into {}", id, collection);
        Ok(id)
    }

    async fn update(
        &self,
        collection: &str,
        filter: Document,
        set: Document,
    ) -> Result<u64, DatabaseError> {
        let mut collections = self.collections.write().await;
        let target = collections
            .get_mut(collection)
            .and_then(|documents| documents.iter_mut().find(|d| matches(d, &filter)));

        match target {
            Some(document) => {
                for (key, value) in set {
                    document.insert(key, value);
                }
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete(&self, collection: &str, filter: Document) -> Result<u64, DatabaseError> {
        let mut collections = self.collections.write().await;
        let Some(documents) = collections.get_mut(collection) else {
            return Ok(0);
        };
        match documents.iter().position(|d| matches(d, &filter)) {
            Some(index) => {
                documents.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}
