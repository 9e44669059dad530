use std::time::Duration;

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document};
use futures::TryStreamExt;
use mongodb::{options::ClientOptions, Client, Collection, Database};
use tracing::{debug, info};

use super::store::{DatabaseError, DocumentStore, Page};
use crate::config::DatabaseConfig;

/// MongoDB backed store. The driver client holds the connection pool and is
/// cheap to clone.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    database: Database,
}

impl MongoStore {
    /// Connect and verify the server answers a ping.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        if config.uri.trim().is_empty() {
            return Err(DatabaseError::ConfigMissing("database.uri"));
        }

        info!("Connecting to MongoDB database '{}'", config.name);

        let mut options = ClientOptions::parse(&config.uri)
            .await
            .map_err(|e| DatabaseError::ConnectionError(format!("invalid MongoDB URI: {}", e)))?;
        let timeout = Duration::from_secs(config.connect_timeout_secs);
        options.max_pool_size = Some(config.max_pool_size);
        options.connect_timeout = Some(timeout);
        options.server_selection_timeout = Some(timeout);
        options.app_name = Some(env!("CARGO_PKG_NAME").to_string());

        let client = Client::with_options(options)?;
        let store = Self {
            database: client.database(&config.name),
            client,
        };
        store
            .ping()
            .await
            .map_err(|e| DatabaseError::ConnectionError(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", config.name);
        Ok(store)
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.database.collection::<Document>(name)
    }

    /// Close the driver's connection pools.
    pub async fn shutdown(self) {
        self.client.shutdown().await;
        info!("Closed MongoDB connections");
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        page: Page,
    ) -> Result<Vec<Document>, DatabaseError> {
        let target = self.collection(collection);
        let mut find = target.find(filter).skip(page.skip);
        if page.limit > 0 {
            find = find.limit(i64::try_from(page.limit).unwrap_or(i64::MAX));
        }
        let documents: Vec<Document> = find.await?.try_collect().await?;
        debug!("Found {} documents in {}", documents.len(), collection);
        Ok(documents)
    }

    async fn count(&self, collection: &str, filter: Document) -> Result<u64, DatabaseError> {
        Ok(self.collection(collection).count_documents(filter).await?)
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, DatabaseError> {
        Ok(self.collection(collection).find_one(filter).await?)
    }

    async fn insert(&self, collection: &str, document: Document) -> Result<ObjectId, DatabaseError> {
        let result = self.collection(collection).insert_one(document).await?;
        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| DatabaseError::QueryError("inserted _id is not an ObjectId".into()))
    }

    async fn update(
        &self,
        collection: &str,
        filter: Document,
        set: Document,
    ) -> Result<u64, DatabaseError> {
        let result = self
            .collection(collection)
            .update_one(filter, doc! { "$set": set })
            .await?;
        Ok(result.matched_count)
    }

    async fn delete(&self, collection: &str, filter: Document) -> Result<u64, DatabaseError> {
        let result = self.collection(collection).delete_one(filter).await?;
        Ok(result.deleted_count)
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        self.database.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}
