//! MongoDB client and collection wrapper

use bson::{doc, oid::ObjectId, Bson, DateTime, Document};
use futures_util::{TryStream, TryStreamExt};
use mongodb::{
    options::{IndexOptions, ReturnDocument, UpdateModifications},
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info};

use crate::db::schemas::{Metadata, TaskDoc, TASK_COLLECTION};
use crate::types::TaskkeepError;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Create a new MongoDB client
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, TaskkeepError> {
        info!("Connecting to MongoDB");

        // Use serverSelectionTimeoutMS to avoid hanging on unreachable MongoDB
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri).await.map_err(|e| {
            TaskkeepError::StoreUnavailable(format!("Failed to connect to MongoDB: {}", e))
        })?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| TaskkeepError::StoreUnavailable(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, TaskkeepError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + Default + IntoIndexes + MutMetadata,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }

    /// Get the database name
    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

/// Live store handle: client plus the task collection with indexes applied
#[derive(Clone)]
pub struct StoreHandle {
    pub client: MongoClient,
    pub tasks: MongoCollection<TaskDoc>,
}

/// Lazily connecting store handle owner.
///
/// `connect()` is idempotent: the first caller connects and applies indexes,
/// later callers reuse the cached handle. A failed attempt leaves nothing
/// cached, so the next call tries again.
pub struct MongoConnector {
    uri: String,
    db_name: String,
    handle: RwLock<Option<StoreHandle>>,
    /// Lock to prevent concurrent connection attempts
    connecting: Mutex<()>,
}

impl MongoConnector {
    pub fn new(uri: &str, db_name: &str) -> Arc<Self> {
        Arc::new(Self {
            uri: uri.to_string(),
            db_name: db_name.to_string(),
            handle: RwLock::new(None),
            connecting: Mutex::new(()),
        })
    }

    /// Return the live handle, connecting on first use
    pub async fn connect(&self) -> Result<StoreHandle, TaskkeepError> {
        // Fast path
        if let Some(ref handle) = *self.handle.read().await {
            return Ok(handle.clone());
        }

        let _lock = self.connecting.lock().await;

        // Double-check after acquiring lock
        if let Some(ref handle) = *self.handle.read().await {
            return Ok(handle.clone());
        }

        let client = MongoClient::new(&self.uri, &self.db_name).await?;
        let tasks = client.collection::<TaskDoc>(TASK_COLLECTION).await?;
        let handle = StoreHandle { client, tasks };

        *self.handle.write().await = Some(handle.clone());
        Ok(handle)
    }

    pub async fn is_connected(&self) -> bool {
        self.handle.read().await.is_some()
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + Default + IntoIndexes + MutMetadata,
{
    /// Create a new collection and apply indexes
    pub async fn new(
        client: &Client,
        db_name: &str,
        collection_name: &str,
    ) -> Result<Self, TaskkeepError> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    /// Apply schema-defined indexes
    async fn apply_indexes(&self) -> Result<(), TaskkeepError> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner.create_indexes(indices).await.map_err(|e| {
            TaskkeepError::StoreUnavailable(format!("Failed to create indexes: {}", e))
        })?;

        Ok(())
    }

    /// Insert a document, stamping its metadata timestamps in place
    pub async fn insert_one(&self, item: &mut T) -> Result<ObjectId, TaskkeepError> {
        let metadata = item.mut_metadata();
        let now = DateTime::now();
        metadata.created_at = Some(now);
        metadata.updated_at = Some(now);

        let result = self
            .inner
            .insert_one(&*item)
            .await
            .map_err(|e| TaskkeepError::StoreUnavailable(format!("Insert failed: {}", e)))?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| TaskkeepError::Internal("Failed to get inserted ID".into()))
    }

    /// Find one document by filter
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, TaskkeepError> {
        self.inner
            .find_one(filter)
            .await
            .map_err(|e| TaskkeepError::StoreUnavailable(format!("Find failed: {}", e)))
    }

    /// Find many documents by filter, in the given sort order
    pub async fn find_many(
        &self,
        filter: Document,
        sort: Document,
    ) -> Result<Vec<T>, TaskkeepError> {
        let cursor = self
            .inner
            .find(filter)
            .sort(sort)
            .await
            .map_err(|e| TaskkeepError::StoreUnavailable(format!("Find failed: {}", e)))?;

        collect_all(cursor).await
    }

    /// Update one document and return it as it is after the update
    pub async fn find_one_and_update(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<Option<T>, TaskkeepError> {
        self.inner
            .find_one_and_update(filter, update.into())
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| TaskkeepError::StoreUnavailable(format!("Update failed: {}", e)))
    }

    /// Delete one document, returning whether anything was removed
    pub async fn delete_one(&self, filter: Document) -> Result<bool, TaskkeepError> {
        let result = self
            .inner
            .delete_one(filter)
            .await
            .map_err(|e| TaskkeepError::StoreUnavailable(format!("Delete failed: {}", e)))?;
        Ok(result.deleted_count > 0)
    }

    /// Delete all matching documents, returning the count removed
    pub async fn delete_many(&self, filter: Document) -> Result<u64, TaskkeepError> {
        let result = self
            .inner
            .delete_many(filter)
            .await
            .map_err(|e| TaskkeepError::StoreUnavailable(format!("Delete failed: {}", e)))?;
        Ok(result.deleted_count)
    }

    /// Count matching documents
    pub async fn count(&self, filter: Document) -> Result<u64, TaskkeepError> {
        self.inner
            .count_documents(filter)
            .await
            .map_err(|e| TaskkeepError::StoreUnavailable(format!("Count failed: {}", e)))
    }

    /// Distinct string values of a field across the collection
    pub async fn distinct_strings(&self, field: &str) -> Result<Vec<String>, TaskkeepError> {
        let values = self
            .inner
            .distinct(field, doc! {})
            .await
            .map_err(|e| TaskkeepError::StoreUnavailable(format!("Distinct failed: {}", e)))?;

        Ok(values
            .into_iter()
            .filter_map(|value| match value {
                Bson::String(s) => Some(s),
                _ => None,
            })
            .collect())
    }
}

/// Drain a cursor. A failed batch fails the whole read: a short list would
/// pass for a complete one.
async fn collect_all<S, T, E>(stream: S) -> Result<Vec<T>, TaskkeepError>
where
    S: TryStream<Ok = T, Error = E>,
    E: std::fmt::Display,
{
    stream.try_collect().await.map_err(|e| {
        error!("Error reading documents: {}", e);
        TaskkeepError::StoreUnavailable(format!("Cursor read failed: {}", e))
    })
}
