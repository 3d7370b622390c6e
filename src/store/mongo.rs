//! MongoDB task store

use bson::{doc, oid::ObjectId, DateTime};
use std::sync::Arc;
use tracing::debug;

use super::{sort_document, OwnerDirectory, TaskFilter, TaskStore};
use crate::db::{MongoConnector, TaskDoc};
use crate::types::{OwnerId, Result};

/// Task store backed by the `tasks` collection.
///
/// Connects through the shared [`MongoConnector`] on first use.
#[derive(Clone)]
pub struct MongoTaskStore {
    connector: Arc<MongoConnector>,
}

impl MongoTaskStore {
    pub fn new(connector: Arc<MongoConnector>) -> Self {
        Self { connector }
    }
}

#[async_trait::async_trait]
impl OwnerDirectory for MongoTaskStore {
    async fn distinct_owners(&self) -> Result<Vec<OwnerId>> {
        let handle = self.connector.connect().await?;
        let owners = handle.tasks.distinct_strings("owner").await?;
        debug!(count = owners.len(), "Loaded distinct owners");
        Ok(owners.into_iter().map(OwnerId::new).collect())
    }
}

#[async_trait::async_trait]
impl TaskStore for MongoTaskStore {
    async fn insert(&self, mut task: TaskDoc) -> Result<TaskDoc> {
        let handle = self.connector.connect().await?;
        task._id = None;
        let id = handle.tasks.insert_one(&mut task).await?;
        task._id = Some(id);
        Ok(task)
    }

    async fn get(&self, owner: &OwnerId, id: ObjectId) -> Result<Option<TaskDoc>> {
        let handle = self.connector.connect().await?;
        handle
            .tasks
            .find_one(doc! { "_id": id, "owner": owner.as_str() })
            .await
    }

    async fn find(&self, owner: &OwnerId, filter: &TaskFilter) -> Result<Vec<TaskDoc>> {
        let handle = self.connector.connect().await?;
        handle
            .tasks
            .find_many(filter.to_document(owner), sort_document())
            .await
    }

    async fn complete(&self, owner: &OwnerId, id: ObjectId) -> Result<Option<TaskDoc>> {
        let handle = self.connector.connect().await?;
        let now = DateTime::now();
        handle
            .tasks
            .find_one_and_update(
                doc! { "_id": id, "owner": owner.as_str(), "done": false },
                doc! {
                    "$set": {
                        "done": true,
                        "completed_at": now,
                        "metadata.updated_at": now,
                    }
                },
            )
            .await
    }

    async fn delete(&self, owner: &OwnerId, id: ObjectId) -> Result<bool> {
        let handle = self.connector.connect().await?;
        handle
            .tasks
            .delete_one(doc! { "_id": id, "owner": owner.as_str() })
            .await
    }

    async fn delete_completed(&self, owner: &OwnerId) -> Result<u64> {
        let handle = self.connector.connect().await?;
        handle
            .tasks
            .delete_many(doc! { "owner": owner.as_str(), "done": true })
            .await
    }

    async fn count(&self, owner: &OwnerId, filter: &TaskFilter) -> Result<u64> {
        let handle = self.connector.connect().await?;
        handle.tasks.count(filter.to_document(owner)).await
    }
}
