//! In-memory task store
//!
//! Process-local and lost on exit. Useful for trying the tools without a
//! database and as the backend in tests.

use bson::{oid::ObjectId, DateTime};
use std::collections::HashSet;
use tokio::sync::RwLock;

use super::{sort_tasks, OwnerDirectory, TaskFilter, TaskStore};
use crate::db::{Metadata, TaskDoc};
use crate::types::{OwnerId, Result};

#[derive(Default)]
pub struct MemoryTaskStore {
    tasks: RwLock<Vec<TaskDoc>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total tasks across all owners
    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }
}

fn owned_by(task: &TaskDoc, owner: &OwnerId, id: ObjectId) -> bool {
    task._id == Some(id) && &task.owner == owner
}

#[async_trait::async_trait]
impl OwnerDirectory for MemoryTaskStore {
    async fn distinct_owners(&self) -> Result<Vec<OwnerId>> {
        let tasks = self.tasks.read().await;
        let mut seen = HashSet::new();
        Ok(tasks
            .iter()
            .filter(|t| seen.insert(&t.owner))
            .map(|t| t.owner.clone())
            .collect())
    }
}

#[async_trait::async_trait]
impl TaskStore for MemoryTaskStore {
    async fn insert(&self, mut task: TaskDoc) -> Result<TaskDoc> {
        task._id = Some(ObjectId::new());
        task.metadata = Metadata::new();

        self.tasks.write().await.push(task.clone());
        Ok(task)
    }

    async fn get(&self, owner: &OwnerId, id: ObjectId) -> Result<Option<TaskDoc>> {
        let tasks = self.tasks.read().await;
        Ok(tasks.iter().find(|t| owned_by(t, owner, id)).cloned())
    }

    async fn find(&self, owner: &OwnerId, filter: &TaskFilter) -> Result<Vec<TaskDoc>> {
        let tasks = self.tasks.read().await;
        let mut found: Vec<TaskDoc> = tasks
            .iter()
            .filter(|t| &t.owner == owner && filter.matches(t))
            .cloned()
            .collect();
        sort_tasks(&mut found);
        Ok(found)
    }

    async fn complete(&self, owner: &OwnerId, id: ObjectId) -> Result<Option<TaskDoc>> {
        let mut tasks = self.tasks.write().await;
        let Some(task) = tasks
            .iter_mut()
            .find(|t| owned_by(t, owner, id) && !t.done)
        else {
            return Ok(None);
        };

        task.done = true;
        task.completed_at = Some(DateTime::now());
        task.metadata.touch();
        Ok(Some(task.clone()))
    }

    async fn delete(&self, owner: &OwnerId, id: ObjectId) -> Result<bool> {
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|t| !owned_by(t, owner, id));
        Ok(tasks.len() < before)
    }

    async fn delete_completed(&self, owner: &OwnerId) -> Result<u64> {
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|t| !(&t.owner == owner && t.done));
        Ok((before - tasks.len()) as u64)
    }

    async fn count(&self, owner: &OwnerId, filter: &TaskFilter) -> Result<u64> {
        let tasks = self.tasks.read().await;
        Ok(tasks
            .iter()
            .filter(|t| &t.owner == owner && filter.matches(t))
            .count() as u64)
    }
}
