//! Shared fixtures for integration tests

#![allow(dead_code)]

use bson::oid::ObjectId;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use taskkeep::auth::{CredentialHasher, HasherConfig, IdentityResolver, ResolverConfig};
use taskkeep::db::TaskDoc;
use taskkeep::services::{Authenticator, TaskService};
use taskkeep::store::{MemoryTaskStore, OwnerDirectory, TaskFilter, TaskStore};
use taskkeep::tools::ToolRegistry;
use taskkeep::types::{OwnerId, Result, TaskkeepError};

/// Low-cost Argon2 parameters so tests stay fast
pub fn fast_hasher() -> CredentialHasher {
    CredentialHasher::new(HasherConfig {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    })
    .unwrap()
}

pub fn resolver() -> IdentityResolver {
    IdentityResolver::new(fast_hasher(), ResolverConfig::default())
}

pub fn explicit_registry(store: Arc<dyn TaskStore>) -> ToolRegistry {
    let auth = Authenticator::explicit(resolver(), Arc::clone(&store));
    ToolRegistry::new(Arc::new(auth), TaskService::new(store), Duration::from_secs(10))
}

/// Memory store that counts every call made to it
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryTaskStore,
    calls: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl OwnerDirectory for CountingStore {
    async fn distinct_owners(&self) -> Result<Vec<OwnerId>> {
        self.tick();
        self.inner.distinct_owners().await
    }
}

#[async_trait::async_trait]
impl TaskStore for CountingStore {
    async fn insert(&self, task: TaskDoc) -> Result<TaskDoc> {
        self.tick();
        self.inner.insert(task).await
    }

    async fn get(&self, owner: &OwnerId, id: ObjectId) -> Result<Option<TaskDoc>> {
        self.tick();
        self.inner.get(owner, id).await
    }

    async fn find(&self, owner: &OwnerId, filter: &TaskFilter) -> Result<Vec<TaskDoc>> {
        self.tick();
        self.inner.find(owner, filter).await
    }

    async fn complete(&self, owner: &OwnerId, id: ObjectId) -> Result<Option<TaskDoc>> {
        self.tick();
        self.inner.complete(owner, id).await
    }

    async fn delete(&self, owner: &OwnerId, id: ObjectId) -> Result<bool> {
        self.tick();
        self.inner.delete(owner, id).await
    }

    async fn delete_completed(&self, owner: &OwnerId) -> Result<u64> {
        self.tick();
        self.inner.delete_completed(owner).await
    }

    async fn count(&self, owner: &OwnerId, filter: &TaskFilter) -> Result<u64> {
        self.tick();
        self.inner.count(owner, filter).await
    }
}

/// Store whose owner query always fails; records whether anything was written
#[derive(Default)]
pub struct FailingStore {
    inserts: AtomicUsize,
}

impl FailingStore {
    pub fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl OwnerDirectory for FailingStore {
    async fn distinct_owners(&self) -> Result<Vec<OwnerId>> {
        Err(TaskkeepError::StoreUnavailable(
            "connection reset during owner query".to_string(),
        ))
    }
}

#[async_trait::async_trait]
impl TaskStore for FailingStore {
    async fn insert(&self, task: TaskDoc) -> Result<TaskDoc> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        Ok(task)
    }

    async fn get(&self, _owner: &OwnerId, _id: ObjectId) -> Result<Option<TaskDoc>> {
        Err(TaskkeepError::StoreUnavailable("down".to_string()))
    }

    async fn find(&self, _owner: &OwnerId, _filter: &TaskFilter) -> Result<Vec<TaskDoc>> {
        Err(TaskkeepError::StoreUnavailable("down".to_string()))
    }

    async fn complete(&self, _owner: &OwnerId, _id: ObjectId) -> Result<Option<TaskDoc>> {
        Err(TaskkeepError::StoreUnavailable("down".to_string()))
    }

    async fn delete(&self, _owner: &OwnerId, _id: ObjectId) -> Result<bool> {
        Err(TaskkeepError::StoreUnavailable("down".to_string()))
    }

    async fn delete_completed(&self, _owner: &OwnerId) -> Result<u64> {
        Err(TaskkeepError::StoreUnavailable("down".to_string()))
    }

    async fn count(&self, _owner: &OwnerId, _filter: &TaskFilter) -> Result<u64> {
        Err(TaskkeepError::StoreUnavailable("down".to_string()))
    }
}
