//! Owner-scoped task operations
//!
//! Input validation and normalisation live here; the store only persists.

use bson::oid::ObjectId;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::debug;

use crate::db::{Priority, TaskDoc};
use crate::store::{StatusFilter, TaskFilter, TaskStore};
use crate::types::{OwnerId, Result, TaskkeepError};

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_TAGS: usize = 20;

const DUE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Fields accepted when creating a task
#[derive(Debug, Clone, Default)]
pub struct NewTaskInput {
    pub title: String,
    pub priority: Option<Priority>,
    pub due_date: Option<String>,
    pub tags: Vec<String>,
}

impl NewTaskInput {
    /// Check every field without touching the store
    pub fn validate(&self) -> Result<()> {
        validate_title(&self.title)?;
        if let Some(due) = self.due_date.as_deref() {
            validate_due_date(due)?;
        }
        normalize_tags(&self.tags)?;
        Ok(())
    }
}

/// Per-owner task counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStats {
    pub total: u64,
    pub pending: u64,
    pub done: u64,
}

#[derive(Debug, Clone)]
pub enum CompleteOutcome {
    Completed(TaskDoc),
    AlreadyDone(TaskDoc),
}

#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn TaskStore>,
}

impl TaskService {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    pub async fn add_task(&self, owner: &OwnerId, input: NewTaskInput) -> Result<TaskDoc> {
        let title = validate_title(&input.title)?;
        let due_date = input.due_date.as_deref().map(validate_due_date).transpose()?;
        let tags = normalize_tags(&input.tags)?;

        let task = TaskDoc::new(
            owner.clone(),
            title,
            input.priority.unwrap_or_default(),
            due_date,
            tags,
        );
        let task = self.store.insert(task).await?;
        debug!(owner = owner.log_tag(), task_id = %task.id_hex(), "Task added");
        Ok(task)
    }

    pub async fn list_tasks(&self, owner: &OwnerId, filter: &TaskFilter) -> Result<Vec<TaskDoc>> {
        let mut filter = filter.clone();
        filter.tag = filter.tag.as_deref().map(normalize_tag).filter(|t| !t.is_empty());
        filter.title_contains = filter
            .title_contains
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        self.store.find(owner, &filter).await
    }

    /// Mark a task done. Completing a task that is already done is not an
    /// error; the outcome says so.
    pub async fn complete_task(&self, owner: &OwnerId, id: &str) -> Result<CompleteOutcome> {
        let id = parse_task_id(id)?;

        if let Some(task) = self.store.complete(owner, id).await? {
            return Ok(CompleteOutcome::Completed(task));
        }

        match self.store.get(owner, id).await? {
            Some(task) => Ok(CompleteOutcome::AlreadyDone(task)),
            None => Err(not_found(id)),
        }
    }

    pub async fn delete_task(&self, owner: &OwnerId, id: &str) -> Result<()> {
        let id = parse_task_id(id)?;
        if self.store.delete(owner, id).await? {
            Ok(())
        } else {
            Err(not_found(id))
        }
    }

    /// Remove every completed task, returning how many were removed
    pub async fn clear_done(&self, owner: &OwnerId) -> Result<u64> {
        self.store.delete_completed(owner).await
    }

    pub async fn task_stats(&self, owner: &OwnerId) -> Result<TaskStats> {
        let pending = self
            .store
            .count(owner, &TaskFilter::with_status(StatusFilter::Pending))
            .await?;
        let done = self
            .store
            .count(owner, &TaskFilter::with_status(StatusFilter::Done))
            .await?;
        Ok(TaskStats {
            total: pending + done,
            pending,
            done,
        })
    }
}

/// Parse a task id as given to the user (24 hex chars)
pub fn parse_task_id(id: &str) -> Result<ObjectId> {
    ObjectId::parse_str(id.trim())
        .map_err(|_| TaskkeepError::Validation(format!("'{}' is not a valid task id.", id.trim())))
}

fn not_found(id: ObjectId) -> TaskkeepError {
    TaskkeepError::NotFound(format!("No task with id {}.", id.to_hex()))
}

fn validate_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(TaskkeepError::Validation("The task title cannot be empty.".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(TaskkeepError::Validation(format!(
            "The task title is too long (max {} characters).",
            MAX_TITLE_LEN
        )));
    }
    Ok(title.to_string())
}

fn validate_due_date(raw: &str) -> Result<String> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, DUE_DATE_FORMAT)
        .map(|date| date.format(DUE_DATE_FORMAT).to_string())
        .map_err(|_| {
            TaskkeepError::Validation(format!(
                "Due date '{}' must be a calendar date in YYYY-MM-DD form.",
                raw
            ))
        })
}

fn normalize_tag(tag: &str) -> String {
    tag.trim().to_lowercase()
}

/// Trim, lowercase, drop empties and duplicates; first occurrence wins
fn normalize_tags(tags: &[String]) -> Result<Vec<String>> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags.iter().map(|t| normalize_tag(t)) {
        if !tag.is_empty() && !normalized.contains(&tag) {
            normalized.push(tag);
        }
    }
    if normalized.len() > MAX_TAGS {
        return Err(TaskkeepError::Validation(format!(
            "A task can have at most {} tags.",
            MAX_TAGS
        )));
    }
    Ok(normalized)
}
