//! Task storage
//!
//! The identity core only needs [`OwnerDirectory`]; the tools need the full
//! [`TaskStore`]. Two backends: an in-memory store and MongoDB.

mod memory;
mod mongo;

pub use memory::MemoryTaskStore;
pub use mongo::MongoTaskStore;

use bson::{doc, oid::ObjectId, Document};
use std::str::FromStr;

use crate::db::{Priority, TaskDoc};
use crate::types::{OwnerId, Result};

/// Read-only view of every owner identifier the store currently knows
#[async_trait::async_trait]
pub trait OwnerDirectory: Send + Sync {
    /// All owners with at least one task. Order is unspecified.
    async fn distinct_owners(&self) -> Result<Vec<OwnerId>>;
}

/// Owner-scoped task persistence
///
/// Every operation takes the owner; a task owned by someone else behaves
/// exactly like a missing one.
#[async_trait::async_trait]
pub trait TaskStore: OwnerDirectory {
    /// Persist a new task, returning it with its ID and timestamps filled in
    async fn insert(&self, task: TaskDoc) -> Result<TaskDoc>;

    async fn get(&self, owner: &OwnerId, id: ObjectId) -> Result<Option<TaskDoc>>;

    /// Matching tasks, pending first, newest first within each group
    async fn find(&self, owner: &OwnerId, filter: &TaskFilter) -> Result<Vec<TaskDoc>>;

    /// Mark a pending task done. `None` if no pending task matched.
    async fn complete(&self, owner: &OwnerId, id: ObjectId) -> Result<Option<TaskDoc>>;

    async fn delete(&self, owner: &OwnerId, id: ObjectId) -> Result<bool>;

    /// Remove every completed task, returning how many were removed
    async fn delete_completed(&self, owner: &OwnerId) -> Result<u64>;

    async fn count(&self, owner: &OwnerId, filter: &TaskFilter) -> Result<u64>;
}

/// Completion status filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    Pending,
    Done,
    All,
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" | "open" => Ok(Self::Pending),
            "done" | "completed" => Ok(Self::Done),
            "all" => Ok(Self::All),
            other => Err(format!(
                "Unknown status '{}'. Use pending, done or all.",
                other
            )),
        }
    }
}

/// Task query filter
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: StatusFilter,
    pub priority: Option<Priority>,
    pub tag: Option<String>,
    /// Case-insensitive substring of the title
    pub title_contains: Option<String>,
}

impl TaskFilter {
    /// Every task of the owner
    pub fn all() -> Self {
        Self {
            status: StatusFilter::All,
            ..Default::default()
        }
    }

    pub fn with_status(status: StatusFilter) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    /// In-memory evaluation, mirroring `to_document`
    pub fn matches(&self, task: &TaskDoc) -> bool {
        let status_ok = match self.status {
            StatusFilter::Pending => !task.done,
            StatusFilter::Done => task.done,
            StatusFilter::All => true,
        };
        let priority_ok = self.priority.map_or(true, |p| task.priority == p);
        let tag_ok = self
            .tag
            .as_ref()
            .map_or(true, |tag| task.tags.iter().any(|t| t == tag));
        let title_ok = self.title_contains.as_ref().map_or(true, |needle| {
            task.title.to_lowercase().contains(&needle.to_lowercase())
        });

        status_ok && priority_ok && tag_ok && title_ok
    }

    /// MongoDB filter document scoped to the owner
    pub fn to_document(&self, owner: &OwnerId) -> Document {
        let mut filter = doc! { "owner": owner.as_str() };

        match self.status {
            StatusFilter::Pending => {
                filter.insert("done", false);
            }
            StatusFilter::Done => {
                filter.insert("done", true);
            }
            StatusFilter::All => {}
        }
        if let Some(priority) = self.priority {
            filter.insert("priority", priority.as_str());
        }
        if let Some(ref tag) = self.tag {
            filter.insert("tags", tag.as_str());
        }
        if let Some(ref needle) = self.title_contains {
            filter.insert(
                "title",
                doc! { "$regex": escape_regex(needle), "$options": "i" },
            );
        }

        filter
    }
}

/// Escape regex metacharacters so user input matches literally
fn escape_regex(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if "\\.+*?()|[]{}^$#&-~".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Shared listing order: pending before done, newest first
pub(crate) fn sort_document() -> Document {
    doc! { "done": 1, "metadata.created_at": -1, "_id": -1 }
}

/// In-memory equivalent of `sort_document`
pub(crate) fn sort_tasks(tasks: &mut [TaskDoc]) {
    tasks.sort_by(|a, b| {
        a.done
            .cmp(&b.done)
            .then_with(|| b.created_at().cmp(&a.created_at()))
            .then_with(|| b._id.cmp(&a._id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(title: &str, done: bool, priority: Priority, tags: &[&str]) -> TaskDoc {
        let mut task = TaskDoc::new(
            OwnerId::new("owner"),
            title.to_string(),
            priority,
            None,
            tags.iter().map(|t| t.to_string()).collect(),
        );
        task.done = done;
        task
    }

    #[test]
    fn test_default_filter_is_pending() {
        let filter = TaskFilter::default();
        assert!(filter.matches(&task("a", false, Priority::Low, &[])));
        assert!(!filter.matches(&task("a", true, Priority::Low, &[])));
    }

    #[test]
    fn test_filter_combines_fields() {
        let filter = TaskFilter {
            status: StatusFilter::All,
            priority: Some(Priority::High),
            tag: Some("work".to_string()),
            title_contains: Some("REPORT".to_string()),
        };
        assert!(filter.matches(&task("Quarterly report", true, Priority::High, &["work"])));
        assert!(!filter.matches(&task("Quarterly report", true, Priority::Low, &["work"])));
        assert!(!filter.matches(&task("Quarterly report", true, Priority::High, &["home"])));
        assert!(!filter.matches(&task("Groceries", true, Priority::High, &["work"])));
    }

    #[test]
    fn test_document_is_owner_scoped() {
        let owner = OwnerId::new("owner-hash");
        let filter = TaskFilter {
            status: StatusFilter::Done,
            priority: None,
            tag: Some("home".to_string()),
            title_contains: Some("a.b".to_string()),
        };
        let document = filter.to_document(&owner);
        assert_eq!(document.get_str("owner").unwrap(), "owner-hash");
        assert!(document.get_bool("done").unwrap());
        assert_eq!(document.get_str("tags").unwrap(), "home");
        let title = document.get_document("title").unwrap();
        assert_eq!(title.get_str("$regex").unwrap(), "a\\.b");
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("Done".parse::<StatusFilter>().unwrap(), StatusFilter::Done);
        assert_eq!("all".parse::<StatusFilter>().unwrap(), StatusFilter::All);
        assert!("later".parse::<StatusFilter>().is_err());
    }
}
