//! Task tools

use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt::Write;

use super::{
    object_schema, parse_args, PasswordArg, ToolDefinition, ToolRegistry, ADD_TASK, CLEAR_DONE,
    COMPLETE_TASK, DELETE_TASK, LIST_TASKS, TASK_STATS,
};
use crate::auth::AuthenticatedOwner;
use crate::db::{Priority, TaskDoc};
use crate::services::tasks::parse_task_id;
use crate::services::{CompleteOutcome, NewTaskInput, MAX_TITLE_LEN};
use crate::store::{StatusFilter, TaskFilter};
use crate::types::{Result, Secret, TaskkeepError};

const NEW_OWNER_NOTE: &str =
    "This password is new, so a new account was created. Use the same password to reach these tasks later.";

#[derive(Default, Deserialize)]
struct AddTaskArgs {
    #[serde(default)]
    title: String,
    priority: Option<String>,
    due_date: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    password: Option<Secret>,
}

#[derive(Default, Deserialize)]
struct ListTasksArgs {
    status: Option<String>,
    priority: Option<String>,
    tag: Option<String>,
    search: Option<String>,
    password: Option<Secret>,
}

#[derive(Default, Deserialize)]
struct TaskIdArgs {
    #[serde(default)]
    task_id: String,
    password: Option<Secret>,
}

pub(super) fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: ADD_TASK,
            description: "Add a task to your list.".to_string(),
            input_schema: object_schema(
                json!({
                    "title": {
                        "type": "string",
                        "maxLength": MAX_TITLE_LEN,
                        "description": "What needs doing"
                    },
                    "priority": { "type": "string", "enum": ["low", "medium", "high"] },
                    "due_date": {
                        "type": "string",
                        "pattern": "^\\d{4}-\\d{2}-\\d{2}$",
                        "description": "Due date as YYYY-MM-DD"
                    },
                    "tags": { "type": "array", "items": { "type": "string" } }
                }),
                &["title"],
            ),
        },
        ToolDefinition {
            name: LIST_TASKS,
            description: "List your tasks, pending first and newest first.".to_string(),
            input_schema: object_schema(
                json!({
                    "status": { "type": "string", "enum": ["pending", "done", "all"] },
                    "priority": { "type": "string", "enum": ["low", "medium", "high"] },
                    "tag": { "type": "string" },
                    "search": {
                        "type": "string",
                        "description": "Case-insensitive text to find in task titles"
                    }
                }),
                &[],
            ),
        },
        ToolDefinition {
            name: COMPLETE_TASK,
            description: "Mark a task as done.".to_string(),
            input_schema: object_schema(task_id_property(), &["task_id"]),
        },
        ToolDefinition {
            name: DELETE_TASK,
            description: "Delete a task permanently.".to_string(),
            input_schema: object_schema(task_id_property(), &["task_id"]),
        },
        ToolDefinition {
            name: CLEAR_DONE,
            description: "Delete all completed tasks.".to_string(),
            input_schema: object_schema(json!({}), &[]),
        },
        ToolDefinition {
            name: TASK_STATS,
            description: "Count your pending and completed tasks.".to_string(),
            input_schema: object_schema(json!({}), &[]),
        },
    ]
}

fn task_id_property() -> Value {
    json!({
        "task_id": { "type": "string", "description": "Task id as shown by list_tasks" }
    })
}

fn parse_priority(raw: Option<&str>) -> Result<Option<Priority>> {
    raw.map(|p| p.parse::<Priority>().map_err(TaskkeepError::Validation))
        .transpose()
}

impl ToolRegistry {
    pub(super) async fn add_task(
        &self,
        arguments: Value,
        identity: &mut Option<AuthenticatedOwner>,
    ) -> Result<String> {
        let args: AddTaskArgs = parse_args(ADD_TASK, arguments)?;
        let input = NewTaskInput {
            title: args.title,
            priority: parse_priority(args.priority.as_deref())?,
            due_date: args.due_date,
            tags: args.tags,
        };
        // Bad input is refused before paying for an owner scan
        input.validate()?;

        let who = self.authenticate(args.password.as_ref(), identity).await?;
        let task = self.tasks.add_task(who.owner(), input).await?;

        let mut text = format!("Added: {}", describe(&task));
        if who.is_new_owner() {
            text.push_str("\n\n");
            text.push_str(NEW_OWNER_NOTE);
        }
        Ok(text)
    }

    pub(super) async fn list_tasks(
        &self,
        arguments: Value,
        identity: &mut Option<AuthenticatedOwner>,
    ) -> Result<String> {
        let args: ListTasksArgs = parse_args(LIST_TASKS, arguments)?;
        let status = args
            .status
            .as_deref()
            .map(|s| s.parse::<StatusFilter>().map_err(TaskkeepError::Validation))
            .transpose()?
            .unwrap_or_default();
        let filter = TaskFilter {
            status,
            priority: parse_priority(args.priority.as_deref())?,
            tag: args.tag,
            title_contains: args.search,
        };

        let who = self.authenticate(args.password.as_ref(), identity).await?;
        let tasks = self.tasks.list_tasks(who.owner(), &filter).await?;

        if tasks.is_empty() {
            return Ok(match status {
                StatusFilter::Pending => "No pending tasks.".to_string(),
                StatusFilter::Done => "No completed tasks.".to_string(),
                StatusFilter::All => "No tasks found.".to_string(),
            });
        }

        let mut text = format!(
            "{} task{}:",
            tasks.len(),
            if tasks.len() == 1 { "" } else { "s" }
        );
        for task in &tasks {
            let _ = write!(text, "\n- {}", describe(task));
        }
        Ok(text)
    }

    pub(super) async fn complete_task(
        &self,
        arguments: Value,
        identity: &mut Option<AuthenticatedOwner>,
    ) -> Result<String> {
        let args: TaskIdArgs = parse_args(COMPLETE_TASK, arguments)?;
        parse_task_id(&args.task_id)?;
        let who = self.authenticate(args.password.as_ref(), identity).await?;

        Ok(match self.tasks.complete_task(who.owner(), &args.task_id).await? {
            CompleteOutcome::Completed(task) => format!("Completed: {}", task.title),
            CompleteOutcome::AlreadyDone(task) => format!("Already done: {}", task.title),
        })
    }

    pub(super) async fn delete_task(
        &self,
        arguments: Value,
        identity: &mut Option<AuthenticatedOwner>,
    ) -> Result<String> {
        let args: TaskIdArgs = parse_args(DELETE_TASK, arguments)?;
        parse_task_id(&args.task_id)?;
        let who = self.authenticate(args.password.as_ref(), identity).await?;
        self.tasks.delete_task(who.owner(), &args.task_id).await?;
        Ok(format!("Deleted task {}.", args.task_id.trim()))
    }

    pub(super) async fn clear_done(
        &self,
        arguments: Value,
        identity: &mut Option<AuthenticatedOwner>,
    ) -> Result<String> {
        let args: PasswordArg = parse_args(CLEAR_DONE, arguments)?;
        let who = self.authenticate(args.password.as_ref(), identity).await?;

        Ok(match self.tasks.clear_done(who.owner()).await? {
            0 => "No completed tasks to clear.".to_string(),
            1 => "Cleared 1 completed task.".to_string(),
            n => format!("Cleared {} completed tasks.", n),
        })
    }

    pub(super) async fn task_stats(
        &self,
        arguments: Value,
        identity: &mut Option<AuthenticatedOwner>,
    ) -> Result<String> {
        let args: PasswordArg = parse_args(TASK_STATS, arguments)?;
        let who = self.authenticate(args.password.as_ref(), identity).await?;
        let stats = self.tasks.task_stats(who.owner()).await?;

        Ok(format!(
            "Total: {}, pending: {}, done: {}",
            stats.total, stats.pending, stats.done
        ))
    }
}

/// One-line human-readable form of a task
fn describe(task: &TaskDoc) -> String {
    let mut line = format!(
        "[{}] {} (id: {}, priority: {}",
        if task.done { "x" } else { " " },
        task.title,
        task.id_hex(),
        task.priority
    );
    if let Some(ref due) = task.due_date {
        let _ = write!(line, ", due: {}", due);
    }
    if !task.tags.is_empty() {
        let _ = write!(line, ", tags: {}", task.tags.join(", "));
    }
    line.push(')');
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{CredentialHasher, HasherConfig, IdentityResolver, ResolverConfig};
    use crate::services::{Authenticator, TaskService};
    use crate::store::{MemoryTaskStore, OwnerDirectory, TaskStore};
    use std::sync::Arc;
    use std::time::Duration;

    fn registry() -> (ToolRegistry, Arc<MemoryTaskStore>) {
        let memory = Arc::new(MemoryTaskStore::new());
        let store: Arc<dyn TaskStore> = memory.clone();
        let hasher = CredentialHasher::new(HasherConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap();
        let resolver = IdentityResolver::new(hasher, ResolverConfig::default());
        let auth = Authenticator::explicit(resolver, Arc::clone(&store));
        let registry =
            ToolRegistry::new(Arc::new(auth), TaskService::new(store), Duration::from_secs(10));
        (registry, memory)
    }

    #[tokio::test]
    async fn test_add_then_list() {
        let (registry, _) = registry();

        let added = registry
            .call(
                ADD_TASK,
                json!({
                    "title": "Water plants",
                    "priority": "high",
                    "tags": ["Home"],
                    "password": "abcd"
                }),
            )
            .await
            .unwrap();
        assert!(!added.is_error);
        assert!(added.joined_text().contains("Water plants"));
        assert!(added.joined_text().contains("new account"));

        let listed = registry
            .call(LIST_TASKS, json!({ "password": "abcd" }))
            .await
            .unwrap();
        let text = listed.joined_text();
        assert!(text.starts_with("1 task:"));
        assert!(text.contains("priority: high"));
        assert!(text.contains("tags: home"));

        // Second add under the same password is not a new account
        let again = registry
            .call(ADD_TASK, json!({ "title": "Feed cat", "password": "abcd" }))
            .await
            .unwrap();
        assert!(!again.joined_text().contains("new account"));
    }

    #[tokio::test]
    async fn test_read_only_tools_persist_nothing() {
        let (registry, store) = registry();

        for tool in [LIST_TASKS, TASK_STATS, CLEAR_DONE] {
            let result = registry.call(tool, json!({ "password": "brand-new" })).await.unwrap();
            assert!(!result.is_error, "{} failed: {}", tool, result.joined_text());
        }
        assert!(store.is_empty().await);
        assert!(store.distinct_owners().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_priority_is_error_result() {
        let (registry, store) = registry();
        let result = registry
            .call(
                ADD_TASK,
                json!({ "title": "x", "priority": "urgent", "password": "abcd" }),
            )
            .await
            .unwrap();
        assert!(result.is_error);
        assert!(result.joined_text().contains("Unknown priority"));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_complete_and_stats() {
        let (registry, store) = registry();
        registry
            .call(ADD_TASK, json!({ "title": "one", "password": "abcd" }))
            .await
            .unwrap();
        let owner = store.distinct_owners().await.unwrap().remove(0);
        let id = store.find(&owner, &TaskFilter::all()).await.unwrap()[0].id_hex();

        let done = registry
            .call(COMPLETE_TASK, json!({ "task_id": id, "password": "abcd" }))
            .await
            .unwrap();
        assert_eq!(done.joined_text(), "Completed: one");

        let again = registry
            .call(COMPLETE_TASK, json!({ "task_id": id, "password": "abcd" }))
            .await
            .unwrap();
        assert_eq!(again.joined_text(), "Already done: one");

        let stats = registry
            .call(TASK_STATS, json!({ "password": "abcd" }))
            .await
            .unwrap();
        assert_eq!(stats.joined_text(), "Total: 1, pending: 0, done: 1");
    }

    #[test]
    fn test_describe() {
        let mut task = TaskDoc::new(
            crate::types::OwnerId::new("o"),
            "Pay rent".to_string(),
            Priority::High,
            Some("2026-11-01".to_string()),
            vec!["bills".to_string()],
        );
        task.done = true;
        let line = describe(&task);
        assert!(line.starts_with("[x] Pay rent"));
        assert!(line.contains("due: 2026-11-01"));
        assert!(line.ends_with("tags: bills)"));
    }
}
