//! Assistant-facing tools
//!
//! The registry describes the tools available in the current auth mode and
//! runs tool calls. Each call is bounded by the request timeout and produces
//! exactly one usage event. Failures come back as error results carrying
//! `TaskkeepError::user_message()` only.

mod account;
mod tasks;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::auth::AuthenticatedOwner;
use crate::config::AuthMode;
use crate::logging::ToolCallEvent;
use crate::services::{Authenticator, TaskService};
use crate::types::{Result, Secret, TaskkeepError};

pub const ADD_TASK: &str = "add_task";
pub const LIST_TASKS: &str = "list_tasks";
pub const COMPLETE_TASK: &str = "complete_task";
pub const DELETE_TASK: &str = "delete_task";
pub const CLEAR_DONE: &str = "clear_done";
pub const TASK_STATS: &str = "task_stats";
pub const SETUP_PASSWORD: &str = "setup_password";
pub const ACTIVATE_ACCOUNT: &str = "activate_account";
pub const DEACTIVATE_ACCOUNT: &str = "deactivate_account";
pub const ACCOUNT_STATUS: &str = "account_status";

const TASK_TOOLS: [&str; 6] = [
    ADD_TASK,
    LIST_TASKS,
    COMPLETE_TASK,
    DELETE_TASK,
    CLEAR_DONE,
    TASK_STATS,
];

/// Tool description as listed to the assistant
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ToolContent {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

/// Result of one tool call
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ToolResult {
    pub content: Vec<ToolContent>,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl ToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent {
                kind: "text",
                text: text.into(),
            }],
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::text(text)
        }
    }

    /// Concatenated text content
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Arguments shared by every task tool. No `Debug`: it would print the secret.
#[derive(Default, Deserialize)]
pub(crate) struct PasswordArg {
    #[serde(default)]
    pub password: Option<Secret>,
}

impl PasswordArg {
    /// The password, for tools that cannot run without one
    pub fn require(&self) -> Result<&str> {
        self.password
            .as_deref()
            .map(String::as_str)
            .ok_or_else(|| TaskkeepError::Validation("A password is required.".to_string()))
    }
}

pub struct ToolRegistry {
    auth: Arc<Authenticator>,
    tasks: TaskService,
    call_timeout: Duration,
}

impl ToolRegistry {
    pub fn new(auth: Arc<Authenticator>, tasks: TaskService, call_timeout: Duration) -> Self {
        Self {
            auth,
            tasks,
            call_timeout,
        }
    }

    pub fn mode(&self) -> AuthMode {
        self.auth.mode()
    }

    /// Tool names available in the current mode
    pub fn names(&self) -> Vec<&'static str> {
        let mut names = TASK_TOOLS.to_vec();
        match self.mode() {
            AuthMode::Explicit => names.push(SETUP_PASSWORD),
            AuthMode::Cached => {
                names.extend([ACTIVATE_ACCOUNT, DEACTIVATE_ACCOUNT, ACCOUNT_STATUS])
            }
        }
        names
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.names().contains(&name)
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions = tasks::definitions();
        if self.mode() == AuthMode::Explicit {
            let min_len = self.auth.min_secret_len();
            for definition in &mut definitions {
                require_password(&mut definition.input_schema, min_len);
            }
        }
        definitions.extend(account::definitions(self.mode(), self.auth.min_secret_len()));
        definitions
    }

    /// Run one tool call.
    ///
    /// Unknown tools are a protocol error (`BadRequest`); everything else,
    /// including timeouts, becomes an error result.
    pub async fn call(&self, name: &str, arguments: Value) -> Result<ToolResult> {
        if !self.has_tool(name) {
            return Err(TaskkeepError::BadRequest(format!("Unknown tool: {}", name)));
        }

        let started = Instant::now();
        let mut identity = None;
        let work = self.dispatch(name, arguments, &mut identity);
        let outcome = match tokio::time::timeout(self.call_timeout, work).await {
            Ok(outcome) => outcome,
            Err(_) => Err(TaskkeepError::Timeout(format!(
                "{} exceeded {} ms",
                name,
                self.call_timeout.as_millis()
            ))),
        };

        let mut event = ToolCallEvent::new(name).with_duration(started.elapsed());
        if let Some(ref identity) = identity {
            event = event.with_identity(identity);
        }

        let result = match outcome {
            Ok(text) => ToolResult::text(text),
            Err(e) => {
                event = event.with_error(&e);
                ToolResult::error(e.user_message())
            }
        };
        event.emit();
        Ok(result)
    }

    async fn dispatch(
        &self,
        name: &str,
        arguments: Value,
        identity: &mut Option<AuthenticatedOwner>,
    ) -> Result<String> {
        match name {
            ADD_TASK => self.add_task(arguments, identity).await,
            LIST_TASKS => self.list_tasks(arguments, identity).await,
            COMPLETE_TASK => self.complete_task(arguments, identity).await,
            DELETE_TASK => self.delete_task(arguments, identity).await,
            CLEAR_DONE => self.clear_done(arguments, identity).await,
            TASK_STATS => self.task_stats(arguments, identity).await,
            SETUP_PASSWORD => self.setup_password(arguments).await,
            ACTIVATE_ACCOUNT => self.activate_account(arguments).await,
            DEACTIVATE_ACCOUNT => self.deactivate_account().await,
            ACCOUNT_STATUS => self.account_status().await,
            other => Err(TaskkeepError::BadRequest(format!("Unknown tool: {}", other))),
        }
    }

    /// Establish the caller and remember it for the usage event
    async fn authenticate(
        &self,
        password: Option<&Secret>,
        slot: &mut Option<AuthenticatedOwner>,
    ) -> Result<AuthenticatedOwner> {
        let identity = self
            .auth
            .authenticate(password.map(|p| p.as_str()))
            .await?;
        *slot = Some(identity.clone());
        Ok(identity)
    }
}

/// Deserialize tool arguments; `null` or a missing object counts as empty
fn parse_args<T: DeserializeOwned + Default>(tool: &str, arguments: Value) -> Result<T> {
    if arguments.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(arguments)
        .map_err(|e| TaskkeepError::Validation(format!("Invalid arguments for {}: {}", tool, e)))
}

fn object_schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn password_property(min_len: usize) -> Value {
    json!({
        "type": "string",
        "minLength": min_len,
        "description": "Your personal password. The same password always reaches the same tasks."
    })
}

fn require_password(schema: &mut Value, min_len: usize) {
    if let Some(properties) = schema.get_mut("properties").and_then(Value::as_object_mut) {
        properties.insert("password".to_string(), password_property(min_len));
    }
    if let Some(required) = schema.get_mut("required").and_then(Value::as_array_mut) {
        required.push(json!("password"));
    }
}
