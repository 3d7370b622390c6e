//! Tool call usage events
//!
//! One structured event per tool call, emitted through `tracing` under the
//! `taskkeep::usage` target so it can be filtered or shipped on its own.
//! Events carry the owner's log tag at most; secrets and full hashes never
//! appear.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::auth::AuthenticatedOwner;
use crate::types::TaskkeepError;

/// How a tool call ended
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    /// The tool answered with an error result
    Failed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

/// Usage event for one tool call
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallEvent {
    pub timestamp: DateTime<Utc>,
    pub tool: String,
    pub outcome: Outcome,
    pub duration_ms: u64,
    /// `freshly_resolved` or `cached_bearer`, once identity is established
    pub trust_level: Option<&'static str>,
    /// Last characters of the owner hash
    pub owner_tag: Option<String>,
    pub is_new_owner: Option<bool>,
    /// `TaskkeepError::kind()` of the failure
    pub error_kind: Option<&'static str>,
}

impl ToolCallEvent {
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            tool: tool.into(),
            outcome: Outcome::Success,
            duration_ms: 0,
            trust_level: None,
            owner_tag: None,
            is_new_owner: None,
            error_kind: None,
        }
    }

    /// Record who made the call
    pub fn with_identity(mut self, identity: &AuthenticatedOwner) -> Self {
        self.trust_level = Some(identity.trust_level());
        self.owner_tag = Some(identity.owner().log_tag().to_string());
        self.is_new_owner = Some(identity.is_new_owner());
        self
    }

    pub fn with_error(mut self, err: &TaskkeepError) -> Self {
        self.outcome = Outcome::Failed;
        self.error_kind = Some(err.kind());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = duration.as_millis() as u64;
        self
    }

    /// Write the event to the log
    pub fn emit(&self) {
        let trust_level = self.trust_level.unwrap_or("none");
        let owner = self.owner_tag.as_deref().unwrap_or("-");

        match self.outcome {
            Outcome::Success => info!(
                target: "taskkeep::usage",
                event = "tool_call",
                tool = %self.tool,
                outcome = self.outcome.as_str(),
                duration_ms = self.duration_ms,
                trust_level,
                owner,
                is_new_owner = self.is_new_owner.unwrap_or(false),
            ),
            Outcome::Failed => warn!(
                target: "taskkeep::usage",
                event = "tool_call",
                tool = %self.tool,
                outcome = self.outcome.as_str(),
                duration_ms = self.duration_ms,
                trust_level,
                owner,
                error_kind = self.error_kind.unwrap_or("unknown"),
            ),
        }
    }
}
