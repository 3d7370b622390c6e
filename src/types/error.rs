//! Error types for taskkeep
//!
//! One enum covers every failure the core and its collaborators surface.
//! `Display` is for logs; `user_message()` is what the assistant sees.

use hyper::StatusCode;

/// Main error type for taskkeep operations
#[derive(Debug, thiserror::Error)]
pub enum TaskkeepError {
    /// Input rejected before any hashing or store access
    #[error("Validation error: {0}")]
    Validation(String),

    /// Secret does not verify against the claimed owner identifier
    #[error("Authentication mismatch")]
    AuthenticationMismatch,

    /// Cached-credential mode without an activated device
    #[error("Device not activated")]
    NotActivated,

    #[error("Not found: {0}")]
    NotFound(String),

    /// Backing store unreachable or failing; callers may retry the whole operation
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Owner scan refused because the directory exceeds the configured bound
    #[error("Owner capacity exceeded: {0} owners")]
    CapacityExceeded(usize),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Hashing error: {0}")]
    Hashing(String),

    #[error("Credential cache error: {0}")]
    Cache(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TaskkeepError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationMismatch => StatusCode::UNAUTHORIZED,
            Self::NotActivated => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::CapacityExceeded(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Hashing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Cache(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON-RPC error code for protocol-level failures
    pub fn rpc_code(&self) -> i64 {
        match self {
            Self::BadRequest(_) => -32602,
            Self::Validation(_) => -32602,
            _ => -32603,
        }
    }

    /// Whether the caller may retry the whole operation unchanged
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::Timeout(_))
    }

    /// Stable snake_case name for structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::AuthenticationMismatch => "authentication_mismatch",
            Self::NotActivated => "not_activated",
            Self::NotFound(_) => "not_found",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::CapacityExceeded(_) => "capacity_exceeded",
            Self::Timeout(_) => "timeout",
            Self::Hashing(_) => "hashing",
            Self::Cache(_) => "cache",
            Self::BadRequest(_) => "bad_request",
            Self::Config(_) => "config",
            Self::Internal(_) => "internal",
        }
    }

    /// Short, non-technical message shown to the user.
    ///
    /// Never includes hashes, file paths or store details. Validation and
    /// not-found messages are produced by this crate and carry no internals.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) | Self::BadRequest(msg) | Self::NotFound(msg) => msg.clone(),
            Self::AuthenticationMismatch => {
                "That password does not match this account. Please re-enter it, or deactivate and set up again."
                    .to_string()
            }
            Self::NotActivated => {
                "This device is not activated yet. Run activate_account with your password first."
                    .to_string()
            }
            Self::StoreUnavailable(_) => {
                "Your tasks are temporarily unavailable. Please try again in a moment.".to_string()
            }
            Self::CapacityExceeded(_) => {
                "This task tracker has reached its account limit. Please contact the operator."
                    .to_string()
            }
            Self::Timeout(_) => {
                "That took too long to finish. Please try again.".to_string()
            }
            Self::Hashing(_) | Self::Cache(_) | Self::Config(_) | Self::Internal(_) => {
                "Something went wrong with your credential. Please re-enter your password or reset it."
                    .to_string()
            }
        }
    }
}

impl From<std::io::Error> for TaskkeepError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for TaskkeepError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for TaskkeepError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<mongodb::error::Error> for TaskkeepError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for TaskkeepError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        Self::Timeout(err.to_string())
    }
}

impl From<tokio::task::JoinError> for TaskkeepError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("Blocking task failed: {}", err))
    }
}

/// Result type alias for taskkeep operations
pub type Result<T> = std::result::Result<T, TaskkeepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_hides_internals() {
        let err = TaskkeepError::StoreUnavailable("mongodb://secret-host:27017 refused".into());
        assert!(!err.user_message().contains("mongodb"));

        let err = TaskkeepError::Cache("/home/me/.config/taskkeep/credential.json".into());
        assert!(!err.user_message().contains("credential.json"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(TaskkeepError::StoreUnavailable("down".into()).is_transient());
        assert!(TaskkeepError::Timeout("scan".into()).is_transient());
        assert!(!TaskkeepError::Validation("short".into()).is_transient());
        assert!(!TaskkeepError::AuthenticationMismatch.is_transient());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            TaskkeepError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            TaskkeepError::StoreUnavailable("x".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
