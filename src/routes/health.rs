//! Health check endpoints
//!
//! - /health, /healthz - Liveness probe (is the process serving?)
//! - /ready, /readyz - Readiness probe (can the task store be reached?)
//!
//! Liveness never touches the store. Readiness connects to MongoDB if the
//! lazy connection has not been made yet; the memory store is always ready.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use super::json_response;
use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    /// `online` or `degraded`
    pub status: &'static str,
    pub version: &'static str,
    /// Git commit hash (short)
    pub commit: &'static str,
    pub build_time: &'static str,
    /// Seconds since the server started
    pub uptime: u64,
    pub timestamp: String,
    #[serde(rename = "authMode")]
    pub auth_mode: &'static str,
    pub store: StoreHealth,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct StoreHealth {
    pub kind: &'static str,
    /// Whether the store connection has been established
    pub connected: bool,
}

fn build_health_response(
    state: &AppState,
    connected: bool,
    error: Option<String>,
) -> HealthResponse {
    HealthResponse {
        healthy: true,
        status: if connected { "online" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        uptime: state.started_at.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        auth_mode: state.rpc.registry().mode().as_str(),
        store: StoreHealth {
            kind: state.store_kind.as_str(),
            connected,
        },
        error,
    }
}

/// Handle liveness probe (/health, /healthz)
///
/// Always 200 while the server runs. `store.connected` is informational: a
/// MongoDB store connects on first use.
pub async fn health_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let connected = match state.connector {
        Some(ref connector) => connector.is_connected().await,
        None => true,
    };
    let response = build_health_response(&state, connected, None);

    let body = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"healthy":true,"error":"Serialization failed"}"#.to_string());
    json_response(StatusCode::OK, body)
}

/// Handle readiness probe (/ready, /readyz)
///
/// 200 only if the task store is reachable.
pub async fn readiness_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let (connected, error) = match state.connector {
        Some(ref connector) => match connector.connect().await {
            Ok(_) => (true, None),
            Err(e) => {
                warn!("Readiness check: store unreachable: {}", e);
                (false, Some(e.user_message()))
            }
        },
        None => (true, None),
    };
    let response = build_health_response(&state, connected, error);

    let body = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"healthy":false,"error":"Serialization failed"}"#.to_string());

    let status = if connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    json_response(status, body)
}
