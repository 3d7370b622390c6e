//! Tool transports
//!
//! - **jsonrpc**: protocol handling shared by both transports
//! - **stdio**: one client per process over stdin/stdout
//! - **http**: JSON-RPC over HTTP POST, plus health probes

pub mod http;
pub mod jsonrpc;
pub mod stdio;

use std::sync::Arc;
use std::time::Instant;

use crate::config::StoreKind;
use crate::db::MongoConnector;

pub use jsonrpc::{RpcError, RpcHandler, RpcResponse};

/// Shared state of the HTTP server
pub struct AppState {
    pub rpc: RpcHandler,
    pub store_kind: StoreKind,
    /// Present for the MongoDB store; probed by the readiness check
    pub connector: Option<Arc<MongoConnector>>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        rpc: RpcHandler,
        store_kind: StoreKind,
        connector: Option<Arc<MongoConnector>>,
    ) -> Self {
        Self {
            rpc,
            store_kind,
            connector,
            started_at: Instant::now(),
        }
    }
}
