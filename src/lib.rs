//! taskkeep - personal task tracker served as assistant tools
//!
//! There are no usernames. A task list belongs to whoever knows its password:
//! the owner identifier is the salted Argon2 hash of that password, and a
//! returning user is recognised by verifying their password against every
//! stored owner identifier.
//!
//! ## Components
//!
//! - **auth**: hashing, identity resolution, device credential cache
//! - **store** / **db**: owner-scoped task persistence (memory or MongoDB)
//! - **services**: per-call authentication and task operations
//! - **tools**: assistant-facing tool definitions and dispatch
//! - **server**: JSON-RPC over stdio or HTTP

pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod routes;
pub mod server;
pub mod services;
pub mod store;
pub mod tools;
pub mod types;

pub use config::Args;
pub use server::{AppState, RpcHandler};
pub use types::{OwnerId, Result, TaskkeepError};
