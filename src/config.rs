//! Configuration for taskkeep
//!
//! CLI arguments and environment variable handling using clap.

use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::{CredentialCache, HasherConfig, ResolverConfig};

/// How tool calls reach the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Transport {
    /// Newline-delimited JSON-RPC on stdin/stdout
    Stdio,
    /// JSON-RPC over HTTP POST
    Http,
}

/// Where tasks live
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    /// Process memory, lost on exit
    Memory,
    Mongo,
}

/// How callers prove their identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AuthMode {
    /// Every task tool takes a password argument
    Explicit,
    /// Password entered once per device, then cached locally
    Cached,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stdio => "stdio",
            Self::Http => "http",
        }
    }
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Mongo => "mongo",
        }
    }
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Explicit => "explicit",
            Self::Cached => "cached",
        }
    }
}

/// taskkeep - personal task tracker for AI assistants
#[derive(Parser, Debug, Clone)]
#[command(name = "taskkeep")]
#[command(about = "Personal task tracker served as assistant tools")]
pub struct Args {
    /// Tool transport
    #[arg(long, env = "TASKKEEP_TRANSPORT", value_enum, default_value = "stdio")]
    pub transport: Transport,

    /// Address to listen on (http transport)
    #[arg(long, env = "LISTEN", default_value = "127.0.0.1:8787")]
    pub listen: SocketAddr,

    /// Task store backend
    #[arg(long, env = "TASKKEEP_STORE", value_enum, default_value = "mongo")]
    pub store: StoreKind,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "taskkeep")]
    pub mongodb_db: String,

    /// Identity mode
    #[arg(long, env = "TASKKEEP_AUTH_MODE", value_enum, default_value = "explicit")]
    pub auth_mode: AuthMode,

    /// Credential cache file (cached auth mode)
    /// Defaults to <config dir>/taskkeep/credential.json
    #[arg(long, env = "TASKKEEP_CREDENTIAL_FILE")]
    pub credential_file: Option<PathBuf>,

    /// Minimum password length in characters
    #[arg(long, env = "TASKKEEP_MIN_SECRET_LEN", default_value = "4")]
    pub min_secret_len: usize,

    /// Maximum number of owners scanned per resolution
    #[arg(long, env = "TASKKEEP_MAX_OWNERS", default_value = "256")]
    pub max_owners: usize,

    /// Budget for one identity resolution in milliseconds
    #[arg(long, env = "TASKKEEP_SCAN_TIMEOUT_MS", default_value = "20000")]
    pub scan_timeout_ms: u64,

    /// Timeout for a whole tool call in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "30000")]
    pub request_timeout_ms: u64,

    /// Argon2 memory cost in KiB
    #[arg(long, env = "TASKKEEP_HASH_MEMORY_KIB", default_value = "19456")]
    pub hash_memory_kib: u32,

    /// Argon2 passes
    #[arg(long, env = "TASKKEEP_HASH_ITERATIONS", default_value = "2")]
    pub hash_iterations: u32,

    /// Argon2 parallelism
    #[arg(long, env = "TASKKEEP_HASH_PARALLELISM", default_value = "1")]
    pub hash_parallelism: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,
}

impl Args {
    pub fn hasher_config(&self) -> HasherConfig {
        HasherConfig {
            memory_kib: self.hash_memory_kib,
            iterations: self.hash_iterations,
            parallelism: self.hash_parallelism,
        }
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            min_secret_len: self.min_secret_len,
            max_owners: self.max_owners,
            scan_timeout: Duration::from_millis(self.scan_timeout_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Credential cache location: explicit flag, else the platform default
    pub fn credential_cache(&self) -> Option<CredentialCache> {
        self.credential_file
            .clone()
            .or_else(CredentialCache::default_path)
            .map(CredentialCache::new)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.auth_mode == AuthMode::Cached {
            if self.transport != Transport::Stdio {
                return Err(
                    "Cached auth mode is device-bound and requires the stdio transport".to_string(),
                );
            }
            if self.credential_cache().is_none() {
                return Err(
                    "No config directory on this platform; set TASKKEEP_CREDENTIAL_FILE".to_string(),
                );
            }
        }

        if self.min_secret_len == 0 {
            return Err("TASKKEEP_MIN_SECRET_LEN must be at least 1".to_string());
        }

        if self.max_owners == 0 {
            return Err("TASKKEEP_MAX_OWNERS must be at least 1".to_string());
        }

        if self.scan_timeout_ms == 0 || self.request_timeout_ms == 0 {
            return Err("Timeouts must be greater than zero".to_string());
        }

        Ok(())
    }
}
