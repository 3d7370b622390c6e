//! taskkeep - personal task tracker served as assistant tools

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taskkeep::{
    auth::{CredentialHasher, IdentityResolver},
    config::{Args, AuthMode, StoreKind, Transport},
    db::MongoConnector,
    server::{self, AppState, RpcHandler},
    services::{Authenticator, TaskService},
    store::{MemoryTaskStore, MongoTaskStore, TaskStore},
    tools::ToolRegistry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging. stdout belongs to the stdio transport, so
    // logs always go to stderr.
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("taskkeep={},info", log_level).into()),
        )
        .with(
            args.log_json
                .then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)),
        )
        .with(
            (!args.log_json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        )
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  taskkeep {}", env!("CARGO_PKG_VERSION"));
    info!("======================================");
    info!("Transport: {}", args.transport.as_str());
    if args.transport == Transport::Http {
        info!("Listen: {}", args.listen);
    }
    info!("Store: {}", args.store.as_str());
    info!("Auth mode: {}", args.auth_mode.as_str());
    info!("Max owners: {}", args.max_owners);
    info!("======================================");

    // Task store
    let (store, connector): (Arc<dyn TaskStore>, Option<Arc<MongoConnector>>) = match args.store {
        StoreKind::Memory => {
            warn!("Memory store selected - tasks are lost when the process exits");
            (Arc::new(MemoryTaskStore::new()), None)
        }
        StoreKind::Mongo => {
            let connector = MongoConnector::new(&args.mongodb_uri, &args.mongodb_db);
            // Connection is lazy; an early failure is not fatal
            match connector.connect().await {
                Ok(_) => info!("MongoDB connected successfully"),
                Err(e) => warn!("MongoDB not reachable yet, will retry on first use: {}", e),
            }
            (
                Arc::new(MongoTaskStore::new(Arc::clone(&connector))),
                Some(connector),
            )
        }
    };

    // Identity
    let hasher = CredentialHasher::new(args.hasher_config())?;
    let resolver = IdentityResolver::new(hasher, args.resolver_config());
    let authenticator = match args.auth_mode {
        AuthMode::Explicit => Authenticator::explicit(resolver, Arc::clone(&store)),
        AuthMode::Cached => {
            let Some(cache) = args.credential_cache() else {
                error!("Configuration error: no credential cache location");
                std::process::exit(1);
            };
            info!("Credential cache: {}", cache.path().display());
            Authenticator::cached(resolver, Arc::clone(&store), cache)
        }
    };

    let registry = ToolRegistry::new(
        Arc::new(authenticator),
        TaskService::new(store),
        args.request_timeout(),
    );
    let rpc = RpcHandler::new(Arc::new(registry));

    match args.transport {
        Transport::Stdio => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                }
                result = server::stdio::run(&rpc) => {
                    result?;
                }
            }
        }
        Transport::Http => {
            let state = Arc::new(AppState::new(rpc, args.store, connector));
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                }
                result = server::http::run(state, args.listen) => {
                    result?;
                }
            }
        }
    }

    info!("taskkeep shutting down");
    Ok(())
}
