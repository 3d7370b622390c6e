//! Per-call authentication
//!
//! Composes the identity resolver with the device credential cache according
//! to the configured [`AuthMode`]:
//!
//! - explicit: every call presents the password and is resolved afresh
//! - cached: `activate` resolves once and stores the owner on this device;
//!   later calls are authenticated by the cached value alone until
//!   `deactivate`

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{AuthenticatedOwner, CredentialCache, DeviceState, IdentityResolver, Resolution};
use crate::config::AuthMode;
use crate::store::TaskStore;
use crate::types::{Result, TaskkeepError};

/// Result of activating this device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    /// The device was already activated for this same account
    pub already_active: bool,
    /// No existing account matched; one is created with the first task
    pub is_new_owner: bool,
}

/// Device status as reported to the user
#[derive(Debug, Clone)]
pub struct DeviceStatus {
    pub state: DeviceState,
    pub activated_at: Option<DateTime<Utc>>,
}

pub struct Authenticator {
    resolver: IdentityResolver,
    store: Arc<dyn TaskStore>,
    mode: AuthMode,
    cache: Option<CredentialCache>,
}

impl Authenticator {
    /// Password required on every call
    pub fn explicit(resolver: IdentityResolver, store: Arc<dyn TaskStore>) -> Self {
        Self {
            resolver,
            store,
            mode: AuthMode::Explicit,
            cache: None,
        }
    }

    /// Password entered once, then cached on this device
    pub fn cached(
        resolver: IdentityResolver,
        store: Arc<dyn TaskStore>,
        cache: CredentialCache,
    ) -> Self {
        Self {
            resolver,
            store,
            mode: AuthMode::Cached,
            cache: Some(cache),
        }
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    pub fn min_secret_len(&self) -> usize {
        self.resolver.config().min_secret_len
    }

    /// Establish the owner for one task call
    pub async fn authenticate(&self, secret: Option<&str>) -> Result<AuthenticatedOwner> {
        match self.mode {
            AuthMode::Explicit => {
                let secret = secret.ok_or_else(|| {
                    TaskkeepError::Validation("A password is required for this tool.".to_string())
                })?;
                let resolution = self.resolver.resolve(secret, &*self.store).await?;
                Ok(resolution.into())
            }
            AuthMode::Cached => {
                let owner = self
                    .with_cache(|cache| cache.load())
                    .await?
                    .ok_or(TaskkeepError::NotActivated)?;
                Ok(AuthenticatedOwner::CachedBearer { owner })
            }
        }
    }

    /// Resolve without persisting anything; tells the user whether the
    /// password is recognised
    pub async fn check_password(&self, secret: &str) -> Result<Resolution> {
        self.resolver.resolve(secret, &*self.store).await
    }

    /// Resolve the password and cache the owner on this device.
    ///
    /// An already-activated device only accepts the password of the account
    /// it is activated for.
    pub async fn activate(&self, secret: &str) -> Result<Activation> {
        if let Some(current) = self.with_cache(|cache| cache.load()).await? {
            self.resolver.verify_claim(secret, &current).await.map_err(|e| {
                if matches!(e, TaskkeepError::AuthenticationMismatch) {
                    warn!("Activation attempted with another account's password");
                }
                e
            })?;
            return Ok(Activation {
                already_active: true,
                is_new_owner: false,
            });
        }

        let resolution = self.resolver.resolve(secret, &*self.store).await?;
        let owner = resolution.owner.clone();
        self.with_cache(move |cache| cache.save(&owner)).await??;
        info!(is_new_owner = resolution.is_new_owner, "Device activated");

        Ok(Activation {
            already_active: false,
            is_new_owner: resolution.is_new_owner,
        })
    }

    /// Forget the cached owner. Returns whether the device was activated.
    pub async fn deactivate(&self) -> Result<bool> {
        self.with_cache(|cache| -> Result<bool> {
            let was_active = cache.load().is_some();
            cache.clear()?;
            Ok(was_active)
        })
        .await?
    }

    pub async fn device_status(&self) -> Result<DeviceStatus> {
        let entry = self.with_cache(|cache| cache.load_entry()).await?;
        Ok(DeviceStatus {
            state: if entry.is_some() {
                DeviceState::Activated
            } else {
                DeviceState::Unactivated
            },
            activated_at: entry.map(|e| e.saved_at),
        })
    }

    /// Run a cache operation on the blocking pool; the cache is plain file I/O
    async fn with_cache<F, T>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&CredentialCache) -> T + Send + 'static,
        T: Send + 'static,
    {
        let cache = self.cache()?.clone();
        Ok(tokio::task::spawn_blocking(move || op(&cache)).await?)
    }

    fn cache(&self) -> Result<&CredentialCache> {
        self.cache.as_ref().ok_or_else(|| {
            TaskkeepError::BadRequest(
                "This server runs in explicit-password mode; pass your password to each tool."
                    .to_string(),
            )
        })
    }
}
