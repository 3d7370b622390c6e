//! Identity resolution by possession of a secret
//!
//! There is no username. A secret is tested against every owner identifier
//! the store knows until one verifies; if none does, a fresh hash of the
//! secret becomes a new owner identifier.
//!
//! ## Capacity
//!
//! Each cold resolution costs one Argon2 verification per registered owner,
//! so latency grows linearly with the number of owners. This is a personal
//! tool: the scan is bounded by `max_owners` and `scan_timeout` instead of
//! being optimised away. A directory lookup would need reversible
//! identifiers, which the design deliberately avoids.
//!
//! ## Known gap
//!
//! Two concurrent first-time resolutions of the same secret can both see no
//! match and mint two different owner identifiers, splitting one person into
//! two owners. Nothing here prevents that; it needs either an advisory lock
//! or manual reconciliation.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::auth::password::CredentialHasher;
use crate::store::OwnerDirectory;
use crate::types::{OwnerId, Result, TaskkeepError};

/// Default minimum secret length, in characters
pub const DEFAULT_MIN_SECRET_LEN: usize = 4;

/// Default upper bound on the number of owners scanned
pub const DEFAULT_MAX_OWNERS: usize = 256;

/// Default budget for one whole resolution
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(20);

/// Resolver limits
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub min_secret_len: usize,
    pub max_owners: usize,
    pub scan_timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            min_secret_len: DEFAULT_MIN_SECRET_LEN,
            max_owners: DEFAULT_MAX_OWNERS,
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
        }
    }
}

/// Outcome of resolving a secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub owner: OwnerId,
    /// True when no stored identifier matched and `owner` was just minted.
    /// Nothing is persisted until a task is created under it.
    pub is_new_owner: bool,
}

/// An owner together with how their identity was established
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticatedOwner {
    /// Secret presented and resolved during this call
    FreshlyResolved { owner: OwnerId, is_new_owner: bool },
    /// Identity taken from the device's credential cache with no challenge
    CachedBearer { owner: OwnerId },
}

impl AuthenticatedOwner {
    pub fn owner(&self) -> &OwnerId {
        match self {
            Self::FreshlyResolved { owner, .. } | Self::CachedBearer { owner } => owner,
        }
    }

    pub fn is_new_owner(&self) -> bool {
        matches!(self, Self::FreshlyResolved { is_new_owner: true, .. })
    }

    pub fn trust_level(&self) -> &'static str {
        match self {
            Self::FreshlyResolved { .. } => "freshly_resolved",
            Self::CachedBearer { .. } => "cached_bearer",
        }
    }
}

impl From<Resolution> for AuthenticatedOwner {
    fn from(resolution: Resolution) -> Self {
        Self::FreshlyResolved {
            owner: resolution.owner,
            is_new_owner: resolution.is_new_owner,
        }
    }
}

/// Turns secrets into owner identifiers
#[derive(Clone)]
pub struct IdentityResolver {
    hasher: Arc<CredentialHasher>,
    config: ResolverConfig,
    #[cfg(test)]
    verifications: Arc<std::sync::atomic::AtomicUsize>,
}

impl IdentityResolver {
    pub fn new(hasher: CredentialHasher, config: ResolverConfig) -> Self {
        Self {
            hasher: Arc::new(hasher),
            config,
            #[cfg(test)]
            verifications: Arc::default(),
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Length policy, checked before any hashing or store access
    pub fn validate(&self, secret: &str) -> Result<()> {
        let trimmed = secret.trim();
        if trimmed.is_empty() {
            return Err(TaskkeepError::Validation(
                "Password cannot be empty.".to_string(),
            ));
        }
        if trimmed.chars().count() < self.config.min_secret_len {
            return Err(TaskkeepError::Validation(format!(
                "Password must be at least {} characters.",
                self.config.min_secret_len
            )));
        }
        Ok(())
    }

    /// Resolve a secret against every owner the directory currently knows.
    ///
    /// Candidates are fetched fresh on every call. A directory failure aborts
    /// resolution; it is never treated as an empty directory.
    pub async fn resolve<D>(&self, secret: &str, directory: &D) -> Result<Resolution>
    where
        D: OwnerDirectory + ?Sized,
    {
        self.validate(secret)?;

        let started = Instant::now();
        let scan = self.scan(secret, directory);
        let resolution = tokio::time::timeout(self.config.scan_timeout, scan)
            .await
            .map_err(|_| {
                warn!(
                    timeout_ms = self.config.scan_timeout.as_millis() as u64,
                    "Owner scan timed out"
                );
                TaskkeepError::Timeout(format!(
                    "owner scan exceeded {} ms",
                    self.config.scan_timeout.as_millis()
                ))
            })??;

        info!(
            owner = resolution.owner.log_tag(),
            is_new_owner = resolution.is_new_owner,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Resolved identity"
        );
        Ok(resolution)
    }

    async fn scan<D>(&self, secret: &str, directory: &D) -> Result<Resolution>
    where
        D: OwnerDirectory + ?Sized,
    {
        let candidates = directory.distinct_owners().await.map_err(|e| match e {
            TaskkeepError::StoreUnavailable(_) => e,
            other => TaskkeepError::StoreUnavailable(other.to_string()),
        })?;

        if candidates.len() > self.config.max_owners {
            warn!(
                owners = candidates.len(),
                max_owners = self.config.max_owners,
                "Owner directory exceeds scan bound"
            );
            return Err(TaskkeepError::CapacityExceeded(candidates.len()));
        }

        debug!(candidates = candidates.len(), "Scanning owner identifiers");
        for candidate in &candidates {
            if self.verify_blocking(secret, candidate).await? {
                return Ok(Resolution {
                    owner: candidate.clone(),
                    is_new_owner: false,
                });
            }
        }

        if candidates.len() >= self.config.max_owners {
            warn!(
                owners = candidates.len(),
                "Refusing to mint a new owner at capacity"
            );
            return Err(TaskkeepError::CapacityExceeded(candidates.len()));
        }

        let owner = self.hash_blocking(secret).await?;
        Ok(Resolution {
            owner,
            is_new_owner: true,
        })
    }

    /// Check a secret against one specific owner identifier
    pub async fn verify_claim(&self, secret: &str, claimed: &OwnerId) -> Result<()> {
        self.validate(secret)?;

        let matched = tokio::time::timeout(
            self.config.scan_timeout,
            self.verify_blocking(secret, claimed),
        )
        .await??;

        if matched {
            Ok(())
        } else {
            Err(TaskkeepError::AuthenticationMismatch)
        }
    }

    async fn verify_blocking(&self, secret: &str, candidate: &OwnerId) -> Result<bool> {
        #[cfg(test)]
        self.verifications.fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        let hasher = Arc::clone(&self.hasher);
        let secret = Zeroizing::new(secret.to_string());
        let candidate = candidate.clone();
        let matched =
            tokio::task::spawn_blocking(move || hasher.verify(&secret, &candidate)).await?;
        Ok(matched)
    }

    async fn hash_blocking(&self, secret: &str) -> Result<OwnerId> {
        let hasher = Arc::clone(&self.hasher);
        let secret = Zeroizing::new(secret.to_string());
        tokio::task::spawn_blocking(move || hasher.hash(&secret)).await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::HasherConfig;
    use crate::db::{Priority, TaskDoc};
    use crate::store::{MemoryTaskStore, TaskStore};

    fn resolver_with(config: ResolverConfig) -> IdentityResolver {
        let hasher = CredentialHasher::new(HasherConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap();
        IdentityResolver::new(hasher, config)
    }

    fn resolver() -> IdentityResolver {
        resolver_with(ResolverConfig::default())
    }

    struct SlowDirectory {
        owners: Vec<OwnerId>,
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl OwnerDirectory for SlowDirectory {
        async fn distinct_owners(&self) -> Result<Vec<OwnerId>> {
            tokio::time::sleep(self.delay).await;
            Ok(self.owners.clone())
        }
    }

    struct BrokenDirectory;

    #[async_trait::async_trait]
    impl OwnerDirectory for BrokenDirectory {
        async fn distinct_owners(&self) -> Result<Vec<OwnerId>> {
            Err(TaskkeepError::Internal("cursor died".to_string()))
        }
    }

    async fn seed_owner(store: &MemoryTaskStore, owner: &OwnerId) {
        store
            .insert(TaskDoc::new(
                owner.clone(),
                "seed".to_string(),
                Priority::Low,
                None,
                vec![],
            ))
            .await
            .unwrap();
    }

    fn verifications(resolver: &IdentityResolver) -> usize {
        resolver.verifications.load(std::sync::atomic::Ordering::SeqCst)
    }

    #[tokio::test]
    async fn test_empty_directory_mints_new_owner() {
        let resolver = resolver();
        let store = MemoryTaskStore::new();

        let resolution = resolver.resolve("abcd", &store).await.unwrap();
        assert!(resolution.is_new_owner);
        // Minted without a single verification
        assert_eq!(verifications(&resolver), 0);
        assert!(resolver.hasher.verify("abcd", &resolution.owner));
    }

    #[tokio::test]
    async fn test_scan_stops_at_first_match() {
        let resolver = resolver();
        let target = resolver.hasher.hash("abcd").unwrap();
        let directory = SlowDirectory {
            owners: vec![
                target.clone(),
                resolver.hasher.hash("other-1").unwrap(),
                resolver.hasher.hash("other-2").unwrap(),
            ],
            delay: Duration::ZERO,
        };

        let resolution = resolver.resolve("abcd", &directory).await.unwrap();
        assert_eq!(resolution.owner, target);
        assert_eq!(verifications(&resolver), 1);
    }

    #[tokio::test]
    async fn test_unmatched_secret_checks_every_owner() {
        let resolver = resolver();
        let directory = SlowDirectory {
            owners: vec![
                resolver.hasher.hash("other-1").unwrap(),
                resolver.hasher.hash("other-2").unwrap(),
                resolver.hasher.hash("other-3").unwrap(),
            ],
            delay: Duration::ZERO,
        };

        let resolution = resolver.resolve("abcd", &directory).await.unwrap();
        assert!(resolution.is_new_owner);
        assert_eq!(verifications(&resolver), 3);
    }

    #[tokio::test]
    async fn test_existing_owner_found_at_any_position() {
        let resolver = resolver();
        let target = resolver.hasher.hash("abcd").unwrap();

        for position in 0..3 {
            let store = MemoryTaskStore::new();
            let mut others = vec![
                resolver.hasher.hash("other-1").unwrap(),
                resolver.hasher.hash("other-2").unwrap(),
            ];
            others.insert(position, target.clone());
            for owner in &others {
                seed_owner(&store, owner).await;
            }

            let resolution = resolver.resolve("abcd", &store).await.unwrap();
            assert_eq!(resolution.owner, target);
            assert!(!resolution.is_new_owner);
        }
    }

    #[tokio::test]
    async fn test_unmatched_secret_is_new_owner() {
        let resolver = resolver();
        let store = MemoryTaskStore::new();
        seed_owner(&store, &resolver.hasher.hash("wxyz").unwrap()).await;

        let resolution = resolver.resolve("abcd", &store).await.unwrap();
        assert!(resolution.is_new_owner);
        assert!(!resolver.hasher.verify("wxyz", &resolution.owner));
    }

    #[tokio::test]
    async fn test_malformed_stored_owner_is_skipped() {
        let resolver = resolver();
        let store = MemoryTaskStore::new();
        seed_owner(&store, &OwnerId::new("legacy-plain-value")).await;

        let resolution = resolver.resolve("abcd", &store).await.unwrap();
        assert!(resolution.is_new_owner);
    }

    #[tokio::test]
    async fn test_short_secret_rejected() {
        let resolver = resolver();
        let result = resolver.resolve("xy", &BrokenDirectory).await;
        assert!(matches!(result, Err(TaskkeepError::Validation(_))));

        let result = resolver.resolve("    ", &BrokenDirectory).await;
        assert!(matches!(result, Err(TaskkeepError::Validation(_))));
    }

    #[tokio::test]
    async fn test_directory_failure_is_store_unavailable() {
        let resolver = resolver();
        let result = resolver.resolve("abcd", &BrokenDirectory).await;
        assert!(matches!(result, Err(TaskkeepError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn test_scan_bound() {
        let resolver = resolver_with(ResolverConfig {
            max_owners: 1,
            ..Default::default()
        });

        let store = MemoryTaskStore::new();
        seed_owner(&store, &resolver.hasher.hash("first").unwrap()).await;

        // Existing owner still resolves at capacity
        let resolution = resolver.resolve("first", &store).await.unwrap();
        assert!(!resolution.is_new_owner);

        // But a new one cannot be minted
        let result = resolver.resolve("second", &store).await;
        assert!(matches!(result, Err(TaskkeepError::CapacityExceeded(1))));

        // Over the bound the scan is refused outright
        seed_owner(&store, &resolver.hasher.hash("third").unwrap()).await;
        let result = resolver.resolve("first", &store).await;
        assert!(matches!(result, Err(TaskkeepError::CapacityExceeded(2))));
    }

    #[tokio::test]
    async fn test_scan_timeout() {
        let resolver = resolver_with(ResolverConfig {
            scan_timeout: Duration::from_millis(20),
            ..Default::default()
        });
        let directory = SlowDirectory {
            owners: vec![],
            delay: Duration::from_millis(500),
        };

        let result = resolver.resolve("abcd", &directory).await;
        assert!(matches!(result, Err(TaskkeepError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_verify_claim() {
        let resolver = resolver();
        let owner = resolver.hasher.hash("abcd").unwrap();

        assert!(resolver.verify_claim("abcd", &owner).await.is_ok());
        assert!(matches!(
            resolver.verify_claim("wxyz", &owner).await,
            Err(TaskkeepError::AuthenticationMismatch)
        ));
    }

    #[test]
    fn test_trust_levels() {
        let fresh: AuthenticatedOwner = Resolution {
            owner: OwnerId::new("h"),
            is_new_owner: true,
        }
        .into();
        assert!(fresh.is_new_owner());
        assert_eq!(fresh.trust_level(), "freshly_resolved");

        let cached = AuthenticatedOwner::CachedBearer {
            owner: OwnerId::new("h"),
        };
        assert!(!cached.is_new_owner());
        assert_eq!(cached.owner(), &OwnerId::new("h"));
        assert_eq!(cached.trust_level(), "cached_bearer");
    }
}
