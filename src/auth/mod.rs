//! Authentication for taskkeep
//!
//! Provides:
//! - Password hashing with Argon2
//! - Identity resolution: secret to owner identifier by verification scan
//! - Device-local credential cache

pub mod credential_cache;
pub mod identity;
pub mod password;

pub use credential_cache::{CacheEntry, CredentialCache, DeviceState};
pub use identity::{AuthenticatedOwner, IdentityResolver, Resolution, ResolverConfig};
pub use password::{CredentialHasher, HasherConfig};
