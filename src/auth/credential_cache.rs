//! Device-local credential cache
//!
//! Persists one resolved owner identifier (the hash, never the secret) so a
//! device only needs the secret once. Whoever can read this file holds the
//! account: its presence is accepted as proof of identity with no further
//! challenge. Identities loaded from here are tagged
//! [`AuthenticatedOwner::CachedBearer`](crate::auth::AuthenticatedOwner).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::types::{OwnerId, Result, TaskkeepError};

const CACHE_DIR: &str = "taskkeep";
const CACHE_FILE: &str = "credential.json";

/// Persisted cache entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub owner: OwnerId,
    pub saved_at: DateTime<Utc>,
}

/// Authentication status of this device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Unactivated,
    Activated,
}

/// File-backed single-slot credential cache
#[derive(Debug, Clone)]
pub struct CredentialCache {
    path: PathBuf,
}

impl CredentialCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/taskkeep/credential.json`, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CACHE_DIR).join(CACHE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cached owner, or `None` if never saved, cleared, or unreadable
    pub fn load(&self) -> Option<OwnerId> {
        self.load_entry().map(|entry| entry.owner)
    }

    /// Full cache entry; unreadable content counts as absent
    pub fn load_entry(&self) -> Option<CacheEntry> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Credential cache unreadable, treating as absent: {}", e.kind());
                return None;
            }
        };

        match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) if !entry.owner.as_str().is_empty() => Some(entry),
            Ok(_) => {
                warn!("Credential cache holds an empty owner, treating as absent");
                None
            }
            Err(e) => {
                warn!("Credential cache corrupt, treating as absent: {}", e);
                None
            }
        }
    }

    /// Overwrite the cached owner.
    ///
    /// Writes a sibling temp file, syncs it, then renames it over the cache,
    /// so a crash leaves either the old entry or the new one.
    pub fn save(&self, owner: &OwnerId) -> Result<()> {
        let entry = CacheEntry {
            owner: owner.clone(),
            saved_at: Utc::now(),
        };
        let body = serde_json::to_vec_pretty(&entry)
            .map_err(|e| TaskkeepError::Cache(format!("Failed to encode entry: {}", e)))?;

        write_atomic(&self.path, &body)
            .map_err(|e| TaskkeepError::Cache(format!("Failed to write cache: {}", e)))?;

        info!(owner = owner.log_tag(), "Credential cached on this device");
        Ok(())
    }

    /// Remove the cached owner. Clearing an empty cache is not an error.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Credential cache cleared");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Credential cache already empty");
                Ok(())
            }
            Err(e) => Err(TaskkeepError::Cache(format!("Failed to clear cache: {}", e))),
        }
    }

    pub fn state(&self) -> DeviceState {
        if self.load().is_some() {
            DeviceState::Activated
        } else {
            DeviceState::Unactivated
        }
    }
}

/// Temp file in the target's directory, synced, then renamed over the target.
/// The directory is synced afterwards so the rename itself is durable.
fn write_atomic(path: &Path, body: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;

    // Owner-only on Unix
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file().set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    tmp.write_all(body)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    #[cfg(unix)]
    fs::File::open(parent)?.sync_all()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cache_in(dir: &TempDir) -> CredentialCache {
        CredentialCache::new(dir.path().join("nested").join(CACHE_FILE))
    }

    #[test]
    fn test_round_trip_and_clear() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        let owner = OwnerId::new("$argon2id$v=19$m=1024,t=1,p=1$c2FsdA$aGFzaA");

        assert_eq!(cache.load(), None);
        assert_eq!(cache.state(), DeviceState::Unactivated);

        cache.save(&owner).unwrap();
        assert_eq!(cache.load(), Some(owner.clone()));
        assert_eq!(cache.state(), DeviceState::Activated);

        cache.clear().unwrap();
        assert_eq!(cache.load(), None);
        assert_eq!(cache.state(), DeviceState::Unactivated);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        cache.clear().unwrap();
        cache.clear().unwrap();
    }

    #[test]
    fn test_save_overwrites() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        cache.save(&OwnerId::new("first")).unwrap();
        cache.save(&OwnerId::new("second")).unwrap();
        assert_eq!(cache.load(), Some(OwnerId::new("second")));

        // Only the cache itself remains; temp files were renamed into place
        let names: Vec<String> = fs::read_dir(cache.path().parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![CACHE_FILE.to_string()]);
    }

    #[test]
    fn test_corrupt_cache_is_absent() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        fs::create_dir_all(cache.path().parent().unwrap()).unwrap();

        fs::write(cache.path(), b"{ not json").unwrap();
        assert_eq!(cache.load(), None);

        fs::write(cache.path(), br#"{"owner":"","saved_at":"2026-01-01T00:00:00Z"}"#).unwrap();
        assert_eq!(cache.load(), None);

        // Saving over a corrupt cache repairs it
        cache.save(&OwnerId::new("fresh")).unwrap();
        assert_eq!(cache.load(), Some(OwnerId::new("fresh")));
    }

    #[test]
    fn test_stores_only_the_hash() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        cache.save(&OwnerId::new("hash-only")).unwrap();

        let raw = fs::read_to_string(cache.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["owner", "saved_at"]);
    }

    #[test]
    fn test_save_into_missing_directory() {
        let dir = TempDir::new().unwrap();
        let cache = CredentialCache::new(dir.path().join("a").join("b").join(CACHE_FILE));
        cache.save(&OwnerId::new("deep")).unwrap();
        assert_eq!(cache.load(), Some(OwnerId::new("deep")));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        cache.save(&OwnerId::new("hash")).unwrap();

        let mode = fs::metadata(cache.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
