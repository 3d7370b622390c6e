//! Password hashing and verification using Argon2
//!
//! Uses the argon2id variant. The PHC string produced by `hash` embeds the
//! salt and cost parameters, so `verify` needs nothing but the stored value.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use tracing::debug;

use crate::types::{OwnerId, Result, TaskkeepError};

/// Argon2 cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HasherConfig {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// One-way, salted credential hasher
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
}

impl CredentialHasher {
    /// Build a hasher, rejecting parameters outside the Argon2 range
    pub fn new(config: HasherConfig) -> Result<Self> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|e| TaskkeepError::Config(format!("Invalid Argon2 parameters: {e}")))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a secret with a fresh random salt
    ///
    /// Returns the PHC-formatted hash string that includes the salt and parameters.
    pub fn hash(&self, secret: &str) -> Result<OwnerId> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| OwnerId::new(hash.to_string()))
            .map_err(|e| TaskkeepError::Hashing(format!("Failed to hash password: {e}")))
    }

    /// Verify a secret against a stored hash
    ///
    /// Malformed hashes verify as false. The parameters embedded in the hash
    /// are used, not this hasher's own.
    pub fn verify(&self, secret: &str, hashed: &OwnerId) -> bool {
        let parsed_hash = match PasswordHash::new(hashed.as_str()) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!(owner = ?hashed, "Ignoring malformed password hash: {}", e);
                return false;
            }
        };

        self.argon2
            .verify_password(secret.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_hasher() -> CredentialHasher {
        CredentialHasher::new(HasherConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = fast_hasher();
        let password = "correct-horse-battery-staple";
        let hash = hasher.hash(password).unwrap();

        // Hash should be in PHC format
        assert!(hash.as_str().starts_with("$argon2id"));

        assert!(hasher.verify(password, &hash));
        assert!(!hasher.verify("wrong-password", &hash));
    }

    #[test]
    fn test_different_salts() {
        let hasher = fast_hasher();
        let password = "same-password";
        let hash1 = hasher.hash(password).unwrap();
        let hash2 = hasher.hash(password).unwrap();

        // Same password should produce different hashes (different salts)
        assert_ne!(hash1, hash2);

        // Both should verify
        assert!(hasher.verify(password, &hash1));
        assert!(hasher.verify(password, &hash2));
    }

    #[test]
    fn test_invalid_hash_format() {
        let hasher = fast_hasher();
        assert!(!hasher.verify("password", &OwnerId::new("not-a-valid-hash")));
        assert!(!hasher.verify("password", &OwnerId::new("")));
    }

    #[test]
    fn test_verify_uses_embedded_params() {
        let cheap = fast_hasher();
        let hash = cheap.hash("abcd").unwrap();

        // A hasher configured differently still verifies via the PHC params
        let other = CredentialHasher::new(HasherConfig {
            memory_kib: 2048,
            iterations: 2,
            parallelism: 1,
        })
        .unwrap();
        assert!(other.verify("abcd", &hash));
    }

    #[test]
    fn test_rejects_out_of_range_params() {
        let result = CredentialHasher::new(HasherConfig {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        });
        assert!(matches!(result, Err(TaskkeepError::Config(_))));
    }
}
