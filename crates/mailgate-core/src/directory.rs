//! Directory service abstraction
//!
//! The credential backend (user lookup and password verification) lives
//! outside this system. The engine talks to it through [`Directory`];
//! [`MemoryDirectory`] is the owned in-process implementation, backing
//! tests and small static deployments.

use anyhow::{anyhow, Result};
use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Backend failure while answering a lookup or verification.
///
/// This is never an authorization outcome: a directory that cannot answer
/// must surface as a backend error, not as invalid credentials.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Directory record for one user
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub hashed_password: String,
}

/// External credential backend contract
#[async_trait]
pub trait Directory: Send + Sync {
    /// Look up a user by name. `Ok(None)` means the user does not exist;
    /// `Err` means the backend could not answer.
    async fn lookup_user(&self, name: &str) -> Result<Option<UserRecord>, DirectoryError>;

    /// Verify a plaintext password against a stored hash
    async fn verify_password(&self, plain: &str, hash: &str) -> Result<bool, DirectoryError>;
}

/// In-memory directory of `name -> argon2 PHC hash` entries
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    users: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct UsersFile {
    #[serde(default)]
    users: HashMap<String, String>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user with an already-hashed password
    pub fn insert(&mut self, name: impl Into<String>, hashed_password: impl Into<String>) {
        self.users.insert(name.into(), hashed_password.into());
    }

    /// Load users from a TOML file with a `[users]` table of
    /// `name = "argon2 hash"` entries.
    pub fn from_file(path: &Path) -> mailgate_common::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            mailgate_common::Error::Config(format!("Failed to read users file: {}", e))
        })?;

        let parsed: UsersFile = toml::from_str(&content).map_err(|e| {
            mailgate_common::Error::Config(format!("Failed to parse users file: {}", e))
        })?;

        debug!(count = parsed.users.len(), "loaded users file");
        Ok(Self {
            users: parsed.users,
        })
    }

    /// Hash a plaintext password into PHC string form, for provisioning
    /// users-file entries and tests.
    pub fn hash_password(plain: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| anyhow!("Failed to hash password: {}", e))?;
        Ok(hash.to_string())
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn lookup_user(&self, name: &str) -> Result<Option<UserRecord>, DirectoryError> {
        Ok(self.users.get(name).map(|hash| UserRecord {
            hashed_password: hash.clone(),
        }))
    }

    async fn verify_password(&self, plain: &str, hash: &str) -> Result<bool, DirectoryError> {
        // An unparsable stored hash reads as a failed login, not an outage
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!(error = %e, "stored password hash is not valid PHC");
                return Ok(false);
            }
        };

        Ok(Argon2::default()
            .verify_password(plain.as_bytes(), &parsed_hash)
            .is_ok())
    }
}
