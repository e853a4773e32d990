//! API key hashing using Argon2

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as Argon2PasswordHasher, PasswordVerifier,
        SaltString,
    },
    Argon2,
};
use std::fmt::Debug;

use crate::domain::DomainError;

/// One-way transform of a plaintext secret into a storage-safe digest.
///
/// One instance is constructed during startup composition and shared by
/// every consumer; `hash` is non-deterministic (distinct salt per call),
/// `verify` is deterministic for any digest `hash` produced.
pub trait KeyHasher: Send + Sync + Debug {
    /// Hash a plaintext API key for storage.
    fn hash(&self, plain_key: &str) -> Result<String, DomainError>;

    /// Verify a plaintext API key against a stored digest.
    fn verify(&self, plain_key: &str, hashed_key: &str) -> bool;
}

/// Argon2-based key hasher (salted, adaptive)
#[derive(Debug, Clone, Default)]
pub struct Argon2KeyHasher;

impl Argon2KeyHasher {
    pub fn new() -> Self {
        Self
    }
}

impl KeyHasher for Argon2KeyHasher {
    fn hash(&self, plain_key: &str) -> Result<String, DomainError> {
        let salt = SaltString::generate(&mut OsRng);

        Argon2::default()
            .hash_password(plain_key.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| DomainError::configuration(format!("Failed to hash API key: {}", e)))
    }

    fn verify(&self, plain_key: &str, hashed_key: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hashed_key) {
            Ok(h) => h,
            Err(_) => return false,
        };

        Argon2::default()
            .verify_password(plain_key.as_bytes(), &parsed_hash)
            .is_ok()
    }
}
