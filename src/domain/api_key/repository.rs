//! API Key repository trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Debug;

use super::entity::ApiKey;
use crate::domain::DomainError;

/// Result of issuing a new API key.
///
/// The plaintext secret is disclosed exactly once here; it is never stored
/// and must never be logged.
#[derive(Debug, Clone)]
pub struct IssuedApiKey {
    /// The persisted entity (identity populated).
    pub api_key: ApiKey,
    /// The full plaintext secret.
    pub secret: String,
}

/// Repository trait for API key storage.
///
/// Lookups are prefix-indexed: hashes are salted and non-comparable, so
/// implementations query candidates by the plaintext prefix and verify the
/// presented secret against each candidate's hash.
#[async_trait]
pub trait ApiKeyRepository: Send + Sync + Debug {
    /// Retrieve a key by its plaintext secret. Returns `None` when no
    /// stored record in the prefix bucket verifies against the secret.
    async fn get_by_key(&self, key: &str) -> Result<Option<ApiKey>, DomainError>;

    /// Persist a fresh key record. When `key` is `None` a new random
    /// secret is generated. Returns the stored entity together with the
    /// one-time plaintext.
    async fn create(&self, key: Option<&str>) -> Result<IssuedApiKey, DomainError>;

    /// Update the last-use timestamp and increment the request counter,
    /// persisting both fields.
    async fn update_usage(
        &self,
        entity: &ApiKey,
        last_use_in: Option<DateTime<Utc>>,
        increment: u64,
    ) -> Result<ApiKey, DomainError>;
}
