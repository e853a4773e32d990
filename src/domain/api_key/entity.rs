//! API Key entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One issued credential.
///
/// The plaintext secret is never part of the entity: only its salted hash
/// and a short prefix of the plaintext (kept for indexed candidate lookup)
/// are stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKey {
    /// Storage-assigned identity; `None` until the record is persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    /// Salted one-way hash of the plaintext secret.
    hashed_key: String,
    /// Fixed-length prefix of the plaintext, kept unhashed for lookup.
    key_prefix: String,
    /// Issuance timestamp.
    initialized_in: DateTime<Utc>,
    /// Last time the key authenticated a request.
    #[serde(skip_serializing_if = "Option::is_none")]
    last_use_in: Option<DateTime<Utc>>,
    /// Monotonically non-decreasing request counter.
    number_of_requests: u64,
}

impl ApiKey {
    /// Create a fresh, not-yet-persisted key record.
    pub fn new(hashed_key: impl Into<String>, key_prefix: impl Into<String>) -> Self {
        Self {
            id: None,
            hashed_key: hashed_key.into(),
            key_prefix: key_prefix.into(),
            initialized_in: Utc::now(),
            last_use_in: None,
            number_of_requests: 0,
        }
    }

    /// Rebuild an entity from a persisted record.
    pub fn from_record(
        id: impl Into<String>,
        hashed_key: impl Into<String>,
        key_prefix: impl Into<String>,
        initialized_in: DateTime<Utc>,
        last_use_in: Option<DateTime<Utc>>,
        number_of_requests: u64,
    ) -> Self {
        Self {
            id: Some(id.into()),
            hashed_key: hashed_key.into(),
            key_prefix: key_prefix.into(),
            initialized_in,
            last_use_in,
            number_of_requests,
        }
    }

    /// Attach the storage-assigned identity after insertion.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    // Getters

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn hashed_key(&self) -> &str {
        &self.hashed_key
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    pub fn initialized_in(&self) -> DateTime<Utc> {
        self.initialized_in
    }

    pub fn last_use_in(&self) -> Option<DateTime<Utc>> {
        self.last_use_in
    }

    pub fn number_of_requests(&self) -> u64 {
        self.number_of_requests
    }

    /// Record usage: set the last-use timestamp (defaults to now) and add
    /// `increment` to the request counter.
    pub fn update_usage(&mut self, last_use_in: Option<DateTime<Utc>>, increment: u64) {
        self.last_use_in = Some(last_use_in.unwrap_or_else(Utc::now));
        self.number_of_requests += increment;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_key_has_zeroed_counters() {
        let key = ApiKey::new("$argon2id$...", "sk-abcdefg");

        assert!(key.id().is_none());
        assert_eq!(key.key_prefix(), "sk-abcdefg");
        assert!(key.last_use_in().is_none());
        assert_eq!(key.number_of_requests(), 0);
    }

    #[test]
    fn test_update_usage_defaults_to_now() {
        let mut key = ApiKey::new("hash", "sk-abcdefg");
        let before = Utc::now();

        key.update_usage(None, 1);

        let used = key.last_use_in().unwrap();
        assert!(used >= before);
        assert_eq!(key.number_of_requests(), 1);
    }

    #[test]
    fn test_update_usage_with_explicit_timestamp_and_increment() {
        let mut key = ApiKey::new("hash", "sk-abcdefg");
        let ts = Utc::now() - chrono::Duration::minutes(5);

        key.update_usage(Some(ts), 3);

        assert_eq!(key.last_use_in(), Some(ts));
        assert_eq!(key.number_of_requests(), 3);
    }

    #[test]
    fn test_repeated_usage_accumulates() {
        let mut key = ApiKey::new("hash", "sk-abcdefg");

        for _ in 0..4 {
            key.update_usage(None, 1);
        }

        assert_eq!(key.number_of_requests(), 4);
    }

    #[test]
    fn test_with_id_populates_identity() {
        let key = ApiKey::new("hash", "sk-abcdefg").with_id("665f1a2b3c");
        assert_eq!(key.id(), Some("665f1a2b3c"));
    }
}
