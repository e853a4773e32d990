//! In-memory API key repository implementation
//!
//! Used by tests and local development; registered as `"in_memory"`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::api_key::{ApiKey, ApiKeyRepository, IssuedApiKey};
use crate::domain::DomainError;
use crate::infrastructure::auth::{KeyGenerator, KeyHasher};

/// Registry name of this implementation
pub const IN_MEMORY_REPOSITORY_NAME: &str = "in_memory";

/// In-memory implementation of `ApiKeyRepository`
#[derive(Debug)]
pub struct InMemoryApiKeyRepository {
    keys: RwLock<HashMap<String, ApiKey>>,
    hasher: Arc<dyn KeyHasher>,
    generator: KeyGenerator,
}

impl InMemoryApiKeyRepository {
    pub fn new(hasher: Arc<dyn KeyHasher>) -> Self {
        Self {
            keys: RwLock::new(HashMap::new()),
            hasher,
            generator: KeyGenerator::new(),
        }
    }

    /// Insert a pre-built record, bypassing generation and hashing.
    #[cfg(test)]
    pub async fn insert_raw(&self, entity: ApiKey) {
        let id = entity.id().expect("raw insert requires an id").to_string();
        self.keys.write().await.insert(id, entity);
    }
}

#[async_trait]
impl ApiKeyRepository for InMemoryApiKeyRepository {
    async fn get_by_key(&self, key: &str) -> Result<Option<ApiKey>, DomainError> {
        let key_prefix = self.generator.prefix_of(key);
        let keys = self.keys.read().await;

        // Candidate set is the prefix bucket only; verification never
        // crosses bucket boundaries.
        for candidate in keys.values().filter(|k| k.key_prefix() == key_prefix) {
            if self.hasher.verify(key, candidate.hashed_key()) {
                return Ok(Some(candidate.clone()));
            }
        }

        Ok(None)
    }

    async fn create(&self, key: Option<&str>) -> Result<IssuedApiKey, DomainError> {
        let plaintext = match key {
            Some(key) => key.to_string(),
            None => self.generator.generate(),
        };
        let key_prefix = self.generator.prefix_of(&plaintext);

        let entity = ApiKey::new(self.hasher.hash(&plaintext)?, key_prefix)
            .with_id(Uuid::new_v4().simple().to_string());

        let id = entity.id().unwrap_or_default().to_string();
        self.keys.write().await.insert(id, entity.clone());

        Ok(IssuedApiKey {
            api_key: entity,
            secret: plaintext,
        })
    }

    async fn update_usage(
        &self,
        entity: &ApiKey,
        last_use_in: Option<DateTime<Utc>>,
        increment: u64,
    ) -> Result<ApiKey, DomainError> {
        let id = entity
            .id()
            .ok_or_else(|| DomainError::corrupt_record("Cannot update an unpersisted API key"))?;

        let mut keys = self.keys.write().await;
        let stored = keys
            .get_mut(id)
            .ok_or_else(|| DomainError::corrupt_record(format!("Unknown API key id '{}'", id)))?;

        stored.update_usage(last_use_in, increment);
        Ok(stored.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::auth::Argon2KeyHasher;

    fn test_repository() -> InMemoryApiKeyRepository {
        InMemoryApiKeyRepository::new(Arc::new(Argon2KeyHasher::new()))
    }

    #[tokio::test]
    async fn test_create_and_get_by_key() {
        let repo = test_repository();

        let issued = repo.create(None).await.unwrap();
        assert!(issued.secret.starts_with("sk-"));
        assert!(issued.api_key.id().is_some());
        assert_eq!(issued.api_key.number_of_requests(), 0);

        let found = repo.get_by_key(&issued.secret).await.unwrap().unwrap();
        assert_eq!(found.id(), issued.api_key.id());
        assert_eq!(found.key_prefix(), issued.api_key.key_prefix());
        assert_eq!(found.initialized_in(), issued.api_key.initialized_in());
        assert!(found.last_use_in().is_none());
    }

    #[tokio::test]
    async fn test_mutated_key_does_not_authenticate() {
        let repo = test_repository();
        let issued = repo.create(None).await.unwrap();

        // First lookup succeeds and usage bumps the counter to 1
        let found = repo.get_by_key(&issued.secret).await.unwrap().unwrap();
        let updated = repo.update_usage(&found, None, 1).await.unwrap();
        assert_eq!(updated.number_of_requests(), 1);

        // Alter a single character of the secret: same prefix bucket,
        // hash verification fails.
        let mut mutated = issued.secret.clone();
        let last = mutated.pop().unwrap();
        mutated.push(if last == 'a' { 'b' } else { 'a' });

        assert!(repo.get_by_key(&mutated).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_prefix_bucket_isolation() {
        let repo = test_repository();
        let hasher = Argon2KeyHasher::new();

        let secret = "sk-N8q2vT5xWm0L7cRdHkYpJ3bFgZsAoE1uQiC9lX4nM6aB";
        // Stored under a foreign prefix bucket: even though the digest
        // verifies against the secret, the lookup must not find it.
        let stray = ApiKey::new(hasher.hash(secret).unwrap(), "sk-0000000").with_id("stray-1");
        repo.insert_raw(stray).await;

        assert!(repo.get_by_key(secret).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_usage_accumulates_exactly() {
        let repo = test_repository();
        let issued = repo.create(None).await.unwrap();

        let mut entity = issued.api_key.clone();
        for _ in 0..3 {
            entity = repo.update_usage(&entity, None, 1).await.unwrap();
        }

        let ts = Utc::now() - chrono::Duration::seconds(30);
        entity = repo.update_usage(&entity, Some(ts), 1).await.unwrap();

        assert_eq!(entity.number_of_requests(), 4);
        assert_eq!(entity.last_use_in(), Some(ts));

        // Persisted state matches the returned entity
        let reloaded = repo.get_by_key(&issued.secret).await.unwrap().unwrap();
        assert_eq!(reloaded.number_of_requests(), 4);
        assert_eq!(reloaded.last_use_in(), Some(ts));
    }

    #[tokio::test]
    async fn test_create_with_supplied_plaintext() {
        let repo = test_repository();
        let secret = "sk-FixedSecretForIntegrationTests0000000000000000001";

        let issued = repo.create(Some(secret)).await.unwrap();
        assert_eq!(issued.secret, secret);
        assert_eq!(issued.api_key.key_prefix(), "sk-FixedSe");

        assert!(repo.get_by_key(secret).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_usage_on_unpersisted_entity_fails() {
        let repo = test_repository();
        let entity = ApiKey::new("digest", "sk-abcdefg");

        let err = repo.update_usage(&entity, None, 1).await.unwrap_err();
        assert!(matches!(err, DomainError::CorruptRecord { .. }));
    }
}
