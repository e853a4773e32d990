//! MongoDB-backed API key repository

use std::sync::Arc;

use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{Client, Collection, IndexModel};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::api_key::{ApiKey, ApiKeyRepository, IssuedApiKey};
use crate::domain::DomainError;
use crate::infrastructure::auth::{KeyGenerator, KeyHasher};

/// Collection name for API keys
const API_KEYS_COLLECTION: &str = "api_keys";

/// Registry name of this implementation
pub const MONGO_REPOSITORY_NAME: &str = "mongo_db";

/// Persisted document shape:
/// `{_id, hashed_key, key_prefix, initialized_in, last_use_in, number_of_requests}`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApiKeyDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    hashed_key: String,
    key_prefix: String,
    initialized_in: bson::DateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_use_in: Option<bson::DateTime>,
    number_of_requests: i64,
}

impl ApiKeyDocument {
    fn from_domain(entity: &ApiKey) -> Result<Self, DomainError> {
        let id = entity
            .id()
            .map(ObjectId::parse_str)
            .transpose()
            .map_err(|e| DomainError::corrupt_record(format!("Invalid API key id: {}", e)))?;

        Ok(Self {
            id,
            hashed_key: entity.hashed_key().to_string(),
            key_prefix: entity.key_prefix().to_string(),
            initialized_in: bson::DateTime::from_chrono(entity.initialized_in()),
            last_use_in: entity.last_use_in().map(bson::DateTime::from_chrono),
            number_of_requests: entity.number_of_requests() as i64,
        })
    }

    fn to_domain(&self) -> Result<ApiKey, DomainError> {
        let id = self
            .id
            .ok_or_else(|| DomainError::corrupt_record("Stored API key record has no _id"))?;

        if self.number_of_requests < 0 {
            return Err(DomainError::corrupt_record(format!(
                "Stored API key '{}' has a negative request counter",
                id.to_hex()
            )));
        }

        Ok(ApiKey::from_record(
            id.to_hex(),
            &self.hashed_key,
            &self.key_prefix,
            self.initialized_in.to_chrono(),
            self.last_use_in.map(|dt| dt.to_chrono()),
            self.number_of_requests as u64,
        ))
    }
}

/// API key repository backed by a MongoDB collection.
///
/// `key_prefix` is the only indexed predicate: digests are salted and
/// non-comparable, so lookups narrow candidates by prefix and verify the
/// presented plaintext against each candidate's hash.
#[derive(Debug)]
pub struct MongoApiKeyRepository {
    collection: Collection<ApiKeyDocument>,
    hasher: Arc<dyn KeyHasher>,
    generator: KeyGenerator,
}

impl MongoApiKeyRepository {
    /// Connect to the store and ensure the prefix index exists.
    pub async fn connect(
        uri: &str,
        database: &str,
        hasher: Arc<dyn KeyHasher>,
    ) -> Result<Self, DomainError> {
        info!("Connecting to MongoDB database '{}'", database);

        let client = Client::with_uri_str(uri).await.map_err(|e| {
            DomainError::repository_unavailable(format!("Failed to connect to MongoDB: {}", e))
        })?;

        client
            .database(database)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| {
                DomainError::repository_unavailable(format!("MongoDB ping failed: {}", e))
            })?;

        let collection = client
            .database(database)
            .collection::<ApiKeyDocument>(API_KEYS_COLLECTION);

        let index = IndexModel::builder().keys(doc! { "key_prefix": 1 }).build();

        collection.create_index(index).await.map_err(|e| {
            DomainError::repository_unavailable(format!("Failed to create prefix index: {}", e))
        })?;

        Ok(Self {
            collection,
            hasher,
            generator: KeyGenerator::new(),
        })
    }
}

#[async_trait]
impl ApiKeyRepository for MongoApiKeyRepository {
    async fn get_by_key(&self, key: &str) -> Result<Option<ApiKey>, DomainError> {
        let key_prefix = self.generator.prefix_of(key);
        debug!(key_prefix = %key_prefix, "Looking up API key candidates");

        // Indexed search on the prefix bucket only
        let mut cursor = self
            .collection
            .find(doc! { "key_prefix": &key_prefix })
            .await
            .map_err(|e| {
                DomainError::repository_unavailable(format!("API key query failed: {}", e))
            })?;

        while let Some(document) = cursor
            .try_next()
            .await
            .map_err(|e| DomainError::corrupt_record(format!("Unreadable API key record: {}", e)))?
        {
            if self.hasher.verify(key, &document.hashed_key) {
                return document.to_domain().map(Some);
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

        let entity = ApiKey::new(self.hasher.hash(&plaintext)?, &key_prefix);
        let document = ApiKeyDocument::from_domain(&entity)?;

        let result = self.collection.insert_one(document).await.map_err(|e| {
            DomainError::repository_unavailable(format!("API key insert failed: {}", e))
        })?;

        let id = result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| DomainError::corrupt_record("Insert returned a non-ObjectId _id"))?;

        info!(key_prefix = %key_prefix, "Issued new API key");

        Ok(IssuedApiKey {
            api_key: entity.with_id(id.to_hex()),
            secret: plaintext,
        })
    }

    async fn update_usage(
        &self,
        entity: &ApiKey,
        last_use_in: Option<DateTime<Utc>>,
        increment: u64,
    ) -> Result<ApiKey, DomainError> {
        let mut updated = entity.clone();
        updated.update_usage(last_use_in, increment);

        let document = ApiKeyDocument::from_domain(&updated)?;
        let id = document
            .id
            .ok_or_else(|| DomainError::corrupt_record("Cannot update an unpersisted API key"))?;

        self.collection
            .update_one(
                doc! { "_id": id },
                doc! {
                    "$set": {
                        "last_use_in": document.last_use_in,
                        "number_of_requests": document.number_of_requests,
                    }
                },
            )
            .await
            .map_err(|e| {
                DomainError::repository_unavailable(format!("API key usage update failed: {}", e))
            })?;

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_round_trip() {
        let id = ObjectId::new();
        let now = Utc::now();
        let entity = ApiKey::from_record(id.to_hex(), "digest", "sk-abcdefg", now, None, 7);

        let document = ApiKeyDocument::from_domain(&entity).unwrap();
        let back = document.to_domain().unwrap();

        assert_eq!(back.id(), Some(id.to_hex().as_str()));
        assert_eq!(back.hashed_key(), "digest");
        assert_eq!(back.key_prefix(), "sk-abcdefg");
        assert_eq!(back.number_of_requests(), 7);
        // bson DateTime is millisecond precision
        assert_eq!(
            back.initialized_in().timestamp_millis(),
            now.timestamp_millis()
        );
    }

    #[test]
    fn test_document_without_id_is_corrupt() {
        let document = ApiKeyDocument {
            id: None,
            hashed_key: "digest".to_string(),
            key_prefix: "sk-abcdefg".to_string(),
            initialized_in: bson::DateTime::now(),
            last_use_in: None,
            number_of_requests: 0,
        };

        let err = document.to_domain().unwrap_err();
        assert!(matches!(err, DomainError::CorruptRecord { .. }));
    }

    #[test]
    fn test_negative_counter_is_corrupt() {
        let document = ApiKeyDocument {
            id: Some(ObjectId::new()),
            hashed_key: "digest".to_string(),
            key_prefix: "sk-abcdefg".to_string(),
            initialized_in: bson::DateTime::now(),
            last_use_in: None,
            number_of_requests: -1,
        };

        let err = document.to_domain().unwrap_err();
        assert!(matches!(err, DomainError::CorruptRecord { .. }));
    }

    #[test]
    fn test_invalid_entity_id_is_corrupt() {
        let entity = ApiKey::from_record("not-an-object-id", "digest", "sk-abcdefg", Utc::now(), None, 0);

        let err = ApiKeyDocument::from_domain(&entity).unwrap_err();
        assert!(matches!(err, DomainError::CorruptRecord { .. }));
    }
}
