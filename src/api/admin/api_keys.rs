//! API key issuance endpoint

use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::api_key::ApiKeyRepository;

/// Response for a newly issued key. The `key` field is the plaintext
/// secret, disclosed exactly once.
#[derive(Debug, Serialize)]
pub struct CreateApiKeyResponse {
    pub id: String,
    pub key: String,
    pub key_prefix: String,
    pub initialized_in: DateTime<Utc>,
}

/// POST /admin/api-keys
pub async fn create_api_key(
    State(state): State<AppState>,
) -> Result<Json<CreateApiKeyResponse>, ApiError> {
    let issued = state.api_keys.create(None).await?;

    info!(key_prefix = %issued.api_key.key_prefix(), "API key issued");

    Ok(Json(CreateApiKeyResponse {
        id: issued.api_key.id().unwrap_or_default().to_string(),
        key: issued.secret,
        key_prefix: issued.api_key.key_prefix().to_string(),
        initialized_in: issued.api_key.initialized_in(),
    }))
}
