//! API key authentication extractor

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::domain::api_key::{ApiKey, ApiKeyRepository};

/// Header carrying the plaintext API key
const API_KEY_HEADER: &str = "x-api-key";

/// Extractor that authenticates the request via the `X-API-Key` header.
///
/// Usage is recorded at authentication time, before the request proceeds:
/// attempts are counted, not successes.
#[derive(Debug, Clone)]
pub struct RequireApiKey(pub ApiKey);

impl FromRequestParts<AppState> for RequireApiKey {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let presented = extract_api_key(&parts.headers)?;

        let matching = state
            .api_keys
            .get_by_key(&presented)
            .await
            .map_err(ApiError::from)?
            .ok_or_else(|| ApiError::unauthorized("Invalid API key"))?;

        let api_key = state
            .api_keys
            .update_usage(&matching, None, 1)
            .await
            .map_err(ApiError::from)?;

        debug!(
            key_prefix = %api_key.key_prefix(),
            requests = api_key.number_of_requests(),
            "API key authenticated"
        );

        Ok(RequireApiKey(api_key))
    }
}

fn extract_api_key(headers: &HeaderMap) -> Result<String, ApiError> {
    let value = headers
        .get(API_KEY_HEADER)
        .ok_or_else(|| ApiError::unauthorized("Missing API key"))?;

    let key = value
        .to_str()
        .map_err(|_| ApiError::bad_request("Invalid X-API-Key header encoding"))?
        .trim();

    if key.is_empty() {
        return Err(ApiError::unauthorized("Missing API key"));
    }

    Ok(key.to_string())
}
