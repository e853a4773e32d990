//! Operator API

mod api_keys;

use axum::{routing::post, Router};

use super::state::AppState;

pub use api_keys::CreateApiKeyResponse;

pub fn create_admin_router() -> Router<AppState> {
    Router::new().route("/api-keys", post(api_keys::create_api_key))
}
