//! API key domain model and repository contract

mod entity;
mod repository;

pub use entity::ApiKey;
pub use repository::{ApiKeyRepository, IssuedApiKey};
