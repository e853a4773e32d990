//! API key repository implementations

mod in_memory;
mod mongo;

pub use in_memory::{InMemoryApiKeyRepository, IN_MEMORY_REPOSITORY_NAME};
pub use mongo::{MongoApiKeyRepository, MONGO_REPOSITORY_NAME};
