use thiserror::Error;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Repository unavailable: {message}")]
    RepositoryUnavailable { message: String },

    #[error("Corrupt record: {message}")]
    CorruptRecord { message: String },

    #[error("Upstream error: {backend} - {message}")]
    Upstream { backend: String, message: String },
}

impl DomainError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn repository_unavailable(message: impl Into<String>) -> Self {
        Self::RepositoryUnavailable {
            message: message.into(),
        }
    }

    pub fn corrupt_record(message: impl Into<String>) -> Self {
        Self::CorruptRecord {
            message: message.into(),
        }
    }

    pub fn upstream(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            backend: backend.into(),
            message: message.into(),
        }
    }
}
