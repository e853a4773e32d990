use async_trait::async_trait;
use std::fmt::Debug;

use super::{CaptioningRequest, QuestionRequest, VqaResponse};
use crate::domain::DomainError;

/// Contract for answering backends (remote VLM, locally-hosted SMSA, ...).
///
/// Both operations tolerate absent or empty history; when present, prior
/// turns are rendered as alternating user/assistant context ahead of the
/// current turn, oldest first. Side effects are confined to outbound
/// model calls; implementations share no mutable state across requests.
#[async_trait]
pub trait VqaPort: Send + Sync + Debug {
    /// Produce a description of the image.
    async fn process_captioning(
        &self,
        request: CaptioningRequest,
    ) -> Result<VqaResponse, DomainError>;

    /// Answer a specific question about the image.
    async fn process_question(&self, request: QuestionRequest)
        -> Result<VqaResponse, DomainError>;

    /// The backend's registry name.
    fn backend_name(&self) -> &'static str;
}
