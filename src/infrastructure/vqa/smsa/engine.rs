//! Vision engine seam
//!
//! The locally-hosted model (generation, embeddings, selector scoring) is
//! an external collaborator behind this trait. Implementations own prompt
//! rendering, tokenization and model execution; history, when present, is
//! rendered oldest first as alternating user/assistant context.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::domain::vqa::HistoryTurn;
use crate::domain::DomainError;

/// Which generation pass to run over the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    /// Produce a candidate answer (or caption) for the image.
    Answer,
    /// Produce image-retake guidance for an unusable image.
    RetakeGuidance,
}

/// One generation request against the engine.
#[derive(Debug, Clone)]
pub struct EngineRequest {
    pub image_bytes: Vec<u8>,
    pub question: Option<String>,
    pub history: Vec<HistoryTurn>,
    pub mode: GenerationMode,
}

/// Output of a generation pass: the text plus the two pooled embeddings
/// the confidence gate blends. `question_vec` is absent for caption-only
/// generation.
#[derive(Debug, Clone)]
pub struct Generation {
    pub answer: String,
    pub question_vec: Option<Vec<f32>>,
    pub answer_vec: Vec<f32>,
}

/// Opaque answering/scoring engine.
#[async_trait]
pub trait VisionEngine: Send + Sync + Debug {
    /// Generate an answer together with its embeddings.
    async fn generate(&self, request: EngineRequest) -> Result<Generation, DomainError>;

    /// Score a blended embedding, returning a scalar confidence.
    async fn score(&self, blend: &[f32]) -> Result<f32, DomainError>;
}
