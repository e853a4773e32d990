//! Confidence-gated response selection
//!
//! A single generation pass is cheap but occasionally low-confidence or an
//! outright refusal. The gate decides whether a candidate answer is worth
//! returning: blend the question and answer embeddings, score the blend,
//! and reject when the score falls below the threshold or the answer is a
//! known refusal phrase. Rejected answers are replaced by image-retake
//! guidance from a second, differently-prompted pass.

use crate::domain::DomainError;

/// Answers that count as refusals after normalization.
const REFUSAL_PHRASES: &[&str] = &["unanswerable", "unsuitable", "unsuitable image", "unreadable"];

/// Outcome of gating one candidate answer.
#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    /// Return the (quote-stripped) answer as-is.
    Accept(String),
    /// Discard the answer and generate retake guidance instead.
    Retake,
}

/// Threshold-and-refusal-list policy.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceGate {
    tau: f32,
    threshold: f32,
}

impl ConfidenceGate {
    /// `tau` weights the question embedding in the blend and must lie in
    /// [0, 1]; `threshold` is the minimum acceptable confidence.
    pub fn new(tau: f32, threshold: f32) -> Result<Self, DomainError> {
        if !(0.0..=1.0).contains(&tau) {
            return Err(DomainError::validation(format!(
                "tau must be within [0, 1], got {}",
                tau
            )));
        }
        Ok(Self { tau, threshold })
    }

    pub fn tau(&self) -> f32 {
        self.tau
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Blend the two embeddings: `tau * question + (1 - tau) * answer`.
    ///
    /// Caption-only generation has no question embedding; the blend then
    /// degenerates to the answer embedding (answer-only score).
    pub fn blend(
        &self,
        question_vec: Option<&[f32]>,
        answer_vec: &[f32],
    ) -> Result<Vec<f32>, DomainError> {
        let Some(question_vec) = question_vec else {
            return Ok(answer_vec.to_vec());
        };

        if question_vec.len() != answer_vec.len() {
            return Err(DomainError::upstream(
                "smsa",
                format!(
                    "Embedding length mismatch: question {} vs answer {}",
                    question_vec.len(),
                    answer_vec.len()
                ),
            ));
        }

        Ok(question_vec
            .iter()
            .zip(answer_vec)
            .map(|(q, a)| self.tau * q + (1.0 - self.tau) * a)
            .collect())
    }

    /// Apply the decision rule to a candidate answer and its confidence.
    pub fn evaluate(&self, answer: &str, confidence: f32) -> GateOutcome {
        let cleaned = strip_quotes(answer);

        if REFUSAL_PHRASES.contains(&cleaned.to_lowercase().as_str())
            || confidence < self.threshold
        {
            return GateOutcome::Retake;
        }

        GateOutcome::Accept(cleaned.to_string())
    }
}

/// Strip surrounding single/double quote characters.
pub fn strip_quotes(text: &str) -> &str {
    text.trim().trim_matches(|c| c == '\'' || c == '"')
}
