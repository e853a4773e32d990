//! Locally-hosted SMSA backend
//!
//! Wraps the vision engine with the confidence-gated selector: generate a
//! candidate answer, score the blended embeddings, and substitute retake
//! guidance when the candidate is a refusal or scores below threshold.

mod engine;
mod selector;

pub use engine::{EngineRequest, Generation, GenerationMode, VisionEngine};
pub use selector::{ConfidenceGate, GateOutcome};

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::config::SmsaConfig;
use crate::domain::vqa::{
    CaptioningRequest, HistoryTurn, OptionOverrides, QuestionRequest, VqaPort, VqaResponse,
};
use crate::domain::DomainError;

use selector::strip_quotes;

/// Registry name of this backend
pub const SMSA_BACKEND_NAME: &str = "smsa";

/// Locally-hosted answering backend with confidence gating
#[derive(Debug)]
pub struct SmsaBackend {
    engine: Arc<dyn VisionEngine>,
    gate: ConfidenceGate,
}

impl SmsaBackend {
    pub fn new(engine: Arc<dyn VisionEngine>, config: &SmsaConfig) -> Result<Self, DomainError> {
        let gate = ConfidenceGate::new(config.tau, config.threshold)
            .map_err(|e| DomainError::configuration(e.to_string()))?;

        Ok(Self { engine, gate })
    }

    /// The configured gate, adjusted by per-request overrides.
    fn gate_for(&self, options: Option<&OptionOverrides>) -> Result<ConfidenceGate, DomainError> {
        let Some(options) = options else {
            return Ok(self.gate);
        };

        let mut tau = self.gate.tau();
        let mut threshold = self.gate.threshold();

        // The selector's override allow-list: tau and threshold only.
        for (key, value) in options {
            match key.as_str() {
                "tau" => tau = numeric_override(key, value)?,
                "threshold" => threshold = numeric_override(key, value)?,
                other => {
                    return Err(DomainError::validation(format!(
                        "Unknown selector override: '{}'",
                        other
                    )))
                }
            }
        }

        ConfidenceGate::new(tau, threshold)
    }

    async fn answer_gated(
        &self,
        image_bytes: Vec<u8>,
        question: Option<String>,
        history: Vec<HistoryTurn>,
        gate: ConfidenceGate,
    ) -> Result<VqaResponse, DomainError> {
        let generation = self
            .engine
            .generate(EngineRequest {
                image_bytes: image_bytes.clone(),
                question: question.clone(),
                history: history.clone(),
                mode: GenerationMode::Answer,
            })
            .await?;

        let blend = gate.blend(generation.question_vec.as_deref(), &generation.answer_vec)?;
        let confidence = self.engine.score(&blend).await?;

        match gate.evaluate(&generation.answer, confidence) {
            GateOutcome::Accept(answer) => {
                Ok(VqaResponse::new(answer).with_detail("confidence", confidence as f64))
            }
            GateOutcome::Retake => {
                debug!(confidence, "Candidate answer gated, generating retake guidance");

                let guidance = self
                    .engine
                    .generate(EngineRequest {
                        image_bytes,
                        question,
                        history,
                        mode: GenerationMode::RetakeGuidance,
                    })
                    .await?;

                Ok(VqaResponse::new(strip_quotes(&guidance.answer))
                    .with_detail("confidence", confidence as f64)
                    .with_detail("retake_guidance", true))
            }
        }
    }
}

#[async_trait]
impl VqaPort for SmsaBackend {
    async fn process_captioning(
        &self,
        request: CaptioningRequest,
    ) -> Result<VqaResponse, DomainError> {
        let gate = self.gate_for(request.options.as_ref())?;
        self.answer_gated(
            request.image.bytes,
            None,
            request.history.unwrap_or_default(),
            gate,
        )
        .await
    }

    async fn process_question(
        &self,
        request: QuestionRequest,
    ) -> Result<VqaResponse, DomainError> {
        let gate = self.gate_for(request.options.as_ref())?;
        self.answer_gated(
            request.image.bytes,
            Some(request.question),
            request.history.unwrap_or_default(),
            gate,
        )
        .await
    }

    fn backend_name(&self) -> &'static str {
        SMSA_BACKEND_NAME
    }
}

fn numeric_override(key: &str, value: &Value) -> Result<f32, DomainError> {
    value
        .as_f64()
        .map(|v| v as f32)
        .ok_or_else(|| {
            DomainError::validation(format!("Selector override '{}' must be a number", key))
        })
}
