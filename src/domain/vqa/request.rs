use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Backend-specific option overrides: string key to scalar value.
///
/// Keys are validated by each backend against its fixed allow-list;
/// unknown keys are rejected, never silently ignored.
pub type OptionOverrides = HashMap<String, Value>;

/// Raw image payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageData {
    pub bytes: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, Value>>,
}

impl ImageData {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            metadata: None,
        }
    }
}

/// One prior question/answer exchange, oldest first in a history list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub question: String,
    pub answer: String,
}

impl HistoryTurn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Request to describe an image; carries no question text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptioningRequest {
    pub image: ImageData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<HistoryTurn>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<OptionOverrides>,
}

impl CaptioningRequest {
    pub fn new(image: ImageData) -> Self {
        Self {
            image,
            history: None,
            options: None,
        }
    }

    pub fn with_history(mut self, history: Vec<HistoryTurn>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_options(mut self, options: OptionOverrides) -> Self {
        self.options = Some(options);
        self
    }
}

/// Request to answer a specific question about an image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRequest {
    pub image: ImageData,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<HistoryTurn>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<OptionOverrides>,
}

impl QuestionRequest {
    pub fn new(image: ImageData, question: impl Into<String>) -> Self {
        Self {
            image,
            question: question.into(),
            history: None,
            options: None,
        }
    }

    pub fn with_history(mut self, history: Vec<HistoryTurn>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_options(mut self, options: OptionOverrides) -> Self {
        self.options = Some(options);
        self
    }
}
