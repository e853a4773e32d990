use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Output of an answering operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VqaResponse {
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Value>>,
}

impl VqaResponse {
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            details: None,
        }
    }

    /// Attach a diagnostic detail.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_serialization_omits_empty_details() {
        let response = VqaResponse::new("A red cup on a table.");
        let json = serde_json::to_string(&response).unwrap();

        assert!(json.contains("A red cup on a table."));
        assert!(!json.contains("details"));
    }

    #[test]
    fn test_response_with_detail() {
        let response = VqaResponse::new("answer").with_detail("confidence", 0.91);

        let details = response.details.unwrap();
        assert_eq!(details.get("confidence").unwrap().as_f64(), Some(0.91));
    }
}
