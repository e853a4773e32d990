//! Remote VLM backend
//!
//! Answers by POSTing a chat-completions payload to an external
//! vision-language model API. The payload is an ordered message list:
//! system prompt, alternating user/assistant history, then a final user
//! message combining the optional question text with the image.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::{json, Map, Value};

use crate::config::VlmConfig;
use crate::domain::vqa::{
    CaptioningRequest, HistoryTurn, OptionOverrides, QuestionRequest, VqaPort, VqaResponse,
};
use crate::domain::DomainError;

use super::http_client::HttpClientTrait;

/// Registry name of this backend
pub const VLM_BACKEND_NAME: &str = "vlm";

/// Generation parameters callers may override per request.
const ALLOWED_OVERRIDES: &[&str] = &[
    "model",
    "temperature",
    "top_k",
    "top_p",
    "min_p",
    "repeat_penalty",
];

/// Remote chat-completions backend
#[derive(Debug)]
pub struct VlmBackend<C: HttpClientTrait> {
    client: C,
    chat_url: String,
    captioning_prompt: String,
    question_prompt: String,
    config: VlmConfig,
}

impl<C: HttpClientTrait> VlmBackend<C> {
    /// Build the backend, loading both system prompts from disk.
    pub fn new(client: C, config: VlmConfig) -> Result<Self, DomainError> {
        let chat_url = format!(
            "{}{}",
            config.base_url.trim_end_matches('/'),
            config.chat_endpoint
        );

        let captioning_prompt = load_prompt(&config.captioning_prompt_path)?;
        let question_prompt = load_prompt(&config.question_prompt_path)?;

        Ok(Self {
            client,
            chat_url,
            captioning_prompt,
            question_prompt,
            config,
        })
    }

    /// Merge the configured generation parameters with per-request
    /// overrides, rejecting keys outside the allow-list.
    fn generation_params(
        &self,
        overrides: Option<&OptionOverrides>,
    ) -> Result<Map<String, Value>, DomainError> {
        let mut params = Map::new();
        params.insert("model".to_string(), json!(self.config.model));
        params.insert("temperature".to_string(), json!(self.config.temperature));
        params.insert("top_k".to_string(), json!(self.config.top_k));
        params.insert("top_p".to_string(), json!(self.config.top_p));
        params.insert("min_p".to_string(), json!(self.config.min_p));
        params.insert(
            "repeat_penalty".to_string(),
            json!(self.config.repeat_penalty),
        );

        if let Some(overrides) = overrides {
            for (key, value) in overrides {
                if !ALLOWED_OVERRIDES.contains(&key.as_str()) {
                    return Err(DomainError::validation(format!(
                        "Unknown generation parameter override: '{}'",
                        key
                    )));
                }
                params.insert(key.clone(), value.clone());
            }
        }

        Ok(params)
    }

    fn build_payload(
        &self,
        image_bytes: &[u8],
        system_prompt: &str,
        text: Option<&str>,
        history: Option<&[HistoryTurn]>,
        overrides: Option<&OptionOverrides>,
    ) -> Result<Value, DomainError> {
        let data_uri = format!("data:image/png;base64,{}", STANDARD.encode(image_bytes));

        let mut messages = vec![json!({ "role": "system", "content": system_prompt })];

        // Prior turns render oldest first, alternating user/assistant
        for turn in history.unwrap_or_default() {
            messages.push(json!({ "role": "user", "content": turn.question }));
            messages.push(json!({ "role": "assistant", "content": turn.answer }));
        }

        let mut content_items = Vec::new();
        if let Some(text) = text {
            content_items.push(json!({ "type": "text", "text": text }));
        }
        content_items.push(json!({
            "type": "image_url",
            "image_url": { "url": data_uri }
        }));
        messages.push(json!({ "role": "user", "content": content_items }));

        let mut payload = Map::new();
        payload.insert("messages".to_string(), Value::Array(messages));
        payload.extend(self.generation_params(overrides)?);

        Ok(Value::Object(payload))
    }

    async fn complete(&self, payload: Value) -> Result<String, DomainError> {
        let headers = vec![("Content-Type", "application/json")];
        let response = self
            .client
            .post_json(&self.chat_url, headers, &payload)
            .await?;

        self.parse_response(response)
    }

    fn parse_response(&self, response: Value) -> Result<String, DomainError> {
        let content = response
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                DomainError::upstream(VLM_BACKEND_NAME, "Reply has no choices[0].message.content")
            })?;

        if self.config.strip_code_fences {
            Ok(strip_code_fences(content).to_string())
        } else {
            Ok(content.to_string())
        }
    }
}

#[async_trait]
impl<C: HttpClientTrait> VqaPort for VlmBackend<C> {
    async fn process_captioning(
        &self,
        request: CaptioningRequest,
    ) -> Result<VqaResponse, DomainError> {
        let payload = self.build_payload(
            &request.image.bytes,
            &self.captioning_prompt,
            None,
            request.history.as_deref(),
            request.options.as_ref(),
        )?;

        let output = self.complete(payload).await?;
        Ok(VqaResponse::new(output))
    }

    async fn process_question(
        &self,
        request: QuestionRequest,
    ) -> Result<VqaResponse, DomainError> {
        let payload = self.build_payload(
            &request.image.bytes,
            &self.question_prompt,
            Some(&request.question),
            request.history.as_deref(),
            request.options.as_ref(),
        )?;

        let output = self.complete(payload).await?;
        Ok(VqaResponse::new(output))
    }

    fn backend_name(&self) -> &'static str {
        VLM_BACKEND_NAME
    }
}

fn load_prompt(path: &str) -> Result<String, DomainError> {
    std::fs::read_to_string(path).map_err(|e| {
        DomainError::configuration(format!("Failed to load prompt file '{}': {}", path, e))
    })
}

/// Strip leading/trailing markdown code-fence markers some models emit.
fn strip_code_fences(text: &str) -> &str {
    let mut text = text;
    if let Some(rest) = text.strip_prefix("```json\n") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest.trim_end();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::vqa::ImageData;
    use crate::infrastructure::vqa::http_client::mock::MockHttpClient;
    use std::io::Write;

    fn write_prompt(dir: &std::path::Path, name: &str, text: &str) -> String {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(text.as_bytes()).unwrap();
        path.to_str().unwrap().to_string()
    }

    fn test_config(dir: &std::path::Path) -> VlmConfig {
        VlmConfig {
            base_url: "http://localhost:1234/v1".to_string(),
            chat_endpoint: "/chat/completions".to_string(),
            model: "test-vlm".to_string(),
            temperature: 0.2,
            top_k: 40,
            top_p: 0.9,
            min_p: 0.05,
            repeat_penalty: 1.1,
            strip_code_fences: true,
            captioning_prompt_path: write_prompt(dir, "captioning.txt", "Describe the image."),
            question_prompt_path: write_prompt(dir, "question.txt", "Answer the question."),
        }
    }

    fn chat_reply(content: &str) -> serde_json::Value {
        json!({
            "choices": [
                { "message": { "role": "assistant", "content": content } }
            ]
        })
    }

    const CHAT_URL: &str = "http://localhost:1234/v1/chat/completions";

    #[tokio::test]
    async fn test_question_payload_shape() {
        let dir = std::env::temp_dir().join("vlm-backend-test-payload");
        std::fs::create_dir_all(&dir).unwrap();

        let client = MockHttpClient::new().with_response(CHAT_URL, chat_reply("A blue mug."));
        let backend = VlmBackend::new(client, test_config(&dir)).unwrap();

        let request = QuestionRequest::new(ImageData::new(vec![1, 2, 3]), "What is this?")
            .with_history(vec![HistoryTurn::new("Is it a mug?", "Yes.")]);

        let response = backend.process_question(request).await.unwrap();
        assert_eq!(response.output, "A blue mug.");

        let payload = backend.client.recorded_requests().remove(0);
        let messages = payload["messages"].as_array().unwrap();

        // system, then history (user/assistant), then final user turn
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], "Answer the question.");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[1]["content"], "Is it a mug?");
        assert_eq!(messages[2]["role"], "assistant");
        assert_eq!(messages[2]["content"], "Yes.");
        assert_eq!(messages[3]["role"], "user");

        let content = messages[3]["content"].as_array().unwrap();
        assert_eq!(content[0]["type"], "text");
        assert_eq!(content[0]["text"], "What is this?");
        assert_eq!(content[1]["type"], "image_url");
        assert!(content[1]["image_url"]["url"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,"));

        // Generation parameters ride alongside the messages
        assert_eq!(payload["model"], "test-vlm");
        assert_eq!(payload["top_k"], 40);
    }

    #[tokio::test]
    async fn test_captioning_payload_has_no_text_part() {
        let dir = std::env::temp_dir().join("vlm-backend-test-captioning");
        std::fs::create_dir_all(&dir).unwrap();

        let client = MockHttpClient::new().with_response(CHAT_URL, chat_reply("A mug."));
        let backend = VlmBackend::new(client, test_config(&dir)).unwrap();

        backend
            .process_captioning(CaptioningRequest::new(ImageData::new(vec![9])))
            .await
            .unwrap();

        let payload = backend.client.recorded_requests().remove(0);
        let messages = payload["messages"].as_array().unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["content"], "Describe the image.");

        let content = messages[1]["content"].as_array().unwrap();
        assert_eq!(content.len(), 1);
        assert_eq!(content[0]["type"], "image_url");
    }

    #[tokio::test]
    async fn test_unknown_override_is_rejected_by_name() {
        let dir = std::env::temp_dir().join("vlm-backend-test-override");
        std::fs::create_dir_all(&dir).unwrap();

        let client = MockHttpClient::new();
        let backend = VlmBackend::new(client, test_config(&dir)).unwrap();

        let mut options = OptionOverrides::new();
        options.insert("max_tokens".to_string(), json!(512));

        let request =
            QuestionRequest::new(ImageData::new(vec![1]), "What is this?").with_options(options);

        let err = backend.process_question(request).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
        assert!(err.to_string().contains("max_tokens"));
    }

    #[tokio::test]
    async fn test_allowed_override_replaces_default() {
        let dir = std::env::temp_dir().join("vlm-backend-test-allowed");
        std::fs::create_dir_all(&dir).unwrap();

        let client = MockHttpClient::new().with_response(CHAT_URL, chat_reply("ok"));
        let backend = VlmBackend::new(client, test_config(&dir)).unwrap();

        let mut options = OptionOverrides::new();
        options.insert("temperature".to_string(), json!(0.9));

        let request =
            QuestionRequest::new(ImageData::new(vec![1]), "What is this?").with_options(options);
        backend.process_question(request).await.unwrap();

        let payload = backend.client.recorded_requests().remove(0);
        assert_eq!(payload["temperature"], 0.9);
    }

    #[tokio::test]
    async fn test_code_fences_are_stripped() {
        let dir = std::env::temp_dir().join("vlm-backend-test-fences");
        std::fs::create_dir_all(&dir).unwrap();

        let client = MockHttpClient::new()
            .with_response(CHAT_URL, chat_reply("```json\n{\"caption\": \"a mug\"}\n```"));
        let backend = VlmBackend::new(client, test_config(&dir)).unwrap();

        let response = backend
            .process_captioning(CaptioningRequest::new(ImageData::new(vec![1])))
            .await
            .unwrap();

        assert_eq!(response.output, "{\"caption\": \"a mug\"}");
    }

    #[tokio::test]
    async fn test_upstream_failure_is_surfaced() {
        let dir = std::env::temp_dir().join("vlm-backend-test-upstream");
        std::fs::create_dir_all(&dir).unwrap();

        let client = MockHttpClient::new().with_error(CHAT_URL, "HTTP 502: bad gateway");
        let backend = VlmBackend::new(client, test_config(&dir)).unwrap();

        let err = backend
            .process_captioning(CaptioningRequest::new(ImageData::new(vec![1])))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Upstream { .. }));
    }

    #[tokio::test]
    async fn test_reply_without_content_is_upstream_error() {
        let dir = std::env::temp_dir().join("vlm-backend-test-nocontent");
        std::fs::create_dir_all(&dir).unwrap();

        let client = MockHttpClient::new().with_response(CHAT_URL, json!({ "choices": [] }));
        let backend = VlmBackend::new(client, test_config(&dir)).unwrap();

        let err = backend
            .process_captioning(CaptioningRequest::new(ImageData::new(vec![1])))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Upstream { .. }));
    }

    #[test]
    fn test_missing_prompt_file_is_configuration_error() {
        let dir = std::env::temp_dir().join("vlm-backend-test-missing-prompt");
        std::fs::create_dir_all(&dir).unwrap();

        let mut config = test_config(&dir);
        config.question_prompt_path = "/nonexistent/question.txt".to_string();

        let err = VlmBackend::new(MockHttpClient::new(), config).unwrap_err();
        assert!(matches!(err, DomainError::Configuration { .. }));
    }
}
