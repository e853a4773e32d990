use serde::Deserialize;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
    pub vqa: VqaConfig,
    pub vlm: VlmConfig,
    pub smsa: SmsaConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Authentication and key-storage settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Registry name of the API key repository implementation
    pub repository: String,
    pub mongodb_uri: String,
    pub mongodb_database: String,
}

/// Backend selection
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VqaConfig {
    /// Registry name of the answering backend
    pub backend: String,
}

/// Remote VLM backend settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VlmConfig {
    pub base_url: String,
    pub chat_endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub min_p: f32,
    pub repeat_penalty: f32,
    pub strip_code_fences: bool,
    pub captioning_prompt_path: String,
    pub question_prompt_path: String,
}

/// Confidence gate settings for the locally-hosted backend
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SmsaConfig {
    /// Weight of the question embedding in the scored blend
    pub tau: f32,
    /// Minimum acceptable confidence
    pub threshold: f32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            repository: "mongo_db".to_string(),
            mongodb_uri: "mongodb://localhost:27017".to_string(),
            mongodb_database: "vqa_gateway".to_string(),
        }
    }
}

impl Default for VqaConfig {
    fn default() -> Self {
        Self {
            backend: "vlm".to_string(),
        }
    }
}

impl Default for VlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:1234/v1".to_string(),
            chat_endpoint: "/chat/completions".to_string(),
            model: "qwen2.5-vl-7b-instruct".to_string(),
            temperature: 0.2,
            top_k: 40,
            top_p: 0.9,
            min_p: 0.05,
            repeat_penalty: 1.1,
            strip_code_fences: true,
            captioning_prompt_path: "config/prompts/captioning.txt".to_string(),
            question_prompt_path: "config/prompts/question.txt".to_string(),
        }
    }
}

impl Default for SmsaConfig {
    fn default() -> Self {
        Self {
            tau: 0.65,
            threshold: 0.67,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
