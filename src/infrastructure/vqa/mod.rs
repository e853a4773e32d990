//! Answering backend implementations

pub mod http_client;
pub mod smsa;
pub mod vlm;

pub use http_client::{HttpClient, HttpClientTrait};
pub use smsa::{SmsaBackend, VisionEngine, SMSA_BACKEND_NAME};
pub use vlm::{VlmBackend, VLM_BACKEND_NAME};
