//! Application state for shared services

use std::sync::Arc;

use crate::domain::api_key::ApiKeyRepository;
use crate::domain::vqa::VqaPort;

/// Shared per-process services.
///
/// Both handles are resolved from the registries once at startup and
/// reused for every request.
#[derive(Clone)]
pub struct AppState {
    pub vqa: Arc<dyn VqaPort>,
    pub api_keys: Arc<dyn ApiKeyRepository>,
}

impl AppState {
    pub fn new(vqa: Arc<dyn VqaPort>, api_keys: Arc<dyn ApiKeyRepository>) -> Self {
        Self { vqa, api_keys }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
