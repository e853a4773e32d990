//! Answering endpoint handlers

use axum::extract::State;
use tracing::info;
use uuid::Uuid;

use crate::api::middleware::RequireApiKey;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::vqa::{CaptioningRequest, QuestionRequest, VqaPort, VqaResponse};

/// POST /v1/vqa/captioning
pub async fn captioning(
    State(state): State<AppState>,
    RequireApiKey(api_key): RequireApiKey,
    Json(request): Json<CaptioningRequest>,
) -> Result<Json<VqaResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    info!(
        request_id = %request_id,
        key_prefix = %api_key.key_prefix(),
        image_bytes = request.image.bytes.len(),
        "Processing captioning request"
    );

    if request.image.bytes.is_empty() {
        return Err(ApiError::bad_request("Image bytes cannot be empty").with_param("image"));
    }

    let response = state.vqa.process_captioning(request).await?;
    Ok(Json(response))
}

/// POST /v1/vqa/question
pub async fn question(
    State(state): State<AppState>,
    RequireApiKey(api_key): RequireApiKey,
    Json(request): Json<QuestionRequest>,
) -> Result<Json<VqaResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    info!(
        request_id = %request_id,
        key_prefix = %api_key.key_prefix(),
        image_bytes = request.image.bytes.len(),
        "Processing question request"
    );

    if request.image.bytes.is_empty() {
        return Err(ApiError::bad_request("Image bytes cannot be empty").with_param("image"));
    }

    if request.question.trim().is_empty() {
        return Err(ApiError::bad_request("Question cannot be empty").with_param("question"));
    }

    let response = state.vqa.process_question(request).await?;
    Ok(Json(response))
}
