//! Public v1 API

mod vqa;

use axum::{routing::post, Router};

use super::state::AppState;

pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route("/vqa/captioning", post(vqa::captioning))
        .route("/vqa/question", post(vqa::question))
}
