//! POST /annotate

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::matrix::MatrixRow;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AnnotateRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct AnnotateResponse {
    pub rows: Vec<MatrixRow>,
    pub skipped_sentences: Vec<usize>,
}

/// POST /annotate
///
/// Annotates free text; one run at a time.
pub async fn annotate(
    State(state): State<AppState>,
    Json(request): Json<AnnotateRequest>,
) -> ApiResult<Json<AnnotateResponse>> {
    if request.text.trim().is_empty() {
        return Err(ApiError::BadRequest("text must not be empty".to_string()));
    }

    let _run = state.run_lock.lock().await;
    info!(chars = request.text.len(), "Annotate request");

    let run = state
        .record_failure(state.pipeline.annotate(&request.text).await)
        .await?;

    Ok(Json(AnnotateResponse {
        rows: run.matrix.into_rows(),
        skipped_sentences: run.skipped_sentences,
    }))
}

pub fn annotate_routes() -> Router<AppState> {
    Router::new().route("/annotate", post(annotate))
}
