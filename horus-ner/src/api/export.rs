//! POST /export

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::matrix::ExportFormat;
use crate::AppState;

fn default_ner_index() -> usize {
    1
}

fn default_format() -> String {
    "tsv".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    pub corpus_file: PathBuf,
    /// 0-based token column
    #[serde(default)]
    pub token_index: usize,
    /// 0-based NER column
    #[serde(default = "default_ner_index")]
    pub ner_index: usize,
    #[serde(default = "default_format")]
    pub format: String,
}

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub path: PathBuf,
    pub rows: usize,
    pub skipped_sentences: Vec<usize>,
}

/// POST /export
///
/// Builds the matrix of a CoNLL corpus and writes it to the output folder.
pub async fn export(
    State(state): State<AppState>,
    Json(request): Json<ExportRequest>,
) -> ApiResult<Json<ExportResponse>> {
    let format: ExportFormat = request
        .format
        .parse()
        .map_err(|e: crate::error::NerError| ApiError::BadRequest(e.to_string()))?;

    if !request.corpus_file.is_file() {
        return Err(ApiError::BadRequest(format!(
            "corpus file not found: {}",
            request.corpus_file.display()
        )));
    }

    let _run = state.run_lock.lock().await;
    info!(corpus = %request.corpus_file.display(), %format, "Export request");

    let export = state
        .record_failure(
            state
                .pipeline
                .export_features(&request.corpus_file, request.token_index, request.ner_index, format)
                .await,
        )
        .await?;

    Ok(Json(ExportResponse {
        path: export.path,
        rows: export.run.matrix.len(),
        skipped_sentences: export.run.skipped_sentences,
    }))
}

pub fn export_routes() -> Router<AppState> {
    Router::new().route("/export", post(export))
}
