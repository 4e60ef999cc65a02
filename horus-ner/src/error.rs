//! Error types for horus-ner
//!
//! Severity by variant:
//! - `Alignment`, `MalformedBundle`, `Annotation`: fatal for one sentence (skipped)
//! - `EvidenceFetch`, `Classification`: non-fatal (empty evidence for the term)
//! - `CacheConsistency` and storage errors: abort the run
//! - `Configuration`: fatal at startup

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Engine error type
#[derive(Debug, Error)]
pub enum NerError {
    /// Annotator token could not be located in the reference tokenization
    #[error("Alignment failed in sentence {sentence_id}: token '{token}' at position {position} has no match in the reference")]
    Alignment {
        sentence_id: usize,
        token: String,
        position: usize,
    },

    /// Cached sentence bundle is inconsistent (e.g. compound span out of bounds)
    #[error("Malformed sentence {sentence_id}: {reason}")]
    MalformedBundle { sentence_id: usize, reason: String },

    /// Term cache holds an unexpected number of entries
    #[error("Cache consistency violated for term '{term}': expected 2 entries, found {found}")]
    CacheConsistency { term: String, found: usize },

    /// Search provider query failed
    #[error("Evidence fetch failed for term '{term}': {reason}")]
    EvidenceFetch { term: String, reason: String },

    /// Annotator call failed
    #[error("Annotation failed ({annotator}): {reason}")]
    Annotation { annotator: String, reason: String },

    /// Image or text classifier call failed
    #[error("Classification failed: {0}")]
    Classification(String),

    /// Corpus file is not in the expected column format
    #[error("Corpus error at line {line}: {reason}")]
    Corpus { line: usize, reason: String },

    /// Invalid or unsupported configuration value
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Common error: {0}")]
    Common(#[from] horus_common::Error),

    /// Run stopped by a fatal error; carries the last completed progress
    #[error("Run aborted (last sentence: {last_sentence:?}, last term: {last_term:?}): {source}")]
    Aborted {
        last_sentence: Option<usize>,
        last_term: Option<String>,
        #[source]
        source: Box<NerError>,
    },
}

impl NerError {
    /// Errors that skip the current sentence without stopping the run
    pub fn is_sentence_local(&self) -> bool {
        matches!(
            self,
            NerError::Alignment { .. } | NerError::MalformedBundle { .. } | NerError::Annotation { .. }
        )
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Engine error
    #[error(transparent)]
    Ner(#[from] NerError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Ner(ref err) => {
                let (status, code) = match err {
                    NerError::Corpus { .. } => (StatusCode::BAD_REQUEST, "CORPUS_ERROR"),
                    NerError::Configuration(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "CONFIGURATION_ERROR")
                    }
                    NerError::Aborted { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "RUN_ABORTED"),
                    NerError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
                    NerError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
                    _ => (StatusCode::INTERNAL_SERVER_ERROR, "ENGINE_ERROR"),
                };
                (status, code, err.to_string())
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
