//! horus-ner library interface
//!
//! Evidence matrix construction and fusion engine, plus the HTTP surface of
//! the service binary.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod evidence;
pub mod fusion;
pub mod linguistics;
pub mod matrix;
pub mod services;
pub mod tags;
pub mod types;
pub mod workflow;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::error::NerError;
use crate::workflow::Pipeline;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub pipeline: Arc<Pipeline>,
    /// Serializes runs started through the API
    pub run_lock: Arc<Mutex<()>>,
    pub startup_time: DateTime<Utc>,
    /// Last failed run, reported by /health
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(db: SqlitePool, pipeline: Pipeline) -> Self {
        Self {
            db,
            pipeline: Arc::new(pipeline),
            run_lock: Arc::new(Mutex::new(())),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Remember a failed run for diagnostics
    pub async fn record_failure<T>(&self, result: Result<T, NerError>) -> ApiResult<T> {
        match result {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::error!(error = %e, "Run failed");
                *self.last_error.write().await = Some(e.to_string());
                Err(e.into())
            }
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::annotate_routes())
        .merge(api::export_routes())
        .merge(api::health_routes())
        .with_state(state)
}
