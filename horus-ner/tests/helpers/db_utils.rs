//! Database Test Utilities

use anyhow::Result;
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;

use horus_ner::config::FusionSettings;
use horus_ner::types::Annotator;
use horus_ner::workflow::{Pipeline, PipelineServices};

use super::mocks::{
    MockAnnotator, MockImageClassifier, MockImageStore, MockSearchProvider, MockTextClassifier,
    MockWeb,
};

/// Create temporary test database with every table created
///
/// Returns (TempDir, SqlitePool) - TempDir must be kept alive for duration of test
pub async fn create_test_db() -> Result<(TempDir, SqlitePool)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test_horus.db");
    let pool = horus_common::db::init_database(&db_path).await?;
    Ok((temp_dir, pool))
}

/// Pipeline over mock collaborators backed by `web`
///
/// Exports land in `<temp_dir>/output`.
pub fn test_pipeline(
    pool: &SqlitePool,
    temp_dir: &TempDir,
    web: Arc<MockWeb>,
    annotator: MockAnnotator,
    settings: FusionSettings,
) -> (Pipeline, Arc<MockSearchProvider>) {
    let provider = Arc::new(MockSearchProvider::new(web.clone()));
    let services = PipelineServices {
        annotators: vec![Arc::new(annotator) as Arc<dyn Annotator>],
        search_provider: provider.clone(),
        image_store: Arc::new(MockImageStore::default()),
        image_classifier: Arc::new(MockImageClassifier::new(web.clone())),
        text_classifier: Arc::new(MockTextClassifier::new(web)),
    };
    let pipeline = Pipeline::new(
        pool.clone(),
        settings,
        services,
        temp_dir.path().join("output"),
    );
    (pipeline, provider)
}
