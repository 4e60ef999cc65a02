//! horus-ner - Evidence Matrix Service
//!
//! Annotates short text and labeled corpora with web-evidence named-entity
//! predictions. Default bind address 127.0.0.1:5790.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use horus_common::config::{load_default_toml_config, resolve_root_folder, RootFolder};
use horus_ner::config::{resolve_search_api_key, FusionSettings};
use horus_ner::services::{
    search_provider, HttpAnnotator, HttpImageClassifier, HttpImageStore, HttpTextClassifier,
};
use horus_ner::types::Annotator;
use horus_ner::workflow::{Pipeline, PipelineServices};
use horus_ner::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let toml_config = load_default_toml_config()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| toml_config.logging.level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting horus-ner (Evidence Matrix) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Root folder and database
    let root_folder = RootFolder::new(resolve_root_folder(None, &toml_config));
    root_folder
        .ensure_directories_exist()
        .context("Failed to initialize root folder")?;

    let db_path = root_folder.database_path();
    info!("Database: {}", db_path.display());
    let db_pool = horus_common::db::init_database(&db_path).await?;

    // Runtime settings (configuration errors are fatal here)
    let settings = FusionSettings::load(&db_pool).await?;
    let api_key = resolve_search_api_key(&db_pool, &toml_config).await?;

    // Collaborators
    let endpoints = &toml_config.services;
    let annotators: Vec<Arc<dyn Annotator>> = HttpAnnotator::all(&endpoints.annotator_url)?
        .into_iter()
        .map(|a| Arc::new(a) as Arc<dyn Annotator>)
        .collect();

    let services = PipelineServices {
        annotators,
        search_provider: search_provider(settings.search_provider, api_key)?,
        image_store: Arc::new(HttpImageStore::new(&root_folder.image_cache_dir())?),
        image_classifier: Arc::new(HttpImageClassifier::new(
            &endpoints.classifier_url,
            settings.object_detection_backend,
        )?),
        text_classifier: Arc::new(HttpTextClassifier::new(
            &endpoints.classifier_url,
            settings.text_classification_backend,
        )?),
    };

    let pipeline = Pipeline::new(db_pool.clone(), settings, services, root_folder.output_dir());
    let state = AppState::new(db_pool, pipeline);
    let app = horus_ner::build_router(state);

    let listener = tokio::net::TcpListener::bind(&toml_config.bind_address).await?;
    info!("Listening on http://{}", toml_config.bind_address);
    info!("Health check: http://{}/health", toml_config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
