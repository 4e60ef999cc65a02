//! Database initialization
//!
//! Opens (or creates) the SQLite store and idempotently creates every table.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Busy timeout applied to every connection (milliseconds)
pub const BUSY_TIMEOUT_MS: u32 = 5000;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL allows concurrent readers with one writer
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query(&format!("PRAGMA busy_timeout = {}", BUSY_TIMEOUT_MS))
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create every table on an already-open pool (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;
    create_sentences_table(pool).await?;
    create_sentence_annotations_table(pool).await?;
    create_terms_table(pool).await?;
    create_web_documents_table(pool).await?;
    create_web_images_table(pool).await?;
    Ok(())
}

async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// One row per distinct sentence of a corpus
///
/// `has_entity`: 1 positive, 0 negative, -1 unknown.
/// Gold tokens and tags are JSON arrays (empty when no gold exists).
async fn create_sentences_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sentences (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            corpus TEXT NOT NULL,
            sentence TEXT NOT NULL,
            has_entity INTEGER NOT NULL DEFAULT -1 CHECK (has_entity IN (-1, 0, 1)),
            gold_tokens TEXT NOT NULL DEFAULT '[]',
            gold_ner TEXT NOT NULL DEFAULT '[]',
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (corpus, sentence)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_sentence_annotations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sentence_annotations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            sentence_id INTEGER NOT NULL REFERENCES sentences(id) ON DELETE CASCADE,
            annotator TEXT NOT NULL,
            tokens TEXT NOT NULL,
            pos TEXT NOT NULL,
            pos_universal TEXT NOT NULL,
            ner TEXT NOT NULL,
            compounds TEXT NOT NULL,
            tokenization_matches_reference INTEGER NOT NULL DEFAULT 0,
            UNIQUE (sentence_id, annotator)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Term cache entries, never deleted
async fn create_terms_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS terms (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            term TEXT NOT NULL,
            provider_id INTEGER NOT NULL,
            feature_kind TEXT NOT NULL CHECK (feature_kind IN ('document', 'image')),
            features_version INTEGER NOT NULL,
            results_requested INTEGER NOT NULL,
            results_returned INTEGER NOT NULL,
            query_metadata TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (term, provider_id, feature_kind, features_version)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Document results; indicators are -1/0/1 and NULL until processed
async fn create_web_documents_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS web_documents (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            term_id INTEGER NOT NULL REFERENCES terms(id) ON DELETE CASCADE,
            seq INTEGER NOT NULL,
            url TEXT NOT NULL,
            title TEXT NOT NULL DEFAULT '',
            snippet TEXT NOT NULL DEFAULT '',
            processed INTEGER NOT NULL DEFAULT 0,
            loc INTEGER,
            org INTEGER,
            per INTEGER,
            translation_error INTEGER,
            UNIQUE (term_id, seq)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Image results; `places` holds the per-sub-category indicators as a JSON array
async fn create_web_images_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS web_images (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            term_id INTEGER NOT NULL REFERENCES terms(id) ON DELETE CASCADE,
            seq INTEGER NOT NULL,
            url TEXT NOT NULL,
            thumbnail_url TEXT,
            local_path TEXT,
            title TEXT NOT NULL DEFAULT '',
            processed INTEGER NOT NULL DEFAULT 0,
            face INTEGER,
            logo INTEGER,
            places TEXT,
            UNIQUE (term_id, seq)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
