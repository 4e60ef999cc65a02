//! Cached web documents and images
//!
//! Children of a term cache entry. Classifier indicators are written once,
//! together with the `processed` flag, and never overwritten.

use sqlx::{Pool, Sqlite};
use std::path::PathBuf;

use crate::error::NerError;
use crate::types::{
    DocumentHit, DocumentSample, ImageHit, ImageSample, ImageVerdict, Indicator, TextVerdict,
};

/// Stored document result
#[derive(Debug, Clone, PartialEq)]
pub struct WebDocument {
    pub id: i64,
    pub seq: i64,
    pub sample: DocumentSample,
    /// Present once processed
    pub verdict: Option<TextVerdict>,
}

/// Stored image result
#[derive(Debug, Clone, PartialEq)]
pub struct WebImage {
    pub id: i64,
    pub seq: i64,
    pub sample: ImageSample,
    /// Present once processed
    pub verdict: Option<ImageVerdict>,
}

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: i64,
    seq: i64,
    url: String,
    title: String,
    snippet: String,
    processed: i64,
    loc: Option<i64>,
    org: Option<i64>,
    per: Option<i64>,
    translation_error: Option<i64>,
}

#[derive(sqlx::FromRow)]
struct ImageRow {
    id: i64,
    seq: i64,
    url: String,
    local_path: Option<String>,
    processed: i64,
    face: Option<i64>,
    logo: Option<i64>,
    places: Option<String>,
}

fn indicator(value: Option<i64>) -> Result<Indicator, NerError> {
    let raw = value.unwrap_or(0);
    i8::try_from(raw)
        .ok()
        .and_then(|v| Indicator::try_from(v).ok())
        .ok_or_else(|| NerError::Classification(format!("stored indicator out of range: {}", raw)))
}

fn indicator_value(value: Indicator) -> i64 {
    i8::from(value) as i64
}

// ============================================================================
// Inserts (inside the term's cache transaction)
// ============================================================================

pub async fn insert_document(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    term_id: i64,
    seq: usize,
    hit: &DocumentHit,
) -> Result<i64, NerError> {
    let result = sqlx::query(
        "INSERT INTO web_documents (term_id, seq, url, title, snippet) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(term_id)
    .bind(seq as i64)
    .bind(&hit.url)
    .bind(&hit.title)
    .bind(&hit.snippet)
    .execute(&mut **tx)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn insert_image(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    term_id: i64,
    seq: usize,
    hit: &ImageHit,
    local_path: Option<&PathBuf>,
) -> Result<i64, NerError> {
    let result = sqlx::query(
        r#"
        INSERT INTO web_images (term_id, seq, url, thumbnail_url, local_path, title)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(term_id)
    .bind(seq as i64)
    .bind(&hit.content_url)
    .bind(hit.thumbnail_url.as_deref())
    .bind(local_path.map(|p| p.to_string_lossy().into_owned()))
    .bind(&hit.title)
    .execute(&mut **tx)
    .await?;

    Ok(result.last_insert_rowid())
}

// ============================================================================
// Reads
// ============================================================================

/// Documents of a term entry in rank order
pub async fn list_documents(db: &Pool<Sqlite>, term_id: i64) -> Result<Vec<WebDocument>, NerError> {
    let rows: Vec<DocumentRow> = sqlx::query_as(
        r#"
        SELECT id, seq, url, title, snippet, processed, loc, org, per, translation_error
        FROM web_documents WHERE term_id = ? ORDER BY seq
        "#,
    )
    .bind(term_id)
    .fetch_all(db)
    .await?;

    rows.into_iter()
        .map(|row| -> Result<WebDocument, NerError> {
            let verdict = if row.processed != 0 {
                Some(TextVerdict {
                    loc: indicator(row.loc)?,
                    org: indicator(row.org)?,
                    per: indicator(row.per)?,
                    translation_failed: row.translation_error.unwrap_or(0) != 0,
                })
            } else {
                None
            };
            Ok(WebDocument {
                id: row.id,
                seq: row.seq,
                sample: DocumentSample {
                    url: row.url,
                    title: row.title,
                    snippet: row.snippet,
                },
                verdict,
            })
        })
        .collect()
}

/// Images of a term entry in rank order
pub async fn list_images(db: &Pool<Sqlite>, term_id: i64) -> Result<Vec<WebImage>, NerError> {
    let rows: Vec<ImageRow> = sqlx::query_as(
        r#"
        SELECT id, seq, url, local_path, processed, face, logo, places
        FROM web_images WHERE term_id = ? ORDER BY seq
        "#,
    )
    .bind(term_id)
    .fetch_all(db)
    .await?;

    rows.into_iter()
        .map(|row| -> Result<WebImage, NerError> {
            let verdict = if row.processed != 0 {
                let places: Vec<Indicator> = match &row.places {
                    Some(json) => serde_json::from_str(json)?,
                    None => Vec::new(),
                };
                Some(ImageVerdict {
                    face: indicator(row.face)?,
                    logo: indicator(row.logo)?,
                    places,
                })
            } else {
                None
            };
            Ok(WebImage {
                id: row.id,
                seq: row.seq,
                sample: ImageSample {
                    url: row.url,
                    local_path: row.local_path.map(PathBuf::from),
                },
                verdict,
            })
        })
        .collect()
}

// ============================================================================
// Indicator persistence (once per result)
// ============================================================================

/// Store a document verdict; no-op when the row is already processed
pub async fn mark_document_processed(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    document_id: i64,
    verdict: &TextVerdict,
) -> Result<bool, NerError> {
    let result = sqlx::query(
        r#"
        UPDATE web_documents
        SET processed = 1, loc = ?, org = ?, per = ?, translation_error = ?
        WHERE id = ? AND processed = 0
        "#,
    )
    .bind(indicator_value(verdict.loc))
    .bind(indicator_value(verdict.org))
    .bind(indicator_value(verdict.per))
    .bind(verdict.translation_failed as i64)
    .bind(document_id)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Store an image verdict; no-op when the row is already processed
pub async fn mark_image_processed(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    image_id: i64,
    verdict: &ImageVerdict,
) -> Result<bool, NerError> {
    let result = sqlx::query(
        r#"
        UPDATE web_images
        SET processed = 1, face = ?, logo = ?, places = ?
        WHERE id = ? AND processed = 0
        "#,
    )
    .bind(indicator_value(verdict.face))
    .bind(indicator_value(verdict.logo))
    .bind(serde_json::to_string(&verdict.places)?)
    .bind(image_id)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected() == 1)
}
