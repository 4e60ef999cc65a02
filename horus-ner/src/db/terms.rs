//! Term cache entries
//!
//! One row per `(term, provider_id, feature_kind, features_version)`. Rows are
//! created lazily on the first cache miss and never deleted.

use chrono::{SecondsFormat, Utc};
use sqlx::{Pool, Sqlite};

use crate::error::NerError;

/// Result set a term entry describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    Document,
    Image,
}

impl FeatureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FeatureKind::Document => "document",
            FeatureKind::Image => "image",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "document" => Some(FeatureKind::Document),
            "image" => Some(FeatureKind::Image),
            _ => None,
        }
    }
}

/// Cache key components shared by every lookup in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermCacheKey {
    pub provider_id: i64,
    pub document_features_version: i64,
    pub image_features_version: i64,
}

/// Cached entry row id and kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermEntry {
    pub id: i64,
    pub kind: FeatureKind,
}

/// New entry to insert
#[derive(Debug, Clone)]
pub struct NewTermEntry<'a> {
    pub term: &'a str,
    pub provider_id: i64,
    pub kind: FeatureKind,
    pub features_version: i64,
    pub results_requested: usize,
    pub results_returned: usize,
    pub query_metadata: &'a str,
}

/// All entries for `term` under the given provider and feature versions
pub async fn find_entries(
    db: &Pool<Sqlite>,
    term: &str,
    key: &TermCacheKey,
) -> Result<Vec<TermEntry>, NerError> {
    let rows: Vec<(i64, String)> = sqlx::query_as(
        r#"
        SELECT id, feature_kind FROM terms
        WHERE term = ? AND provider_id = ?
          AND ((feature_kind = 'document' AND features_version = ?)
            OR (feature_kind = 'image' AND features_version = ?))
        ORDER BY id
        "#,
    )
    .bind(term)
    .bind(key.provider_id)
    .bind(key.document_features_version)
    .bind(key.image_features_version)
    .fetch_all(db)
    .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(id, kind)| FeatureKind::parse(&kind).map(|kind| TermEntry { id, kind }))
        .collect())
}

/// Insert an entry inside the caller's transaction
pub async fn insert_entry(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    entry: &NewTermEntry<'_>,
) -> Result<i64, NerError> {
    let result = sqlx::query(
        r#"
        INSERT INTO terms (
            term, provider_id, feature_kind, features_version,
            results_requested, results_returned, query_metadata, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(entry.term)
    .bind(entry.provider_id)
    .bind(entry.kind.as_str())
    .bind(entry.features_version)
    .bind(entry.results_requested as i64)
    .bind(entry.results_returned as i64)
    .bind(entry.query_metadata)
    .bind(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true))
    .execute(&mut **tx)
    .await?;

    Ok(result.last_insert_rowid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> Pool<Sqlite> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        horus_common::db::create_schema(&pool).await.unwrap();
        pool
    }

    const KEY: TermCacheKey = TermCacheKey {
        provider_id: 1,
        document_features_version: 1,
        image_features_version: 1,
    };

    fn entry(term: &str, kind: FeatureKind, version: i64) -> NewTermEntry<'_> {
        NewTermEntry {
            term,
            provider_id: 1,
            kind,
            features_version: version,
            results_requested: 10,
            results_returned: 3,
            query_metadata: "{}",
        }
    }

    #[tokio::test]
    async fn test_find_entries_filters_by_version() {
        let pool = setup_test_db().await;
        let mut tx = pool.begin().await.unwrap();
        insert_entry(&mut tx, &entry("Paris", FeatureKind::Document, 1)).await.unwrap();
        insert_entry(&mut tx, &entry("Paris", FeatureKind::Image, 1)).await.unwrap();
        insert_entry(&mut tx, &entry("Paris", FeatureKind::Image, 2)).await.unwrap();
        tx.commit().await.unwrap();

        let found = find_entries(&pool, "Paris", &KEY).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].kind, FeatureKind::Document);
        assert_eq!(found[1].kind, FeatureKind::Image);
    }

    #[tokio::test]
    async fn test_rolled_back_entry_not_visible() {
        let pool = setup_test_db().await;
        {
            let mut tx = pool.begin().await.unwrap();
            insert_entry(&mut tx, &entry("Lyon", FeatureKind::Document, 1)).await.unwrap();
            // dropped without commit
        }

        let found = find_entries(&pool, "Lyon", &KEY).await.unwrap();
        assert!(found.is_empty());
    }
}
