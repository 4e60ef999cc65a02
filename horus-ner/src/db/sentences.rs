//! Sentence cache
//!
//! Stores processed sentence bundles keyed by `(corpus, sentence)`. Annotation
//! arrays are persisted as JSON text columns.

use sqlx::{Pool, Sqlite};
use std::collections::BTreeMap;

use crate::error::NerError;
use crate::types::{AnnotationLayer, AnnotatorKind, SentenceBundle, Tristate};

#[derive(sqlx::FromRow)]
struct SentenceRow {
    id: i64,
    has_entity: i64,
    gold_tokens: String,
    gold_ner: String,
}

#[derive(sqlx::FromRow)]
struct AnnotationRow {
    annotator: String,
    tokens: String,
    pos: String,
    pos_universal: String,
    ner: String,
    compounds: String,
    tokenization_matches_reference: i64,
}

/// Look up a cached bundle
///
/// **Returns:** (sentence row id, bundle) on hit
pub async fn find_bundle(
    db: &Pool<Sqlite>,
    corpus: &str,
    sentence: &str,
) -> Result<Option<(i64, SentenceBundle)>, NerError> {
    let row: Option<SentenceRow> = sqlx::query_as(
        "SELECT id, has_entity, gold_tokens, gold_ner FROM sentences WHERE corpus = ? AND sentence = ?",
    )
    .bind(corpus)
    .bind(sentence)
    .fetch_optional(db)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let annotations: Vec<AnnotationRow> = sqlx::query_as(
        r#"
        SELECT annotator, tokens, pos, pos_universal, ner, compounds, tokenization_matches_reference
        FROM sentence_annotations
        WHERE sentence_id = ?
        "#,
    )
    .bind(row.id)
    .fetch_all(db)
    .await?;

    let mut layers = BTreeMap::new();
    for annotation in annotations {
        let kind: AnnotatorKind = annotation.annotator.parse()?;
        layers.insert(
            kind,
            AnnotationLayer {
                tokens: serde_json::from_str(&annotation.tokens)?,
                pos: serde_json::from_str(&annotation.pos)?,
                pos_universal: serde_json::from_str(&annotation.pos_universal)?,
                ner: serde_json::from_str(&annotation.ner)?,
                compounds: serde_json::from_str(&annotation.compounds)?,
                tokenization_matches_reference: annotation.tokenization_matches_reference != 0,
            },
        );
    }

    let bundle = SentenceBundle {
        has_entity: Tristate::from_i64(row.has_entity),
        text: sentence.to_string(),
        gold_tokens: serde_json::from_str(&row.gold_tokens)?,
        gold_ner: serde_json::from_str(&row.gold_ner)?,
        layers,
    };

    Ok(Some((row.id, bundle)))
}

/// Persist a new bundle (sentence row plus every layer) in one transaction
pub async fn save_bundle(
    db: &Pool<Sqlite>,
    corpus: &str,
    bundle: &SentenceBundle,
) -> Result<i64, NerError> {
    let mut tx = db.begin().await?;

    let result = sqlx::query(
        r#"
        INSERT INTO sentences (corpus, sentence, has_entity, gold_tokens, gold_ner)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(corpus)
    .bind(&bundle.text)
    .bind(bundle.has_entity.as_i64())
    .bind(serde_json::to_string(&bundle.gold_tokens)?)
    .bind(serde_json::to_string(&bundle.gold_ner)?)
    .execute(&mut *tx)
    .await?;

    let sentence_id = result.last_insert_rowid();

    for (kind, layer) in &bundle.layers {
        save_layer(&mut tx, sentence_id, *kind, layer).await?;
    }

    tx.commit().await?;

    tracing::debug!(sentence_id, corpus, layers = bundle.layers.len(), "Cached sentence bundle");

    Ok(sentence_id)
}

/// Add a layer to an existing sentence (annotator registered after caching)
pub async fn add_layer(
    db: &Pool<Sqlite>,
    sentence_id: i64,
    kind: AnnotatorKind,
    layer: &AnnotationLayer,
) -> Result<(), NerError> {
    let mut tx = db.begin().await?;
    save_layer(&mut tx, sentence_id, kind, layer).await?;
    tx.commit().await?;
    Ok(())
}

async fn save_layer(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    sentence_id: i64,
    kind: AnnotatorKind,
    layer: &AnnotationLayer,
) -> Result<(), NerError> {
    sqlx::query(
        r#"
        INSERT INTO sentence_annotations (
            sentence_id, annotator, tokens, pos, pos_universal, ner, compounds,
            tokenization_matches_reference
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(sentence_id)
    .bind(kind.as_str())
    .bind(serde_json::to_string(&layer.tokens)?)
    .bind(serde_json::to_string(&layer.pos)?)
    .bind(serde_json::to_string(&layer.pos_universal)?)
    .bind(serde_json::to_string(&layer.ner)?)
    .bind(serde_json::to_string(&layer.compounds)?)
    .bind(layer.tokenization_matches_reference as i64)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Compound;
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

    fn sample_bundle() -> SentenceBundle {
        let mut layers = BTreeMap::new();
        layers.insert(
            AnnotatorKind::Stanford,
            AnnotationLayer {
                tokens: vec!["New".into(), "York".into(), "City".into()],
                pos: vec!["NNP".into(), "NNP".into(), "NNP".into()],
                pos_universal: vec!["PROPN".into(), "PROPN".into(), "PROPN".into()],
                ner: vec!["LOCATION".into(), "LOCATION".into(), "LOCATION".into()],
                compounds: vec![Compound {
                    start: 1,
                    text: "New York City".into(),
                    size: 3,
                }],
                tokenization_matches_reference: true,
            },
        );
        SentenceBundle {
            has_entity: Tristate::Positive,
            text: "New York City".into(),
            gold_tokens: vec!["New".into(), "York".into(), "City".into()],
            gold_ner: vec!["B-geo-loc".into(), "I-geo-loc".into(), "I-geo-loc".into()],
            layers,
        }
    }

    #[tokio::test]
    async fn test_miss_returns_none() {
        let pool = setup_test_db().await;
        let found = find_bundle(&pool, "wnut", "nothing here").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_save_then_find_returns_identical_bundle() {
        let pool = setup_test_db().await;
        let bundle = sample_bundle();

        let id = save_bundle(&pool, "wnut", &bundle).await.unwrap();
        let (found_id, found) = find_bundle(&pool, "wnut", "New York City")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(found_id, id);
        assert_eq!(found, bundle);
    }

    #[tokio::test]
    async fn test_cache_is_keyed_by_corpus() {
        let pool = setup_test_db().await;
        save_bundle(&pool, "wnut", &sample_bundle()).await.unwrap();

        let other = find_bundle(&pool, "conll", "New York City").await.unwrap();
        assert!(other.is_none());
    }
}
