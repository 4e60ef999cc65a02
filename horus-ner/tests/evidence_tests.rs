//! Evidence cache and aggregation against a file-backed database

mod helpers;

use std::sync::Arc;

use helpers::{
    create_test_db, location_image, logo_image, neutral_image, MockImageClassifier,
    MockImageStore, MockSearchProvider, MockTextClassifier, MockWeb, TermScenario,
};
use horus_ner::evidence::{EvidenceAggregator, EvidenceCache};
use horus_ner::types::{EntityClass, Indicator, TextVerdict};

fn org_document() -> TextVerdict {
    TextVerdict {
        loc: Indicator::Negative,
        org: Indicator::Positive,
        per: Indicator::Negative,
        translation_failed: false,
    }
}

fn paris() -> TermScenario {
    let mut images = vec![location_image(6); 7];
    images.push(logo_image());
    images.push(neutral_image());
    images.push(neutral_image());
    TermScenario {
        images,
        documents: Vec::new(),
    }
}

#[tokio::test]
async fn test_acme_corp_fetched_once() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let web = Arc::new(MockWeb::new().with_term(
        "Acme Corp",
        TermScenario {
            images: vec![logo_image(), logo_image()],
            documents: vec![org_document(); 3],
        },
    ));
    let provider = Arc::new(MockSearchProvider::new(web));
    let store = Arc::new(MockImageStore::default());
    let cache = EvidenceCache::new(pool.clone(), provider.clone(), store.clone(), 10, 1, 1);

    let first = cache.resolve_or_fetch("Acme Corp").await.unwrap().unwrap();
    assert_eq!(provider.document_calls(), 1);
    assert_eq!(provider.image_calls(), 1);

    let second = cache.resolve_or_fetch("Acme Corp").await.unwrap().unwrap();
    assert_eq!(first, second);
    assert_eq!(provider.document_calls(), 1);
    assert_eq!(provider.image_calls(), 1);

    let documents: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM web_documents WHERE term_id = ?")
        .bind(first.document)
        .fetch_one(&pool)
        .await
        .unwrap();
    let images: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM web_images WHERE term_id = ?")
        .bind(first.image)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(documents, 3);
    assert_eq!(images, 2);
    assert_eq!(store.stored.load(std::sync::atomic::Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_cache_survives_new_run() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let web = Arc::new(MockWeb::new().with_term("Paris", paris()));
    let provider = Arc::new(MockSearchProvider::new(web));

    let first_run = EvidenceCache::new(
        pool.clone(),
        provider.clone(),
        Arc::new(MockImageStore::default()),
        10,
        1,
        1,
    );
    let ids = first_run.resolve_or_fetch("Paris").await.unwrap();

    let second_run = EvidenceCache::new(
        pool.clone(),
        provider.clone(),
        Arc::new(MockImageStore::default()),
        10,
        1,
        1,
    );
    assert_eq!(second_run.resolve_or_fetch("Paris").await.unwrap(), ids);
    assert_eq!(provider.image_calls(), 1);
}

#[tokio::test]
async fn test_new_features_version_refetches() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let web = Arc::new(MockWeb::new().with_term("Paris", paris()));
    let provider = Arc::new(MockSearchProvider::new(web));
    let store = Arc::new(MockImageStore::default());

    let v1 = EvidenceCache::new(pool.clone(), provider.clone(), store.clone(), 10, 1, 1);
    let v2 = EvidenceCache::new(pool.clone(), provider.clone(), store, 10, 1, 2);

    let a = v1.resolve_or_fetch("Paris").await.unwrap().unwrap();
    let b = v2.resolve_or_fetch("Paris").await.unwrap().unwrap();

    assert_ne!(a.image, b.image);
    assert_eq!(provider.image_calls(), 2);
}

#[tokio::test]
async fn test_concurrent_resolves_query_once() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let web = Arc::new(MockWeb::new().with_term("Paris", paris()));
    let provider = Arc::new(MockSearchProvider::new(web));
    let cache = Arc::new(EvidenceCache::new(
        pool,
        provider.clone(),
        Arc::new(MockImageStore::default()),
        10,
        1,
        1,
    ));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.resolve_or_fetch("Paris").await.unwrap() })
        })
        .collect();

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }

    assert!(results.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(provider.document_calls(), 1);
}

#[tokio::test]
async fn test_paris_image_evidence() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let web = Arc::new(MockWeb::new().with_term("Paris", paris()));
    let provider = Arc::new(MockSearchProvider::new(web.clone()));
    let cache = EvidenceCache::new(
        pool.clone(),
        provider,
        Arc::new(MockImageStore::default()),
        10,
        1,
        1,
    );
    let image_classifier = Arc::new(MockImageClassifier::new(web.clone()));
    let aggregator = EvidenceAggregator::new(
        pool,
        image_classifier.clone(),
        Arc::new(MockTextClassifier::new(web)),
        10,
        5,
    );

    let ids = cache.resolve_or_fetch("Paris").await.unwrap().unwrap();
    let (image, text) = aggregator.aggregate("Paris", ids).await.unwrap();

    assert_eq!((image.loc, image.org, image.per), (7, 1, 0));
    assert_eq!(image.distance, 6);
    assert_eq!(image.polarity, 7 * (6 - 4));
    assert_eq!(image.total, 10);
    assert_eq!(image.predicted, EntityClass::Loc);
    assert_eq!(text.total, 0);
    assert_eq!(text.predicted, EntityClass::O);

    // Stored verdicts are reused
    let (again, _) = aggregator.aggregate("Paris", ids).await.unwrap();
    assert_eq!(again, image);
    assert_eq!(
        image_classifier.calls.load(std::sync::atomic::Ordering::SeqCst),
        10
    );
}

#[tokio::test]
async fn test_result_count_caps_aggregation() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let web = Arc::new(MockWeb::new().with_term("Paris", paris()));
    let provider = Arc::new(MockSearchProvider::new(web.clone()));
    let cache = EvidenceCache::new(
        pool.clone(),
        provider,
        Arc::new(MockImageStore::default()),
        10,
        1,
        1,
    );
    let ids = cache.resolve_or_fetch("Paris").await.unwrap().unwrap();

    let aggregator = EvidenceAggregator::new(
        pool,
        Arc::new(MockImageClassifier::new(web.clone())),
        Arc::new(MockTextClassifier::new(web)),
        3,
        5,
    );
    let (image, _) = aggregator.aggregate("Paris", ids).await.unwrap();

    assert_eq!(image.total, 3);
    assert_eq!(image.results_returned, 10);
    assert_eq!(image.loc, 3);
}

#[tokio::test]
async fn test_failed_fetch_leaves_no_entries() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let web = Arc::new(MockWeb::new().with_failing_term("Atlantis"));
    let provider = Arc::new(MockSearchProvider::new(web));
    let cache = EvidenceCache::new(
        pool.clone(),
        provider,
        Arc::new(MockImageStore::default()),
        10,
        1,
        1,
    );

    assert_eq!(cache.resolve_or_fetch("Atlantis").await.unwrap(), None);

    let entries: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM terms")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(entries, 0);
}
