//! Term evidence cache
//!
//! Resolves a term to its (document, image) term entries, querying the search
//! provider at most once per term. A miss fetches both result sets and
//! downloads the images, then persists both entries with every result in a
//! single transaction.

use sqlx::{Pool, Sqlite};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::db::terms::{find_entries, insert_entry, FeatureKind, NewTermEntry, TermCacheKey};
use crate::db::web_results::{insert_document, insert_image};
use crate::error::NerError;
use crate::types::{DocumentHit, ImageHit, ImageStore, SearchProvider, SearchResponse};

/// Term entry ids for both channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermEvidenceIds {
    pub document: i64,
    pub image: i64,
}

pub struct EvidenceCache {
    db: Pool<Sqlite>,
    provider: Arc<dyn SearchProvider>,
    image_store: Arc<dyn ImageStore>,
    key: TermCacheKey,
    result_count: usize,
    /// Per-term locks serializing concurrent resolves of the same term
    term_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    /// Terms whose fetch failed in this run; not re-queried
    failed_terms: Mutex<HashSet<String>>,
}

impl EvidenceCache {
    pub fn new(
        db: Pool<Sqlite>,
        provider: Arc<dyn SearchProvider>,
        image_store: Arc<dyn ImageStore>,
        result_count: usize,
        document_features_version: i64,
        image_features_version: i64,
    ) -> Self {
        let key = TermCacheKey {
            provider_id: provider.provider_id(),
            document_features_version,
            image_features_version,
        };
        Self {
            db,
            provider,
            image_store,
            key,
            result_count,
            term_locks: Mutex::new(HashMap::new()),
            failed_terms: Mutex::new(HashSet::new()),
        }
    }

    async fn term_lock(&self, term: &str) -> Arc<Mutex<()>> {
        let mut locks = self.term_locks.lock().await;
        locks
            .entry(term.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Cached entry ids for `term`, if both exist
    ///
    /// Any multiplicity other than 0 or exactly one entry per kind is a
    /// consistency error.
    pub async fn lookup(&self, term: &str) -> Result<Option<TermEvidenceIds>, NerError> {
        let entries = find_entries(&self.db, term, &self.key).await?;

        match entries.as_slice() {
            [] => Ok(None),
            [a, b] => {
                let document = [a, b].into_iter().find(|e| e.kind == FeatureKind::Document);
                let image = [a, b].into_iter().find(|e| e.kind == FeatureKind::Image);
                match (document, image) {
                    (Some(document), Some(image)) => Ok(Some(TermEvidenceIds {
                        document: document.id,
                        image: image.id,
                    })),
                    _ => Err(NerError::CacheConsistency {
                        term: term.to_string(),
                        found: 2,
                    }),
                }
            }
            other => Err(NerError::CacheConsistency {
                term: term.to_string(),
                found: other.len(),
            }),
        }
    }

    /// Resolve `term`, fetching and caching on a miss
    ///
    /// **Returns:** None when the fetch failed (empty evidence)
    pub async fn resolve_or_fetch(&self, term: &str) -> Result<Option<TermEvidenceIds>, NerError> {
        let lock = self.term_lock(term).await;
        let _guard = lock.lock().await;

        if let Some(ids) = self.lookup(term).await? {
            debug!(term, document = ids.document, image = ids.image, "Term cache hit");
            return Ok(Some(ids));
        }

        if self.failed_terms.lock().await.contains(term) {
            debug!(term, "Skipping term whose fetch already failed in this run");
            return Ok(None);
        }

        info!(term, "Term not cached, querying search provider");

        let fetched = self.fetch(term).await;
        let (documents, images) = match fetched {
            Ok(results) => results,
            Err(e) => {
                warn!(term, error = %e, "Evidence fetch failed, continuing with empty evidence");
                self.failed_terms.lock().await.insert(term.to_string());
                return Ok(None);
            }
        };

        let ids = self.persist(term, &documents, &images).await?;
        Ok(Some(ids))
    }

    async fn fetch(
        &self,
        term: &str,
    ) -> Result<(SearchResponse<DocumentHit>, SearchResponse<ImageHit>), NerError> {
        let documents = self.provider.search_documents(term, self.result_count).await?;
        let images = self.provider.search_images(term, self.result_count).await?;
        Ok((documents, images))
    }

    /// Download every image before the term transaction opens
    ///
    /// Failed downloads are `None` and persist without a local path.
    async fn download_images(
        &self,
        term: &str,
        images: &SearchResponse<ImageHit>,
    ) -> Vec<Option<Vec<u8>>> {
        let mut downloads = Vec::with_capacity(images.results.len());
        for (i, hit) in images.results.iter().enumerate() {
            match self.image_store.download(hit).await {
                Ok(bytes) => downloads.push(Some(bytes)),
                Err(e) => {
                    warn!(
                        term,
                        seq = i + 1,
                        url = %hit.content_url,
                        error = %e,
                        "Image download failed"
                    );
                    downloads.push(None);
                }
            }
        }
        downloads
    }

    async fn persist(
        &self,
        term: &str,
        documents: &SearchResponse<DocumentHit>,
        images: &SearchResponse<ImageHit>,
    ) -> Result<TermEvidenceIds, NerError> {
        let downloads = self.download_images(term, images).await;

        let mut tx = self.db.begin().await?;

        let document_id = insert_entry(
            &mut tx,
            &NewTermEntry {
                term,
                provider_id: self.key.provider_id,
                kind: FeatureKind::Document,
                features_version: self.key.document_features_version,
                results_requested: self.result_count,
                results_returned: documents.results.len(),
                query_metadata: &documents.metadata,
            },
        )
        .await?;

        for (i, hit) in documents.results.iter().enumerate() {
            insert_document(&mut tx, document_id, i + 1, hit).await?;
        }

        let image_id = insert_entry(
            &mut tx,
            &NewTermEntry {
                term,
                provider_id: self.key.provider_id,
                kind: FeatureKind::Image,
                features_version: self.key.image_features_version,
                results_requested: self.result_count,
                results_returned: images.results.len(),
                query_metadata: &images.metadata,
            },
        )
        .await?;

        for (i, (hit, bytes)) in images.results.iter().zip(&downloads).enumerate() {
            let seq = i + 1;
            let local_path = match bytes {
                Some(bytes) => match self.image_store.save(image_id, seq, hit, bytes).await {
                    Ok(path) => Some(path),
                    Err(e) => {
                        warn!(term, seq, error = %e, "Image could not be written to the cache");
                        None
                    }
                },
                None => None,
            };
            insert_image(&mut tx, image_id, seq, hit, local_path.as_ref()).await?;
        }

        tx.commit().await?;

        info!(
            term,
            documents = documents.results.len(),
            images = images.results.len(),
            "Term evidence cached"
        );

        Ok(TermEvidenceIds {
            document: document_id,
            image: image_id,
        })
    }
}
