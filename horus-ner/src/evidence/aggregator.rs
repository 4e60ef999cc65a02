//! Evidence aggregation
//!
//! Reduces the classifier verdicts of a term's images and documents into
//! per-channel class counts. Results without a stored verdict are scored
//! through the classifier collaborators and the verdicts persisted once.

use sqlx::{Pool, Sqlite};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::db::web_results::{
    list_documents, list_images, mark_document_processed, mark_image_processed,
};
use crate::error::NerError;
use crate::matrix::{ImageEvidence, TextEvidence};
use crate::types::{
    EntityClass, ImageClassifier, ImageVerdict, TextClassifier, TextVerdict,
};

use super::TermEvidenceIds;

/// Class order of count vectors
const CLASS_ORDER: [EntityClass; 3] = [EntityClass::Loc, EntityClass::Org, EntityClass::Per];

// ============================================================================
// Pure reductions
// ============================================================================

/// Gap between the two largest of `[loc, org, per]`
pub fn dominance_distance(counts: [i64; 3]) -> i64 {
    let mut sorted = counts;
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    sorted[0] - sorted[1]
}

/// Class with the most votes; ties resolve LOC > ORG > PER
///
/// A channel with no results predicts `O`.
pub fn majority_class(counts: [i64; 3], has_results: bool) -> EntityClass {
    if !has_results {
        return EntityClass::O;
    }
    let mut best = 0;
    for i in 1..counts.len() {
        if counts[i] > counts[best] {
            best = i;
        }
    }
    CLASS_ORDER[best]
}

/// Image channel summary
///
/// `total` is the number of images considered, `results_returned` what the
/// provider returned. An image counts as a location when at least
/// `location_vote_threshold` place sub-categories are positive.
pub fn summarize_images(
    verdicts: &[ImageVerdict],
    total: usize,
    results_returned: usize,
    location_vote_threshold: usize,
) -> ImageEvidence {
    let mut evidence = ImageEvidence {
        total: total as i64,
        results_returned: results_returned as i64,
        ..Default::default()
    };

    for verdict in verdicts {
        if verdict.face.is_positive() {
            evidence.per += 1;
        }
        if verdict.logo.is_positive() {
            evidence.org += 1;
        }
        let positives = verdict.places.iter().filter(|p| p.is_positive()).count();
        let negatives = verdict.places.iter().filter(|p| p.is_negative()).count();
        if positives >= location_vote_threshold {
            evidence.loc += 1;
        }
        evidence.polarity += positives as i64 - negatives as i64;
    }

    let counts = [evidence.loc, evidence.org, evidence.per];
    evidence.distance = dominance_distance(counts);
    evidence.predicted = majority_class(counts, total > 0);
    evidence
}

/// Text channel summary
pub fn summarize_documents(
    verdicts: &[TextVerdict],
    total: usize,
    results_returned: usize,
) -> TextEvidence {
    let mut evidence = TextEvidence {
        total: total as i64,
        results_returned: results_returned as i64,
        ..Default::default()
    };

    for verdict in verdicts {
        if verdict.loc.is_positive() {
            evidence.loc += 1;
        }
        if verdict.org.is_positive() {
            evidence.org += 1;
        }
        if verdict.per.is_positive() {
            evidence.per += 1;
        }
        if verdict.translation_failed {
            evidence.translation_errors += 1;
        }
    }

    let counts = [evidence.loc, evidence.org, evidence.per];
    evidence.distance = dominance_distance(counts);
    evidence.predicted = majority_class(counts, total > 0);
    evidence
}

// ============================================================================
// Aggregator
// ============================================================================

pub struct EvidenceAggregator {
    db: Pool<Sqlite>,
    image_classifier: Arc<dyn ImageClassifier>,
    text_classifier: Arc<dyn TextClassifier>,
    result_count: usize,
    location_vote_threshold: usize,
}

impl EvidenceAggregator {
    pub fn new(
        db: Pool<Sqlite>,
        image_classifier: Arc<dyn ImageClassifier>,
        text_classifier: Arc<dyn TextClassifier>,
        result_count: usize,
        location_vote_threshold: usize,
    ) -> Self {
        Self {
            db,
            image_classifier,
            text_classifier,
            result_count,
            location_vote_threshold,
        }
    }

    /// Aggregate both channels of a resolved term
    ///
    /// Newly scored verdicts are committed in one transaction. A result whose
    /// classification fails is left unprocessed and excluded from the counts.
    pub async fn aggregate(
        &self,
        term: &str,
        ids: TermEvidenceIds,
    ) -> Result<(ImageEvidence, TextEvidence), NerError> {
        let images = list_images(&self.db, ids.image).await?;
        let documents = list_documents(&self.db, ids.document).await?;

        let image_limit = images.len().min(self.result_count);
        let document_limit = documents.len().min(self.result_count);

        let mut image_verdicts = Vec::with_capacity(image_limit);
        let mut new_image_verdicts = Vec::new();
        for image in images.iter().take(image_limit) {
            match &image.verdict {
                Some(verdict) => image_verdicts.push(verdict.clone()),
                None => match self.image_classifier.classify(&image.sample).await {
                    Ok(verdict) => {
                        new_image_verdicts.push((image.id, verdict.clone()));
                        image_verdicts.push(verdict);
                    }
                    Err(e) => {
                        warn!(term, seq = image.seq, url = %image.sample.url, error = %e, "Image classification failed");
                    }
                },
            }
        }

        let mut document_verdicts = Vec::with_capacity(document_limit);
        let mut new_document_verdicts = Vec::new();
        for document in documents.iter().take(document_limit) {
            match &document.verdict {
                Some(verdict) => document_verdicts.push(verdict.clone()),
                None => match self.text_classifier.classify(&document.sample).await {
                    Ok(verdict) => {
                        new_document_verdicts.push((document.id, verdict.clone()));
                        document_verdicts.push(verdict);
                    }
                    Err(e) => {
                        warn!(term, seq = document.seq, url = %document.sample.url, error = %e, "Text classification failed");
                    }
                },
            }
        }

        if !new_image_verdicts.is_empty() || !new_document_verdicts.is_empty() {
            let mut tx = self.db.begin().await?;
            for (id, verdict) in &new_image_verdicts {
                mark_image_processed(&mut tx, *id, verdict).await?;
            }
            for (id, verdict) in &new_document_verdicts {
                mark_document_processed(&mut tx, *id, verdict).await?;
            }
            tx.commit().await?;
        }

        let image = summarize_images(
            &image_verdicts,
            image_limit,
            images.len(),
            self.location_vote_threshold,
        );
        let text = summarize_documents(&document_verdicts, document_limit, documents.len());

        debug!(
            term,
            loc = image.loc,
            org = image.org,
            per = image.per,
            dist = image.distance,
            polarity = image.polarity,
            "Image channel"
        );
        debug!(
            term,
            loc = text.loc,
            org = text.org,
            per = text.per,
            dist = text.distance,
            translation_errors = text.translation_errors,
            "Text channel"
        );

        Ok((image, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Indicator;

    fn image(face: bool, logo: bool, places_pos: usize, places_neg: usize) -> ImageVerdict {
        let mut places = vec![Indicator::Positive; places_pos];
        places.extend(vec![Indicator::Negative; places_neg]);
        places.resize(10, Indicator::Neutral);
        ImageVerdict {
            face: if face { Indicator::Positive } else { Indicator::Neutral },
            logo: if logo { Indicator::Positive } else { Indicator::Neutral },
            places,
        }
    }

    #[test]
    fn test_dominance_distance() {
        assert_eq!(dominance_distance([7, 1, 0]), 6);
        assert_eq!(dominance_distance([0, 3, 3]), 0);
        assert_eq!(dominance_distance([0, 0, 0]), 0);
        assert_eq!(dominance_distance([2, 9, 4]), 5);
    }

    #[test]
    fn test_majority_ties_prefer_location() {
        assert_eq!(majority_class([2, 2, 2], true), EntityClass::Loc);
        assert_eq!(majority_class([0, 3, 3], true), EntityClass::Org);
        assert_eq!(majority_class([0, 1, 3], true), EntityClass::Per);
        assert_eq!(majority_class([5, 0, 0], false), EntityClass::O);
    }

    #[test]
    fn test_summarize_images_location_threshold_and_polarity() {
        let verdicts = vec![
            image(false, false, 6, 1),
            image(true, false, 4, 3),
            image(false, true, 5, 0),
        ];

        let evidence = summarize_images(&verdicts, 3, 8, 5);

        assert_eq!(evidence.loc, 2);
        assert_eq!(evidence.org, 1);
        assert_eq!(evidence.per, 1);
        assert_eq!(evidence.distance, 1);
        assert_eq!(evidence.polarity, (6 - 1) + (4 - 3) + 5);
        assert_eq!(evidence.total, 3);
        assert_eq!(evidence.results_returned, 8);
        assert_eq!(evidence.predicted, EntityClass::Loc);
    }

    #[test]
    fn test_summarize_empty_channel_predicts_o() {
        let evidence = summarize_documents(&[], 0, 0);
        assert_eq!(evidence.predicted, EntityClass::O);
        assert_eq!(evidence.distance, 0);
    }

    #[test]
    fn test_summarize_documents_counts_positive_indicators() {
        let verdict = |loc, org, per, failed| TextVerdict {
            loc,
            org,
            per,
            translation_failed: failed,
        };
        let verdicts = vec![
            verdict(Indicator::Positive, Indicator::Negative, Indicator::Negative, false),
            verdict(Indicator::Negative, Indicator::Positive, Indicator::Negative, true),
            verdict(Indicator::Negative, Indicator::Positive, Indicator::Negative, false),
        ];

        let evidence = summarize_documents(&verdicts, 3, 3);

        assert_eq!((evidence.loc, evidence.org, evidence.per), (1, 2, 0));
        assert_eq!(evidence.translation_errors, 1);
        assert_eq!(evidence.distance, 1);
        assert_eq!(evidence.predicted, EntityClass::Org);
    }
}
