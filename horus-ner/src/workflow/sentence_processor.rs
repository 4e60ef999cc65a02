//! Sentence processing
//!
//! Produces the annotation bundle of one sentence: cached bundles are reused,
//! missing annotator layers are added, and new sentences are annotated by
//! every registered annotator and persisted in one transaction.

use sqlx::{Pool, Sqlite};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::db::sentences::{add_layer, find_bundle, save_bundle};
use crate::error::NerError;
use crate::linguistics::{extract_compounds, SentenceInput};
use crate::tags::{cmu_to_ptb, cmu_to_universal, ptb_to_universal};
use crate::types::{AnnotationLayer, Annotator, AnnotatorKind, AnnotatorOutput, SentenceBundle};

/// Universal tag used when a POS tag has no mapping
const UNMAPPED_UNIVERSAL: &str = "X";

/// Turn raw annotator output into a layer
///
/// CMU Twitter tags are mapped to Penn Treebank; universal tags are derived
/// when the annotator did not supply them.
pub fn build_layer(kind: AnnotatorKind, output: AnnotatorOutput, gold_tokens: &[String]) -> AnnotationLayer {
    let (pos, pos_universal) = if kind == AnnotatorKind::TweetNlp {
        let ptb = output
            .pos
            .iter()
            .map(|t| cmu_to_ptb(t).unwrap_or(t.as_str()).to_string())
            .collect();
        let universal = output
            .pos
            .iter()
            .map(|t| cmu_to_universal(t).unwrap_or(UNMAPPED_UNIVERSAL).to_string())
            .collect();
        (ptb, universal)
    } else if output.pos_universal.len() == output.pos.len() {
        (output.pos, output.pos_universal)
    } else {
        let universal = output
            .pos
            .iter()
            .map(|t| ptb_to_universal(t).unwrap_or(UNMAPPED_UNIVERSAL).to_string())
            .collect();
        (output.pos, universal)
    };

    let compounds = extract_compounds(&output.tokens, &pos);
    let tokenization_matches_reference = output.tokens.len() == gold_tokens.len();

    AnnotationLayer {
        tokens: output.tokens,
        pos,
        pos_universal,
        ner: output.ner,
        compounds,
        tokenization_matches_reference,
    }
}

pub struct SentenceProcessor {
    db: Pool<Sqlite>,
    annotators: Vec<Arc<dyn Annotator>>,
}

impl SentenceProcessor {
    pub fn new(db: Pool<Sqlite>, annotators: Vec<Arc<dyn Annotator>>) -> Self {
        Self { db, annotators }
    }

    async fn annotate(
        &self,
        annotator: &dyn Annotator,
        text: &str,
        gold_tokens: &[String],
    ) -> Result<AnnotationLayer, NerError> {
        let output = annotator.annotate(text).await?;
        Ok(build_layer(annotator.kind(), output, gold_tokens))
    }

    /// Bundle for `input` within `corpus`, annotating on a cache miss
    pub async fn process(&self, corpus: &str, input: &SentenceInput) -> Result<SentenceBundle, NerError> {
        if let Some((sentence_row_id, mut bundle)) = find_bundle(&self.db, corpus, &input.text).await? {
            debug!(sentence_row_id, "Sentence cache hit");

            for annotator in &self.annotators {
                let kind = annotator.kind();
                if bundle.layers.contains_key(&kind) {
                    continue;
                }
                let layer = self
                    .annotate(annotator.as_ref(), &bundle.text, &bundle.gold_tokens)
                    .await?;
                add_layer(&self.db, sentence_row_id, kind, &layer).await?;
                bundle.layers.insert(kind, layer);
            }

            return Ok(bundle);
        }

        let mut layers = BTreeMap::new();
        for annotator in &self.annotators {
            let layer = self
                .annotate(annotator.as_ref(), &input.text, &input.gold_tokens)
                .await?;
            layers.insert(annotator.kind(), layer);
        }

        let bundle = SentenceBundle {
            has_entity: input.has_entity,
            text: input.text.clone(),
            gold_tokens: input.gold_tokens.clone(),
            gold_ner: input.gold_ner.clone(),
            layers,
        };

        save_bundle(&self.db, corpus, &bundle).await?;

        Ok(bundle)
    }
}
