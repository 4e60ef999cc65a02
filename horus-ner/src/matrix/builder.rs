//! Matrix row construction for one sentence

use crate::error::NerError;
use crate::linguistics::TokenAligner;
use crate::tags::{is_plo_tag, ner_class};
use crate::types::{AnnotatorKind, EntityClass, SentenceBundle, Tristate};

use super::{ImageEvidence, MatrixRow, Predictions, TextEvidence};

/// Build every row of one sentence from the chosen annotator's layer
///
/// Compound rows come first, then one token row per annotator token. Gold
/// classes are resolved through the token aligner when the bundle carries a
/// reference tokenization. Any failure discards the whole sentence.
pub fn build_sentence_rows(
    sentence_id: usize,
    bundle: &SentenceBundle,
    annotator: AnnotatorKind,
) -> Result<Vec<MatrixRow>, NerError> {
    let layer = bundle.layer(annotator).ok_or_else(|| NerError::MalformedBundle {
        sentence_id,
        reason: format!("no {} annotation", annotator),
    })?;

    let token_count = layer.tokens.len();
    let mut rows = Vec::with_capacity(layer.compounds.len() + token_count);

    for compound in &layer.compounds {
        if compound.start == 0 || compound.size < 2 || compound.start + compound.size - 1 > token_count {
            return Err(NerError::MalformedBundle {
                sentence_id,
                reason: format!(
                    "compound '{}' (start {}, size {}) outside {} tokens",
                    compound.text, compound.start, compound.size, token_count
                ),
            });
        }

        rows.push(MatrixRow {
            is_entity_gold: Tristate::Negative,
            sentence_id,
            word_index: compound.start,
            surface_form: compound.text.clone(),
            pos_universal: String::new(),
            pos: String::new(),
            ner_tag: EntityClass::O,
            is_compound: true,
            compound_size: compound.size,
            term_doc_id: None,
            term_img_id: None,
            image: ImageEvidence::default(),
            text: TextEvidence::default(),
            index_start_term: 0,
            predictions: Predictions::default(),
            gold_class: EntityClass::O,
        });
    }

    let has_gold = !bundle.gold_tokens.is_empty();
    let mut aligner = TokenAligner::new(&bundle.gold_tokens, annotator);
    let mut offset = 0;

    for (i, token) in layer.tokens.iter().enumerate() {
        let (is_entity_gold, gold_class) = if has_gold {
            let k = aligner
                .align(&layer.tokens, i)
                .map_err(|miss| NerError::Alignment {
                    sentence_id,
                    token: miss.token,
                    position: miss.position,
                })?;
            let gold_tag = bundle.gold_ner.get(k).map(String::as_str).unwrap_or("O");
            let flag = if is_plo_tag(gold_tag) {
                Tristate::Positive
            } else {
                Tristate::Negative
            };
            (flag, ner_class(gold_tag))
        } else {
            (Tristate::Unknown, EntityClass::O)
        };

        let ner_tag = layer
            .ner
            .get(i)
            .map(|t| ner_class(t))
            .unwrap_or(EntityClass::O);

        rows.push(MatrixRow {
            is_entity_gold,
            sentence_id,
            word_index: i + 1,
            surface_form: token.clone(),
            pos_universal: layer.pos_universal.get(i).cloned().unwrap_or_default(),
            pos: layer.pos.get(i).cloned().unwrap_or_default(),
            ner_tag,
            is_compound: false,
            compound_size: 1,
            term_doc_id: None,
            term_img_id: None,
            image: ImageEvidence::default(),
            text: TextEvidence::default(),
            index_start_term: offset,
            predictions: Predictions::default(),
            gold_class,
        });

        offset += token.chars().count() + 1;
    }

    Ok(rows)
}
