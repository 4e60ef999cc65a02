//! Evidence matrix
//!
//! One row per token and one row per compound occurrence. Compound rows of a
//! sentence precede its token rows. Column order matters only to the
//! exporters in [`export`].

pub mod builder;
pub mod export;

pub use builder::build_sentence_rows;
pub use export::{export_matrix, ExportFormat, MATRIX_HEADER};

use serde::Serialize;

use crate::tags::is_noun_tag;
use crate::types::{EntityClass, Tristate};

/// Image-channel evidence for one term
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageEvidence {
    /// Images aggregated (capped at the requested result count)
    pub total: i64,
    pub loc: i64,
    pub org: i64,
    pub per: i64,
    pub distance: i64,
    /// Positive minus negative place votes
    pub polarity: i64,
    /// Images returned by the provider
    pub results_returned: i64,
    pub predicted: EntityClass,
}

impl Default for ImageEvidence {
    fn default() -> Self {
        Self {
            total: 0,
            loc: 0,
            org: 0,
            per: 0,
            distance: 0,
            polarity: 0,
            results_returned: 0,
            predicted: EntityClass::O,
        }
    }
}

/// Text-channel evidence for one term
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextEvidence {
    pub total: i64,
    pub loc: i64,
    pub org: i64,
    pub per: i64,
    pub translation_errors: i64,
    pub distance: i64,
    pub results_returned: i64,
    pub predicted: EntityClass,
}

impl Default for TextEvidence {
    fn default() -> Self {
        Self {
            total: 0,
            loc: 0,
            org: 0,
            per: 0,
            translation_errors: 0,
            distance: 0,
            results_returned: 0,
            predicted: EntityClass::O,
        }
    }
}

/// Final class predictions; `None` means unset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Predictions {
    pub theta: Option<EntityClass>,
    pub theta_plus_one: Option<EntityClass>,
    pub theta_plus_two: Option<EntityClass>,
    /// Filled from the enclosing compound's θ-level class
    pub compound: Option<EntityClass>,
}

/// One token or compound occurrence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixRow {
    pub is_entity_gold: Tristate,
    /// 1-based within a run
    pub sentence_id: usize,
    /// 1-based within the sentence; compound rows carry their start word
    pub word_index: usize,
    pub surface_form: String,
    pub pos_universal: String,
    pub pos: String,
    pub ner_tag: EntityClass,
    pub is_compound: bool,
    pub compound_size: usize,
    pub term_doc_id: Option<i64>,
    pub term_img_id: Option<i64>,
    pub image: ImageEvidence,
    pub text: TextEvidence,
    /// Character offset of the token within its sentence
    pub index_start_term: usize,
    pub predictions: Predictions,
    pub gold_class: EntityClass,
}

impl MatrixRow {
    /// Rows that receive web evidence: nouns and compounds
    pub fn is_evidence_candidate(&self) -> bool {
        self.is_compound || is_noun_tag(&self.pos)
    }
}

/// Corpus statistics over token rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorpusStats {
    pub total_rows: usize,
    pub token_rows: usize,
    pub plo_tokens: usize,
    pub plo_tokens_as_nouns: usize,
    pub nouns_not_entities: usize,
}

/// Owned matrix passed through the pipeline stages
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EvidenceMatrix {
    rows: Vec<MatrixRow>,
}

impl EvidenceMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append every row of one sentence
    pub fn extend_sentence(&mut self, rows: Vec<MatrixRow>) {
        self.rows.extend(rows);
    }

    pub fn rows(&self) -> &[MatrixRow] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [MatrixRow] {
        &mut self.rows
    }

    pub fn into_rows(self) -> Vec<MatrixRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn stats(&self) -> CorpusStats {
        let mut stats = CorpusStats {
            total_rows: self.rows.len(),
            ..Default::default()
        };
        for row in self.rows.iter().filter(|r| !r.is_compound) {
            stats.token_rows += 1;
            let noun = is_noun_tag(&row.pos);
            match row.is_entity_gold {
                Tristate::Positive => {
                    stats.plo_tokens += 1;
                    if noun {
                        stats.plo_tokens_as_nouns += 1;
                    }
                }
                Tristate::Negative if noun => stats.nouns_not_entities += 1,
                _ => {}
            }
        }
        stats
    }

    /// `token/POS/class` per token, one line per prediction slot and sentence
    pub fn render_annotated(&self) -> Vec<String> {
        let slots: [(&str, fn(&Predictions) -> Option<EntityClass>); 4] = [
            ("KLASS_1", |p| p.theta),
            ("KLASS_2", |p| p.theta_plus_one),
            ("KLASS_3", |p| p.theta_plus_two),
            ("KLASS_4", |p| p.compound),
        ];

        let mut lines = Vec::new();
        let mut sentence_ids: Vec<usize> = self.rows.iter().map(|r| r.sentence_id).collect();
        sentence_ids.dedup();

        for sentence_id in sentence_ids {
            for (label, slot) in &slots {
                let rendered: Vec<String> = self
                    .rows
                    .iter()
                    .filter(|r| r.sentence_id == sentence_id && !r.is_compound)
                    .map(|r| {
                        format!(
                            "{}/{}/{}",
                            r.surface_form,
                            r.pos_universal,
                            slot(&r.predictions).unwrap_or(EntityClass::O)
                        )
                    })
                    .collect();
                lines.push(format!("[{}] {}: {}", sentence_id, label, rendered.join(" ")));
            }
        }
        lines
    }
}

#[cfg(test)]
pub(crate) mod test_rows {
    use super::*;

    /// Token row with empty evidence
    pub fn token(sentence_id: usize, word_index: usize, surface: &str, pos: &str) -> MatrixRow {
        MatrixRow {
            is_entity_gold: Tristate::Unknown,
            sentence_id,
            word_index,
            surface_form: surface.to_string(),
            pos_universal: crate::tags::ptb_to_universal(pos).unwrap_or("X").to_string(),
            pos: pos.to_string(),
            ner_tag: EntityClass::O,
            is_compound: false,
            compound_size: 1,
            term_doc_id: None,
            term_img_id: None,
            image: ImageEvidence::default(),
            text: TextEvidence::default(),
            index_start_term: 0,
            predictions: Predictions::default(),
            gold_class: EntityClass::O,
        }
    }

    pub fn compound(sentence_id: usize, start: usize, surface: &str, size: usize) -> MatrixRow {
        MatrixRow {
            is_entity_gold: Tristate::Negative,
            is_compound: true,
            compound_size: size,
            pos: String::new(),
            pos_universal: String::new(),
            ..token(sentence_id, start, surface, "")
        }
    }
}
