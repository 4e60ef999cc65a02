//! Compound propagation
//!
//! Copies each compound's θ-level class onto the compound slot of every token
//! in its span. Compound rows precede the token rows of their sentence, so a
//! single forward pass suffices.

use crate::matrix::MatrixRow;
use crate::types::EntityClass;

/// Pending span of one compound row
#[derive(Debug, Clone, Copy)]
struct PendingSpan {
    sentence_id: usize,
    start: usize,
    size: usize,
    class: Option<EntityClass>,
}

/// Propagate compound classes onto member tokens
///
/// **Returns:** number of token rows written
pub fn propagate_compounds(rows: &mut [MatrixRow]) -> usize {
    let mut pending: Vec<PendingSpan> = Vec::new();
    let mut current_sentence = None;
    let mut written = 0;

    for i in 0..rows.len() {
        // Rows of a sentence are contiguous; spans never outlive their sentence
        if current_sentence != Some(rows[i].sentence_id) {
            pending.clear();
            current_sentence = Some(rows[i].sentence_id);
        }

        if rows[i].is_compound {
            pending.push(PendingSpan {
                sentence_id: rows[i].sentence_id,
                start: rows[i].word_index,
                size: rows[i].compound_size,
                class: rows[i].predictions.theta,
            });
            continue;
        }

        let (sentence_id, word_index) = (rows[i].sentence_id, rows[i].word_index);
        for span in pending
            .iter()
            .filter(|s| s.sentence_id == sentence_id && s.start == word_index)
        {
            for row in rows[i..].iter_mut().take(span.size) {
                if row.sentence_id != sentence_id || row.is_compound {
                    break;
                }
                row.predictions.compound = span.class;
                written += 1;
            }
        }
    }

    written
}
