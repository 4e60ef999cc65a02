//! Corpus input
//!
//! CoNLL-style reader (one token per line, blank line between sentences) and
//! a sentence splitter for ad-hoc text.

use std::path::Path;

use crate::error::NerError;
use crate::tags::is_plo_tag;
use crate::types::Tristate;

/// One sentence awaiting annotation
#[derive(Debug, Clone, PartialEq)]
pub struct SentenceInput {
    pub text: String,
    pub has_entity: Tristate,
    /// Reference tokens (empty for ad-hoc text)
    pub gold_tokens: Vec<String>,
    pub gold_ner: Vec<String>,
}

impl SentenceInput {
    /// Ad-hoc sentence without reference annotation
    pub fn unlabeled(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            has_entity: Tristate::Unknown,
            gold_tokens: Vec::new(),
            gold_ner: Vec::new(),
        }
    }

    fn from_labeled(tokens: Vec<String>, ner: Vec<String>) -> Self {
        let has_entity = if ner.iter().any(|t| is_plo_tag(t)) {
            Tristate::Positive
        } else {
            Tristate::Unknown
        };
        Self {
            text: tokens.join(" "),
            has_entity,
            gold_tokens: tokens,
            gold_ner: ner,
        }
    }
}

/// Parse CoNLL content
///
/// Columns are whitespace separated; `token_col` and `ner_col` are 0-based.
pub fn parse_conll(
    content: &str,
    token_col: usize,
    ner_col: usize,
) -> Result<Vec<SentenceInput>, NerError> {
    let mut sentences = Vec::new();
    let mut tokens = Vec::new();
    let mut ner = Vec::new();

    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            if !tokens.is_empty() {
                sentences.push(SentenceInput::from_labeled(
                    std::mem::take(&mut tokens),
                    std::mem::take(&mut ner),
                ));
            }
            continue;
        }

        let columns: Vec<&str> = line.split_whitespace().collect();
        let (Some(token), Some(tag)) = (columns.get(token_col), columns.get(ner_col)) else {
            return Err(NerError::Corpus {
                line: line_no + 1,
                reason: format!(
                    "expected columns {} and {}, found {}",
                    token_col,
                    ner_col,
                    columns.len()
                ),
            });
        };
        tokens.push(token.to_string());
        ner.push(tag.to_string());
    }

    if !tokens.is_empty() {
        sentences.push(SentenceInput::from_labeled(tokens, ner));
    }

    Ok(sentences)
}

/// Read a CoNLL file from disk
pub fn read_conll(path: &Path, token_col: usize, ner_col: usize) -> Result<Vec<SentenceInput>, NerError> {
    let content = std::fs::read_to_string(path)?;
    let sentences = parse_conll(&content, token_col, ner_col)?;

    let with_entity = sentences
        .iter()
        .filter(|s| s.has_entity == Tristate::Positive)
        .count();
    tracing::info!(
        corpus = %path.display(),
        sentences = sentences.len(),
        with_entity,
        without_entity = sentences.len() - with_entity,
        "Corpus loaded"
    );

    Ok(sentences)
}

/// Split free text into sentences
///
/// Surrounding quotes are trimmed first. A sentence ends at `.`, `!` or `?`
/// followed by whitespace (or end of text).
pub fn split_sentences(text: &str) -> Vec<String> {
    let text = text.trim().trim_matches(|c| c == '"' || c == '\'').trim();
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            let at_boundary = match chars.peek() {
                Some((_, next)) => next.is_whitespace(),
                None => true,
            };
            if at_boundary {
                let end = i + c.len_utf8();
                let sentence = text[start..end].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence.to_string());
                }
                start = end;
            }
        }
    }

    let rest = text[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }

    sentences
}
