//! Token alignment
//!
//! Maps each annotator token onto the reference (gold) token that contains
//! it. Tokenizers disagree on quotes, HTML escaping and splitting, so matching
//! is containment after annotator-specific normalization, and the reference
//! cursor only moves forward.

use crate::types::AnnotatorKind;

/// Annotator token with no containing reference token at or after the cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentMiss {
    pub token: String,
    pub position: usize,
}

/// Undo the HTML escaping applied by the Twitter tagger
fn unescape_html(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&apos", "'")
        .replace("&gt;", ">")
        .replace("&lt;", "<")
}

/// Normalized candidate token plus an optional quote-swapped alternative
fn normalize_candidate(token: &str, annotator: AnnotatorKind) -> (String, Option<&'static str>) {
    if annotator.escapes_html() {
        return (unescape_html(token), None);
    }

    let term = match annotator {
        AnnotatorKind::Nltk => token.replace("``", "\""),
        _ => token.to_string(),
    };

    let swap = match term.as_str() {
        "''" => Some("\""),
        "\"" => Some("''"),
        _ => None,
    };

    (term, swap)
}

fn normalize_reference(token: &str, annotator: AnnotatorKind) -> String {
    if annotator.escapes_html() {
        unescape_html(token)
    } else {
        token.to_string()
    }
}

/// First reference index `k >= y_start` whose token contains `candidate[x_index]`
pub fn align_token(
    reference: &[String],
    candidate: &[String],
    x_index: usize,
    y_start: usize,
    annotator: AnnotatorKind,
) -> Option<usize> {
    let token = candidate.get(x_index)?;
    let (term, swap) = normalize_candidate(token, annotator);

    reference
        .iter()
        .enumerate()
        .skip(y_start)
        .find(|(_, base)| {
            let base = normalize_reference(base, annotator);
            base.contains(term.as_str()) || swap.is_some_and(|s| base.contains(s))
        })
        .map(|(k, _)| k)
}

/// Stateful aligner over one sentence
///
/// Returned indices are 0-based positions into the reference and never
/// decrease across calls.
pub struct TokenAligner<'a> {
    reference: &'a [String],
    annotator: AnnotatorKind,
    cursor: usize,
}

impl<'a> TokenAligner<'a> {
    pub fn new(reference: &'a [String], annotator: AnnotatorKind) -> Self {
        Self {
            reference,
            annotator,
            cursor: 0,
        }
    }

    /// Align `candidate[x_index]` and advance the cursor to the match
    pub fn align(&mut self, candidate: &[String], x_index: usize) -> Result<usize, AlignmentMiss> {
        match align_token(self.reference, candidate, x_index, self.cursor, self.annotator) {
            Some(k) => {
                self.cursor = k;
                Ok(k)
            }
            None => Err(AlignmentMiss {
                token: candidate.get(x_index).cloned().unwrap_or_default(),
                position: x_index,
            }),
        }
    }

    /// Align a whole candidate sequence
    pub fn align_all(&mut self, candidate: &[String]) -> Result<Vec<usize>, AlignmentMiss> {
        (0..candidate.len()).map(|i| self.align(candidate, i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_identical_tokenizations_align_one_to_one() {
        let gold = tokens("John works at Google .");
        let mut aligner = TokenAligner::new(&gold, AnnotatorKind::Stanford);

        let indices = aligner.align_all(&gold).unwrap();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_split_token_maps_to_containing_reference() {
        let gold = tokens("I can't go");
        let candidate = tokens("I ca n't go");
        let mut aligner = TokenAligner::new(&gold, AnnotatorKind::Stanford);

        let indices = aligner.align_all(&candidate).unwrap();
        assert_eq!(indices, vec![0, 1, 1, 2]);
    }

    #[test]
    fn test_alignment_is_monotonic() {
        let gold = tokens("a b a b");
        let candidate = tokens("b a b");
        let mut aligner = TokenAligner::new(&gold, AnnotatorKind::Stanford);

        let indices = aligner.align_all(&candidate).unwrap();
        assert!(indices.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[test]
    fn test_nltk_backticks_match_double_quote() {
        let gold = vec!["\"Hi\"".to_string()];
        let candidate = vec!["``".to_string()];

        assert_eq!(align_token(&gold, &candidate, 0, 0, AnnotatorKind::Nltk), Some(0));
    }

    #[test]
    fn test_quote_swap_for_non_escaping_annotators() {
        let gold = vec!["said".to_string(), "\"".to_string()];
        let candidate = vec!["''".to_string()];

        assert_eq!(align_token(&gold, &candidate, 0, 0, AnnotatorKind::Stanford), Some(1));
    }

    #[test]
    fn test_html_unescaping_for_twitter_tagger() {
        let gold = vec!["AT&amp;T".to_string(), "&lt;3".to_string()];
        let candidate = vec!["AT&T".to_string(), "&lt;3".to_string()];
        let mut aligner = TokenAligner::new(&gold, AnnotatorKind::TweetNlp);

        assert_eq!(aligner.align_all(&candidate).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_truncated_apos_entity() {
        let gold = vec!["don't".to_string()];
        let candidate = vec!["don&apos".to_string()];

        assert_eq!(align_token(&gold, &candidate, 0, 0, AnnotatorKind::TweetNlp), Some(0));
    }

    #[test]
    fn test_missing_token_is_alignment_miss() {
        let gold = tokens("Paris is nice");
        let candidate = tokens("Paris was nice");
        let mut aligner = TokenAligner::new(&gold, AnnotatorKind::Stanford);

        let err = aligner.align_all(&candidate).unwrap_err();
        assert_eq!(err, AlignmentMiss { token: "was".into(), position: 1 });
    }
}
