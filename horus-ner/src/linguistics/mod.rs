//! Sentence-level linguistic processing: corpus input, token alignment and
//! compound extraction.

pub mod aligner;
pub mod compounds;
pub mod corpus;

pub use aligner::{align_token, AlignmentMiss, TokenAligner};
pub use compounds::extract_compounds;
pub use corpus::{parse_conll, read_conll, split_sentences, SentenceInput};
