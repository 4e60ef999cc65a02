//! Tag vocabularies and mappings
//!
//! Static lookup tables between the heterogeneous POS/NER tag sets emitted by
//! the supported annotators and the canonical scheme used by the evidence
//! matrix. Pure lookups, no state.

use crate::types::EntityClass;

// ============================================================================
// NER tag sets
// ============================================================================

pub const NER_RITTER_PER: &[&str] = &["B-person", "I-person"];
pub const NER_RITTER_ORG: &[&str] = &["B-company", "I-company"];
pub const NER_RITTER_LOC: &[&str] = &["B-geo-loc", "I-geo-loc"];

/// GSP = geo-political social group
pub const NER_STANFORD_PER: &[&str] = &["PERSON"];
pub const NER_STANFORD_ORG: &[&str] = &["ORGANIZATION", "GSP"];
pub const NER_STANFORD_LOC: &[&str] = &["LOCATION"];

/// GPE = geo-political entity (city, state/province, country)
pub const NER_NLTK_PER: &[&str] = &["B-PERSON", "I-PERSON", "PERSON"];
pub const NER_NLTK_ORG: &[&str] = &["B-ORGANIZATION", "I-ORGANIZATION", "ORGANIZATION", "GSP"];
pub const NER_NLTK_LOC: &[&str] = &["B-LOCATION", "I-LOCATION", "LOCATION", "GPE"];

pub const NER_CONLL_PER: &[&str] = &["I-PER"];
pub const NER_CONLL_ORG: &[&str] = &["I-ORG"];
pub const NER_CONLL_LOC: &[&str] = &["I-LOC"];

const NER_PER_SETS: &[&[&str]] = &[
    &["PER"],
    NER_RITTER_PER,
    NER_STANFORD_PER,
    NER_NLTK_PER,
    NER_CONLL_PER,
];
const NER_ORG_SETS: &[&[&str]] = &[
    &["ORG"],
    NER_RITTER_ORG,
    NER_STANFORD_ORG,
    NER_NLTK_ORG,
    NER_CONLL_ORG,
];
const NER_LOC_SETS: &[&[&str]] = &[
    &["LOC"],
    NER_RITTER_LOC,
    NER_STANFORD_LOC,
    NER_NLTK_LOC,
    NER_CONLL_LOC,
];

fn in_sets(sets: &[&[&str]], tag: &str) -> bool {
    sets.iter().any(|set| set.contains(&tag))
}

/// Classify an NER tag from any supported vocabulary into {LOC, ORG, PER, O}
///
/// LOC is checked first, so a tag present in several sets resolves LOC > ORG > PER.
pub fn ner_class(tag: &str) -> EntityClass {
    if in_sets(NER_LOC_SETS, tag) {
        EntityClass::Loc
    } else if in_sets(NER_ORG_SETS, tag) {
        EntityClass::Org
    } else if in_sets(NER_PER_SETS, tag) {
        EntityClass::Per
    } else {
        EntityClass::O
    }
}

/// True when the tag denotes a person, location or organization
pub fn is_plo_tag(tag: &str) -> bool {
    ner_class(tag) != EntityClass::O
}

// ============================================================================
// POS tag sets
// ============================================================================

pub const POS_NOUN_PTB: &[&str] = &["NN", "NNS", "NNP", "NNPS", "PRP", "PRP$"];
pub const POS_NOUN_UNIVERSAL: &[&str] = &["NOUN", "PRON", "PROPN"];

/// Noun-class membership used to select rows for evidence aggregation
pub fn is_noun_tag(pos: &str) -> bool {
    POS_NOUN_PTB.contains(&pos) || POS_NOUN_UNIVERSAL.contains(&pos)
}

/// Universal noun or proper noun (pronouns excluded)
pub fn is_universal_noun(pos_universal: &str) -> bool {
    matches!(pos_universal, "NOUN" | "PROPN")
}

/// CMU Twitter tag -> Penn Treebank tag
const CMU_PENN_TAGS: &[(&str, &str)] = &[
    ("N", "NNS"),
    ("O", "PRP"),
    ("S", "PRP$"),
    ("^", "NNP"),
    ("D", "DT"),
    ("A", "JJ"),
    ("P", "IN"),
    ("&", "CC"),
    ("V", "VBD"),
    ("R", "RB"),
    ("!", "UH"),
    ("T", "RP"),
    ("$", "CD"),
    ("G", "SYM"),
];

/// CMU Twitter tag -> universal tag
const CMU_UNI_TAGS: &[(&str, &str)] = &[
    ("N", "NOUN"),
    ("^", "NOUN"),
    ("V", "VERB"),
    ("D", "DET"),
    ("A", "ADJ"),
    ("P", "ADP"),
    ("&", "CCONJ"),
    ("R", "ADV"),
    ("!", "INTJ"),
    ("O", "PRON"),
    ("$", "NUM"),
    (",", "PUNCT"),
];

/// Penn Treebank tag -> universal tag
const PENN_UNI_TAGS: &[(&str, &str)] = &[
    ("#", "SYM"),
    ("$", "SYM"),
    ("", "PUNCT"),
    (",", "PUNCT"),
    ("-LRB-", "PUNCT"),
    ("-RRB-", "PUNCT"),
    (".", "PUNCT"),
    (":", "PUNCT"),
    ("AFX", "ADJ"),
    ("CC", "CONJ"),
    ("CD", "NUM"),
    ("DT", "DET"),
    ("EX", "ADV"),
    ("FW", "X"),
    ("HYPH", "PUNCT"),
    ("IN", "ADP"),
    ("JJ", "ADJ"),
    ("JJR", "ADJ"),
    ("JJS", "ADJ"),
    ("LS", "PUNCT"),
    ("MD", "VERB"),
    ("NIL", "X"),
    ("NN", "NOUN"),
    ("NNP", "PROPN"),
    ("NNPS", "PROPN"),
    ("NNS", "NOUN"),
    ("PDT", "DET"),
    ("POS", "PART"),
    ("PRP", "PRON"),
    ("PRP$", "DET"),
    ("RB", "ADV"),
    ("RBR", "ADV"),
    ("RBS", "ADV"),
    ("RP", "PART"),
    ("SYM", "SYM"),
    ("TO", "PART"),
    ("UH", "INTJ"),
    ("VB", "VERB"),
    ("VBD", "VERB"),
    ("VBG", "VERB"),
    ("VBN", "VERB"),
    ("VBP", "VERB"),
    ("VBZ", "VERB"),
    ("WDT", "DET"),
    ("WP", "PRON"),
    ("WP$", "DET"),
    ("WRB", "ADV"),
];

fn lookup(table: &'static [(&'static str, &'static str)], tag: &str) -> Option<&'static str> {
    table.iter().find(|(from, _)| *from == tag).map(|(_, to)| *to)
}

pub fn cmu_to_ptb(tag: &str) -> Option<&'static str> {
    lookup(CMU_PENN_TAGS, tag)
}

pub fn cmu_to_universal(tag: &str) -> Option<&'static str> {
    lookup(CMU_UNI_TAGS, tag)
}

pub fn ptb_to_universal(tag: &str) -> Option<&'static str> {
    lookup(PENN_UNI_TAGS, tag)
}

// ============================================================================
// Chunk categories
// ============================================================================

/// Coarse POS category consumed by the compound grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkCategory {
    Adjective,
    Noun,
    Conjunction,
    Adposition,
    Other,
}

/// Resolve a PTB, universal or CMU-Twitter tag to its chunk category
///
/// Pronouns are not nouns here: only common and proper nouns form compounds.
pub fn chunk_category(tag: &str) -> ChunkCategory {
    match tag {
        "JJ" | "JJR" | "JJS" | "ADJ" | "A" => ChunkCategory::Adjective,
        "NN" | "NNS" | "NNP" | "NNPS" | "NOUN" | "PROPN" | "N" | "^" => ChunkCategory::Noun,
        "CC" | "CONJ" | "CCONJ" | "&" => ChunkCategory::Conjunction,
        "IN" | "ADP" | "P" => ChunkCategory::Adposition,
        _ => ChunkCategory::Other,
    }
}
