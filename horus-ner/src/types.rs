//! Core types and collaborator traits
//!
//! The engine consumes four kinds of external collaborators through the
//! traits defined here:
//! - **Annotator:** tokenize and tag one sentence
//! - **SearchProvider:** ranked web documents and images for a term
//! - **ImageClassifier / TextClassifier:** per-class indicators for one result
//! - **ImageStore:** local copy of a search image
//!
//! Production implementations live in [`crate::services`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::NerError;

// ============================================================================
// Sum types
// ============================================================================

/// Three-valued flag: gold entity membership, sentence has-entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tristate {
    Positive,
    Negative,
    Unknown,
}

impl Tristate {
    /// Storage/export encoding: 1, 0, -1
    pub fn as_i64(self) -> i64 {
        match self {
            Tristate::Positive => 1,
            Tristate::Negative => 0,
            Tristate::Unknown => -1,
        }
    }

    pub fn from_i64(value: i64) -> Self {
        match value {
            1 => Tristate::Positive,
            0 => Tristate::Negative,
            _ => Tristate::Unknown,
        }
    }
}

/// Classifier output for one class: -1 (negative), 0 (neutral), 1 (positive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum Indicator {
    Negative,
    Neutral,
    Positive,
}

impl Indicator {
    pub fn is_positive(self) -> bool {
        self == Indicator::Positive
    }

    pub fn is_negative(self) -> bool {
        self == Indicator::Negative
    }
}

impl TryFrom<i8> for Indicator {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Indicator::Negative),
            0 => Ok(Indicator::Neutral),
            1 => Ok(Indicator::Positive),
            other => Err(format!("indicator out of range: {}", other)),
        }
    }
}

impl From<Indicator> for i8 {
    fn from(value: Indicator) -> Self {
        match value {
            Indicator::Negative => -1,
            Indicator::Neutral => 0,
            Indicator::Positive => 1,
        }
    }
}

/// Canonical entity class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityClass {
    Loc,
    Org,
    Per,
    O,
}

impl EntityClass {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityClass::Loc => "LOC",
            EntityClass::Org => "ORG",
            EntityClass::Per => "PER",
            EntityClass::O => "O",
        }
    }
}

impl fmt::Display for EntityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported annotators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotatorKind {
    Nltk,
    Stanford,
    TweetNlp,
}

impl AnnotatorKind {
    pub const ALL: [AnnotatorKind; 3] = [
        AnnotatorKind::Nltk,
        AnnotatorKind::Stanford,
        AnnotatorKind::TweetNlp,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AnnotatorKind::Nltk => "nltk",
            AnnotatorKind::Stanford => "stanford",
            AnnotatorKind::TweetNlp => "tweetnlp",
        }
    }

    /// The Twitter tagger HTML-escapes its tokens
    pub fn escapes_html(self) -> bool {
        self == AnnotatorKind::TweetNlp
    }
}

impl fmt::Display for AnnotatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnnotatorKind {
    type Err = NerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nltk" => Ok(AnnotatorKind::Nltk),
            "stanford" => Ok(AnnotatorKind::Stanford),
            "tweetnlp" => Ok(AnnotatorKind::TweetNlp),
            other => Err(NerError::Configuration(format!(
                "unsupported annotator '{}'",
                other
            ))),
        }
    }
}

// ============================================================================
// Sentence annotation
// ============================================================================

/// Raw output of one annotator for one sentence
///
/// `ner` may be empty when the annotator does not tag entities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotatorOutput {
    pub tokens: Vec<String>,
    pub pos: Vec<String>,
    #[serde(default)]
    pub pos_universal: Vec<String>,
    #[serde(default)]
    pub ner: Vec<String>,
}

/// Multi-token noun phrase
///
/// `start` is the 1-based word index of the first token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compound {
    pub start: usize,
    pub text: String,
    pub size: usize,
}

/// One annotator's view of a sentence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationLayer {
    pub tokens: Vec<String>,
    pub pos: Vec<String>,
    pub pos_universal: Vec<String>,
    pub ner: Vec<String>,
    pub compounds: Vec<Compound>,
    pub tokenization_matches_reference: bool,
}

/// One processed sentence with every annotator's layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceBundle {
    pub has_entity: Tristate,
    pub text: String,
    /// Reference tokenization (empty for ad-hoc text)
    pub gold_tokens: Vec<String>,
    pub gold_ner: Vec<String>,
    pub layers: BTreeMap<AnnotatorKind, AnnotationLayer>,
}

impl SentenceBundle {
    pub fn layer(&self, annotator: AnnotatorKind) -> Option<&AnnotationLayer> {
        self.layers.get(&annotator)
    }
}

// ============================================================================
// Search results and classifier verdicts
// ============================================================================

/// Web page returned by a search provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentHit {
    pub url: String,
    pub title: String,
    pub snippet: String,
}

/// Image returned by a search provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageHit {
    pub content_url: String,
    pub thumbnail_url: Option<String>,
    pub title: String,
    pub encoding_format: Option<String>,
}

/// Ranked results for one query plus provider metadata
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResponse<T> {
    pub results: Vec<T>,
    pub metadata: String,
}

/// Image as handed to the image classifier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageSample {
    pub url: String,
    pub local_path: Option<PathBuf>,
}

/// Document as handed to the text classifier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSample {
    pub url: String,
    pub title: String,
    pub snippet: String,
}

/// Object-detection verdict for one image
///
/// `places` holds one indicator per place sub-category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageVerdict {
    pub face: Indicator,
    pub logo: Indicator,
    pub places: Vec<Indicator>,
}

/// Text-classification verdict for one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextVerdict {
    pub loc: Indicator,
    pub org: Indicator,
    pub per: Indicator,
    #[serde(default)]
    pub translation_failed: bool,
}

// ============================================================================
// Collaborator traits
// ============================================================================

#[async_trait]
pub trait Annotator: Send + Sync {
    fn kind(&self) -> AnnotatorKind;

    async fn annotate(&self, sentence: &str) -> Result<AnnotatorOutput, NerError>;
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Stable id stored with every cached term
    fn provider_id(&self) -> i64;

    async fn search_documents(
        &self,
        term: &str,
        count: usize,
    ) -> Result<SearchResponse<DocumentHit>, NerError>;

    async fn search_images(
        &self,
        term: &str,
        count: usize,
    ) -> Result<SearchResponse<ImageHit>, NerError>;
}

#[async_trait]
pub trait ImageClassifier: Send + Sync {
    async fn classify(&self, image: &ImageSample) -> Result<ImageVerdict, NerError>;
}

#[async_trait]
pub trait TextClassifier: Send + Sync {
    async fn classify(&self, document: &DocumentSample) -> Result<TextVerdict, NerError>;
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Fetch the image bytes (thumbnail preferred)
    async fn download(&self, image: &ImageHit) -> Result<Vec<u8>, NerError>;

    /// Write downloaded bytes into the local cache; returns the local path
    async fn save(
        &self,
        term_id: i64,
        seq: usize,
        image: &ImageHit,
        bytes: &[u8],
    ) -> Result<PathBuf, NerError>;
}
