//! Mock collaborators
//!
//! A [`MockWeb`] holds per-term scenarios (the classifier verdict of every
//! image and document a search returns). The mock provider serves hits whose
//! URLs encode `(term, index)`, and the mock classifiers look the verdict up
//! again from the same scenario.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use horus_ner::error::NerError;
use horus_ner::types::{
    Annotator, AnnotatorKind, AnnotatorOutput, DocumentHit, DocumentSample, ImageClassifier,
    ImageHit, ImageSample, ImageStore, ImageVerdict, Indicator, SearchProvider, SearchResponse,
    TextClassifier, TextVerdict,
};

// ============================================================================
// Scenarios
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct TermScenario {
    pub images: Vec<ImageVerdict>,
    pub documents: Vec<TextVerdict>,
}

#[derive(Debug, Default)]
pub struct MockWeb {
    scenarios: HashMap<String, TermScenario>,
    failing_terms: HashSet<String>,
}

impl MockWeb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_term(mut self, term: &str, scenario: TermScenario) -> Self {
        self.scenarios.insert(term.to_string(), scenario);
        self
    }

    pub fn with_failing_term(mut self, term: &str) -> Self {
        self.failing_terms.insert(term.to_string());
        self
    }

    fn scenario(&self, term: &str) -> TermScenario {
        self.scenarios.get(term).cloned().unwrap_or_default()
    }
}

/// Image with `positive_places` of 10 place sub-categories positive
pub fn location_image(positive_places: usize) -> ImageVerdict {
    let mut places = vec![Indicator::Positive; positive_places];
    places.resize(10, Indicator::Negative);
    ImageVerdict {
        face: Indicator::Neutral,
        logo: Indicator::Neutral,
        places,
    }
}

pub fn logo_image() -> ImageVerdict {
    ImageVerdict {
        face: Indicator::Neutral,
        logo: Indicator::Positive,
        places: vec![Indicator::Neutral; 10],
    }
}

pub fn neutral_image() -> ImageVerdict {
    ImageVerdict {
        face: Indicator::Neutral,
        logo: Indicator::Neutral,
        places: vec![Indicator::Neutral; 10],
    }
}

fn encode(channel: &str, term: &str, index: usize) -> String {
    format!("mock://{}|{}|{}", channel, term, index)
}

fn decode(url: &str) -> Option<(String, usize)> {
    let rest = url.strip_prefix("mock://")?;
    let mut parts = rest.splitn(3, '|');
    let _channel = parts.next()?;
    let term = parts.next()?;
    let index = parts.next()?.parse().ok()?;
    Some((term.to_string(), index))
}

// ============================================================================
// Search provider
// ============================================================================

pub struct MockSearchProvider {
    web: Arc<MockWeb>,
    pub document_calls: AtomicUsize,
    pub image_calls: AtomicUsize,
}

impl MockSearchProvider {
    pub fn new(web: Arc<MockWeb>) -> Self {
        Self {
            web,
            document_calls: AtomicUsize::new(0),
            image_calls: AtomicUsize::new(0),
        }
    }

    pub fn document_calls(&self) -> usize {
        self.document_calls.load(Ordering::SeqCst)
    }

    pub fn image_calls(&self) -> usize {
        self.image_calls.load(Ordering::SeqCst)
    }

    fn check(&self, term: &str) -> Result<(), NerError> {
        if self.web.failing_terms.contains(term) {
            return Err(NerError::EvidenceFetch {
                term: term.to_string(),
                reason: "mock outage".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SearchProvider for MockSearchProvider {
    fn provider_id(&self) -> i64 {
        1
    }

    async fn search_documents(
        &self,
        term: &str,
        count: usize,
    ) -> Result<SearchResponse<DocumentHit>, NerError> {
        self.document_calls.fetch_add(1, Ordering::SeqCst);
        self.check(term)?;
        let results = (0..self.web.scenario(term).documents.len())
            .take(count)
            .map(|i| DocumentHit {
                url: encode("doc", term, i),
                title: format!("{} page {}", term, i),
                snippet: format!("about {}", term),
            })
            .collect();
        Ok(SearchResponse {
            results,
            metadata: "{}".to_string(),
        })
    }

    async fn search_images(
        &self,
        term: &str,
        count: usize,
    ) -> Result<SearchResponse<ImageHit>, NerError> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        self.check(term)?;
        let results = (0..self.web.scenario(term).images.len())
            .take(count)
            .map(|i| ImageHit {
                content_url: encode("img", term, i),
                thumbnail_url: None,
                title: term.to_string(),
                encoding_format: Some("png".to_string()),
            })
            .collect();
        Ok(SearchResponse {
            results,
            metadata: "{}".to_string(),
        })
    }
}

// ============================================================================
// Classifiers and image store
// ============================================================================

pub struct MockImageClassifier {
    web: Arc<MockWeb>,
    pub calls: AtomicUsize,
}

impl MockImageClassifier {
    pub fn new(web: Arc<MockWeb>) -> Self {
        Self {
            web,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ImageClassifier for MockImageClassifier {
    async fn classify(&self, image: &ImageSample) -> Result<ImageVerdict, NerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (term, index) = decode(&image.url)
            .ok_or_else(|| NerError::Classification(format!("unknown image {}", image.url)))?;
        self.web
            .scenario(&term)
            .images
            .get(index)
            .cloned()
            .ok_or_else(|| NerError::Classification(format!("no verdict for {}", image.url)))
    }
}

pub struct MockTextClassifier {
    web: Arc<MockWeb>,
    pub calls: AtomicUsize,
}

impl MockTextClassifier {
    pub fn new(web: Arc<MockWeb>) -> Self {
        Self {
            web,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TextClassifier for MockTextClassifier {
    async fn classify(&self, document: &DocumentSample) -> Result<TextVerdict, NerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (term, index) = decode(&document.url)
            .ok_or_else(|| NerError::Classification(format!("unknown document {}", document.url)))?;
        self.web
            .scenario(&term)
            .documents
            .get(index)
            .cloned()
            .ok_or_else(|| NerError::Classification(format!("no verdict for {}", document.url)))
    }
}

#[derive(Default)]
pub struct MockImageStore {
    pub downloaded: AtomicUsize,
    pub stored: AtomicUsize,
}

#[async_trait]
impl ImageStore for MockImageStore {
    async fn download(&self, image: &ImageHit) -> Result<Vec<u8>, NerError> {
        self.downloaded.fetch_add(1, Ordering::SeqCst);
        Ok(image.content_url.as_bytes().to_vec())
    }

    async fn save(
        &self,
        term_id: i64,
        seq: usize,
        _image: &ImageHit,
        _bytes: &[u8],
    ) -> Result<PathBuf, NerError> {
        self.stored.fetch_add(1, Ordering::SeqCst);
        Ok(PathBuf::from(format!("/tmp/horus-mock/{}_{}.png", term_id, seq)))
    }
}

// ============================================================================
// Annotator
// ============================================================================

/// Whitespace tokenizer with a small POS lexicon
///
/// Trailing sentence punctuation is split off. Unknown capitalized words are
/// `NNP`, other unknown words `NN`. `rewrites` replaces tokens after
/// tokenization, which lets a test produce a tokenization that no longer
/// aligns with the reference.
pub struct MockAnnotator {
    kind: AnnotatorKind,
    rewrites: HashMap<String, String>,
    pub calls: AtomicUsize,
}

impl MockAnnotator {
    pub fn new(kind: AnnotatorKind) -> Self {
        Self {
            kind,
            rewrites: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_rewrite(mut self, from: &str, to: &str) -> Self {
        self.rewrites.insert(from.to_string(), to.to_string());
        self
    }
}

fn lexicon(token: &str) -> Option<&'static str> {
    Some(match token {
        "I" | "it" | "he" | "she" => "PRP",
        "is" | "works" | "sleeps" | "visits" => "VBZ",
        "love" => "VBP",
        "at" | "in" | "of" => "IN",
        "and" => "CC",
        "the" | "a" => "DT",
        "nice" | "big" => "JJ",
        "." | "!" | "?" => ".",
        _ => return None,
    })
}

#[async_trait]
impl Annotator for MockAnnotator {
    fn kind(&self) -> AnnotatorKind {
        self.kind
    }

    async fn annotate(&self, sentence: &str) -> Result<AnnotatorOutput, NerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut tokens = Vec::new();
        for word in sentence.split_whitespace() {
            match word.char_indices().last() {
                Some((i, c)) if i > 0 && matches!(c, '.' | '!' | '?') => {
                    tokens.push(word[..i].to_string());
                    tokens.push(c.to_string());
                }
                _ => tokens.push(word.to_string()),
            }
        }

        let tokens: Vec<String> = tokens
            .into_iter()
            .map(|t| self.rewrites.get(&t).cloned().unwrap_or(t))
            .collect();

        let pos = tokens
            .iter()
            .map(|t| {
                let tag = lexicon(t).unwrap_or_else(|| {
                    if t.chars().next().is_some_and(char::is_uppercase) {
                        "NNP"
                    } else {
                        "NN"
                    }
                });
                tag.to_string()
            })
            .collect();

        Ok(AnnotatorOutput {
            tokens,
            pos,
            pos_universal: Vec::new(),
            ner: Vec::new(),
        })
    }
}
