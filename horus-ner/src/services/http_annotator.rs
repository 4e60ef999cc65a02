//! HTTP annotator client
//!
//! Each annotator runs as a sidecar model service exposing
//! `POST {base}/annotate/{kind}` with body `{"sentence": "..."}` and replying
//! with token, POS and NER arrays.

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

use crate::error::NerError;
use crate::types::{Annotator, AnnotatorKind, AnnotatorOutput};

pub struct HttpAnnotator {
    http_client: reqwest::Client,
    endpoint: String,
    kind: AnnotatorKind,
}

impl HttpAnnotator {
    pub fn new(base_url: &str, kind: AnnotatorKind) -> Result<Self, NerError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| NerError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            endpoint: format!("{}/annotate/{}", base_url.trim_end_matches('/'), kind),
            kind,
        })
    }

    /// One client per supported annotator
    pub fn all(base_url: &str) -> Result<Vec<Self>, NerError> {
        AnnotatorKind::ALL
            .iter()
            .map(|kind| Self::new(base_url, *kind))
            .collect()
    }

    fn error(&self, reason: String) -> NerError {
        NerError::Annotation {
            annotator: self.kind.to_string(),
            reason,
        }
    }
}

#[async_trait]
impl Annotator for HttpAnnotator {
    fn kind(&self) -> AnnotatorKind {
        self.kind
    }

    async fn annotate(&self, sentence: &str) -> Result<AnnotatorOutput, NerError> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&json!({ "sentence": sentence }))
            .send()
            .await
            .map_err(|e| self.error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(self.error(format!("HTTP {}: {}", status.as_u16(), error_text)));
        }

        let output: AnnotatorOutput = response
            .json()
            .await
            .map_err(|e| self.error(format!("invalid response: {}", e)))?;

        if output.tokens.len() != output.pos.len() {
            return Err(self.error(format!(
                "{} tokens but {} POS tags",
                output.tokens.len(),
                output.pos.len()
            )));
        }

        tracing::debug!(annotator = %self.kind, tokens = output.tokens.len(), "Sentence annotated");

        Ok(output)
    }
}
