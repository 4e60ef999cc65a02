//! HTTP classifier clients
//!
//! Object detection and text classification run in a sidecar model service.
//! The backend name selects the model: `POST {base}/image/{sift|cnn}` and
//! `POST {base}/text/{bow|topic}`. Both reply with per-class indicators in
//! {-1, 0, 1}.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use crate::config::{ObjectDetectionBackend, TextClassificationBackend};
use crate::error::NerError;
use crate::types::{
    DocumentSample, ImageClassifier, ImageSample, ImageVerdict, TextClassifier, TextVerdict,
};

fn build_client() -> Result<reqwest::Client, NerError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(120))
        .build()
        .map_err(|e| NerError::Configuration(format!("HTTP client: {}", e)))
}

async fn post_json<B, R>(client: &reqwest::Client, endpoint: &str, body: &B) -> Result<R, NerError>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let response = client
        .post(endpoint)
        .json(body)
        .send()
        .await
        .map_err(|e| NerError::Classification(format!("{}: {}", endpoint, e)))?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(NerError::Classification(format!(
            "{}: HTTP {}: {}",
            endpoint,
            status.as_u16(),
            error_text
        )));
    }

    response
        .json()
        .await
        .map_err(|e| NerError::Classification(format!("{}: invalid response: {}", endpoint, e)))
}

pub struct HttpImageClassifier {
    http_client: reqwest::Client,
    endpoint: String,
}

impl HttpImageClassifier {
    pub fn new(base_url: &str, backend: ObjectDetectionBackend) -> Result<Self, NerError> {
        Ok(Self {
            http_client: build_client()?,
            endpoint: format!("{}/image/{}", base_url.trim_end_matches('/'), backend),
        })
    }
}

#[async_trait]
impl ImageClassifier for HttpImageClassifier {
    async fn classify(&self, image: &ImageSample) -> Result<ImageVerdict, NerError> {
        post_json(&self.http_client, &self.endpoint, image).await
    }
}

pub struct HttpTextClassifier {
    http_client: reqwest::Client,
    endpoint: String,
}

impl HttpTextClassifier {
    pub fn new(base_url: &str, backend: TextClassificationBackend) -> Result<Self, NerError> {
        Ok(Self {
            http_client: build_client()?,
            endpoint: format!("{}/text/{}", base_url.trim_end_matches('/'), backend),
        })
    }
}

#[async_trait]
impl TextClassifier for HttpTextClassifier {
    async fn classify(&self, document: &DocumentSample) -> Result<TextVerdict, NerError> {
        post_json(&self.http_client, &self.endpoint, document).await
    }
}
