//! Local image cache
//!
//! Downloads a search image (thumbnail preferred) into the image cache folder
//! as `{term_id}_{seq}.{ext}`.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::NerError;
use crate::types::{ImageHit, ImageStore};

pub struct HttpImageStore {
    http_client: reqwest::Client,
    cache_dir: PathBuf,
}

impl HttpImageStore {
    pub fn new(cache_dir: &Path) -> Result<Self, NerError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| NerError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            cache_dir: cache_dir.to_path_buf(),
        })
    }
}

/// File extension from the declared encoding, defaulting to jpg
fn extension(image: &ImageHit) -> &str {
    match image.encoding_format.as_deref() {
        Some("jpeg") | None => "jpg",
        Some(format) if format.chars().all(|c| c.is_ascii_alphanumeric()) => format,
        Some(_) => "jpg",
    }
}

/// Cache file name of one image
pub fn image_file_name(term_id: i64, seq: usize, image: &ImageHit) -> String {
    format!("{}_{}.{}", term_id, seq, extension(image))
}

/// URL to download: the thumbnail unless it is missing or blank
pub fn download_url(image: &ImageHit) -> &str {
    image
        .thumbnail_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .unwrap_or(&image.content_url)
}

#[async_trait]
impl ImageStore for HttpImageStore {
    async fn download(&self, image: &ImageHit) -> Result<Vec<u8>, NerError> {
        let url = download_url(image);

        let download_error = |reason: String| NerError::EvidenceFetch {
            term: image.title.clone(),
            reason: format!("image {}: {}", url, reason),
        };

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| download_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(download_error(format!("HTTP {}", response.status().as_u16())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| download_error(e.to_string()))?;

        Ok(bytes.to_vec())
    }

    async fn save(
        &self,
        term_id: i64,
        seq: usize,
        image: &ImageHit,
        bytes: &[u8],
    ) -> Result<PathBuf, NerError> {
        tokio::fs::create_dir_all(&self.cache_dir).await?;
        let path = self.cache_dir.join(image_file_name(term_id, seq, image));
        tokio::fs::write(&path, bytes).await?;

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Image stored");

        Ok(path)
    }
}
