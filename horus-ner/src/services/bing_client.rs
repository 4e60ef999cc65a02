//! Bing Web/Image Search client
//!
//! Implements [`SearchProvider`] over the v7 REST endpoints. Requests are
//! spaced by a minimum interval.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::config::SearchProviderKind;
use crate::error::NerError;
use crate::types::{DocumentHit, ImageHit, SearchProvider, SearchResponse};

pub const BING_BASE_URL: &str = "https://api.bing.microsoft.com";
const USER_AGENT: &str = "horus-ner/0.1.0";
const RATE_LIMIT_MS: u64 = 350;
const SUBSCRIPTION_HEADER: &str = "Ocp-Apim-Subscription-Key";

// ============================================================================
// Response bodies
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebSearchBody {
    web_pages: Option<WebPages>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebPages {
    #[serde(default)]
    total_estimated_matches: Option<u64>,
    #[serde(default)]
    value: Vec<WebPage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebPage {
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    display_url: String,
    #[serde(default)]
    snippet: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageSearchBody {
    #[serde(default)]
    total_estimated_matches: Option<u64>,
    #[serde(default)]
    value: Vec<ImageValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageValue {
    content_url: String,
    #[serde(default)]
    name: String,
    encoding_format: Option<String>,
    thumbnail_url: Option<String>,
}

fn parse_documents(term: &str, body: &str, count: usize) -> Result<SearchResponse<DocumentHit>, NerError> {
    let parsed: WebSearchBody = serde_json::from_str(body).map_err(|e| NerError::EvidenceFetch {
        term: term.to_string(),
        reason: format!("invalid web search response: {}", e),
    })?;

    let pages = parsed.web_pages.unwrap_or(WebPages {
        total_estimated_matches: None,
        value: Vec::new(),
    });

    let results = pages
        .value
        .into_iter()
        .take(count)
        .map(|page| DocumentHit {
            url: if page.url.is_empty() { page.display_url } else { page.url },
            title: page.name,
            snippet: page.snippet,
        })
        .collect();

    Ok(SearchResponse {
        results,
        metadata: json!({
            "query": term,
            "total_estimated_matches": pages.total_estimated_matches,
        })
        .to_string(),
    })
}

fn parse_images(term: &str, body: &str, count: usize) -> Result<SearchResponse<ImageHit>, NerError> {
    let parsed: ImageSearchBody = serde_json::from_str(body).map_err(|e| NerError::EvidenceFetch {
        term: term.to_string(),
        reason: format!("invalid image search response: {}", e),
    })?;

    let results = parsed
        .value
        .into_iter()
        .take(count)
        .map(|image| ImageHit {
            content_url: image.content_url,
            thumbnail_url: image.thumbnail_url,
            title: image.name,
            encoding_format: image.encoding_format,
        })
        .collect();

    Ok(SearchResponse {
        results,
        metadata: json!({
            "query": term,
            "total_estimated_matches": parsed.total_estimated_matches,
        })
        .to_string(),
    })
}

// ============================================================================
// Client
// ============================================================================

/// Minimum spacing between requests
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Search rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

pub struct BingClient {
    http_client: reqwest::Client,
    rate_limiter: RateLimiter,
    base_url: String,
    api_key: String,
}

impl BingClient {
    pub fn new(api_key: String) -> Result<Self, NerError> {
        Self::with_base_url(api_key, BING_BASE_URL)
    }

    pub fn with_base_url(api_key: String, base_url: &str) -> Result<Self, NerError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| NerError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            rate_limiter: RateLimiter::new(RATE_LIMIT_MS),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn query(&self, term: &str, path: &str, count: usize) -> Result<String, NerError> {
        self.rate_limiter.wait().await;

        let fetch_error = |reason: String| NerError::EvidenceFetch {
            term: term.to_string(),
            reason,
        };

        tracing::debug!(term, path, count, "Querying search provider");

        let count = count.to_string();
        let response = self
            .http_client
            .get(format!("{}{}", self.base_url, path))
            .header(SUBSCRIPTION_HEADER, &self.api_key)
            .query(&[("q", term), ("count", count.as_str())])
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(fetch_error(format!("HTTP {}: {}", status.as_u16(), error_text)));
        }

        response.text().await.map_err(|e| fetch_error(e.to_string()))
    }
}

#[async_trait]
impl SearchProvider for BingClient {
    fn provider_id(&self) -> i64 {
        SearchProviderKind::Bing.id()
    }

    async fn search_documents(
        &self,
        term: &str,
        count: usize,
    ) -> Result<SearchResponse<DocumentHit>, NerError> {
        let body = self.query(term, "/v7.0/search", count).await?;
        parse_documents(term, &body, count)
    }

    async fn search_images(
        &self,
        term: &str,
        count: usize,
    ) -> Result<SearchResponse<ImageHit>, NerError> {
        let body = self.query(term, "/v7.0/images/search", count).await?;
        parse_images(term, &body, count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_documents() {
        let body = r#"{
            "webPages": {
                "totalEstimatedMatches": 1200,
                "value": [
                    {"id": "0", "name": "Paris - Wikipedia", "url": "https://en.wikipedia.org/wiki/Paris",
                     "displayUrl": "en.wikipedia.org/wiki/Paris", "snippet": "Paris is the capital of France."},
                    {"id": "1", "name": "Visit Paris", "displayUrl": "parisinfo.com", "snippet": ""}
                ]
            }
        }"#;

        let response = parse_documents("Paris", body, 10).unwrap();

        assert_eq!(response.results.len(), 2);
        assert_eq!(response.results[0].title, "Paris - Wikipedia");
        assert_eq!(response.results[1].url, "parisinfo.com");
        assert!(response.metadata.contains("1200"));
    }

    #[test]
    fn test_parse_documents_without_web_pages() {
        let response = parse_documents("zzqx", "{}", 10).unwrap();
        assert!(response.results.is_empty());
    }

    #[test]
    fn test_parse_images_caps_count() {
        let body = r#"{"value": [
            {"contentUrl": "https://a/1.jpg", "name": "one", "encodingFormat": "jpeg", "thumbnailUrl": "https://t/1"},
            {"contentUrl": "https://a/2.png", "name": "two"},
            {"contentUrl": "https://a/3.png", "name": "three"}
        ]}"#;

        let response = parse_images("Paris", body, 2).unwrap();

        assert_eq!(response.results.len(), 2);
        assert_eq!(response.results[0].thumbnail_url.as_deref(), Some("https://t/1"));
        assert_eq!(response.results[1].encoding_format, None);
    }

    #[test]
    fn test_parse_invalid_body_is_fetch_error() {
        let err = parse_images("Paris", "not json", 5).unwrap_err();
        assert!(matches!(err, NerError::EvidenceFetch { .. }));
    }
}
