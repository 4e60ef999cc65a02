//! Production collaborators over HTTP

pub mod bing_client;
pub mod http_annotator;
pub mod http_classifier;
pub mod image_store;

pub use bing_client::BingClient;
pub use http_annotator::HttpAnnotator;
pub use http_classifier::{HttpImageClassifier, HttpTextClassifier};
pub use image_store::HttpImageStore;

use std::sync::Arc;

use crate::config::SearchProviderKind;
use crate::error::NerError;
use crate::types::SearchProvider;

/// Search client for the configured provider
pub fn search_provider(
    kind: SearchProviderKind,
    api_key: String,
) -> Result<Arc<dyn SearchProvider>, NerError> {
    match kind {
        SearchProviderKind::Bing => Ok(Arc::new(BingClient::new(api_key)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_matches_configured_kind() {
        let provider = search_provider(SearchProviderKind::Bing, "key".to_string()).unwrap();
        assert_eq!(provider.provider_id(), SearchProviderKind::Bing.id());
    }
}
