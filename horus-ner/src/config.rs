//! Configuration resolution for horus-ner
//!
//! Multi-tier resolution with Database → ENV → TOML priority. Runtime
//! parameters live in the `settings` table; missing keys are written back with
//! their defaults.

use horus_common::config::TomlConfig;
use sqlx::{Pool, Sqlite};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

use crate::db::settings::{get_or_init_setting, get_setting};
use crate::error::NerError;
use crate::types::AnnotatorKind;

/// Environment variable holding the search API key
pub const SEARCH_API_KEY_ENV: &str = "HORUS_SEARCH_API_KEY";

// ============================================================================
// Enumerated settings
// ============================================================================

/// Web/image search provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchProviderKind {
    Bing,
}

impl SearchProviderKind {
    /// Id persisted with every cached term
    pub fn id(self) -> i64 {
        match self {
            SearchProviderKind::Bing => 1,
        }
    }
}

impl FromStr for SearchProviderKind {
    type Err = NerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bing" => Ok(SearchProviderKind::Bing),
            other => Err(NerError::Configuration(format!(
                "unsupported search provider '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for SearchProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchProviderKind::Bing => f.write_str("bing"),
        }
    }
}

/// Object-detection model family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectDetectionBackend {
    Sift,
    Cnn,
}

impl FromStr for ObjectDetectionBackend {
    type Err = NerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sift" => Ok(ObjectDetectionBackend::Sift),
            "cnn" => Ok(ObjectDetectionBackend::Cnn),
            other => Err(NerError::Configuration(format!(
                "unsupported object detection backend '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for ObjectDetectionBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectDetectionBackend::Sift => f.write_str("sift"),
            ObjectDetectionBackend::Cnn => f.write_str("cnn"),
        }
    }
}

/// Text-classification model family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextClassificationBackend {
    Bow,
    Topic,
}

impl FromStr for TextClassificationBackend {
    type Err = NerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bow" => Ok(TextClassificationBackend::Bow),
            "topic" => Ok(TextClassificationBackend::Topic),
            other => Err(NerError::Configuration(format!(
                "unsupported text classification backend '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for TextClassificationBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextClassificationBackend::Bow => f.write_str("bow"),
            TextClassificationBackend::Topic => f.write_str("topic"),
        }
    }
}

// ============================================================================
// Runtime settings
// ============================================================================

/// Runtime parameters of the evidence and fusion stages
#[derive(Debug, Clone, PartialEq)]
pub struct FusionSettings {
    pub search_provider: SearchProviderKind,
    /// Requested results per query; also caps the results aggregated per term
    pub search_result_count: usize,
    /// Positive place sub-categories needed to count an image as a location (T)
    pub location_vote_threshold: usize,
    /// Base fusion threshold (θ)
    pub distance_theta: i64,
    pub high_bias_enabled: bool,
    pub min_location_polarity: i64,
    pub safe_interval: i64,
    pub annotator: AnnotatorKind,
    pub object_detection_backend: ObjectDetectionBackend,
    pub text_classification_backend: TextClassificationBackend,
    pub document_features_version: i64,
    pub image_features_version: i64,
}

impl Default for FusionSettings {
    fn default() -> Self {
        Self {
            search_provider: SearchProviderKind::Bing,
            search_result_count: 10,
            location_vote_threshold: 5,
            distance_theta: 2,
            high_bias_enabled: false,
            min_location_polarity: 0,
            safe_interval: 5,
            annotator: AnnotatorKind::Stanford,
            object_detection_backend: ObjectDetectionBackend::Sift,
            text_classification_backend: TextClassificationBackend::Bow,
            document_features_version: 1,
            image_features_version: 1,
        }
    }
}

/// Read an enumerated setting stored as text
async fn load_enum<T>(db: &Pool<Sqlite>, key: &str, default: T) -> Result<T, NerError>
where
    T: FromStr<Err = NerError> + fmt::Display,
{
    let raw = get_or_init_setting(db, key, default.to_string()).await?;
    raw.parse::<T>()
}

impl FusionSettings {
    /// Load from the settings table, writing defaults for missing keys
    ///
    /// Unsupported values are a configuration error.
    pub async fn load(db: &Pool<Sqlite>) -> Result<Self, NerError> {
        let defaults = Self::default();

        let settings = Self {
            search_provider: load_enum(db, "search_provider", defaults.search_provider).await?,
            search_result_count: get_or_init_setting(
                db,
                "search_result_count",
                defaults.search_result_count,
            )
            .await?,
            location_vote_threshold: get_or_init_setting(
                db,
                "location_vote_threshold",
                defaults.location_vote_threshold,
            )
            .await?,
            distance_theta: get_or_init_setting(db, "distance_theta", defaults.distance_theta)
                .await?,
            high_bias_enabled: get_or_init_setting(
                db,
                "high_bias_enabled",
                defaults.high_bias_enabled,
            )
            .await?,
            min_location_polarity: get_or_init_setting(
                db,
                "min_location_polarity",
                defaults.min_location_polarity,
            )
            .await?,
            safe_interval: get_or_init_setting(db, "safe_interval", defaults.safe_interval).await?,
            annotator: load_enum(db, "annotator", defaults.annotator).await?,
            object_detection_backend: load_enum(
                db,
                "object_detection_backend",
                defaults.object_detection_backend,
            )
            .await?,
            text_classification_backend: load_enum(
                db,
                "text_classification_backend",
                defaults.text_classification_backend,
            )
            .await?,
            document_features_version: get_or_init_setting(
                db,
                "document_features_version",
                defaults.document_features_version,
            )
            .await?,
            image_features_version: get_or_init_setting(
                db,
                "image_features_version",
                defaults.image_features_version,
            )
            .await?,
        };

        settings.validate()?;

        info!(
            provider = %settings.search_provider,
            annotator = %settings.annotator,
            theta = settings.distance_theta,
            high_bias = settings.high_bias_enabled,
            "Fusion settings loaded"
        );

        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), NerError> {
        if self.search_result_count == 0 {
            return Err(NerError::Configuration(
                "search_result_count must be at least 1".to_string(),
            ));
        }
        if self.location_vote_threshold == 0 {
            return Err(NerError::Configuration(
                "location_vote_threshold must be at least 1".to_string(),
            ));
        }
        if self.distance_theta < 0 {
            return Err(NerError::Configuration(
                "distance_theta must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Search API key
// ============================================================================

/// Resolve the search API key from 3-tier configuration
///
/// **Priority:** Database → ENV → TOML
pub async fn resolve_search_api_key(
    db: &Pool<Sqlite>,
    toml_config: &TomlConfig,
) -> Result<String, NerError> {
    let db_key: Option<String> = get_setting(db, "search_api_key").await?;
    let env_key = std::env::var(SEARCH_API_KEY_ENV).ok();
    let toml_key = toml_config.search_api_key.clone();

    let candidates = [
        ("database", db_key),
        ("environment", env_key),
        ("TOML", toml_key),
    ];

    let valid: Vec<(&str, String)> = candidates
        .into_iter()
        .filter_map(|(source, key)| key.filter(|k| is_valid_key(k)).map(|k| (source, k)))
        .collect();

    if valid.len() > 1 {
        let sources: Vec<&str> = valid.iter().map(|(source, _)| *source).collect();
        warn!(
            "Search API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    match valid.into_iter().next() {
        Some((source, key)) => {
            info!("Search API key loaded from {}", source);
            Ok(key)
        }
        None => Err(NerError::Configuration(format!(
            "search API key not configured. Set one of:\n\
             1. settings table: key 'search_api_key'\n\
             2. Environment: {}=your-key\n\
             3. TOML config: ~/.config/horus/config.toml (search_api_key = \"your-key\")",
            SEARCH_API_KEY_ENV
        ))),
    }
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
