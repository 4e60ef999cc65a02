//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration comes from a TOML file and environment variables.
//! Runtime parameters (thresholds, provider selection) live in the database
//! `settings` table and are loaded by the service crate.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "HORUS_ROOT_FOLDER";

/// Bootstrap configuration loaded from TOML file
///
/// These settings cannot change while the service runs.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding the database, image cache and exports
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// API key for the web/image search provider
    #[serde(default)]
    pub search_api_key: Option<String>,

    /// Sidecar model services
    #[serde(default)]
    pub services: ServiceEndpoints,

    /// HTTP bind address (default 127.0.0.1:5790)
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            logging: LoggingConfig::default(),
            search_api_key: None,
            services: ServiceEndpoints::default(),
            bind_address: default_bind_address(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Base URLs of the external annotator and classifier services
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceEndpoints {
    #[serde(default = "default_annotator_url")]
    pub annotator_url: String,

    #[serde(default = "default_classifier_url")]
    pub classifier_url: String,
}

impl Default for ServiceEndpoints {
    fn default() -> Self {
        Self {
            annotator_url: default_annotator_url(),
            classifier_url: default_classifier_url(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_bind_address() -> String {
    "127.0.0.1:5790".to_string()
}

fn default_annotator_url() -> String {
    "http://127.0.0.1:5791".to_string()
}

fn default_classifier_url() -> String {
    "http://127.0.0.1:5792".to_string()
}

/// Load TOML configuration from an explicit path
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
}

/// Load TOML configuration from the platform config directory
///
/// A missing file is not an error: defaults are returned.
pub fn load_default_toml_config() -> Result<TomlConfig> {
    match default_config_path() {
        Some(path) if path.exists() => load_toml_config(&path),
        _ => Ok(TomlConfig::default()),
    }
}

/// `~/.config/horus/config.toml` (or the platform equivalent)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("horus").join("config.toml"))
}

/// Root folder resolution, in priority order:
/// 1. Explicit argument
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent default
pub fn resolve_root_folder(explicit: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("horus"))
        .unwrap_or_else(|| PathBuf::from("./horus_data"))
}

/// Resolved root folder with the fixed layout beneath it
#[derive(Debug, Clone)]
pub struct RootFolder {
    path: PathBuf,
}

impl RootFolder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the root folder and its sub-folders if missing
    pub fn ensure_directories_exist(&self) -> Result<()> {
        std::fs::create_dir_all(&self.path)?;
        std::fs::create_dir_all(self.image_cache_dir())?;
        std::fs::create_dir_all(self.output_dir())?;
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.path.join("horus.db")
    }

    /// Downloaded search images
    pub fn image_cache_dir(&self) -> PathBuf {
        self.path.join("cache").join("img")
    }

    /// Exported evidence matrices
    pub fn output_dir(&self) -> PathBuf {
        self.path.join("output")
    }
}
