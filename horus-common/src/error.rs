//! Error type for configuration and database bootstrap

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures while resolving configuration or opening the store
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Root folder creation or config file access
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unreadable TOML file or unparsable stored setting
    #[error("Configuration error: {0}")]
    Config(String),
}
