//! # HORUS Common Library
//!
//! Shared code for the HORUS named-entity recognition service:
//! - Error type shared by every crate in the workspace
//! - Configuration loading and root folder resolution
//! - Database bootstrap (pool creation and table creation)

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
