//! Test Helper Utilities
//!
//! Shared utilities for testing horus-ner

#![allow(dead_code)]

pub mod db_utils;
pub mod mocks;

pub use db_utils::{create_test_db, test_pipeline};
pub use mocks::{
    location_image, logo_image, neutral_image, MockAnnotator, MockImageClassifier,
    MockImageStore, MockSearchProvider, MockTextClassifier, MockWeb, TermScenario,
};
