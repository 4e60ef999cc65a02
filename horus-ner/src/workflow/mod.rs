//! Run orchestration
//!
//! [`SentenceProcessor`] turns one input sentence into a cached annotation
//! bundle; [`Pipeline`] drives a whole run over those bundles.

pub mod pipeline;
pub mod sentence_processor;

pub use pipeline::{AnnotationRun, ExportRun, Pipeline, PipelineServices};
pub use sentence_processor::{build_layer, SentenceProcessor};
