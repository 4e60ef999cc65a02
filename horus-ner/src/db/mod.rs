//! Database access for horus-ner
//!
//! Schema creation lives in `horus_common::db`; this module holds the
//! per-table queries.

pub mod sentences;
pub mod settings;
pub mod terms;
pub mod web_results;
