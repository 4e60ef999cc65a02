//! Web evidence: per-term cache and per-channel aggregation

pub mod aggregator;
pub mod cache;

pub use aggregator::{
    dominance_distance, majority_class, summarize_documents, summarize_images, EvidenceAggregator,
};
pub use cache::{EvidenceCache, TermEvidenceIds};
