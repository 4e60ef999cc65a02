//! HTTP API handlers for horus-ner

pub mod annotate;
pub mod export;
pub mod health;

pub use annotate::annotate_routes;
pub use export::export_routes;
pub use health::health_routes;
