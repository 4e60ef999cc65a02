//! Threshold fusion and compound propagation

pub mod propagator;
pub mod threshold;

pub use propagator::propagate_compounds;
pub use threshold::{HighBiasRule, ThresholdFusion};
