//! Aggregation of task outputs into the final feedback.

pub mod aggregator;

pub use aggregator::*;
