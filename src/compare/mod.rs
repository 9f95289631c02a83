//! Multi-model comparison: fans one question out to several models over the
//! shared retrieval index and aggregates per-model results deterministically.

pub mod engine;
pub mod types;

pub use engine::ModelComparison;
pub use types::{ComparisonResults, ModelResult, ResultMetrics};
