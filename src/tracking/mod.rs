//! Experiment tracking: one persisted run per tracked comparison request,
//! with the question/parameters and per-model timing metrics.

mod tracker;

pub use tracker::ExperimentTracker;
