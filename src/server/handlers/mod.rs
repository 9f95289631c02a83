pub mod health;
pub mod metrics;
pub mod models;
pub mod query;
