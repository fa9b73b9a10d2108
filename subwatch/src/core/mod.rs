/*!
Core modules for the subdomain monitor
*/

pub mod aggregator;
pub mod baseline_store;
pub mod config;
pub mod monitor;
pub mod normalizer;
pub mod notifiers;
pub mod results;
pub mod scheduler;
pub mod subdomain;
pub mod targets;

/// Error type used across the application layer
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
