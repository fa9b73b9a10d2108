/*!
Continuous subdomain discovery.

Queries passive sources for every target domain, merges the names, compares them with a
persisted baseline and reports the ones never seen before.
*/

pub mod core;

pub use crate::core::BoxError;
pub use crate::core::config::MonitorConfig;
pub use crate::core::monitor::{MonitorPipeline, MonitorStats, SubdomainMonitor};
