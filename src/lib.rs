pub mod cache;
pub mod config;
pub mod crawlers;
pub mod monitor;
pub mod parsers;
pub mod results;
pub mod sink;
pub mod tracker;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types for convenience
pub use config::MonitorConfig;
pub use monitor::{Monitor, Phase};
pub use results::{DetailOutcome, JobDetail, JobRecord};
