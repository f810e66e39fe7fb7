pub mod detail;
pub mod dispatcher;
pub mod driver;
pub mod fetcher;
pub mod pool;
pub mod web;

pub use driver::{DriverError, PageDriver, close_all};
