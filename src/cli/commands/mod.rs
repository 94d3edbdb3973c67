//! CLI command implementations

pub mod cache;
pub mod config;
pub mod dispatch;

pub use cache::execute as cache;
pub use config::execute as config;
pub use dispatch::execute as dispatch;
