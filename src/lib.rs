//! Fancy - command packages on demand
//!
//! Maps CLI commands to registry packages, keeps a version-namespaced
//! cache of them on disk and runs each command in its own interpreter
//! process.

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod lifecycle;
pub mod package;
pub mod registry;
pub mod version;

pub use error::{FancyError, FancyResult};
