//! Command lifecycle
//!
//! Every command runs through the same four stages:
//!
//! 1. version check against the minimum runtime version
//! 2. argument normalization (trailing options object split off)
//! 3. [`Command::init`]
//! 4. [`Command::exec`]
//!
//! The first failing stage ends the run.

use crate::dispatch::InvocationContext;
use crate::error::FancyResult;
use crate::version;
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

/// A command driven by [`run`]
#[async_trait]
pub trait Command: Send {
    /// Prepare command state from the normalized invocation
    async fn init(&mut self, invocation: &InvocationContext) -> FancyResult<()>;

    /// Do the work and return the process exit code
    async fn exec(&mut self) -> FancyResult<i32>;
}

/// Runtime versions the first stage compares
#[derive(Debug, Clone, Copy)]
pub struct VersionRequirement<'a> {
    pub current: &'a str,
    pub minimum: &'a str,
}

/// Run `command` through all stages with the raw argument list
pub async fn run<C: Command + ?Sized>(
    command: &mut C,
    raw: Vec<Value>,
    requirement: VersionRequirement<'_>,
) -> FancyResult<i32> {
    version::check(requirement.current, requirement.minimum)?;
    debug!("Runtime {} satisfies {}", requirement.current, requirement.minimum);

    let invocation = InvocationContext::from_raw(raw)?;
    debug!("Normalized {} positional argument(s)", invocation.args.len());

    command.init(&invocation).await?;
    command.exec().await
}
