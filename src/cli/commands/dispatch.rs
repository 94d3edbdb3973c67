//! Dispatch command - run a command package through the lifecycle

use crate::config::Settings;
use crate::dispatch::{Dispatcher, InvocationContext, NodeLauncher};
use crate::error::{FancyError, FancyResult};
use crate::lifecycle::{self, Command, VersionRequirement};
use crate::registry::NpmRegistry;
use crate::version;
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use tracing::debug;

/// Execute `command` with its raw argument list, returning the child's exit code
pub async fn execute(command: &str, raw: Vec<Value>, settings: &Settings) -> FancyResult<i32> {
    let interpreter = &settings.runtime.interpreter;
    let current = version::probe_interpreter(interpreter).await?;
    version::check(&current, &settings.runtime.min_version)?;

    let registry = NpmRegistry::new(&settings.registry);
    let launcher = NodeLauncher::from_settings(settings);
    let dispatcher = Dispatcher::new(settings, &registry, &launcher);

    let mut package_command = PackageCommand::new(command, dispatcher);
    lifecycle::run(
        &mut package_command,
        raw,
        VersionRequirement {
            current: &current,
            minimum: &settings.runtime.min_version,
        },
    )
    .await
}

/// A command whose behavior lives in a cached package
pub struct PackageCommand<'a> {
    name: String,
    dispatcher: Dispatcher<'a>,
    invocation: Option<InvocationContext>,
}

impl<'a> PackageCommand<'a> {
    pub fn new(name: &str, dispatcher: Dispatcher<'a>) -> Self {
        Self {
            name: name.to_string(),
            dispatcher,
            invocation: None,
        }
    }
}

#[async_trait]
impl<'a> Command for PackageCommand<'a> {
    async fn init(&mut self, invocation: &InvocationContext) -> FancyResult<()> {
        let package = self.dispatcher.package_for(&self.name)?;
        debug!("{} is served by {}", self.name, package);
        self.invocation = Some(invocation.clone());
        Ok(())
    }

    async fn exec(&mut self) -> FancyResult<i32> {
        let invocation = self
            .invocation
            .as_ref()
            .ok_or_else(|| FancyError::Internal(format!("{} executed before init", self.name)))?;

        let pb = create_progress_bar(&format!("Preparing {}...", self.name));
        let entry = self.dispatcher.prepare(&self.name).await;
        pb.finish_and_clear();

        match entry? {
            Some(entry) => self.dispatcher.launch(&entry, invocation).await,
            None => Ok(0),
        }
    }
}

fn create_progress_bar(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
