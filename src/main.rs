//! Fancy - command packages on demand
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use fancy::cli::args::parse_external;
use fancy::cli::{Cli, Commands};
use fancy::config::{ConfigManager, Overrides, Settings};
use fancy::error::{FancyError, FancyResult};
use std::error::Error as _;
use std::process::ExitCode;
use tracing::{debug, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            debug!("{}", error_chain(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> FancyResult<i32> {
    let log_filter = init_logging(cli.verbose, cli.debug);
    debug!("fancy {}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    let target_path = cli
        .target_path
        .as_deref()
        .map(|p| {
            std::path::absolute(p)
                .map_err(|e| FancyError::io(format!("resolving {}", p.display()), e))
        })
        .transpose()?;

    let settings = Settings::resolve(
        &config,
        Overrides {
            target_path,
            cache_home: cli.home.clone(),
            debug: cli.debug,
        },
    );

    // `general.debug` in the config file can still raise the level
    if settings.debug && !cli.debug {
        if let Err(e) = log_filter.reload(EnvFilter::new("fancy=debug")) {
            warn!("Could not raise log level: {}", e);
        }
    }

    debug!("Cache home: {}", settings.cache_home.display());

    // Dispatch to command
    match cli.command {
        Commands::Init(args) => {
            fancy::cli::commands::dispatch("init", args.to_raw(), &settings).await
        }
        Commands::External(line) => {
            let (name, invocation) = parse_external(&line)
                .ok_or_else(|| FancyError::User("No command given".to_string()))?;
            fancy::cli::commands::dispatch(&name, invocation.to_raw(), &settings).await
        }
        Commands::Cache(args) => fancy::cli::commands::cache(args, &settings)
            .await
            .map(|()| 0),
        Commands::Config(args) => fancy::cli::commands::config(args, &config, &config_manager)
            .await
            .map(|()| 0),
    }
}

/// Install the fmt subscriber behind a reloadable filter
///
/// 0 = warn (spinners only), 1 = info, 2+ or `--debug` = debug
fn init_logging(verbose: u8, debug: bool) -> reload::Handle<EnvFilter, Registry> {
    let filter = match verbose {
        _ if debug => EnvFilter::new("fancy=debug"),
        0 => EnvFilter::new("fancy=warn"),
        1 => EnvFilter::new("fancy=info"),
        _ => EnvFilter::new("fancy=debug"),
    };
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).without_time())
        .init();

    handle
}

/// Error message followed by each of its sources
fn error_chain(err: &FancyError) -> String {
    let mut chain = format!("{:?}", err);
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push_str(&format!("\n  caused by: {}", cause));
        source = cause.source();
    }
    chain
}
