//! CLI argument definitions using clap derive

use crate::dispatch::{InvocationContext, InvocationOptions};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::path::PathBuf;

/// Fancy - scaffolding commands delivered as cached packages
///
/// Each command is a package fetched from the registry on first use,
/// kept up to date, and run in its own process.
#[derive(Parser, Debug)]
#[command(name = "fancy")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Debug mode: full error details, child logs at verbose level
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "FANCY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Run the command from a local module instead of the cache
    #[arg(long, global = true, env = "CLI_TARGET_PATH")]
    pub target_path: Option<PathBuf>,

    /// Cache home directory
    #[arg(long, global = true, env = "CLI_HOME_PATH")]
    pub home: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new project
    Init(InitArgs),

    /// Inspect cached command packages
    Cache(CacheArgs),

    /// Show configuration
    Config(ConfigArgs),

    /// Any command mapped in the [commands] config table
    #[command(external_subcommand)]
    External(Vec<String>),
}

/// Arguments for the init command
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Name of the project to create
    pub project_name: Option<String>,

    /// Overwrite an existing directory
    #[arg(short, long)]
    pub force: bool,
}

impl InitArgs {
    /// Raw argument list for the lifecycle: positionals then the options object
    pub fn to_raw(&self) -> Vec<Value> {
        let mut options = InvocationOptions::new();
        options.insert("force", self.force);
        let args = self.project_name.iter().cloned().collect();
        InvocationContext::new(args, options).to_raw()
    }
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show effective configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration file
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for listings
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List cached packages
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show the cache store directory
    Path,
}

/// Split an external subcommand line into its name and invocation
///
/// `--key=value` and `--key value` become string options, a bare `--flag`
/// becomes `true` and `--no-flag` becomes `false`. Keys are camel-cased.
/// Everything after `--` is positional.
///
/// `--key value` takes the next argument unless it starts with `--`, so a
/// boolean flag followed by a positional swallows it. Put such flags last,
/// or write `--flag=true`.
pub fn parse_external(line: &[String]) -> Option<(String, InvocationContext)> {
    let (name, rest) = line.split_first()?;
    let mut args = Vec::new();
    let mut options = InvocationOptions::new();
    let mut iter = rest.iter().peekable();

    while let Some(arg) = iter.next() {
        if arg == "--" {
            args.extend(iter.by_ref().cloned());
            break;
        }

        let Some(flag) = arg.strip_prefix("--").filter(|f| !f.is_empty()) else {
            args.push(arg.clone());
            continue;
        };

        if let Some((key, value)) = flag.split_once('=') {
            options.insert(camel_case(key), value);
        } else if let Some(negated) = flag.strip_prefix("no-") {
            options.insert(camel_case(negated), false);
        } else if let Some(value) = iter.next_if(|next| !next.starts_with("--")) {
            options.insert(camel_case(flag), value.as_str());
        } else {
            options.insert(camel_case(flag), true);
        }
    }

    Some((name.clone(), InvocationContext::new(args, options)))
}

/// `dry-run` -> `dryRun`
fn camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for c in key.chars() {
        if c == '-' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn line(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn cli_parses_init() {
        let cli = Cli::parse_from(["fancy", "init", "my-app", "--force"]);
        match cli.command {
            Commands::Init(args) => {
                assert_eq!(args.project_name.as_deref(), Some("my-app"));
                assert!(args.force);
            }
            _ => panic!("expected Init command"),
        }
    }

    #[test]
    fn init_raw_ends_with_options() {
        let cli = Cli::parse_from(["fancy", "init", "-f", "demo"]);
        let Commands::Init(args) = cli.command else {
            panic!("expected Init command");
        };
        assert_eq!(args.to_raw(), vec![json!("demo"), json!({"force": true})]);
    }

    #[test]
    fn init_without_name() {
        let cli = Cli::parse_from(["fancy", "init"]);
        let Commands::Init(args) = cli.command else {
            panic!("expected Init command");
        };
        assert_eq!(args.to_raw(), vec![json!({"force": false})]);
    }

    #[test]
    fn cli_parses_global_overrides() {
        let cli = Cli::parse_from([
            "fancy",
            "--debug",
            "--target-path",
            "/tmp/module",
            "--home",
            "/tmp/home",
            "cache",
            "path",
        ]);
        assert!(cli.debug);
        assert_eq!(cli.target_path, Some(PathBuf::from("/tmp/module")));
        assert_eq!(cli.home, Some(PathBuf::from("/tmp/home")));
        assert!(matches!(
            cli.command,
            Commands::Cache(CacheArgs {
                action: CacheAction::Path
            })
        ));
    }

    #[test]
    fn cli_routes_unknown_subcommands() {
        let cli = Cli::parse_from(["fancy", "component", "Button", "--style=css"]);
        match cli.command {
            Commands::External(line) => assert_eq!(line, vec!["component", "Button", "--style=css"]),
            _ => panic!("expected External command"),
        }
    }

    #[test]
    fn parse_external_options() {
        let (name, ctx) = parse_external(&line(&[
            "component",
            "Button",
            "--style=css",
            "--out-dir",
            "src/ui",
            "--dry-run",
            "--no-test",
            "extra",
        ]))
        .unwrap();

        assert_eq!(name, "component");
        assert_eq!(ctx.args, vec!["Button".to_string(), "extra".to_string()]);
        assert_eq!(ctx.options.get("style"), Some(&json!("css")));
        assert_eq!(ctx.options.get("outDir"), Some(&json!("src/ui")));
        assert!(ctx.options.flag("dryRun"));
        assert_eq!(ctx.options.get("test"), Some(&json!(false)));
    }

    #[test]
    fn flag_takes_following_word_as_value() {
        let (_, ctx) = parse_external(&line(&["component", "--dry-run", "Button"])).unwrap();
        assert_eq!(ctx.options.get("dryRun"), Some(&json!("Button")));
        assert!(ctx.args.is_empty());

        let (_, ctx) =
            parse_external(&line(&["component", "--dry-run=true", "Button"])).unwrap();
        assert_eq!(ctx.options.get("dryRun"), Some(&json!("true")));
        assert_eq!(ctx.args, vec!["Button".to_string()]);
    }

    #[test]
    fn parse_external_double_dash() {
        let (_, ctx) = parse_external(&line(&["run", "--verbose", "--", "--literal"])).unwrap();
        assert!(ctx.options.flag("verbose"));
        assert_eq!(ctx.args, vec!["--literal".to_string()]);
    }

    #[test]
    fn parse_external_empty() {
        assert!(parse_external(&[]).is_none());
    }

    #[test]
    fn camel_case_keys() {
        assert_eq!(camel_case("target-path"), "targetPath");
        assert_eq!(camel_case("force"), "force");
    }
}
