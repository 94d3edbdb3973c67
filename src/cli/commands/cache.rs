//! Cache command - inspect cached command packages

use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::config::Settings;
use crate::error::FancyResult;
use crate::package::{list_entries, CacheEntry};
use console::style;

/// Execute the cache command
pub async fn execute(args: CacheArgs, settings: &Settings) -> FancyResult<()> {
    match args.action {
        CacheAction::List { format } => list_packages(settings, format).await,
        CacheAction::Path => {
            println!("{}", settings.store_dir().display());
            Ok(())
        }
    }
}

/// List cached packages
async fn list_packages(settings: &Settings, format: OutputFormat) -> FancyResult<()> {
    let entries = list_entries(&settings.store_dir()).await?;

    match format {
        OutputFormat::Table => print_cache_table(&entries),
        OutputFormat::Json => print_cache_json(&entries)?,
        OutputFormat::Plain => print_cache_plain(&entries),
    }

    Ok(())
}

fn print_cache_table(entries: &[CacheEntry]) {
    if entries.is_empty() {
        println!("No cached packages found.");
        return;
    }

    println!("{:<40} {:<12} {:<20}", "PACKAGE", "VERSION", "FETCHED");
    println!("{}", "-".repeat(72));

    for entry in entries {
        let fetched = entry
            .modified
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| style("unknown").dim().to_string());

        println!(
            "{:<40} {:<12} {:<20}",
            entry.name,
            style(&entry.version).green(),
            fetched
        );
    }

    println!();
    println!("Total: {} package(s)", entries.len());
}

fn print_cache_json(entries: &[CacheEntry]) -> FancyResult<()> {
    #[derive(serde::Serialize)]
    struct EntryJson<'a> {
        name: &'a str,
        version: &'a str,
        path: String,
        fetched_at: Option<String>,
    }

    let json_entries: Vec<EntryJson> = entries
        .iter()
        .map(|e| EntryJson {
            name: &e.name,
            version: &e.version,
            path: e.path.display().to_string(),
            fetched_at: e.modified.map(|t| t.to_rfc3339()),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&json_entries)?);
    Ok(())
}

fn print_cache_plain(entries: &[CacheEntry]) {
    for entry in entries {
        println!("{}@{}", entry.name, entry.version);
    }
}
