//! ib - resolve issue keys in batches
//!
//! CLI entry point wiring the cache, queued lookup and batch coordinator.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result, eyre};
use futures::future::join_all;
use tracing::{debug, info};

use issuebatch::batch::{self, BatchCoordinator, BatchHandle};
use issuebatch::cli::{Cli, Command, OutputFormat, SourceArgs};
use issuebatch::config::Config;
use issuebatch::keys::extract_issue_keys;
use issuebatch::{Account, DispatchQueue, FixtureLookup, Issue, LookupError, MemoryCache, QueuedLookup};

fn setup_logging(level: Option<&str>) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("issuebatch")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Write to the log file, stdout carries results only
    let level: tracing::Level = match level {
        Some(level) => level.parse().map_err(|_| eyre!("Invalid log level: {}", level))?,
        None => tracing::Level::INFO,
    };
    let log_file = fs::File::create(log_dir.join("issuebatch.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Setup logging: CLI level wins over config
    setup_logging(cli.log_level.as_deref().or(config.log_level.as_deref())).context("Failed to setup logging")?;

    info!(accounts = config.accounts.len(), "ib loaded config");

    match cli.command {
        Command::Resolve { keys, source, format } => cmd_resolve(&config, keys, &source, format).await,
        Command::Scan { file, source, format } => cmd_scan(&config, &file, &source, format).await,
        Command::Config => cmd_config(&config),
    }
}

/// Resolve keys given on the command line
async fn cmd_resolve(config: &Config, keys: Vec<String>, source: &SourceArgs, format: OutputFormat) -> Result<()> {
    let handle = start_coordinator(config, &source.fixtures)?;
    let account = config.account_by_alias(source.account.as_deref().unwrap_or_default())?;

    let results = resolve_all(handle, keys, account).await;
    report(&results, format)
}

/// Resolve every key referenced in a file
async fn cmd_scan(config: &Config, file: &Path, source: &SourceArgs, format: OutputFormat) -> Result<()> {
    let text = fs::read_to_string(file).context(format!("Failed to read {}", file.display()))?;
    let keys = extract_issue_keys(&text, config.scan.inline_prefix.as_deref())?;
    debug!(file = %file.display(), keys = keys.len(), "cmd_scan: extracted keys");

    if keys.is_empty() {
        println!("No issue keys found in {}", file.display());
        return Ok(());
    }

    let handle = start_coordinator(config, &source.fixtures)?;
    let account = config.account_by_alias(source.account.as_deref().unwrap_or_default())?;

    let mut seen = std::collections::HashSet::new();
    let results: Vec<_> = resolve_all(handle, keys, account)
        .await
        .into_iter()
        .filter(|(key, _)| seen.insert(key.clone()))
        .collect();
    report(&results, format)
}

/// Print the effective configuration
fn cmd_config(config: &Config) -> Result<()> {
    let yaml = serde_yaml::to_string(config).context("Failed to serialize config")?;
    print!("{}", yaml);
    Ok(())
}

/// Install the process-wide coordinator backed by the fixture lookup
fn start_coordinator(config: &Config, fixtures: &Path) -> Result<&'static BatchHandle> {
    let fixtures = FixtureLookup::from_file(fixtures)?;
    let queue = DispatchQueue::new(config.queue);
    let lookup = QueuedLookup::new(Arc::new(fixtures), queue, &config.lookup);
    let cache = MemoryCache::new(&config.cache);
    let coordinator = BatchCoordinator::new(config.batch.clone(), Arc::new(cache), Arc::new(lookup));

    Ok(batch::global_handle(move || {
        let (handle, _task) = coordinator.spawn();
        handle
    }))
}

/// Register every key in one burst and wait for all outcomes
async fn resolve_all(
    handle: &BatchHandle,
    keys: Vec<String>,
    account: Option<Account>,
) -> Vec<(String, Result<Issue, LookupError>)> {
    join_all(keys.into_iter().map(|key| {
        let account = account.clone();
        async move {
            let result = handle.resolve(key.clone(), account).await;
            (key, result)
        }
    }))
    .await
}

fn report(results: &[(String, Result<Issue, LookupError>)], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json: Vec<_> = results
                .iter()
                .map(|(key, result)| match result {
                    Ok(issue) => serde_json::json!({ "key": key, "issue": issue }),
                    Err(e) => serde_json::json!({ "key": key, "error": e.to_string() }),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            for (key, result) in results {
                match result {
                    Ok(issue) => println!("{}  {}", key.green().bold(), issue.summary().unwrap_or("-")),
                    Err(e) => println!("{}  {}", key.red().bold(), e.to_string().red()),
                }
            }
        }
    }

    let failed = results.iter().filter(|(_, result)| result.is_err()).count();
    if failed > 0 {
        return Err(eyre!("{} of {} keys failed to resolve", failed, results.len()));
    }
    Ok(())
}
