//! Shopfront main entry point
//!
//! This is the command-line interface for the Shopfront catalogue harvester.

use clap::Parser;
use std::path::{Path, PathBuf};
use shopfront::config::{load_config_with_hash, Config};
use shopfront::pipeline::{run_all_stages, HarvestSummary};
use shopfront::storage::{open_storage, Storage, TABLES};
use tracing_subscriber::EnvFilter;

/// Shopfront: a concurrent catalogue harvester
///
/// Shopfront walks a storefront in four stages (categories, listing pages,
/// article URLs, article data) and stores every stage in a SQLite table.
#[derive(Parser, Debug)]
#[command(name = "shopfront")]
#[command(version = "1.0.0")]
#[command(about = "A concurrent catalogue harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be harvested without fetching anything
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show row counts and a preview of every table, then exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_harvest(&config).await?;
    }

    Ok(())
}

/// Sets up the tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("shopfront=info,warn"),
            1 => EnvFilter::new("shopfront=debug,info"),
            2 => EnvFilter::new("shopfront=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: prints the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Shopfront Dry Run ===\n");

    println!("Site:");
    println!("  Name: {}", config.site.name);
    println!("  Base URL: {}", config.site.base_url);
    println!("  User agent: {}", config.site.user_agent);
    for (name, value) in &config.site.headers {
        println!("  Header {}: {}", name, value);
    }

    println!("\nPipeline:");
    println!("  Concurrency limit: {}", config.pipeline.concurrency_limit);
    println!("  Batch size: {}", config.pipeline.batch_size);

    println!("\nRetry:");
    println!("  Max attempts: {}", config.retry.max_retries);
    println!("  Timeout per attempt: {}s", config.retry.timeout_secs);
    println!("  Backoff factor: {}s", config.retry.backoff_factor);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\nExtra Categories ({}):", config.extra_categories.len());
    for entry in &config.extra_categories {
        println!(
            "  - {} {}/{}/{} -> {}",
            entry.id, entry.gender, entry.category, entry.subcategory, entry.base_url
        );
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start harvesting from {}", config.site.base_url);
}

/// Handles the --stats mode: row counts and a short preview per table
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))?;

    for schema in TABLES.iter() {
        // Tables of stages that never ran do not exist yet
        let count = match storage.count_rows(schema.name) {
            Ok(count) => count,
            Err(e) => {
                println!("{}: not available ({})\n", schema.name, e);
                continue;
            }
        };

        println!("{}: {} rows", schema.name, count);
        for record in storage.preview(schema.name, 5)? {
            let line = record
                .iter()
                .map(|(column, value)| format!("{}={}", column, value))
                .collect::<Vec<_>>()
                .join(", ");
            println!("  {}", line);
        }
        println!();
    }

    Ok(())
}

/// Handles the main harvest
async fn handle_harvest(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Harvesting {} with at most {} concurrent requests",
        config.site.base_url,
        config.pipeline.concurrency_limit
    );

    let mut storage = open_storage(Path::new(&config.output.database_path))?;

    match run_all_stages(config, &mut storage).await {
        Ok(summary) => {
            print_summary(&summary);
            tracing::info!("Harvest completed");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}

fn print_summary(summary: &HarvestSummary) {
    println!("\n=== Harvest Summary ===\n");
    for report in &summary.stages {
        println!(
            "[{}] {:<14} {:>8} inputs {:>8} rows {:>6} failed",
            report.stage,
            report.name,
            report.inputs,
            report.succeeded,
            report.failed_count()
        );
    }
    if summary.total_failed() > 0 {
        println!("\n{} items failed in total", summary.total_failed());
    }
}
