//! Shelf-Harvest main entry point
//!
//! This is the command-line interface for the Shelf-Harvest catalog harvester.

use anyhow::Context;
use clap::Parser;
use shelf_harvest::config::{load_config_with_hash, Config};
use shelf_harvest::crawler::{harvest, listing_url};
use shelf_harvest::output::print_summary;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Shelf-Harvest: a polite catalog harvester
///
/// Shelf-Harvest walks the paginated category listings of a book catalog,
/// drops duplicate entries, enriches each unique entry from its detail page
/// and checkpoints the accumulated records to JSON while it runs.
#[derive(Parser, Debug)]
#[command(name = "shelf-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A polite catalog harvester", long_about = None)]
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

    /// Validate config and show what would be harvested without harvesting
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config)?;
    } else {
        handle_harvest(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("shelf_harvest=info,warn"),
            1 => EnvFilter::new("shelf_harvest=debug,info"),
            2 => EnvFilter::new("shelf_harvest=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows the harvest plan
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Shelf-Harvest Dry Run ===\n");

    println!("Harvester Configuration:");
    println!(
        "  Max concurrent requests: {}",
        config.harvester.max_concurrent_requests
    );
    println!("  Request timeout: {}s", config.harvester.request_timeout_secs);
    println!(
        "  Request delay: {}-{}ms (error factor {})",
        config.harvester.min_request_delay_ms,
        config.harvester.max_request_delay_ms,
        config.harvester.error_delay_factor
    );
    println!(
        "  Retries: {} attempts, backoff {}-{}ms",
        config.retry.max_attempts, config.retry.base_delay_ms, config.retry.max_delay_ms
    );

    println!("\nSource:");
    println!("  Base URL: {}", config.source.base_url);
    println!("  Page size: {}", config.source.page_size);
    println!(
        "  Max pages per category: {}",
        config.source.max_pages_per_category
    );
    if config.source.accept_invalid_certs {
        println!("  WARNING: TLS certificate validation disabled");
    }

    println!("\nOutput:");
    println!(
        "  Checkpoint: {} (every {} records)",
        config.output.checkpoint_path, config.output.checkpoint_interval
    );
    println!("  Final: {}", config.output.final_path);

    println!("\nCategories ({}):", config.categories.len());
    for category in &config.categories {
        let first_page = listing_url(&config.source, &category.list_id, 1)?;
        println!("  - {} (quota {})", category.name, category.quota);
        println!("    * {}", first_page);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would harvest up to {} records",
        config.categories.iter().map(|c| c.quota).sum::<usize>()
    );

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        "Categories: {}, total quota: {}",
        config.categories.len(),
        config.categories.iter().map(|c| c.quota).sum::<usize>()
    );

    match harvest(config).await {
        Ok(summary) => {
            tracing::info!("Harvest completed successfully");
            print_summary(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}
