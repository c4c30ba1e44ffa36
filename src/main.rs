//! Pricewatch main entry point
//!
//! Command-line interface for the marketplace product watcher.

use anyhow::Context;
use clap::Parser;
use pricewatch::config::load_config_with_hash;
use std::path::PathBuf;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// Pricewatch: a cyclic marketplace product watcher
///
/// Periodically scrapes product pages across the configured marketplaces and
/// forwards price/availability/rating snapshots to the configured feed.
#[derive(Parser, Debug)]
#[command(name = "pricewatch")]
#[command(version = "1.0.0")]
#[command(about = "A cyclic marketplace product watcher", long_about = None)]
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

    /// Validate config and show what would be watched without scraping
    #[arg(long, conflicts_with = "once")]
    dry_run: bool,

    /// Run a single cycle and exit instead of looping forever
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded (hash: {})", config_hash);

    if cli.dry_run {
        print_dry_run(&config);
        return Ok(());
    }

    if cli.once {
        let report = pricewatch::engine::run_once(config).await?;
        println!("{}", report);
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received, finishing in-flight work");
            let _ = shutdown_tx.send(true);
        }
    });

    pricewatch::engine::run(config, shutdown_rx).await?;
    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("pricewatch=info,warn"),
            1 => EnvFilter::new("pricewatch=debug,info"),
            2 => EnvFilter::new("pricewatch=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows the watch plan
fn print_dry_run(config: &pricewatch::config::Config) {
    println!("=== Pricewatch Dry Run ===\n");

    println!("Scraper:");
    println!(
        "  Max concurrent parsers: {}",
        config.scraper.max_concurrent_parsers
    );
    println!("  Batch size: {}", config.scraper.batch_size);
    println!(
        "  Cycle interval: {}s",
        config.scraper.cycle_interval_seconds
    );
    println!(
        "  Inter-marketplace delay: {}s",
        config.scraper.inter_marketplace_delay_seconds
    );
    println!(
        "  Parse timeout: {}s",
        config.scraper.parse_timeout_seconds
    );

    println!("\nMarketplaces ({}):", config.scraper.marketplaces.len());
    for key in &config.scraper.marketplaces {
        println!("  - {}", key);
    }

    println!("\nProxy:");
    if config.proxy.endpoints.is_empty() {
        println!("  (direct connections)");
    } else {
        for endpoint in &config.proxy.endpoints {
            println!("  - {}", endpoint);
        }
        println!(
            "  Rebind cooldown: {}s",
            config.proxy.rebind_cooldown_seconds
        );
    }

    println!("\nFeed:");
    println!("  Kind: {:?}", config.feed.kind);
    if let Some(base_url) = &config.feed.base_url {
        println!("  Base URL: {}", base_url);
    }
    if let Some(path) = &config.feed.database_path {
        println!("  Database: {}", path);
    }

    println!("\n✓ Configuration is valid");
}
