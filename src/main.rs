//! Job-Trawl main entry point
//!
//! This is the command-line interface for the Job-Trawl freelance job scraper.

use anyhow::Context;
use clap::Parser;
use job_trawl::config::{load_config_with_hash, Config};
use job_trawl::crawler::{plan, trawl, TrawlOptions};
use job_trawl::output::print_reports;
use job_trawl::platform::KNOWN_PLATFORMS;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Job-Trawl: a resilient two-stage freelance job scraper
///
/// Job-Trawl walks each platform's listing pages, enriches every listing
/// from its detail page and checkpoints the results to JSON after each page.
#[derive(Parser, Debug)]
#[command(name = "job-trawl")]
#[command(version)]
#[command(about = "A resilient two-stage freelance job scraper", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Only scrape this platform (repeatable)
    #[arg(long = "platform", value_name = "NAME")]
    platforms: Vec<String>,

    /// Page cap for every platform (0 = unlimited)
    #[arg(long, value_name = "N")]
    max_pages: Option<u32>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be scraped without scraping
    #[arg(long)]
    dry_run: bool,

    /// Connect directly even when the proxy pool is enabled
    #[arg(long)]
    no_proxy: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if let Some(unknown) = cli
        .platforms
        .iter()
        .find(|name| !KNOWN_PLATFORMS.contains(&name.as_str()))
    {
        return Err(format!(
            "unknown platform '{}' (known: {})",
            unknown,
            KNOWN_PLATFORMS.join(", ")
        )
        .into());
    }

    let options = TrawlOptions {
        platforms: cli.platforms,
        max_pages: cli.max_pages,
        no_proxy: cli.no_proxy,
    };

    if cli.dry_run {
        handle_dry_run(&config, &options);
        return Ok(());
    }

    let reports = trawl(&config, &options)
        .await
        .context("scrape could not start")?;
    print_reports(&reports);

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("job_trawl=info,warn"),
            1 => EnvFilter::new("job_trawl=debug,info"),
            2 => EnvFilter::new("job_trawl=trace,debug"),
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

/// Handles the --dry-run mode: shows the resolved run plan
fn handle_dry_run(config: &Config, options: &TrawlOptions) {
    println!("=== Job-Trawl Dry Run ===\n");

    println!("Scraper Configuration:");
    println!("  Max concurrent fetches: {}", config.scraper.max_concurrent_fetches);
    println!(
        "  Attempts per fetch: {} (backoff unit {}ms)",
        config.scraper.max_attempts, config.scraper.retry_base_delay_ms
    );
    println!("  Detail timeout: {}s", config.scraper.detail_timeout_secs);
    println!(
        "  Per-candidate budget: {}s",
        config.scraper.per_candidate_budget_secs
    );
    println!("  Delay between pages: {}ms", config.scraper.rate_limit_ms);
    println!("  Rendered fetches: {}", config.scraper.render);

    println!("\nProxy:");
    if config.proxy.enabled && !options.no_proxy {
        println!("  API: {} ({})", config.proxy.api_url, config.proxy.format.as_param());
        println!(
            "  Refill interval: {}s, {} per request",
            config.proxy.request_interval_secs, config.proxy.count
        );
    } else {
        println!("  Disabled (direct connections)");
    }

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory);
    if let Some(combined) = &config.output.combined_file {
        println!("  Combined file: {}", combined);
    }

    let planned = plan(config, options);
    println!("\nPlatforms ({}):", planned.len());
    for platform in &planned {
        let cap = if platform.max_pages == 0 {
            "unlimited".to_string()
        } else {
            platform.max_pages.to_string()
        };
        match &platform.list_url {
            Some(url) => println!("  - {} (max pages: {}, list: {})", platform.name, cap, url),
            None => println!("  - {} (max pages: {})", platform.name, cap),
        }
    }

    println!("\n✓ Configuration is valid");
}
