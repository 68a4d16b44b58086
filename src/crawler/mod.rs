//! Crawler module for page fetching and scrape orchestration
//!
//! This module contains the core scraping logic, including:
//! - Page fetching with admission control and retry
//! - Detail enrichment under a per-page deadline
//! - The per-platform pagination state machine
//! - Running every configured platform and collecting their reports

#[cfg(feature = "browser")]
mod browser;
mod coordinator;
mod enricher;
mod fetcher;
mod scheduler;

#[cfg(feature = "browser")]
pub use browser::BrowserBackend;
pub use coordinator::{DriverSettings, PageSource, PaginationDriver, ScrapeOutcome};
pub use enricher::{DetailEnricher, DetailRules, PageEnrichment};
pub use fetcher::{
    build_http_client, BackendFuture, FetchClient, FetchFailure, FetchMode, FetchRequest,
    HttpBackend, PageBackend,
};
pub use scheduler::{AdmissionGate, RetryPolicy};

use crate::config::Config;
use crate::output::{JsonFileStore, ResultStore, RunReport};
use crate::platform::{self, PlatformScraper, Scraper, SharedServices};
use crate::proxy::{ProxyProvider, ProxySettings};
use crate::TrawlError;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Run-time choices made on the command line
#[derive(Debug, Clone, Default)]
pub struct TrawlOptions {
    /// Only run these platforms (empty = every enabled platform)
    pub platforms: Vec<String>,
    /// Overrides every page cap from the config
    pub max_pages: Option<u32>,
    /// Skips the proxy pool even when the config enables it
    pub no_proxy: bool,
}

/// A platform selected for this run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedPlatform {
    pub name: String,
    pub list_url: Option<String>,
    pub max_pages: u32,
}

/// Resolves which platforms run and with which page caps
///
/// Without `[[platform]]` entries every built-in platform runs with the
/// scraper defaults.
pub fn plan(config: &Config, options: &TrawlOptions) -> Vec<PlannedPlatform> {
    let default_cap = options.max_pages.unwrap_or(config.scraper.max_pages);

    let configured: Vec<PlannedPlatform> = if config.platforms.is_empty() {
        platform::KNOWN_PLATFORMS
            .iter()
            .map(|name| PlannedPlatform {
                name: name.to_string(),
                list_url: None,
                max_pages: default_cap,
            })
            .collect()
    } else {
        config
            .platforms
            .iter()
            .filter(|entry| entry.enabled)
            .map(|entry| PlannedPlatform {
                name: entry.name.clone(),
                list_url: entry.list_url.clone(),
                max_pages: options
                    .max_pages
                    .or(entry.max_pages)
                    .unwrap_or(config.scraper.max_pages),
            })
            .collect()
    };

    configured
        .into_iter()
        .filter(|planned| options.platforms.is_empty() || options.platforms.contains(&planned.name))
        .collect()
}

/// Picks the page backend for this run
pub fn build_backend(config: &Config) -> Arc<dyn PageBackend> {
    let timeout = config.scraper.request_timeout();

    if config.scraper.render {
        #[cfg(feature = "browser")]
        {
            tracing::info!("Rendering pages with headless Chrome");
            return Arc::new(BrowserBackend::new(&config.user_agent.value, timeout));
        }

        #[cfg(not(feature = "browser"))]
        tracing::warn!(
            "Rendering requested but this build lacks the `browser` feature; fetching statically"
        );
    }

    Arc::new(HttpBackend::new(config.user_agent.clone(), timeout))
}

/// Builds the fetch client, proxy pool and store shared by all platforms
pub fn build_services(
    config: &Config,
    options: &TrawlOptions,
    backend: Arc<dyn PageBackend>,
) -> Result<SharedServices, TrawlError> {
    let client = FetchClient::new(
        backend,
        AdmissionGate::new(config.scraper.max_concurrent_fetches as usize),
        RetryPolicy::new(config.scraper.max_attempts, config.scraper.retry_base_delay()),
    );

    let proxies = if options.no_proxy || !config.proxy.enabled {
        ProxyProvider::disabled()
    } else {
        ProxyProvider::new(ProxySettings::from_config(&config.proxy)?)?
    };

    let store: Arc<dyn ResultStore> = Arc::new(JsonFileStore::new(&config.output.directory));

    Ok(SharedServices {
        client: Arc::new(client),
        proxies: Arc::new(proxies),
        store,
    })
}

/// Runs every planned platform with the configured backend
pub async fn trawl(config: &Config, options: &TrawlOptions) -> Result<Vec<RunReport>, TrawlError> {
    trawl_with_backend(config, options, build_backend(config)).await
}

/// Runs every planned platform concurrently over one page backend
///
/// Platforms share the admission gate and proxy pool. Once all have stopped,
/// the combined results file is written. Reports come back sorted by
/// platform name.
pub async fn trawl_with_backend(
    config: &Config,
    options: &TrawlOptions,
    backend: Arc<dyn PageBackend>,
) -> Result<Vec<RunReport>, TrawlError> {
    let planned = plan(config, options);
    if planned.is_empty() {
        tracing::warn!("No platforms selected, nothing to do");
        return Ok(Vec::new());
    }

    let services = build_services(config, options, backend)?;

    let mut scrapers = Vec::with_capacity(planned.len());
    for entry in &planned {
        let definition = platform::definition_for(&entry.name)?;
        let scraper = PlatformScraper::new(
            definition,
            entry.list_url.as_deref(),
            &services,
            &config.scraper,
        );
        scrapers.push((scraper, entry.max_pages));
    }

    let mut tasks = JoinSet::new();
    for (scraper, max_pages) in scrapers {
        tasks.spawn(async move {
            let outcome = scraper.scrape(max_pages).await;
            (scraper.platform().to_string(), outcome)
        });
    }

    let mut combined = BTreeMap::new();
    let mut reports = Vec::with_capacity(planned.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((platform, outcome)) => {
                reports.push(outcome.report);
                combined.insert(platform, outcome.listings);
            }
            Err(e) => tracing::error!("Platform task failed: {}", e),
        }
    }

    if let Some(file_name) = config.output.combined_file.clone() {
        let store = JsonFileStore::new(&config.output.directory);
        let written =
            tokio::task::spawn_blocking(move || store.persist_combined(&file_name, &combined)).await;
        match written {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::error!("Failed to save combined results: {}", e),
            Err(e) => tracing::error!("Combined persist task failed: {}", e),
        }
    }

    reports.sort_by(|a, b| a.platform.cmp(&b.platform));
    Ok(reports)
}
