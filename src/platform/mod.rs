//! Platform adapters
//!
//! A platform is a rule table (listing URL, discovery rules, detail rules)
//! plugged into the shared pagination machinery. Adding a site means adding
//! a module here that returns a [`PlatformDefinition`].

pub mod sxsapi;
pub mod yuanjisong;

use crate::config::ScraperConfig;
use crate::crawler::{
    DetailEnricher, DetailRules, DriverSettings, FetchClient, FetchMode, PageSource,
    PaginationDriver, ScrapeOutcome,
};
use crate::discover::Discoverer;
use crate::extract::MarkupKind;
use crate::output::ResultStore;
use crate::proxy::ProxyProvider;
use crate::TrawlError;
use std::future::Future;
use std::sync::Arc;

/// Identifiers of every built-in platform
pub const KNOWN_PLATFORMS: &[&str] = &[yuanjisong::NAME, sxsapi::NAME];

/// Everything that distinguishes one site from another
pub struct PlatformDefinition {
    pub name: &'static str,
    /// Default listing URL template containing `{page}`
    pub list_url: &'static str,
    pub list_mode: FetchMode,
    pub markup: MarkupKind,
    pub discoverer: Box<dyn Discoverer>,
    pub detail: DetailRules,
}

/// Builds the definition of a built-in platform by name
pub fn definition_for(name: &str) -> Result<PlatformDefinition, TrawlError> {
    let definition = match name {
        yuanjisong::NAME => yuanjisong::definition()?,
        sxsapi::NAME => sxsapi::definition()?,
        other => return Err(TrawlError::UnknownPlatform(other.to_string())),
    };
    Ok(definition)
}

/// A site that can be scraped page by page
pub trait Scraper: Send + Sync {
    fn platform(&self) -> &str;

    /// Scrapes up to `max_pages` listing pages (0 = unlimited)
    fn scrape(&self, max_pages: u32) -> impl Future<Output = ScrapeOutcome> + Send;
}

/// Components shared by every platform of a run
#[derive(Clone)]
pub struct SharedServices {
    pub client: Arc<FetchClient>,
    pub proxies: Arc<ProxyProvider>,
    pub store: Arc<dyn ResultStore>,
}

/// A platform definition wired to the shared services
pub struct PlatformScraper {
    driver: PaginationDriver,
}

impl PlatformScraper {
    /// Wires a definition into a runnable scraper
    ///
    /// `list_url` overrides the definition's listing URL template.
    pub fn new(
        definition: PlatformDefinition,
        list_url: Option<&str>,
        services: &SharedServices,
        config: &ScraperConfig,
    ) -> Self {
        let enricher = DetailEnricher::new(Arc::clone(&services.client), definition.detail)
            .with_timeout(config.detail_timeout())
            .with_per_candidate_budget(config.per_candidate_budget());

        let source = PageSource {
            list_url: list_url.unwrap_or(definition.list_url).to_string(),
            mode: definition.list_mode,
            markup: definition.markup,
            discoverer: definition.discoverer,
        };

        let driver = PaginationDriver::new(
            definition.name,
            source,
            Arc::clone(&services.client),
            Arc::new(enricher),
            Arc::clone(&services.proxies),
            Arc::clone(&services.store),
            DriverSettings {
                rate_limit: config.rate_limit(),
                page_retries: config.page_retries,
            },
        );

        Self { driver }
    }
}

impl Scraper for PlatformScraper {
    fn platform(&self) -> &str {
        self.driver.platform()
    }

    fn scrape(&self, max_pages: u32) -> impl Future<Output = ScrapeOutcome> + Send {
        self.driver.run(max_pages)
    }
}
