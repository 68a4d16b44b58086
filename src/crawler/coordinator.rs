//! Pagination driver: the per-platform scrape loop
//!
//! This module contains the state machine that walks one platform's listing
//! pages in order:
//! - Fetching each listing page through the shared fetch client
//! - Discovering candidates and skipping URLs already collected
//! - Enriching candidates concurrently
//! - Persisting the accumulated results after every page
//! - Stopping on an empty page, fetch exhaustion or the page cap

use super::enricher::DetailEnricher;
use super::fetcher::{FetchClient, FetchMode, FetchRequest};
use crate::discover::Discoverer;
use crate::extract::{Markup, MarkupKind};
use crate::listing::Listing;
use crate::output::{ResultStore, RunReport};
use crate::proxy::{ProxyCredential, ProxyProvider};
use crate::state::{DriverState, StopReason};
use crate::url::page_url;
use crate::TrawlError;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Where a platform's listing pages come from and how they are read
pub struct PageSource {
    /// Listing URL template containing `{page}`
    pub list_url: String,
    pub mode: FetchMode,
    pub markup: MarkupKind,
    pub discoverer: Box<dyn Discoverer>,
}

/// Pacing and retry knobs for the driver
#[derive(Debug, Clone, Copy)]
pub struct DriverSettings {
    /// Delay between listing pages
    pub rate_limit: Duration,
    /// Whole-page retries after the fetch client gives up on a listing page
    pub page_retries: u32,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            rate_limit: Duration::from_secs(2),
            page_retries: 1,
        }
    }
}

/// Everything a platform run produced
#[derive(Debug, Clone)]
pub struct ScrapeOutcome {
    pub listings: Vec<Listing>,
    pub report: RunReport,
}

/// Mutable state of one run
struct RunContext {
    state: DriverState,
    page: u32,
    failed_fetches: u32,
    proxy: Option<ProxyCredential>,
    markup: Option<Markup>,
    candidates: Vec<Listing>,
    accumulated: Vec<Listing>,
    seen: HashSet<String>,
    report: RunReport,
}

impl RunContext {
    fn new(platform: &str) -> Self {
        Self {
            state: DriverState::FetchingPage,
            page: 1,
            failed_fetches: 0,
            proxy: None,
            markup: None,
            candidates: Vec::new(),
            accumulated: Vec::new(),
            seen: HashSet::new(),
            report: RunReport::new(platform),
        }
    }

    fn transition(&mut self, next: DriverState) -> Result<(), TrawlError> {
        if !self.state.can_transition_to(next) {
            return Err(TrawlError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::trace!("Page {}: {} -> {}", self.page, self.state, next);
        self.state = next;
        Ok(())
    }
}

/// Walks one platform's listing pages
pub struct PaginationDriver {
    platform: String,
    source: PageSource,
    client: Arc<FetchClient>,
    enricher: Arc<DetailEnricher>,
    proxies: Arc<ProxyProvider>,
    store: Arc<dyn ResultStore>,
    settings: DriverSettings,
}

impl PaginationDriver {
    pub fn new(
        platform: &str,
        source: PageSource,
        client: Arc<FetchClient>,
        enricher: Arc<DetailEnricher>,
        proxies: Arc<ProxyProvider>,
        store: Arc<dyn ResultStore>,
        settings: DriverSettings,
    ) -> Self {
        Self {
            platform: platform.to_string(),
            source,
            client,
            enricher,
            proxies,
            store,
            settings,
        }
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// Hands the accumulated results to the store on the blocking pool
    async fn save(&self, listings: &[Listing]) {
        let store = Arc::clone(&self.store);
        let platform = self.platform.clone();
        let listings = listings.to_vec();

        let written = tokio::task::spawn_blocking(move || store.persist(&platform, &listings)).await;
        if let Err(e) = written {
            tracing::error!("Persist task for {} failed: {}", self.platform, e);
        }
    }

    /// Runs pagination to completion
    ///
    /// `max_pages` caps the pages walked; 0 means unlimited. Never fails:
    /// unexpected errors stop pagination and whatever was collected is kept.
    pub async fn run(&self, max_pages: u32) -> ScrapeOutcome {
        let mut ctx = RunContext::new(&self.platform);
        tracing::info!(
            "Starting {} (max pages: {})",
            self.platform,
            if max_pages == 0 {
                "unlimited".to_string()
            } else {
                max_pages.to_string()
            }
        );

        while !ctx.state.is_terminal() {
            if let Err(e) = self.step(&mut ctx, max_pages).await {
                tracing::error!(
                    "{} stopped on page {} after an internal error: {}",
                    self.platform,
                    ctx.page,
                    e
                );
                ctx.state = DriverState::Stopped(StopReason::Internal);
            }
        }

        let reason = match ctx.state {
            DriverState::Stopped(reason) => reason,
            _ => StopReason::Internal,
        };

        self.save(&ctx.accumulated).await;
        ctx.report.listings = ctx.accumulated.len();
        ctx.report.finish(reason);

        tracing::info!(
            "Finished {}: {} listings from {} pages ({})",
            self.platform,
            ctx.report.listings,
            ctx.report.pages_completed,
            reason
        );

        ScrapeOutcome {
            listings: ctx.accumulated,
            report: ctx.report,
        }
    }

    async fn step(&self, ctx: &mut RunContext, max_pages: u32) -> Result<(), TrawlError> {
        match ctx.state {
            DriverState::FetchingPage => self.fetch_page(ctx).await,

            DriverState::Discovering => {
                let markup = ctx
                    .markup
                    .take()
                    .ok_or_else(|| TrawlError::Internal("no markup to discover from".to_string()))?;

                let found = self.source.discoverer.discover(&markup);
                if found.is_empty() {
                    tracing::info!("No listings on {} page {}, stopping", self.platform, ctx.page);
                    return ctx.transition(DriverState::Stopped(StopReason::EmptyPage));
                }

                let total = found.len();
                let mut fresh = Vec::with_capacity(total);
                for candidate in found {
                    let Some(url) = candidate.url() else {
                        continue;
                    };
                    if ctx.seen.insert(url.to_string()) {
                        fresh.push(candidate);
                    } else {
                        ctx.report.duplicates_skipped += 1;
                        tracing::debug!("Skipping already collected {}", url);
                    }
                }

                // A page repeating only known listings means the site ran out
                if fresh.is_empty() {
                    tracing::info!(
                        "{} page {} only repeats collected listings, stopping",
                        self.platform,
                        ctx.page
                    );
                    return ctx.transition(DriverState::Stopped(StopReason::EmptyPage));
                }

                tracing::info!(
                    "Found {} listings on {} page {} ({} new)",
                    total,
                    self.platform,
                    ctx.page,
                    fresh.len()
                );
                ctx.candidates = fresh;
                ctx.transition(DriverState::Enriching)
            }

            DriverState::Enriching => {
                let candidates = std::mem::take(&mut ctx.candidates);
                let page = self.enricher.enrich_page(candidates, ctx.proxy.clone()).await;

                ctx.report.enriched += page.enriched;
                ctx.report.partial += page.partial;
                ctx.report.timed_out += page.timed_out;

                for mut listing in page.listings {
                    listing.set_platform(&self.platform);
                    ctx.accumulated.push(listing);
                }
                ctx.transition(DriverState::Persisting)
            }

            DriverState::Persisting => {
                self.save(&ctx.accumulated).await;
                ctx.report.pages_completed += 1;
                tracing::info!(
                    "Saved {} {} listings after page {}",
                    ctx.accumulated.len(),
                    self.platform,
                    ctx.page
                );

                if max_pages != 0 && ctx.page >= max_pages {
                    tracing::info!("Reached {} page cap ({})", self.platform, max_pages);
                    ctx.transition(DriverState::Stopped(StopReason::PageCap))
                } else {
                    ctx.transition(DriverState::NextPage)
                }
            }

            DriverState::NextPage => {
                tokio::time::sleep(self.settings.rate_limit).await;
                ctx.page += 1;
                ctx.transition(DriverState::FetchingPage)
            }

            DriverState::Stopped(_) => Ok(()),
        }
    }

    async fn fetch_page(&self, ctx: &mut RunContext) -> Result<(), TrawlError> {
        ctx.proxy = self.proxies.get_credential().await;
        if let Some(proxy) = &ctx.proxy {
            tracing::debug!("Using proxy {} for {} page {}", proxy, self.platform, ctx.page);
        }

        let request = FetchRequest {
            url: page_url(&self.source.list_url, ctx.page),
            mode: self.source.mode.clone(),
        };
        tracing::info!("Fetching {} page {}: {}", self.platform, ctx.page, request.url);

        match self.client.fetch(&request, ctx.proxy.as_ref()).await {
            Ok(body) => {
                ctx.failed_fetches = 0;
                ctx.markup = Some(self.source.markup.wrap(body));
                ctx.transition(DriverState::Discovering)
            }
            Err(failure) => {
                ctx.failed_fetches += 1;
                if ctx.failed_fetches <= self.settings.page_retries {
                    tracing::warn!(
                        "{}; retrying page ({}/{})",
                        failure,
                        ctx.failed_fetches,
                        self.settings.page_retries
                    );
                    tokio::time::sleep(self.settings.rate_limit).await;
                    ctx.transition(DriverState::FetchingPage)
                } else {
                    tracing::error!("{}; giving up on {}", failure, self.platform);
                    ctx.transition(DriverState::Stopped(StopReason::FetchExhausted))
                }
            }
        }
    }
}
