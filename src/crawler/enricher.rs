//! Detail enrichment: the second scraping stage
//!
//! Each discovered candidate is fetched at its detail URL and merged with the
//! fields extracted there. Enrichment never loses a candidate: on any failure
//! the candidate is kept in its discovery-only form.

use super::fetcher::{FetchClient, FetchMode, FetchRequest};
use crate::extract::{FieldExtractor, MarkupKind};
use crate::listing::Listing;
use crate::proxy::ProxyCredential;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;

/// How a platform's detail pages are fetched and read
#[derive(Debug, Clone)]
pub struct DetailRules {
    pub mode: FetchMode,
    pub markup: MarkupKind,
    pub extractor: FieldExtractor,
}

/// Result of enriching one page of candidates
#[derive(Debug, Clone, Default)]
pub struct PageEnrichment {
    /// Listings in discovery order, enriched or partial
    pub listings: Vec<Listing>,
    pub enriched: usize,
    pub partial: usize,
    /// Candidates still running when the page deadline passed
    pub timed_out: usize,
}

struct Outcome {
    listing: Listing,
    enriched: bool,
}

/// Fetches detail pages and merges their fields into candidates
pub struct DetailEnricher {
    client: Arc<FetchClient>,
    rules: DetailRules,
    timeout: Duration,
    per_candidate_budget: Duration,
}

impl DetailEnricher {
    pub fn new(client: Arc<FetchClient>, rules: DetailRules) -> Self {
        Self {
            client,
            rules,
            timeout: Duration::from_secs(30),
            per_candidate_budget: Duration::from_secs(10),
        }
    }

    /// Sets the wall-clock bound on a single enrichment
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the per-candidate share of a page's aggregate deadline
    pub fn with_per_candidate_budget(mut self, budget: Duration) -> Self {
        self.per_candidate_budget = budget;
        self
    }

    /// Enriches one candidate; returns it unchanged on any failure
    pub async fn enrich(&self, candidate: Listing, proxy: Option<&ProxyCredential>) -> Listing {
        self.enrich_outcome(candidate, proxy).await.listing
    }

    async fn enrich_outcome(&self, candidate: Listing, proxy: Option<&ProxyCredential>) -> Outcome {
        let Some(url) = candidate.url().map(str::to_string) else {
            return Outcome {
                listing: candidate,
                enriched: false,
            };
        };

        let request = FetchRequest {
            url,
            mode: self.rules.mode.clone(),
        };

        let body = match tokio::time::timeout(self.timeout, self.client.fetch(&request, proxy)).await {
            Ok(Ok(body)) => body,
            Ok(Err(failure)) => {
                tracing::warn!("Keeping partial listing: {}", failure);
                return Outcome {
                    listing: candidate,
                    enriched: false,
                };
            }
            Err(_) => {
                tracing::warn!(
                    "Keeping partial listing: detail fetch of {} exceeded {:?}",
                    request.url,
                    self.timeout
                );
                return Outcome {
                    listing: candidate,
                    enriched: false,
                };
            }
        };

        let markup = self.rules.markup.wrap(body);
        if markup.is_blank() {
            tracing::warn!("Keeping partial listing: {} has no readable content", request.url);
            return Outcome {
                listing: candidate,
                enriched: false,
            };
        }

        let details = self.rules.extractor.extract(&markup);
        if details.is_empty() {
            tracing::warn!("Keeping partial listing: no detail fields found at {}", request.url);
            return Outcome {
                listing: candidate,
                enriched: false,
            };
        }

        tracing::debug!("Enriched {} with {} fields", request.url, details.len());
        let mut listing = candidate;
        listing.merge(details);
        Outcome {
            listing,
            enriched: true,
        }
    }

    /// Enriches a page of candidates concurrently
    ///
    /// The page as a whole gets `per_candidate_budget * candidates.len()`.
    /// Candidates that have not finished by then are emitted in partial form
    /// and their tasks are aborted. Output order is discovery order.
    pub async fn enrich_page(
        self: &Arc<Self>,
        candidates: Vec<Listing>,
        proxy: Option<ProxyCredential>,
    ) -> PageEnrichment {
        if candidates.is_empty() {
            return PageEnrichment::default();
        }

        let budget = self
            .per_candidate_budget
            .saturating_mul(u32::try_from(candidates.len()).unwrap_or(u32::MAX));
        let deadline = Instant::now() + budget;

        let mut tasks = JoinSet::new();
        for candidate in &candidates {
            let Some(url) = candidate.url().map(str::to_string) else {
                continue;
            };
            let enricher = Arc::clone(self);
            let candidate = candidate.clone();
            let proxy = proxy.clone();
            tasks.spawn(async move {
                let outcome = enricher.enrich_outcome(candidate, proxy.as_ref()).await;
                (url, outcome)
            });
        }

        let mut finished: HashMap<String, Outcome> = HashMap::with_capacity(candidates.len());
        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((url, outcome)))) => {
                    finished.insert(url, outcome);
                }
                Ok(Some(Err(e))) => tracing::warn!("Enrichment task failed: {}", e),
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        "Page enrichment deadline of {:?} passed with {} candidates unfinished",
                        budget,
                        tasks.len()
                    );
                    break;
                }
            }
        }
        tasks.abort_all();

        let mut page = PageEnrichment::default();
        for candidate in candidates {
            let done = candidate.url().and_then(|url| finished.remove(url));
            match done {
                Some(outcome) if outcome.enriched => {
                    page.enriched += 1;
                    page.listings.push(outcome.listing);
                }
                Some(outcome) => {
                    page.partial += 1;
                    page.listings.push(outcome.listing);
                }
                None => {
                    page.partial += 1;
                    page.timed_out += 1;
                    page.listings.push(candidate);
                }
            }
        }

        page
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::fetcher::{BackendFuture, PageBackend};
    use crate::crawler::scheduler::{AdmissionGate, RetryPolicy};
    use crate::extract::{FieldRule, Rule};
    use crate::listing::{TITLE, URL};
    use crate::FetchError;
    use serde_json::json;

    /// Serves fixed bodies by URL; unknown URLs fail, "slow" URLs stall
    struct Pages {
        bodies: HashMap<String, String>,
        stall: Duration,
    }

    impl PageBackend for Pages {
        fn fetch<'a>(
            &'a self,
            request: &'a FetchRequest,
            _proxy: Option<&'a ProxyCredential>,
        ) -> BackendFuture<'a> {
            Box::pin(async move {
                if request.url.contains("slow") {
                    tokio::time::sleep(self.stall).await;
                }
                self.bodies
                    .get(&request.url)
                    .cloned()
                    .ok_or(FetchError::Status(404))
            })
        }
    }

    fn enricher(bodies: &[(&str, &str)]) -> Arc<DetailEnricher> {
        let backend = Pages {
            bodies: bodies
                .iter()
                .map(|(u, b)| (u.to_string(), b.to_string()))
                .collect(),
            stall: Duration::from_secs(5),
        };
        let client = FetchClient::new(
            Arc::new(backend),
            AdmissionGate::new(4),
            RetryPolicy::new(1, Duration::ZERO),
        );
        let rules = DetailRules {
            mode: FetchMode::Static,
            markup: MarkupKind::Html,
            extractor: FieldExtractor::new(vec![
                FieldRule::text("title").rule(Rule::css("h2").unwrap()),
                FieldRule::text("duration").rule(Rule::pattern(r"duration:\s*(.+)").unwrap()),
            ]),
        };
        Arc::new(
            DetailEnricher::new(Arc::new(client), rules)
                .with_timeout(Duration::from_secs(2))
                .with_per_candidate_budget(Duration::from_millis(200)),
        )
    }

    fn candidate(title: &str, url: &str) -> Listing {
        let mut listing = Listing::new();
        listing.insert(TITLE, title);
        listing.insert(URL, url);
        listing.insert("price", "100");
        listing
    }

    #[tokio::test]
    async fn test_enrich_failure_returns_input() {
        let enricher = enricher(&[]);
        let input = candidate("Build a widget", "https://a.example/job/1");
        let output = enricher.enrich(input.clone(), None).await;
        assert_eq!(output, input);
    }

    #[tokio::test]
    async fn test_enrich_merges_and_keeps_keys() {
        let enricher = enricher(&[(
            "https://a.example/job/1",
            "<h2>Build a widget (remote)</h2><p>duration: 5 days</p>",
        )]);
        let input = candidate("Build a widget", "https://a.example/job/1");
        let output = enricher.enrich(input.clone(), None).await;

        for key in input.keys() {
            assert!(output.get(key).is_some(), "lost key {}", key);
        }
        assert_eq!(output.get("duration"), Some(&json!("5 days")));
        assert_eq!(output.title(), Some("Build a widget (remote)"));
        assert_eq!(output.url(), Some("https://a.example/job/1"));
    }

    #[tokio::test]
    async fn test_enrich_without_fields_keeps_partial() {
        let enricher = enricher(&[("https://a.example/job/1", "<p>nothing useful</p>")]);
        let input = candidate("Build a widget", "https://a.example/job/1");
        assert_eq!(enricher.enrich(input.clone(), None).await, input);
    }

    #[tokio::test]
    async fn test_page_keeps_discovery_order_and_partials() {
        let enricher = enricher(&[
            ("https://a.example/job/1", "<h2>One</h2>"),
            ("https://a.example/job/3", "<h2>Three</h2>"),
        ]);
        let candidates = vec![
            candidate("one", "https://a.example/job/1"),
            candidate("two", "https://a.example/job/2"),
            candidate("three", "https://a.example/job/3"),
        ];

        let page = enricher.enrich_page(candidates, None).await;
        let titles: Vec<_> = page.listings.iter().filter_map(Listing::title).collect();
        assert_eq!(titles, vec!["One", "two", "Three"]);
        assert_eq!(page.enriched, 2);
        assert_eq!(page.partial, 1);
        assert_eq!(page.timed_out, 0);
    }

    #[tokio::test]
    async fn test_page_deadline_emits_unfinished_as_partial() {
        let enricher = enricher(&[
            ("https://a.example/job/1", "<h2>One</h2>"),
            ("https://a.example/slow/2", "<h2>Two</h2>"),
        ]);
        let candidates = vec![
            candidate("one", "https://a.example/job/1"),
            candidate("two", "https://a.example/slow/2"),
        ];

        let page = enricher.enrich_page(candidates, None).await;
        assert_eq!(page.listings.len(), 2);
        assert_eq!(page.listings[0].title(), Some("One"));
        assert_eq!(page.listings[1].title(), Some("two"));
        assert_eq!(page.timed_out, 1);
    }

    #[tokio::test]
    async fn test_empty_page() {
        let page = enricher(&[]).enrich_page(Vec::new(), None).await;
        assert!(page.listings.is_empty());
    }
}
