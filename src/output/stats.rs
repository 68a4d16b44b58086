//! Per-platform run reports
//!
//! This module records what one platform's pagination run did and prints a
//! summary once all platforms have finished.

use crate::state::StopReason;
use chrono::{DateTime, Utc};

/// Summary of one platform's run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Platform identifier
    pub platform: String,

    /// Listing pages fully processed (fetched, enriched and persisted)
    pub pages_completed: u32,

    /// Listings in the final result set
    pub listings: usize,

    /// Listings merged with detail fields
    pub enriched: usize,

    /// Listings kept in discovery-only form
    pub partial: usize,

    /// Candidates skipped because their URL was already collected
    pub duplicates_skipped: usize,

    /// Candidates whose enrichment did not finish before the page deadline
    pub timed_out: usize,

    /// Why pagination ended (None while running)
    pub stop_reason: Option<StopReason>,

    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunReport {
    pub fn new(platform: &str) -> Self {
        Self {
            platform: platform.to_string(),
            pages_completed: 0,
            listings: 0,
            enriched: 0,
            partial: 0,
            duplicates_skipped: 0,
            timed_out: 0,
            stop_reason: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Marks the run finished
    pub fn finish(&mut self, reason: StopReason) {
        self.stop_reason = Some(reason);
        self.finished_at = Some(Utc::now());
    }

    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }

    /// Share of listings that were enriched, as a percentage
    pub fn enrichment_rate(&self) -> f64 {
        if self.listings == 0 {
            return 0.0;
        }
        (self.enriched as f64 / self.listings as f64) * 100.0
    }
}

/// Prints run reports to stdout in a formatted manner
pub fn print_reports(reports: &[RunReport]) {
    println!("=== Scrape Summary ===\n");

    for report in reports {
        println!("{}:", report.platform);
        println!("  Pages completed: {}", report.pages_completed);
        println!(
            "  Listings: {} ({} enriched, {} partial, {:.1}% enriched)",
            report.listings,
            report.enriched,
            report.partial,
            report.enrichment_rate()
        );
        if report.duplicates_skipped > 0 {
            println!("  Duplicates skipped: {}", report.duplicates_skipped);
        }
        if report.timed_out > 0 {
            println!("  Enrichments cut off by page deadline: {}", report.timed_out);
        }
        match report.stop_reason {
            Some(reason) => println!("  Stopped: {}", reason),
            None => println!("  Stopped: (still running)"),
        }
        if let Some(seconds) = report.duration_seconds() {
            println!("  Duration: {}s", seconds);
        }
        println!();
    }

    let total: usize = reports.iter().map(|r| r.listings).sum();
    println!("Total listings: {}", total);
}
