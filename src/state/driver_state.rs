//! Pagination driver state definitions
//!
//! The driver walks listing pages through a fixed cycle of states. Every
//! move is checked with [`DriverState::can_transition_to`] so that a bug in
//! the loop surfaces as an error instead of a silently skipped stage.
use std::fmt;

/// Why pagination ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// The configured page cap was reached
    PageCap,

    /// A listing page yielded no candidates
    EmptyPage,

    /// A listing page could not be fetched, even after page retries
    FetchExhausted,

    /// An unexpected error inside the driver
    Internal,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PageCap => "page_cap",
            Self::EmptyPage => "empty_page",
            Self::FetchExhausted => "fetch_exhausted",
            Self::Internal => "internal_error",
        }
    }

    /// Returns true when pagination ended because the site ran out of pages
    /// or the cap was hit, as opposed to a failure
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::PageCap | Self::EmptyPage)
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Current stage of the pagination driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverState {
    // ===== Per-page cycle =====
    /// Retrieving the current listing page
    FetchingPage,

    /// Extracting candidates from the page
    Discovering,

    /// Fanning out detail fetches for the page's candidates
    Enriching,

    /// Writing the accumulated results
    Persisting,

    /// Waiting out the inter-page delay
    NextPage,

    // ===== Terminal =====
    Stopped(StopReason),
}

impl DriverState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped(_))
    }

    /// Returns true if the driver may move from `self` to `next`
    ///
    /// A failed page fetch may loop back to `FetchingPage` for a whole-page
    /// retry. Any live state may stop with [`StopReason::Internal`].
    pub fn can_transition_to(&self, next: DriverState) -> bool {
        use DriverState::*;

        match (*self, next) {
            (Stopped(_), _) => false,
            (_, Stopped(StopReason::Internal)) => true,
            (FetchingPage, Discovering)
            | (FetchingPage, FetchingPage)
            | (FetchingPage, Stopped(StopReason::FetchExhausted)) => true,
            (Discovering, Enriching) | (Discovering, Stopped(StopReason::EmptyPage)) => true,
            (Enriching, Persisting) => true,
            (Persisting, NextPage) | (Persisting, Stopped(StopReason::PageCap)) => true,
            (NextPage, FetchingPage) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FetchingPage => "fetching_page",
            Self::Discovering => "discovering",
            Self::Enriching => "enriching",
            Self::Persisting => "persisting",
            Self::NextPage => "next_page",
            Self::Stopped(_) => "stopped",
        }
    }
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped(reason) => write!(f, "stopped ({})", reason),
            other => write!(f, "{}", other.as_str()),
        }
    }
}
