//! Job-Trawl: a resilient two-stage scraper for freelance job boards
//!
//! This crate walks paginated listing pages, discovers per-listing detail
//! URLs, enriches each listing from its detail page under concurrency limits
//! and timeouts, and checkpoints the accumulated results to JSON after every
//! page.

pub mod config;
pub mod crawler;
pub mod discover;
pub mod extract;
pub mod listing;
pub mod output;
pub mod platform;
pub mod proxy;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Job-Trawl operations
#[derive(Debug, Error)]
pub enum TrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Extraction rule error: {0}")]
    Extract(#[from] extract::ExtractError),

    #[error("Output error: {0}")]
    Store(#[from] output::StoreError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::DriverState,
        to: state::DriverState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Missing secret: environment variable {0} is not set")]
    MissingSecret(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Rejected link: {0}")]
    Rejected(String),
}

/// A single failed fetch attempt
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("empty response body")]
    EmptyBody,

    #[error("render error: {0}")]
    Render(String),
}

impl FetchError {
    /// Returns true when the backend session should be rebuilt before retrying
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout | Self::Render(_))
    }
}

/// Result type alias for Job-Trawl operations
pub type Result<T> = std::result::Result<T, TrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{FetchClient, FetchFailure, FetchMode, FetchRequest, PaginationDriver};
pub use listing::Listing;
pub use proxy::{ProxyCredential, ProxyProvider};
pub use state::{DriverState, StopReason};
