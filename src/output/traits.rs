//! Result store trait and errors
//!
//! A store receives the full accumulated listing sequence of one platform and
//! overwrites whatever it held before. Persistence never fails the caller:
//! implementations log write errors and return.

use crate::listing::Listing;
use thiserror::Error;

/// Errors that can occur while writing results
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize results: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Overwrite-style persistence of accumulated listings
///
/// Implementations must be thread-safe; platforms persist concurrently.
pub trait ResultStore: Send + Sync {
    /// Replaces the stored results for `platform` with `listings`
    ///
    /// Failures are logged, never raised.
    fn persist(&self, platform: &str, listings: &[Listing]);
}
