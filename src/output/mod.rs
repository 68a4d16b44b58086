//! Output module for persisting results and reporting runs
//!
//! This module handles:
//! - Overwrite persistence of accumulated listings as JSON
//! - The combined all-platform results file
//! - Per-platform run reports

mod json_store;
pub mod stats;
mod traits;

pub use json_store::{render_json, JsonFileStore};
pub use stats::{print_reports, RunReport};
pub use traits::{ResultStore, StoreError, StoreResult};
