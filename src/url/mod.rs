//! URL handling module for Job-Trawl
//!
//! This module provides listing-link canonicalization and listing-page URL
//! template expansion.

mod normalize;

pub use normalize::{canonicalize_url, page_url};
