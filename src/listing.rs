//! The scraped job record
//!
//! A [`Listing`] is an open map: `title` and `url` are required for a record
//! to be emitted, everything else is best-effort and platform-specific.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key holding the listing title
pub const TITLE: &str = "title";

/// Key holding the canonical detail URL (identity within a platform)
pub const URL: &str = "url";

/// Key holding the platform identifier, stamped by the caller
pub const PLATFORM: &str = "platform";

/// One job/project record, partial (discovery only) or enriched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Listing {
    fields: Map<String, Value>,
}

impl Listing {
    /// Creates an empty listing
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing field map
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Returns the title if present and non-empty
    pub fn title(&self) -> Option<&str> {
        self.non_empty_str(TITLE)
    }

    /// Returns the detail URL if present and non-empty
    pub fn url(&self) -> Option<&str> {
        self.non_empty_str(URL)
    }

    /// Returns the platform identifier if stamped
    pub fn platform(&self) -> Option<&str> {
        self.non_empty_str(PLATFORM)
    }

    /// A listing is complete when it carries both a title and a URL
    pub fn is_complete(&self) -> bool {
        self.title().is_some() && self.url().is_some()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn set_platform(&mut self, platform: &str) {
        self.insert(PLATFORM, platform);
    }

    /// Merges detail fields into this listing
    ///
    /// Detail values take precedence over same-named discovery values. The
    /// `url` identity key is never replaced and no key is ever removed, so
    /// the merged key set is always a superset of the original.
    pub fn merge(&mut self, details: Map<String, Value>) {
        for (key, value) in details {
            if key == URL && self.url().is_some() {
                continue;
            }
            if value.is_null() {
                continue;
            }
            self.fields.insert(key, value);
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }

    fn non_empty_str(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

impl From<Map<String, Value>> for Listing {
    fn from(fields: Map<String, Value>) -> Self {
        Self::from_fields(fields)
    }
}
