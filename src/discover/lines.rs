//! Discovery over flow text, one line at a time

use super::{Denylist, Discoverer};
use crate::extract::{ExtractError, Markup, TextCleaner};
use crate::listing::{Listing, TITLE, URL};
use crate::url::canonicalize_url;
use regex::Regex;
use url::Url;

/// Scans flow text for listing headings
///
/// A heading line matches `heading`, which must define the named groups
/// `title` and `url` and may define any other named groups (e.g. `price`)
/// that become fields. Every following line is tested against the attribute
/// patterns until the next heading; the first capture group of the first
/// matching attribute is attached to the current candidate.
#[derive(Debug, Clone)]
pub struct LineDiscoverer {
    heading: Regex,
    attributes: Vec<(String, Regex)>,
    base_url: Url,
    denylist: Denylist,
    cleaner: TextCleaner,
}

impl LineDiscoverer {
    pub fn new(heading: &str, base_url: Url) -> Result<Self, ExtractError> {
        Ok(Self {
            heading: Regex::new(heading)?,
            attributes: Vec::new(),
            base_url,
            denylist: Denylist::default(),
            cleaner: TextCleaner::default(),
        })
    }

    /// Adds an attribute line pattern; its first capture group is the value
    pub fn attribute(mut self, name: &str, pattern: &str) -> Result<Self, ExtractError> {
        self.attributes.push((name.to_string(), Regex::new(pattern)?));
        Ok(self)
    }

    pub fn with_denylist(mut self, denylist: Denylist) -> Self {
        self.denylist = denylist;
        self
    }

    fn start_candidate(&self, caps: &regex::Captures<'_>) -> Listing {
        let mut listing = Listing::new();

        for name in self.heading.capture_names().flatten() {
            let Some(raw) = caps.name(name).map(|m| m.as_str()) else {
                continue;
            };

            if name == URL {
                match canonicalize_url(raw, &self.base_url) {
                    Ok(url) => listing.insert(URL, url.to_string()),
                    Err(e) => tracing::trace!("Dropping heading link {:?}: {}", raw, e),
                }
            } else if let Some(value) = self.cleaner.clean(raw, &[]) {
                listing.insert(name, value);
            }
        }

        listing
    }

    fn attach_attribute(&self, line: &str, listing: &mut Listing) -> bool {
        for (name, pattern) in &self.attributes {
            let Some(caps) = pattern.captures(line) else {
                continue;
            };
            let raw = caps.get(1).or_else(|| caps.get(0)).map(|m| m.as_str());
            if let Some(value) = raw.and_then(|r| self.cleaner.clean(r, &[])) {
                listing.insert(name.as_str(), value);
                return true;
            }
        }
        false
    }
}

impl Discoverer for LineDiscoverer {
    fn discover(&self, markup: &Markup) -> Vec<Listing> {
        let text = match markup {
            Markup::Flow(text) => text.clone(),
            Markup::Html(_) => markup.clone().into_flow(),
        };

        let mut listings = Vec::new();
        let mut current: Option<Listing> = None;

        for line in text.lines().map(str::trim) {
            if line.is_empty() {
                continue;
            }

            if let Some(caps) = self.heading.captures(line) {
                if let Some(done) = current.take() {
                    push_complete(&mut listings, done);
                }
                // A denied heading still closes the previous candidate; its
                // own attribute lines are dropped with it
                if self.denylist.matches(line) {
                    tracing::debug!("Skipping denylisted heading: {}", line);
                } else {
                    current = Some(self.start_candidate(&caps));
                }
                continue;
            }

            if self.denylist.matches(line) {
                continue;
            }

            if let Some(listing) = current.as_mut() {
                self.attach_attribute(line, listing);
            }
        }

        if let Some(done) = current.take() {
            push_complete(&mut listings, done);
        }

        tracing::debug!("Discovered {} listings from flow text", listings.len());
        listings
    }
}

fn push_complete(listings: &mut Vec<Listing>, listing: Listing) {
    if listing.is_complete() {
        listings.push(listing);
    } else {
        tracing::trace!("Dropping incomplete heading: {:?}", listing.get(TITLE));
    }
}
