//! Discovery over repeated structural containers

use super::{Denylist, Discoverer};
use crate::extract::{ExtractError, FieldExtractor, Markup, Scope};
use crate::listing::{Listing, TITLE};
use scraper::{Html, Selector};

/// Finds listing blocks by a stable container selector and extracts each
/// block's fields with a block-scoped rule table
///
/// The extractor should carry the platform base URL so that the `url` field
/// (declared as a link) comes out absolute.
#[derive(Debug, Clone)]
pub struct BlockDiscoverer {
    container: Selector,
    fields: FieldExtractor,
    denylist: Denylist,
}

impl BlockDiscoverer {
    pub fn new(container: &str, fields: FieldExtractor) -> Result<Self, ExtractError> {
        let container = Selector::parse(container)
            .map_err(|e| ExtractError::Selector(format!("{}: {:?}", container, e)))?;
        Ok(Self {
            container,
            fields,
            denylist: Denylist::default(),
        })
    }

    pub fn with_denylist(mut self, denylist: Denylist) -> Self {
        self.denylist = denylist;
        self
    }
}

impl Discoverer for BlockDiscoverer {
    fn discover(&self, markup: &Markup) -> Vec<Listing> {
        let document = Html::parse_document(markup.as_str());
        let mut listings = Vec::new();
        let mut blocks = 0usize;

        for block in document.select(&self.container) {
            blocks += 1;
            let listing = Listing::from_fields(self.fields.extract_scope(&Scope::Element(block)));

            if !listing.is_complete() {
                tracing::trace!("Skipping block {} without title or url", blocks);
                continue;
            }

            if listing.title().is_some_and(|t| self.denylist.matches_label(t)) {
                tracing::debug!(
                    "Skipping denylisted block: {:?}",
                    listing.get(TITLE)
                );
                continue;
            }

            listings.push(listing);
        }

        tracing::debug!(
            "Discovered {} listings from {} blocks",
            listings.len(),
            blocks
        );
        listings
    }
}
