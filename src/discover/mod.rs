//! Listing discovery: the first scraping stage
//!
//! A discoverer turns one listing page into an ordered sequence of partial
//! [`Listing`]s, each carrying at least a title and a canonical detail URL.
//! Candidates missing either are dropped silently; nothing is sorted or
//! deduplicated here.

mod blocks;
mod lines;

pub use blocks::BlockDiscoverer;
pub use lines::LineDiscoverer;

use crate::extract::Markup;
use crate::listing::Listing;

/// Navigation and boilerplate phrases that never belong to a listing
pub const DEFAULT_DENYLIST: &[&str] = &["登录", "注册", "会员", "友链合作"];

/// Extracts candidate listings from a listing page
pub trait Discoverer: Send + Sync {
    /// Returns complete candidates in document order
    fn discover(&self, markup: &Markup) -> Vec<Listing>;
}

/// Static list of phrases; any text containing one is rejected
#[derive(Debug, Clone, Default)]
pub struct Denylist {
    phrases: Vec<String>,
}

impl Denylist {
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            phrases: phrases
                .into_iter()
                .map(|p| p.into().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Returns true when the text contains any denied phrase (case-insensitive)
    pub fn matches(&self, text: &str) -> bool {
        if self.phrases.is_empty() {
            return false;
        }
        let lowered = text.to_lowercase();
        self.phrases.iter().any(|p| lowered.contains(p.as_str()))
    }

    /// Returns true only when the whole trimmed text is a denied phrase
    ///
    /// Used where the text is already known to be a listing title, so a
    /// phrase appearing inside a longer title does not reject it.
    pub fn matches_label(&self, text: &str) -> bool {
        let lowered = text.trim().to_lowercase();
        self.phrases.iter().any(|p| *p == lowered)
    }
}

impl From<&[&str]> for Denylist {
    fn from(phrases: &[&str]) -> Self {
        Self::new(phrases.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denylist_matches_case_insensitive() {
        let denylist = Denylist::new(["Login", "友链合作"]);
        assert!(denylist.matches("Please LOGIN to continue"));
        assert!(denylist.matches("友链合作 | 关于我们"));
        assert!(!denylist.matches("Build a widget"));
    }

    #[test]
    fn test_empty_denylist_never_matches() {
        let denylist = Denylist::default();
        assert!(!denylist.matches("登录"));
    }

    #[test]
    fn test_label_match_needs_whole_text() {
        let denylist = Denylist::from(DEFAULT_DENYLIST);
        assert!(denylist.matches_label(" 会员 "));
        assert!(!denylist.matches_label("会员管理系统开发"));
        assert!(denylist.matches("会员管理系统开发"));
    }
}
