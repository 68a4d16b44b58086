//! Field extraction from loosely-structured markup
//!
//! Every output field owns an ordered chain of [`Rule`]s. The extractor tries
//! them in order and keeps the first non-empty, cleaned match, which lets one
//! rule table tolerate several page template variants. Fields with no match
//! are left out of the record entirely.

mod clean;
mod rules;

pub use clean::{collapse_whitespace, TextCleaner};
pub use rules::{FieldKind, FieldRule, Missing, Rule, Scope};

use crate::url::canonicalize_url;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

/// Errors raised while compiling extraction rules
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid CSS selector {0}")]
    Selector(String),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("invalid base URL: {0}")]
    BaseUrl(#[from] url::ParseError),
}

static DATE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4})\s*[-/.年]\s*(\d{1,2})\s*[-/.月]\s*(\d{1,2})").expect("static date pattern")
});

/// Raw page content in the form extraction works on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Markup {
    /// Tag-structured HTML
    Html(String),
    /// Flow text (markdown converted from HTML)
    Flow(String),
}

impl Markup {
    pub fn as_str(&self) -> &str {
        match self {
            Markup::Html(s) | Markup::Flow(s) => s,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.as_str().trim().is_empty()
    }

    /// Returns the content as flow text, converting HTML when needed
    pub fn into_flow(self) -> String {
        match self {
            Markup::Flow(text) => text,
            Markup::Html(html) => html_to_flow(&html),
        }
    }
}

/// Which markup form a platform's pages are processed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupKind {
    Html,
    Flow,
}

impl MarkupKind {
    /// Wraps a fetched HTML body in this markup form
    pub fn wrap(self, html: String) -> Markup {
        match self {
            MarkupKind::Html => Markup::Html(html),
            MarkupKind::Flow => Markup::Flow(html_to_flow(&html)),
        }
    }
}

/// Converts HTML to markdown flow text
///
/// Falls back to the document's plain text when the converter fails.
pub fn html_to_flow(html: &str) -> String {
    match htmd::convert(html) {
        Ok(markdown) => markdown,
        Err(e) => {
            tracing::debug!("Markdown conversion failed, using plain text: {}", e);
            let document = Html::parse_document(html);
            Scope::Element(document.root_element()).text().into_owned()
        }
    }
}

/// Turns markup into a best-effort partial record
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    fields: Vec<FieldRule>,
    cleaner: TextCleaner,
    base_url: Option<Url>,
}

impl FieldExtractor {
    pub fn new(fields: Vec<FieldRule>) -> Self {
        Self {
            fields,
            cleaner: TextCleaner::default(),
            base_url: None,
        }
    }

    /// Sets the base URL that [`FieldKind::Link`] values are resolved against
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn with_cleaner(mut self, cleaner: TextCleaner) -> Self {
        self.cleaner = cleaner;
        self
    }

    pub fn fields(&self) -> &[FieldRule] {
        &self.fields
    }

    /// Extracts every field from a whole page
    pub fn extract(&self, markup: &Markup) -> Map<String, Value> {
        match markup {
            Markup::Html(html) => {
                let document = Html::parse_document(html);
                self.extract_scope(&Scope::Element(document.root_element()))
            }
            Markup::Flow(text) => self.extract_scope(&Scope::Text(text)),
        }
    }

    /// Extracts every field from one scope (a page or a listing block)
    pub fn extract_scope(&self, scope: &Scope<'_>) -> Map<String, Value> {
        let mut record = Map::new();
        for field in &self.fields {
            if let Some(value) = self.extract_field(field, scope) {
                record.insert(field.name.clone(), value);
            }
        }
        record
    }

    /// Runs one field's rule chain; the first rule yielding a value wins
    pub fn extract_field(&self, field: &FieldRule, scope: &Scope<'_>) -> Option<Value> {
        let raw = field.rules.iter().find_map(|rule| {
            rule.apply(scope, |candidate| {
                self.cleaner.clean(candidate, &field.strip_prefixes)
            })
        })?;

        self.convert(field, &raw)
    }

    fn convert(&self, field: &FieldRule, raw: &str) -> Option<Value> {
        match field.kind {
            FieldKind::Text => Some(Value::String(raw.to_string())),

            FieldKind::Integer(missing) => match parse_digits(raw) {
                Some(n) => Some(Value::from(n)),
                None => match missing {
                    Missing::Zero => Some(Value::from(0)),
                    Missing::Omit => None,
                },
            },

            FieldKind::Date => parse_date(raw).map(Value::String),

            FieldKind::Link => {
                let resolved = match &self.base_url {
                    Some(base) => canonicalize_url(raw, base).ok(),
                    None => Url::parse(raw).ok(),
                };
                resolved.map(|url| Value::String(url.to_string()))
            }
        }
    }
}

/// Concatenates every ASCII digit in the text and parses the result
///
/// Returns `None` when the text holds no digits or the number overflows.
pub fn parse_digits(text: &str) -> Option<i64> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Finds a calendar date in the text and renders it as `YYYY-MM-DD`
pub fn parse_date(text: &str) -> Option<String> {
    let caps = DATE_PATTERN.captures(text)?;
    let year = caps.get(1)?.as_str().parse().ok()?;
    let month = caps.get(2)?.as_str().parse().ok()?;
    let day = caps.get(3)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day).map(|d| d.format("%Y-%m-%d").to_string())
}
