//! Extraction rules and per-field rule chains

use super::ExtractError;
use regex::Regex;
use scraper::{ElementRef, Selector};
use std::borrow::Cow;

/// The region of markup a rule is evaluated against
#[derive(Debug, Clone, Copy)]
pub enum Scope<'a> {
    /// A parsed HTML element (the document root or one listing block)
    Element(ElementRef<'a>),
    /// Flow text, typically markdown converted from HTML
    Text(&'a str),
}

impl<'a> Scope<'a> {
    /// Returns the scope as newline-separated text
    ///
    /// For elements every text node is split into trimmed, non-empty lines.
    pub fn text(&self) -> Cow<'a, str> {
        match self {
            Scope::Text(text) => Cow::Borrowed(text),
            Scope::Element(element) => Cow::Owned(
                element
                    .text()
                    .flat_map(str::lines)
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
        }
    }
}

/// One way of locating a field value
#[derive(Debug, Clone)]
pub enum Rule {
    /// Text (or an attribute) of the first matching element
    Css {
        selector: Selector,
        attr: Option<String>,
    },

    /// First capture group (or the whole match) of a regular expression
    /// evaluated over the scope text
    Pattern(Regex),

    /// Label/value rows: the value cell of the first row whose label cell
    /// contains the given text
    Labeled {
        row: Selector,
        label: Selector,
        value: Selector,
        contains: String,
    },

    /// Lines following a start marker, up to the first stop marker
    Section { start: String, stops: Vec<String> },
}

impl Rule {
    pub fn css(selector: &str) -> Result<Self, ExtractError> {
        Ok(Rule::Css {
            selector: parse_selector(selector)?,
            attr: None,
        })
    }

    pub fn css_attr(selector: &str, attr: &str) -> Result<Self, ExtractError> {
        Ok(Rule::Css {
            selector: parse_selector(selector)?,
            attr: Some(attr.to_string()),
        })
    }

    pub fn pattern(pattern: &str) -> Result<Self, ExtractError> {
        Ok(Rule::Pattern(Regex::new(pattern)?))
    }

    pub fn labeled(
        row: &str,
        label: &str,
        value: &str,
        contains: &str,
    ) -> Result<Self, ExtractError> {
        Ok(Rule::Labeled {
            row: parse_selector(row)?,
            label: parse_selector(label)?,
            value: parse_selector(value)?,
            contains: contains.to_string(),
        })
    }

    pub fn section(start: &str, stops: &[&str]) -> Self {
        Rule::Section {
            start: start.to_string(),
            stops: stops.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Evaluates the rule, returning the first candidate that `accept` keeps
    ///
    /// `accept` performs cleanup; a candidate it rejects (empty, noise) does
    /// not end the search within this rule.
    pub fn apply<F>(&self, scope: &Scope<'_>, accept: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        match self {
            Rule::Css { selector, attr } => {
                let Scope::Element(element) = scope else {
                    return None;
                };
                element.select(selector).find_map(|matched| match attr {
                    Some(name) => matched.value().attr(name).and_then(&accept),
                    None => accept(&matched.text().collect::<Vec<_>>().join(" ")),
                })
            }

            Rule::Pattern(regex) => {
                let text = scope.text();
                regex.captures_iter(&text).find_map(|caps| {
                    caps.get(1)
                        .or_else(|| caps.get(0))
                        .and_then(|m| accept(m.as_str()))
                })
            }

            Rule::Labeled {
                row,
                label,
                value,
                contains,
            } => {
                let Scope::Element(element) = scope else {
                    return None;
                };
                element.select(row).find_map(|row| {
                    let label_text = row.select(label).next()?.text().collect::<String>();
                    if !label_text.contains(contains.as_str()) {
                        return None;
                    }
                    let cell = row.select(value).last()?;
                    accept(&cell.text().collect::<Vec<_>>().join(" "))
                })
            }

            Rule::Section { start, stops } => {
                let text = scope.text();
                let mut started = false;
                let mut collected = Vec::new();

                for line in text.lines().map(str::trim) {
                    if !started {
                        started = line.contains(start.as_str());
                        continue;
                    }
                    if stops.iter().any(|stop| line.contains(stop.as_str())) {
                        break;
                    }
                    if !line.is_empty() && !line.starts_with('#') && !line.starts_with("![") {
                        collected.push(line);
                    }
                }

                accept(&collected.join(" "))
            }
        }
    }
}

/// What happens to an integer field whose matched text holds no number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    /// Leave the field out
    Omit,
    /// Record zero (counters such as applicants or employer stats)
    Zero,
}

/// How a matched value is converted before it lands in the record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer(Missing),
    /// `YYYY-MM-DD`
    Date,
    /// Resolved to an absolute, canonical URL
    Link,
}

/// An ordered chain of rules for one output field
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub name: String,
    pub rules: Vec<Rule>,
    pub kind: FieldKind,
    pub strip_prefixes: Vec<String>,
}

impl FieldRule {
    pub fn new(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            rules: Vec::new(),
            kind,
            strip_prefixes: Vec::new(),
        }
    }

    pub fn text(name: &str) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub fn integer(name: &str, missing: Missing) -> Self {
        Self::new(name, FieldKind::Integer(missing))
    }

    pub fn date(name: &str) -> Self {
        Self::new(name, FieldKind::Date)
    }

    pub fn link(name: &str) -> Self {
        Self::new(name, FieldKind::Link)
    }

    /// Appends a fallback rule; rules are tried in insertion order
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Adds a field-specific label to strip from matched values
    pub fn strip(mut self, prefix: &str) -> Self {
        self.strip_prefixes.push(prefix.to_string());
        self
    }
}

fn parse_selector(selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector)
        .map_err(|e| ExtractError::Selector(format!("{}: {:?}", selector, e)))
}
