//! Thin wrapper over the `scraper` DOM engine.

use quarry_core::{AttrFilter, AttrMode};
use scraper::{ElementRef, Html, Selector};

use crate::error::ScrapeError;

/// Parse a fetched body into a document. An empty body is the one way
/// html5ever gives us nothing to work with.
pub fn parse_document(url: &str, body: &str) -> Result<Html, ScrapeError> {
    if body.trim().is_empty() {
        return Err(ScrapeError::Parse(url.to_string()));
    }
    Ok(Html::parse_document(body))
}

/// Descendants of `element` matching a base selector, in document
/// order. A base selector the DOM engine cannot parse matches nothing.
pub fn query<'a>(element: ElementRef<'a>, base: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(base) {
        Ok(selector) => element.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

/// Text content with whitespace runs collapsed to single spaces.
pub fn text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn attribute(element: ElementRef<'_>, name: &str) -> Option<String> {
    element.value().attr(name).map(str::to_string)
}

/// Resolve an attribute filter against an element. html5ever lowercases
/// attribute names during parsing, matching the lowercased filter name.
pub fn apply_attr_filter(element: ElementRef<'_>, filter: &AttrFilter) -> Option<String> {
    let value = element.value().attr(&filter.name);
    match &filter.mode {
        AttrMode::Value => value.map(str::to_string),
        AttrMode::TextIfEquals(expected) => {
            (value == Some(expected.as_str())).then(|| text(element))
        }
        AttrMode::ValueIfPrefix(prefix) => value
            .filter(|value| value.starts_with(prefix.as_str()))
            .map(str::to_string),
    }
}
