//! Small structural lookups over rendered markup.
//!
//! Site adapters parse a snapshot once with [`scraper::Html`] and use these
//! helpers to pull normalized text and attributes out of it.

use crate::utils::normalize_text;
use scraper::{ElementRef, Html, Selector};

/// Compile a CSS selector that is known at build time.
///
/// Used to initialize `Lazy<Selector>` statics; every static is exercised by
/// the adapter tests, so a typo fails there rather than at crawl time.
pub fn css(selector: &str) -> Selector {
    Selector::parse(selector).unwrap_or_else(|e| panic!("invalid selector {selector:?}: {e}"))
}

/// Raw text content of an element, with text nodes joined as-is.
pub fn raw_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>()
}

/// Whitespace-normalized text content of an element.
pub fn text_of(el: ElementRef<'_>) -> String {
    normalize_text(&raw_text(el))
}

/// First element matching `selector` inside `scope`.
pub fn first<'a>(scope: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    scope.select(selector).next()
}

/// First element matching `selector` in the whole document.
pub fn first_in<'a>(doc: &'a Html, selector: &Selector) -> Option<ElementRef<'a>> {
    doc.select(selector).next()
}

/// Normalized text of the first match of `selector` inside `scope`.
pub fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    first(scope, selector).map(text_of)
}

/// Values of `attr` on every element matching `selector`, in document order.
pub fn attr_values(doc: &Html, selector: &Selector, attr: &str) -> Vec<String> {
    doc.select(selector)
        .filter_map(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}
