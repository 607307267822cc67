//! Fox News site adapter.
//!
//! Fox search results live on a single page that loads ten more items each
//! time its "Load More" control is clicked, so discovery scrolls the page
//! until its height settles, clicks the control, and repeats.
//!
//! Article bodies carry promo paragraphs (newsletter plugs, app banners in
//! capitals, CyberGuy links); the junk-phrase and all-caps filters in the
//! extraction pipeline drop them.

use super::{DiscoveryMode, ExtractedFields, SiteAdapter, UrlClass, resolve_links};
use crate::markup::{attr_values, css, first, first_in, first_text, raw_text, text_of};
use crate::models::Source;
use crate::utils::strip_leading_labels;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use url::Url;

const SEARCH_URL: &str = "https://www.foxnews.com/search-results/search";
const BASE_URL: &str = "https://www.foxnews.com";
const LOAD_MORE: &str = "div.button.load-more a";
const DATE_LABELS: [&str; 1] = ["Published"];

static RESULT_LINK: Lazy<Selector> = Lazy::new(|| css("div.m > a"));
static HEADER: Lazy<Selector> = Lazy::new(|| css("header.article-header"));
static HEADLINE: Lazy<Selector> = Lazy::new(|| css("h1.headline"));
static DATE: Lazy<Selector> = Lazy::new(|| css("span.article-date"));
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| css("div.article-body > p"));

/// Rules for foxnews.com.
#[derive(Debug, Clone, Copy, Default)]
pub struct FoxNewsAdapter;

impl SiteAdapter for FoxNewsAdapter {
    fn source(&self) -> Source {
        Source::FoxNews
    }

    fn discovery_mode(&self) -> DiscoveryMode {
        DiscoveryMode::ScrollConvergence {
            load_more_selector: LOAD_MORE,
        }
    }

    fn search_url(&self, keyword: &str, _page: usize) -> String {
        format!("{SEARCH_URL}?q={}", urlencoding::encode(keyword))
    }

    fn extract_links(&self, markup: &str) -> Vec<String> {
        let doc = Html::parse_document(markup);
        let hrefs = attr_values(&doc, &RESULT_LINK, "href");
        match Url::parse(BASE_URL) {
            Ok(base) => resolve_links(&base, hrefs),
            Err(_) => hrefs,
        }
    }

    fn classify(&self, _url: &str) -> UrlClass {
        UrlClass::Standard
    }

    fn extract_standard(&self, markup: &str) -> Option<ExtractedFields> {
        let doc = Html::parse_document(markup);
        let header = first_in(&doc, &HEADER)?;
        let headline = first_text(header, &HEADLINE).filter(|h| !h.is_empty())?;
        let publish_date = first(header, &DATE)
            .map(|d| strip_leading_labels(&raw_text(d), &DATE_LABELS))
            .unwrap_or_default();
        let paragraphs = doc
            .select(&PARAGRAPH)
            .map(text_of)
            .filter(|p| !p.is_empty())
            .collect();
        Some(ExtractedFields {
            publish_date,
            headline,
            paragraphs,
        })
    }
}
