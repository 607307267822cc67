//! CNN site adapter.
//!
//! CNN search is paged: every results page shows ten items and a
//! `"Displaying results 1-10 out of 1234"` counter, so discovery probes page 0
//! for the total and then fetches only the pages the budget needs.
//!
//! # URL Classes
//!
//! - `/reviews/`, `/cnn-underscored/`: shopping content, skipped unfetched
//! - `live-news`: live blogs; each entry becomes its own record
//! - everything else: standard articles
//!
//! Live-blog entries stamped `"From CNN"` instead of a time are attribution
//! blurbs, not news.

use super::{DiscoveryMode, ExtractedFields, SiteAdapter, UrlClass, resolve_links};
use crate::markup::{attr_values, css, first, first_in, first_text, raw_text, text_of};
use crate::models::Source;
use crate::utils::strip_leading_labels;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

const SEARCH_URL: &str = "https://www.cnn.com/search";
const BASE_URL: &str = "https://www.cnn.com";
const PROMOTIONAL_PATHS: [&str; 2] = ["/reviews/", "/cnn-underscored/"];
const LIVE_PATH: &str = "live-news";
const DATE_LABELS: [&str; 2] = ["Published", "Updated"];

static RESULT_LINK: Lazy<Selector> = Lazy::new(|| {
    css("div.container__headline.container_list-images-with-description__headline > span.container__headline-text")
});
static RESULT_COUNT: Lazy<Selector> = Lazy::new(|| css("div.search__results-count"));
static RESULT_COUNT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"out of ([\d,]+)").unwrap());

static HEADER: Lazy<Selector> = Lazy::new(|| css("div.headline.headline--has-lowertext"));
static HEADLINE: Lazy<Selector> = Lazy::new(|| css("div.headline__wrapper h1#maincontent"));
static TIMESTAMP: Lazy<Selector> = Lazy::new(|| css("div.headline__sub-text div.timestamp"));
static BODY: Lazy<Selector> = Lazy::new(|| css("div.article__content"));
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| css("p.paragraph.inline-placeholder"));
static SUBHEADER: Lazy<Selector> = Lazy::new(|| css("h2.subheader"));

static LIVE_CONTAINER: Lazy<Selector> = Lazy::new(|| css("div.live-story__items-container"));
static LIVE_CONTAINER_FALLBACK: Lazy<Selector> = Lazy::new(|| css("div#posts-and-button"));
static LIVE_ENTRY: Lazy<Selector> = Lazy::new(|| css("article"));
static ENTRY_HEADER: Lazy<Selector> = Lazy::new(|| css("header"));
static ENTRY_HEADLINE: Lazy<Selector> = Lazy::new(|| css("h2"));
static ENTRY_DATE: Lazy<Selector> = Lazy::new(|| css("span"));
static ENTRY_PARAGRAPH: Lazy<Selector> = Lazy::new(|| css("div > p"));

/// Rules for cnn.com.
#[derive(Debug, Clone, Copy, Default)]
pub struct CnnAdapter;

fn paragraphs(scope: ElementRef<'_>, selector: &Selector) -> Vec<String> {
    scope
        .select(selector)
        .map(text_of)
        .filter(|p| !p.is_empty())
        .collect()
}

fn live_entry(entry: ElementRef<'_>) -> ExtractedFields {
    let header = first(entry, &ENTRY_HEADER);
    ExtractedFields {
        headline: header
            .and_then(|h| first_text(h, &ENTRY_HEADLINE))
            .unwrap_or_default(),
        publish_date: header
            .and_then(|h| first_text(h, &ENTRY_DATE))
            .unwrap_or_default(),
        paragraphs: paragraphs(entry, &ENTRY_PARAGRAPH),
    }
}

impl SiteAdapter for CnnAdapter {
    fn source(&self) -> Source {
        Source::Cnn
    }

    fn discovery_mode(&self) -> DiscoveryMode {
        DiscoveryMode::Paged
    }

    fn search_url(&self, keyword: &str, page: usize) -> String {
        let size = self.page_size();
        format!(
            "{SEARCH_URL}?q={}&from={}&size={size}&page={}&sort=relevance&types=article&section=",
            urlencoding::encode(keyword),
            page * size,
            page + 1
        )
    }

    fn extract_links(&self, markup: &str) -> Vec<String> {
        let doc = Html::parse_document(markup);
        let hrefs = attr_values(&doc, &RESULT_LINK, "data-zjs-href");
        match Url::parse(BASE_URL) {
            Ok(base) => resolve_links(&base, hrefs),
            Err(_) => hrefs,
        }
    }

    fn total_results(&self, markup: &str) -> Option<usize> {
        let doc = Html::parse_document(markup);
        let counter = first_in(&doc, &RESULT_COUNT)?;
        let text = text_of(counter);
        let caps = RESULT_COUNT_RE.captures(&text)?;
        caps[1].replace(',', "").parse().ok()
    }

    fn classify(&self, url: &str) -> UrlClass {
        if url.contains(LIVE_PATH) {
            UrlClass::LiveBlog
        } else if PROMOTIONAL_PATHS.iter().any(|p| url.contains(p)) {
            UrlClass::Promotional
        } else {
            UrlClass::Standard
        }
    }

    fn extract_standard(&self, markup: &str) -> Option<ExtractedFields> {
        let doc = Html::parse_document(markup);
        let header = first_in(&doc, &HEADER)?;
        let headline = first_text(header, &HEADLINE).filter(|h| !h.is_empty())?;
        let publish_date = first(header, &TIMESTAMP)
            .map(|t| strip_leading_labels(&raw_text(t), &DATE_LABELS))
            .unwrap_or_default();
        // Section subheaders follow the paragraphs, each closed with a period.
        let paragraphs = first_in(&doc, &BODY)
            .map(|body| {
                let mut text = paragraphs(body, &PARAGRAPH);
                text.extend(paragraphs(body, &SUBHEADER).into_iter().map(|h| format!("{h}.")));
                text
            })
            .unwrap_or_default();
        Some(ExtractedFields {
            publish_date,
            headline,
            paragraphs,
        })
    }

    fn extract_live_blog(&self, markup: &str) -> Option<Vec<ExtractedFields>> {
        let doc = Html::parse_document(markup);
        let container =
            first_in(&doc, &LIVE_CONTAINER).or_else(|| first_in(&doc, &LIVE_CONTAINER_FALLBACK))?;
        Some(container.select(&LIVE_ENTRY).map(live_entry).collect())
    }

    fn attribution_sentinel(&self) -> Option<&'static str> {
        Some("From CNN")
    }
}
