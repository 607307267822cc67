//! Site adapters: the per-outlet markup rules consumed by the crawl.
//!
//! The orchestration core (discovery, distribution, extraction, aggregation)
//! never looks at a CSS selector. Everything site-specific goes through the
//! [`SiteAdapter`] capability set, with one implementation per source.
//!
//! # Supported Sources
//!
//! | Source | Module | Discovery | Notes |
//! |--------|--------|-----------|-------|
//! | CNN | [`cnn`] | Paged search with a result count | Live-news blogs; promotional sections skipped |
//! | Fox News | [`foxnews`] | Infinite scroll + "load more" | Junk promo paragraphs filtered |
//!
//! # Adding a Source
//!
//! Implement [`SiteAdapter`], add a [`Source`] variant, and register it in
//! [`adapter_for`]. Nothing in the orchestration core changes.

pub mod cnn;
pub mod foxnews;

#[cfg(test)]
pub mod fixtures;

use crate::models::Source;
use url::Url;

/// How a URL should be handled, decided from the URL alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlClass {
    /// Product reviews, shopping promos: skipped without fetching.
    Promotional,
    /// One page hosting many timestamped entries.
    LiveBlog,
    /// A regular article.
    Standard,
}

/// How a source's search results are enumerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryMode {
    /// A single results page that grows as it is scrolled, with a control
    /// that reveals the next batch.
    ScrollConvergence { load_more_selector: &'static str },
    /// Numbered result pages plus a declared total result count.
    Paged,
}

/// Fields pulled out of one article, or one live-blog entry, before filtering.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractedFields {
    pub publish_date: String,
    pub headline: String,
    /// Paragraph texts in document order, each whitespace-normalized.
    pub paragraphs: Vec<String>,
}

/// Site-specific rules for one news source.
pub trait SiteAdapter: Send + Sync {
    fn source(&self) -> Source;

    fn discovery_mode(&self) -> DiscoveryMode;

    /// Results revealed per page or per "load more" click.
    fn page_size(&self) -> usize {
        10
    }

    /// Search URL for `keyword`; `page` is 0-based and ignored by
    /// scroll-convergence sources.
    fn search_url(&self, keyword: &str, page: usize) -> String;

    /// Absolute article URLs present in a search results snapshot, in
    /// document order.
    fn extract_links(&self, markup: &str) -> Vec<String>;

    /// Total result count declared by a paged search snapshot.
    fn total_results(&self, _markup: &str) -> Option<usize> {
        None
    }

    fn classify(&self, url: &str) -> UrlClass;

    /// Header and body of a standard article; `None` when the header block
    /// or headline is missing.
    fn extract_standard(&self, markup: &str) -> Option<ExtractedFields>;

    /// Entries of a live blog; `None` when no entries container exists.
    fn extract_live_blog(&self, _markup: &str) -> Option<Vec<ExtractedFields>> {
        None
    }

    /// Timestamp marker of attribution-only live-blog entries.
    fn attribution_sentinel(&self) -> Option<&'static str> {
        None
    }
}

/// The adapter registered for `source`.
pub fn adapter_for(source: Source) -> Box<dyn SiteAdapter> {
    match source {
        Source::Cnn => Box::new(cnn::CnnAdapter),
        Source::FoxNews => Box::new(foxnews::FoxNewsAdapter),
    }
}

/// Resolve possibly-relative `hrefs` against `base`, dropping anything that is
/// not http(s).
pub(crate) fn resolve_links(base: &Url, hrefs: Vec<String>) -> Vec<String> {
    hrefs
        .into_iter()
        .filter_map(|href| base.join(&href).ok())
        .filter(|u| matches!(u.scheme(), "http" | "https"))
        .map(|mut u| {
            u.set_fragment(None);
            u.to_string()
        })
        .collect()
}
