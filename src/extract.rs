//! Per-URL extraction pipeline.
//!
//! Every URL is classified from its text first; promotional URLs are skipped
//! without touching the browser. Standard articles and live blogs are then
//! fetched, parsed by the site adapter, filtered, and turned into either
//! accepted records or a single skip-audit entry.
//!
//! # Paragraph Filters
//!
//! - all upper-case paragraphs (bylines, shouted promos) are dropped
//! - paragraphs matching a junk phrase of the source are dropped
//! - survivors are joined with single spaces and normalized
//!
//! # Live Blogs
//!
//! Entries with an empty headline or too-short body are dropped without an
//! audit entry. Entries whose timestamp is missing or carries the source's
//! attribution marker are counted as attribution-only and dropped. A page
//! whose entries are all dropped gets one `all_subentries_filtered` skip.

use crate::config::{CrawlConfig, PauseRange};
use crate::discovery::converge_scroll;
use crate::models::{ArticleRecord, ContentType, SkipAuditEntry, SkipReason};
use crate::retry::{RetryPolicy, retry};
use crate::scrapers::{ExtractedFields, SiteAdapter, UrlClass};
use crate::session::{RenderSession, SessionError};
use crate::utils::{JunkFilter, is_all_upper, normalize_text, pause, truncate_for_log};
use futures::FutureExt;
use futures::future::LocalBoxFuture;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractSettings {
    /// Minimum `main_text` length, in characters.
    pub min_chars: usize,
    pub standard_timeout: Duration,
    pub live_blog_timeout: Duration,
    /// Pause before each navigation.
    pub request_pause: PauseRange,
    pub live_scroll_pause: PauseRange,
    pub max_live_scrolls: usize,
    /// Re-reads of the snapshot while the content anchor is still missing.
    pub markup: RetryPolicy,
}

impl ExtractSettings {
    pub fn from_config(config: &CrawlConfig) -> Self {
        Self {
            min_chars: config.min_content_chars,
            standard_timeout: config.timeouts.standard(),
            live_blog_timeout: config.timeouts.live_blog(),
            request_pause: config.pauses.request,
            live_scroll_pause: config.pauses.live_scroll,
            max_live_scrolls: config.max_live_blog_scrolls,
            markup: RetryPolicy::new(config.markup_attempts, Duration::from_millis(500)),
        }
    }
}

/// Outcome of extracting one URL.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Article(ArticleRecord),
    /// One record per surviving entry, all sharing the page URL.
    LiveBlog(Vec<ArticleRecord>),
    Skipped(SkipAuditEntry),
}

#[derive(Debug, Error)]
enum ReadError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("content anchor missing")]
    MissingAnchor,
}

impl ReadError {
    fn skip_reason(&self) -> SkipReason {
        match self {
            ReadError::Session(_) => SkipReason::FetchFailed,
            ReadError::MissingAnchor => SkipReason::NoContentMarkup,
        }
    }
}

struct Snapshot<'s, S> {
    session: &'s mut S,
    adapter: &'s dyn SiteAdapter,
}

fn read_standard<'a, S: RenderSession>(
    snap: &'a mut Snapshot<'_, S>,
) -> LocalBoxFuture<'a, Result<ExtractedFields, ReadError>> {
    async move {
        let markup = snap.session.current_markup().await?;
        snap.adapter
            .extract_standard(&markup)
            .ok_or(ReadError::MissingAnchor)
    }
    .boxed_local()
}

fn read_live_blog<'a, S: RenderSession>(
    snap: &'a mut Snapshot<'_, S>,
) -> LocalBoxFuture<'a, Result<Vec<ExtractedFields>, ReadError>> {
    async move {
        let markup = snap.session.current_markup().await?;
        snap.adapter
            .extract_live_blog(&markup)
            .ok_or(ReadError::MissingAnchor)
    }
    .boxed_local()
}

/// Applies one source's rules to URLs, on whatever session it is handed.
pub struct Extractor<'a> {
    adapter: &'a dyn SiteAdapter,
    junk: JunkFilter,
    settings: ExtractSettings,
}

impl<'a> Extractor<'a> {
    pub fn new(adapter: &'a dyn SiteAdapter, config: &CrawlConfig) -> Self {
        Self::with_settings(
            adapter,
            JunkFilter::new(config.junk_for(adapter.source())),
            ExtractSettings::from_config(config),
        )
    }

    pub fn with_settings(adapter: &'a dyn SiteAdapter, junk: JunkFilter, settings: ExtractSettings) -> Self {
        Self {
            adapter,
            junk,
            settings,
        }
    }

    /// Classify `url` and run the matching handler.
    pub async fn extract<S: RenderSession>(&self, session: &mut S, url: &str) -> Extraction {
        match self.adapter.classify(url) {
            UrlClass::Promotional => {
                debug!(url, "Promotional section; skipped without fetching");
                Extraction::Skipped(SkipAuditEntry::new(url, SkipReason::IrrelevantSection))
            }
            UrlClass::LiveBlog => self.extract_live_blog(session, url).await,
            UrlClass::Standard => self.extract_standard(session, url).await,
        }
    }

    /// Join the paragraphs that pass the filters into one normalized text.
    pub fn build_main_text(&self, paragraphs: &[String]) -> String {
        let kept: Vec<String> = paragraphs
            .iter()
            .map(|p| normalize_text(p))
            .filter(|p| !p.is_empty() && !is_all_upper(p) && !self.junk.matches(p))
            .collect();
        normalize_text(&kept.join(" "))
    }

    fn long_enough(&self, text: &str) -> bool {
        text.chars().count() >= self.settings.min_chars
    }

    fn record(&self, fields: ExtractedFields, main_text: String, content_type: ContentType, url: &str) -> ArticleRecord {
        ArticleRecord {
            publish_date: fields.publish_date,
            headline: fields.headline,
            main_text,
            source: self.adapter.source(),
            content_type,
            url: url.to_string(),
        }
    }

    async fn fetch<S: RenderSession>(
        &self,
        session: &mut S,
        url: &str,
        timeout: Duration,
    ) -> Result<(), SkipAuditEntry> {
        pause(&self.settings.request_pause).await;
        session.navigate(url, timeout).await.map_err(|e| {
            let reason = if e.is_timeout() {
                SkipReason::FetchTimeout
            } else {
                SkipReason::FetchFailed
            };
            debug!(url, error = %e, %reason, "Navigation failed");
            SkipAuditEntry::new(url, reason)
        })
    }

    async fn extract_standard<S: RenderSession>(&self, session: &mut S, url: &str) -> Extraction {
        if let Err(skip) = self.fetch(session, url, self.settings.standard_timeout).await {
            return Extraction::Skipped(skip);
        }
        let mut snap = Snapshot {
            session,
            adapter: self.adapter,
        };
        let fields = match retry(&mut snap, &self.settings.markup, "article_header", read_standard::<S>).await {
            Ok(fields) => fields,
            Err(e) => {
                debug!(url, error = %e, "No article markup");
                return Extraction::Skipped(SkipAuditEntry::new(url, e.last_error.skip_reason()));
            }
        };

        let main_text = self.build_main_text(&fields.paragraphs);
        if !self.long_enough(&main_text) {
            debug!(url, chars = main_text.chars().count(), "Body below minimum length");
            return Extraction::Skipped(SkipAuditEntry::new(url, SkipReason::BelowMinLength));
        }
        debug!(url, headline = %truncate_for_log(&fields.headline, 80), "Article accepted");
        Extraction::Article(self.record(fields, main_text, ContentType::Article, url))
    }

    fn is_attribution(&self, date: &str) -> bool {
        date.is_empty()
            || self
                .adapter
                .attribution_sentinel()
                .is_some_and(|marker| date.contains(marker))
    }

    async fn extract_live_blog<S: RenderSession>(&self, session: &mut S, url: &str) -> Extraction {
        if let Err(skip) = self.fetch(session, url, self.settings.live_blog_timeout).await {
            return Extraction::Skipped(skip);
        }
        match converge_scroll(session, self.settings.max_live_scrolls, &self.settings.live_scroll_pause).await {
            Ok(outcome) if !outcome.converged => {
                debug!(url, steps = outcome.steps, "Live blog still growing after scroll budget")
            }
            Ok(_) => {}
            Err(e) => warn!(url, error = %e, "Live blog scrolling failed; reading what is loaded"),
        }

        let mut snap = Snapshot {
            session,
            adapter: self.adapter,
        };
        let entries = match retry(&mut snap, &self.settings.markup, "live_container", read_live_blog::<S>).await {
            Ok(entries) => entries,
            Err(e) => {
                debug!(url, error = %e, "No live blog container");
                return Extraction::Skipped(SkipAuditEntry::new(url, e.last_error.skip_reason()));
            }
        };

        let total = entries.len();
        let mut attribution_only = 0;
        let mut records = Vec::new();
        for entry in entries {
            if entry.headline.is_empty() {
                continue;
            }
            let main_text = self.build_main_text(&entry.paragraphs);
            if !self.long_enough(&main_text) {
                continue;
            }
            if self.is_attribution(&entry.publish_date) {
                attribution_only += 1;
                continue;
            }
            records.push(self.record(entry, main_text, ContentType::LiveBlogEntry, url));
        }

        debug!(url, total, attribution_only, kept = records.len(), "Live blog entries filtered");
        if records.is_empty() {
            return Extraction::Skipped(SkipAuditEntry::new(url, SkipReason::AllSubentriesFiltered));
        }
        Extraction::LiveBlog(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Source;
    use crate::scrapers::cnn::CnnAdapter;
    use crate::scrapers::fixtures;
    use crate::scrapers::foxnews::FoxNewsAdapter;
    use crate::session::fake::{FakePage, FakeSite};

    const STORY: &str = "https://www.cnn.com/2025/05/06/politics/story";
    const LIVE: &str = "https://www.cnn.com/politics/live-news/election-05-06-25";
    const FOX: &str = "https://www.foxnews.com/tech/story";

    fn settings(min_chars: usize) -> ExtractSettings {
        let mut config = CrawlConfig::for_tests();
        config.min_content_chars = min_chars;
        let mut settings = ExtractSettings::from_config(&config);
        settings.markup = RetryPolicy::new(2, Duration::ZERO).with_jitter(Duration::ZERO);
        settings
    }

    fn cnn(min_chars: usize) -> Extractor<'static> {
        Extractor::with_settings(&CnnAdapter, JunkFilter::default(), settings(min_chars))
    }

    fn site(url: &str, page: FakePage) -> FakeSite {
        FakeSite::builder().page(url, page).build()
    }

    #[tokio::test]
    async fn test_standard_article_accepted() {
        let markup = fixtures::cnn_article(
            "Senate\u{a0}passes bill",
            "Updated 10:01 AM EDT, Tue May 6, 2025",
            &["The  Senate voted.", "BREAKING NEWS", "It passed 51-49."],
        );
        let site = site(STORY, FakePage::new(markup));
        let mut session = site.session();
        let out = cnn(10).extract(&mut session, STORY).await;
        assert_eq!(
            out,
            Extraction::Article(ArticleRecord {
                publish_date: "10:01 AM EDT, Tue May 6, 2025".into(),
                headline: "Senate passes bill".into(),
                main_text: "The Senate voted. It passed 51-49.".into(),
                source: Source::Cnn,
                content_type: ContentType::Article,
                url: STORY.into(),
            })
        );
    }

    #[tokio::test]
    async fn test_minimum_length_boundary() {
        // "abcde fghi" is exactly 10 characters.
        let markup = fixtures::cnn_article("H", "May 6", &["abcde", "fghi"]);
        let site = site(STORY, FakePage::new(markup));
        let mut session = site.session();
        assert!(matches!(cnn(10).extract(&mut session, STORY).await, Extraction::Article(_)));
        assert_eq!(
            cnn(11).extract(&mut session, STORY).await,
            Extraction::Skipped(SkipAuditEntry::new(STORY, SkipReason::BelowMinLength))
        );
    }

    #[tokio::test]
    async fn test_promotional_url_never_fetched() {
        let url = "https://www.cnn.com/cnn-underscored/reviews/best-tvs";
        let site = FakeSite::builder().build();
        let mut session = site.session();
        let out = cnn(10).extract(&mut session, url).await;
        assert_eq!(out, Extraction::Skipped(SkipAuditEntry::new(url, SkipReason::IrrelevantSection)));
        assert!(site.navigations().is_empty());
    }

    #[tokio::test]
    async fn test_timeout_and_failure_are_distinguished() {
        let site = site(STORY, FakePage::timing_out());
        let mut session = site.session();
        assert_eq!(
            cnn(10).extract(&mut session, STORY).await,
            Extraction::Skipped(SkipAuditEntry::new(STORY, SkipReason::FetchTimeout))
        );
        let missing = "https://www.cnn.com/2025/05/06/us/missing";
        assert_eq!(
            cnn(10).extract(&mut session, missing).await,
            Extraction::Skipped(SkipAuditEntry::new(missing, SkipReason::FetchFailed))
        );
    }

    #[tokio::test]
    async fn test_missing_header_is_no_content_markup() {
        let site = site(STORY, FakePage::new("<html><body><p>Just text here.</p></body></html>"));
        let mut session = site.session();
        assert_eq!(
            cnn(10).extract(&mut session, STORY).await,
            Extraction::Skipped(SkipAuditEntry::new(STORY, SkipReason::NoContentMarkup))
        );
    }

    #[tokio::test]
    async fn test_junk_and_all_caps_paragraphs_excluded() {
        let markup = fixtures::fox_article(
            "Your phone is listening",
            "Published May 6, 2025",
            &[
                "Security researchers found a flaw.",
                "CLICK HERE TO GET THE FOX NEWS APP",
                "Click here.",
                "Get more of my tech tips at CyberGuy.com.",
                "Update your phone today.",
            ],
        );
        let site = site(FOX, FakePage::new(markup));
        let mut session = site.session();
        let extractor = Extractor::new(&FoxNewsAdapter, &{
            let mut config = CrawlConfig::for_tests();
            config.markup_attempts = 1;
            config
        });
        let Extraction::Article(record) = extractor.extract(&mut session, FOX).await else {
            panic!("expected an accepted article");
        };
        assert_eq!(
            record.main_text,
            "Security researchers found a flaw. Update your phone today."
        );
        assert_eq!(record.source, Source::FoxNews);
    }

    #[tokio::test]
    async fn test_live_blog_drops_attribution_entries() {
        let markup = fixtures::cnn_live_blog(
            &[
                ("Polls open", "7:00 a.m. ET", "Voters lined up early in the morning."),
                ("About our coverage", "From CNN", "CNN staff contributed to this report."),
                ("Turnout is high", "9:30 a.m. ET", "Officials report record turnout so far."),
                ("Correspondents", "From CNN staff", "Reporting from across the country."),
                ("Results expected", "8:00 p.m. ET", "First results are expected tonight."),
            ],
            false,
        );
        let site = site(LIVE, FakePage::new(markup).growing(3));
        let mut session = site.session();
        let Extraction::LiveBlog(records) = cnn(10).extract(&mut session, LIVE).await else {
            panic!("expected accepted entries");
        };
        let headlines: Vec<&str> = records.iter().map(|r| r.headline.as_str()).collect();
        assert_eq!(headlines, vec!["Polls open", "Turnout is high", "Results expected"]);
        assert!(records.iter().all(|r| r.url == LIVE && r.content_type == ContentType::LiveBlogEntry));
    }

    #[tokio::test]
    async fn test_live_blog_all_entries_filtered() {
        let markup = fixtures::cnn_live_blog(
            &[
                ("About our coverage", "From CNN", "CNN staff contributed to this report."),
                ("", "7:00 a.m. ET", "An entry with no headline at all."),
                ("Short", "7:05 a.m. ET", "Tiny."),
            ],
            true,
        );
        let site = site(LIVE, FakePage::new(markup));
        let mut session = site.session();
        assert_eq!(
            cnn(10).extract(&mut session, LIVE).await,
            Extraction::Skipped(SkipAuditEntry::new(LIVE, SkipReason::AllSubentriesFiltered))
        );
    }

    #[tokio::test]
    async fn test_live_blog_of_attributions_only_is_one_skip() {
        let markup = fixtures::cnn_live_blog(
            &[
                ("About our coverage", "From CNN", "CNN staff contributed to this report."),
                ("Our correspondents", "From CNN", "Reporters are stationed across the country."),
                ("How we report", "From CNN", "Results come from the Associated Press."),
            ],
            false,
        );
        let site = site(LIVE, FakePage::new(markup));
        let mut session = site.session();
        let out = cnn(10).extract(&mut session, LIVE).await;
        assert_eq!(out, Extraction::Skipped(SkipAuditEntry::new(LIVE, SkipReason::AllSubentriesFiltered)));
    }

    #[tokio::test]
    async fn test_subheaders_count_toward_length() {
        let markup = fixtures::cnn_article_with_subheaders("H", "May 6", &["Short body."], &["What next"]);
        let site = site(STORY, FakePage::new(markup));
        let mut session = site.session();
        let Extraction::Article(record) = cnn(20).extract(&mut session, STORY).await else {
            panic!("expected an accepted article");
        };
        assert_eq!(record.main_text, "Short body. What next.");
    }

    #[tokio::test]
    async fn test_live_blog_without_container() {
        let site = site(LIVE, FakePage::new("<html><body><article>x</article></body></html>"));
        let mut session = site.session();
        assert_eq!(
            cnn(10).extract(&mut session, LIVE).await,
            Extraction::Skipped(SkipAuditEntry::new(LIVE, SkipReason::NoContentMarkup))
        );
    }

    #[test]
    fn test_build_main_text_collapses_whitespace() {
        let extractor = cnn(0);
        let text = extractor.build_main_text(&["  One\u{a0} two ".into(), "".into(), "three\n four".into()]);
        assert_eq!(text, "One two three four");
    }
}
