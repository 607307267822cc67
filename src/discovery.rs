//! Candidate URL discovery.
//!
//! Each source enumerates its search results one of two ways, chosen by its
//! [`DiscoveryMode`]:
//!
//! - **Scroll convergence**: one results page that grows while scrolled.
//!   Scroll until the document height stops changing, click "load more",
//!   repeat. At most `budget / page_size` clicks are made, so a site with
//!   endless results still stops where the budget says.
//! - **Paged**: probe page 0 for the declared result count, then fetch the
//!   `ceil(min(total, budget) / page_size)` pages that cover the budget,
//!   optionally spread over every session through [`distribute`].
//!
//! Discovery never fails the run. A timeout or missing control ends the
//! current step; whatever was gathered so far is returned, possibly nothing.
//! Results are deduplicated in first-seen order and capped at the budget.

use crate::config::{CrawlConfig, PauseRange};
use crate::distributor::{ChunkHandler, NoPreload, PreloadJob, distribute};
use crate::retry::{RetryPolicy, retry};
use crate::scrapers::{DiscoveryMode, SiteAdapter};
use crate::session::{RenderSession, SessionError, click_first, scroll_height, scroll_to_bottom};
use crate::utils::pause;
use futures::FutureExt;
use futures::future::LocalBoxFuture;
use itertools::Itertools;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

const LOAD_MORE_POLL: Duration = Duration::from_millis(250);
const PAGE_POLL: Duration = Duration::from_millis(250);

/// Knobs for one discovery pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverySettings {
    /// Maximum number of URLs to return.
    pub budget: usize,
    /// Scroll steps per convergence burst.
    pub max_scroll_steps: usize,
    pub scroll_pause: PauseRange,
    /// Load bound for search result pages.
    pub page_timeout: Duration,
    /// How long a "load more" control may take to become clickable.
    pub load_more_timeout: Duration,
    /// Retry policy for reading the declared result count.
    pub probe: RetryPolicy,
    /// Fetch result pages on every session rather than one.
    pub concurrent_pages: bool,
}

impl DiscoverySettings {
    pub fn from_config(config: &CrawlConfig) -> Self {
        let mut probe = RetryPolicy::new(config.probe_attempts, Duration::from_millis(500));
        probe.max_delay = Duration::from_secs(1);
        Self {
            budget: config.article_budget,
            max_scroll_steps: config.max_scroll_steps,
            scroll_pause: config.pauses.scroll,
            page_timeout: config.timeouts.discovery(),
            load_more_timeout: config.timeouts.load_more(),
            probe,
            concurrent_pages: config.concurrent_page_discovery,
        }
    }

    pub fn with_budget(mut self, budget: usize) -> Self {
        self.budget = budget;
        self
    }
}

/// Result of one scroll-until-stable burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollOutcome {
    pub steps: usize,
    pub final_height: u64,
    /// `false` when the step budget ran out while the page was still growing.
    pub converged: bool,
}

/// Scroll to the bottom until the document height stops changing, at most
/// `max_steps` times.
pub async fn converge_scroll<S: RenderSession>(
    session: &mut S,
    max_steps: usize,
    pause_range: &PauseRange,
) -> Result<ScrollOutcome, SessionError> {
    let mut height = scroll_height(session).await?;
    for step in 1..=max_steps {
        scroll_to_bottom(session).await?;
        pause(pause_range).await;
        let next = scroll_height(session).await?;
        if next == height {
            return Ok(ScrollOutcome {
                steps: step,
                final_height: next,
                converged: true,
            });
        }
        height = next;
    }
    Ok(ScrollOutcome {
        steps: max_steps,
        final_height: height,
        converged: false,
    })
}

#[derive(Debug, Error)]
enum StepError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("{0} not present yet")]
    NotReady(&'static str),
}

/// What a retried page read needs besides the session.
struct PageRead<'s, S> {
    session: &'s mut S,
    adapter: &'s dyn SiteAdapter,
    url: String,
    timeout: Duration,
}

fn read_total<'a, S: RenderSession>(
    read: &'a mut PageRead<'_, S>,
) -> LocalBoxFuture<'a, Result<(usize, Vec<String>), StepError>> {
    async move {
        read.session.navigate(&read.url, read.timeout).await?;
        let markup = read.session.current_markup().await?;
        let total = read
            .adapter
            .total_results(&markup)
            .ok_or(StepError::NotReady("result count"))?;
        Ok((total, read.adapter.extract_links(&markup)))
    }
    .boxed_local()
}

fn read_links<'a, S: RenderSession>(
    read: &'a mut PageRead<'_, S>,
) -> LocalBoxFuture<'a, Result<Vec<String>, StepError>> {
    async move {
        let markup = read.session.current_markup().await?;
        let links = read.adapter.extract_links(&markup);
        if links.is_empty() {
            return Err(StepError::NotReady("result links"));
        }
        Ok(links)
    }
    .boxed_local()
}

fn capped(urls: impl IntoIterator<Item = String>, budget: usize) -> Vec<String> {
    urls.into_iter().unique().take(budget).collect()
}

/// Discover candidate URLs for `keyword` on `adapter`'s source.
///
/// Scroll-convergence sources use `sessions[0]` only. Paged sources probe on
/// `sessions[0]` and, when `settings.concurrent_pages` is set, fetch the
/// remaining pages on every session.
#[instrument(level = "info", skip_all, fields(source = %adapter.source(), keyword, budget = settings.budget))]
pub async fn discover<S: RenderSession>(
    sessions: &mut [S],
    adapter: &dyn SiteAdapter,
    keyword: &str,
    settings: &DiscoverySettings,
) -> Vec<String> {
    if settings.budget == 0 {
        info!("Budget is zero; nothing to discover");
        return Vec::new();
    }
    let urls = match adapter.discovery_mode() {
        DiscoveryMode::ScrollConvergence { load_more_selector } => {
            let Some(session) = sessions.first_mut() else {
                warn!("No session available for discovery");
                return Vec::new();
            };
            discover_by_scrolling(session, adapter, keyword, load_more_selector, settings).await
        }
        DiscoveryMode::Paged => {
            if sessions.is_empty() {
                warn!("No session available for discovery");
                return Vec::new();
            }
            let sessions = if settings.concurrent_pages {
                sessions
            } else {
                &mut sessions[..1]
            };
            discover_by_pages(sessions, adapter, keyword, settings).await
        }
    };
    info!(found = urls.len(), "Discovery finished");
    urls
}

async fn discover_by_scrolling<S: RenderSession>(
    session: &mut S,
    adapter: &dyn SiteAdapter,
    keyword: &str,
    load_more_selector: &'static str,
    settings: &DiscoverySettings,
) -> Vec<String> {
    let url = adapter.search_url(keyword, 0);
    if let Err(e) = session.navigate(&url, settings.page_timeout).await {
        warn!(url = %url, error = %e, "Could not load search page");
        return Vec::new();
    }

    let max_cycles = settings.budget / adapter.page_size().max(1);
    let load_more = RetryPolicy::polling(LOAD_MORE_POLL, settings.load_more_timeout);
    let mut cycles = 0;
    loop {
        match converge_scroll(session, settings.max_scroll_steps, &settings.scroll_pause).await {
            Ok(outcome) => debug!(
                cycle = cycles,
                steps = outcome.steps,
                height = outcome.final_height,
                converged = outcome.converged,
                "Scroll burst finished"
            ),
            Err(e) => {
                warn!(cycle = cycles, error = %e, "Scrolling failed; keeping what is loaded");
                break;
            }
        }
        if cycles >= max_cycles {
            debug!(cycles, "Load-more budget reached");
            break;
        }
        let clicked = retry(session, &load_more, "load_more", move |s| {
            async move {
                if click_first(s, load_more_selector).await? {
                    Ok(())
                } else {
                    Err(StepError::NotReady("load more control"))
                }
            }
            .boxed_local()
        })
        .await;
        if let Err(e) = clicked {
            debug!(cycles, error = %e, "No more results to load");
            break;
        }
        cycles += 1;
    }

    match session.current_markup().await {
        Ok(markup) => capped(adapter.extract_links(&markup), settings.budget),
        Err(e) => {
            warn!(error = %e, "Could not snapshot search results");
            Vec::new()
        }
    }
}

/// Number of result pages needed to cover `min(total, budget)`.
pub fn pages_needed(total: usize, budget: usize, page_size: usize) -> usize {
    total.min(budget).div_ceil(page_size.max(1))
}

/// Fetches one results page per item; pages land in `found` keyed by index.
struct PageFetcher<'d> {
    adapter: &'d dyn SiteAdapter,
    keyword: &'d str,
    settings: &'d DiscoverySettings,
    found: Mutex<BTreeMap<usize, Vec<String>>>,
}

impl<S: RenderSession> ChunkHandler<S> for PageFetcher<'_> {
    type Item = usize;

    fn label(&self, page: &usize) -> String {
        format!("page {page}")
    }

    async fn handle(&self, worker: usize, session: &mut S, page: usize) {
        let url = self.adapter.search_url(self.keyword, page);
        if let Err(e) = session.navigate(&url, self.settings.page_timeout).await {
            warn!(worker, page, error = %e, "Results page failed to load; skipping it");
            return;
        }
        let mut read = PageRead {
            session,
            adapter: self.adapter,
            url,
            timeout: self.settings.page_timeout,
        };
        let policy = RetryPolicy::polling(PAGE_POLL, self.settings.page_timeout);
        match retry(&mut read, &policy, "result_links", read_links::<S>).await {
            Ok(links) => {
                debug!(worker, page, links = links.len(), "Results page read");
                self.found.lock().await.insert(page, links);
            }
            Err(e) => warn!(worker, page, error = %e, "No results on page"),
        }
    }
}

async fn discover_by_pages<S: RenderSession>(
    sessions: &mut [S],
    adapter: &dyn SiteAdapter,
    keyword: &str,
    settings: &DiscoverySettings,
) -> Vec<String> {
    let (total, first_links) = {
        let Some(session) = sessions.first_mut() else {
            return Vec::new();
        };
        let mut read = PageRead {
            session,
            adapter,
            url: adapter.search_url(keyword, 0),
            timeout: settings.page_timeout,
        };
        match retry(&mut read, &settings.probe, "result_count", read_total::<S>).await {
            Ok(probed) => probed,
            Err(e) => {
                warn!(error = %e, "Could not read result count; discovery yields nothing");
                return Vec::new();
            }
        }
    };

    let pages = pages_needed(total, settings.budget, adapter.page_size());
    info!(total, pages, "Result count read");
    if pages == 0 {
        return Vec::new();
    }

    let fetcher = PageFetcher {
        adapter,
        keyword,
        settings,
        found: Mutex::new(BTreeMap::from([(0, first_links)])),
    };
    distribute(sessions, (1..pages).collect(), &fetcher, None::<NoPreload>).await;

    let found = fetcher.found.into_inner();
    capped(found.into_values().flatten(), settings.budget)
}

/// Discovery of the next source, run on the reserved slot while the current
/// source is being extracted.
pub struct PreloadDiscovery<'a> {
    pub adapter: &'a dyn SiteAdapter,
    pub keyword: &'a str,
    pub settings: DiscoverySettings,
}

impl<S: RenderSession> PreloadJob<S> for PreloadDiscovery<'_> {
    type Output = Vec<String>;

    async fn run(self, session: &mut S) -> Vec<String> {
        info!(source = %self.adapter.source(), "Preloading discovery");
        discover(std::slice::from_mut(session), self.adapter, self.keyword, &self.settings).await
    }
}
