//! Run controller: discover, distribute extraction, freeze, per source.
//!
//! With preloading enabled and at least two sessions, the last session
//! discovers the next source while the others extract the current one, so
//! the next run starts with its URLs already in hand. Preloading only moves
//! work around; the URLs discovered and the rules applied to them are the
//! same as for a cold run.

use crate::aggregator::{Aggregator, RunState};
use crate::config::CrawlConfig;
use crate::discovery::{DiscoverySettings, PreloadDiscovery, discover};
use crate::distributor::{ChunkHandler, distribute};
use crate::extract::{Extraction, Extractor};
use crate::models::{SkipAuditEntry, SkipReason};
use crate::scrapers::SiteAdapter;
use crate::session::{RenderSession, SessionPool};
use itertools::Itertools;
use tracing::{debug, error, info, instrument, warn};

/// Extracts one URL per item and reports into the shared aggregator.
struct ExtractionWorker<'a> {
    extractor: Extractor<'a>,
    aggregator: &'a Aggregator,
}

impl<S: RenderSession> ChunkHandler<S> for ExtractionWorker<'_> {
    type Item = String;

    fn label(&self, url: &String) -> String {
        url.clone()
    }

    async fn handle(&self, worker: usize, session: &mut S, url: String) {
        let progress = match self.extractor.extract(session, &url).await {
            Extraction::Article(record) => self.aggregator.accept(record).await,
            Extraction::LiveBlog(records) => self.aggregator.accept_all(records).await,
            Extraction::Skipped(entry) => {
                warn!(worker, url = %entry.url, reason = %entry.reason, "Skipped");
                self.aggregator.skip(entry).await
            }
        };
        info!(
            worker,
            source = %self.aggregator.source(),
            processed = progress.processed,
            total = progress.total,
            accepted = progress.accepted,
            skipped = progress.skipped,
            "Progress"
        );
    }

    async fn on_panic(&self, worker: usize, url: String) {
        error!(worker, url = %url, "Extraction panicked; recording URL as failed");
        self.aggregator
            .skip(SkipAuditEntry::new(url, SkipReason::FetchFailed))
            .await;
    }
}

/// Drives whole runs over a borrowed session pool.
pub struct RunController<'p, S> {
    pool: &'p mut SessionPool<S>,
    config: &'p CrawlConfig,
}

impl<'p, S: RenderSession> RunController<'p, S> {
    pub fn new(pool: &'p mut SessionPool<S>, config: &'p CrawlConfig) -> Self {
        Self { pool, config }
    }

    fn preload_enabled(&self) -> bool {
        self.config.preload_next_source && self.pool.len() >= 2
    }

    /// One source, discovered cold, extracted on every session.
    #[instrument(level = "info", skip_all, fields(source = %adapter.source(), keyword, budget))]
    pub async fn run(&mut self, adapter: &dyn SiteAdapter, keyword: &str, budget: usize) -> RunState {
        let urls = self.discover_cold(adapter, keyword, budget).await;
        self.run_urls(adapter, urls).await
    }

    /// Extract an already-discovered URL set.
    pub async fn run_urls(&mut self, adapter: &dyn SiteAdapter, urls: Vec<String>) -> RunState {
        self.extract_phase(adapter, urls, None).await.0
    }

    /// Every source in order, preloading each next source's discovery when
    /// enabled.
    #[instrument(level = "info", skip_all, fields(keyword, sources = adapters.len()))]
    pub async fn run_all(&mut self, adapters: &[Box<dyn SiteAdapter>], keyword: &str) -> Vec<RunState> {
        let budget = self.config.article_budget;
        let preload = self.preload_enabled();
        if self.config.preload_next_source && !preload {
            warn!(sessions = self.pool.len(), "Preloading needs at least two sessions; discovering cold");
        }
        if !preload {
            let mut states = Vec::with_capacity(adapters.len());
            for adapter in adapters {
                states.push(self.run(adapter.as_ref(), keyword, budget).await);
            }
            return states;
        }

        let mut states = Vec::with_capacity(adapters.len());
        let mut preloaded: Option<Vec<String>> = None;
        for (i, adapter) in adapters.iter().enumerate() {
            let adapter = adapter.as_ref();
            let urls = match preloaded.take() {
                Some(urls) => {
                    info!(source = %adapter.source(), found = urls.len(), "Using preloaded discovery");
                    urls
                }
                None => self.discover_cold(adapter, keyword, budget).await,
            };
            let job = adapters
                .get(i + 1)
                .map(|next| PreloadDiscovery {
                    adapter: next.as_ref(),
                    keyword,
                    settings: DiscoverySettings::from_config(self.config).with_budget(budget),
                });
            let (state, next_urls) = self.extract_phase(adapter, urls, job).await;
            preloaded = next_urls;
            states.push(state);
        }
        states
    }

    async fn discover_cold(&mut self, adapter: &dyn SiteAdapter, keyword: &str, budget: usize) -> Vec<String> {
        let settings = DiscoverySettings::from_config(self.config).with_budget(budget);
        discover(self.pool.slots_mut(), adapter, keyword, &settings).await
    }

    async fn extract_phase<'a>(
        &mut self,
        adapter: &'a dyn SiteAdapter,
        urls: Vec<String>,
        preload: Option<PreloadDiscovery<'a>>,
    ) -> (RunState, Option<Vec<String>>) {
        info!(source = %adapter.source(), urls = urls.len(), preload = preload.is_some(), "Extraction starting");
        let aggregator = Aggregator::new(adapter.source(), urls.clone());
        let worker = ExtractionWorker {
            extractor: Extractor::new(adapter, self.config),
            aggregator: &aggregator,
        };
        let preloaded = distribute(self.pool.slots_mut(), urls, &worker, preload).await;
        drop(worker);
        let progress = aggregator.progress().await;
        debug!(
            source = %adapter.source(),
            processed = progress.processed,
            total = progress.total,
            "Completion barrier reached"
        );

        let state = aggregator.freeze();
        report(&state);
        (state, preloaded)
    }
}

/// Log the final counts, every skipped URL with its reason, and the skips
/// grouped by reason.
fn report(state: &RunState) {
    let progress = state.progress();
    info!(
        source = %state.source(),
        discovered = progress.total,
        accepted = progress.accepted,
        skipped = progress.skipped,
        "Run finished"
    );
    for entry in state.skipped() {
        warn!(source = %state.source(), url = %entry.url, reason = %entry.reason, "Skipped link");
    }
    for (reason, count) in skips_by_reason(state) {
        info!(source = %state.source(), %reason, count, "Skipped");
    }
}

fn skips_by_reason(state: &RunState) -> Vec<(SkipReason, usize)> {
    state
        .skipped()
        .iter()
        .map(|s| s.reason)
        .counts()
        .into_iter()
        .sorted_by_key(|(r, _)| r.to_string())
        .collect()
}
