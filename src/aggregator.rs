//! Thread-safe accumulation of one source's results.
//!
//! Workers hand every outcome to a shared [`Aggregator`]; each append takes
//! the lock once, so counts and collections never drift apart. After the
//! completion barrier the aggregator is consumed into a read-only
//! [`RunState`].

use crate::models::{ArticleRecord, SkipAuditEntry, Source};
use serde::Serialize;
use tokio::sync::Mutex;

/// Snapshot of a run's counters. Every field only grows during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Progress {
    /// Accepted records (a live blog may contribute several).
    pub accepted: usize,
    /// Skipped URLs.
    pub skipped: usize,
    /// URLs that have been fully handled, accepted or skipped.
    pub processed: usize,
    /// URLs discovered for this run.
    pub total: usize,
}

#[derive(Debug, Default)]
struct Tally {
    accepted: Vec<ArticleRecord>,
    skipped: Vec<SkipAuditEntry>,
    processed: usize,
}

impl Tally {
    fn progress(&self, total: usize) -> Progress {
        Progress {
            accepted: self.accepted.len(),
            skipped: self.skipped.len(),
            processed: self.processed,
            total,
        }
    }
}

/// Shared sink for accepted records and skip-audit entries.
#[derive(Debug)]
pub struct Aggregator {
    source: Source,
    targets: Vec<String>,
    inner: Mutex<Tally>,
}

impl Aggregator {
    /// Start a run over `targets`, the discovered URL set.
    pub fn new(source: Source, targets: Vec<String>) -> Self {
        Self {
            source,
            targets,
            inner: Mutex::new(Tally::default()),
        }
    }

    pub fn source(&self) -> Source {
        self.source
    }

    /// Record one accepted article from one URL.
    pub async fn accept(&self, record: ArticleRecord) -> Progress {
        self.accept_all(vec![record]).await
    }

    /// Record every record produced by one URL, as a single update.
    pub async fn accept_all(&self, records: Vec<ArticleRecord>) -> Progress {
        let mut tally = self.inner.lock().await;
        tally.accepted.extend(records);
        tally.processed += 1;
        tally.progress(self.targets.len())
    }

    /// Record one rejected URL.
    pub async fn skip(&self, entry: SkipAuditEntry) -> Progress {
        let mut tally = self.inner.lock().await;
        tally.skipped.push(entry);
        tally.processed += 1;
        tally.progress(self.targets.len())
    }

    pub async fn progress(&self) -> Progress {
        self.inner.lock().await.progress(self.targets.len())
    }

    /// Freeze the results. Consuming `self` guarantees no worker still holds
    /// a reference, so no lock is needed from here on.
    pub fn freeze(self) -> RunState {
        let tally = self.inner.into_inner();
        RunState {
            source: self.source,
            target_urls: self.targets,
            accepted: tally.accepted,
            skipped: tally.skipped,
            processed: tally.processed,
        }
    }
}

/// Final, read-only results of one source's run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunState {
    source: Source,
    target_urls: Vec<String>,
    accepted: Vec<ArticleRecord>,
    skipped: Vec<SkipAuditEntry>,
    processed: usize,
}

impl RunState {
    pub fn source(&self) -> Source {
        self.source
    }

    pub fn target_urls(&self) -> &[String] {
        &self.target_urls
    }

    pub fn accepted(&self) -> &[ArticleRecord] {
        &self.accepted
    }

    pub fn skipped(&self) -> &[SkipAuditEntry] {
        &self.skipped
    }

    pub fn accepted_count(&self) -> usize {
        self.accepted.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn progress(&self) -> Progress {
        Progress {
            accepted: self.accepted.len(),
            skipped: self.skipped.len(),
            processed: self.processed,
            total: self.target_urls.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentType, SkipReason};
    use futures::future::join_all;

    fn record(i: usize) -> ArticleRecord {
        ArticleRecord {
            publish_date: "May 6, 2025".to_string(),
            headline: format!("Headline {i}"),
            main_text: "Body text long enough".to_string(),
            source: Source::FoxNews,
            content_type: ContentType::Article,
            url: format!("https://www.foxnews.com/a/{i}"),
        }
    }

    #[tokio::test]
    async fn test_concurrent_appends_lose_nothing() {
        let urls: Vec<String> = (0..200).map(|i| format!("u{i}")).collect();
        let aggregator = Aggregator::new(Source::FoxNews, urls);
        join_all((0..200).map(|i| {
            let aggregator = &aggregator;
            async move {
                tokio::task::yield_now().await;
                if i % 3 == 0 {
                    aggregator
                        .skip(SkipAuditEntry::new(format!("u{i}"), SkipReason::BelowMinLength))
                        .await;
                } else {
                    aggregator.accept(record(i)).await;
                }
            }
        }))
        .await;

        let progress = aggregator.progress().await;
        assert_eq!(progress.skipped, 67);
        assert_eq!(progress.accepted, 133);
        assert_eq!(progress.processed, 200);
        assert_eq!(progress.total, 200);

        let state = aggregator.freeze();
        assert_eq!(state.accepted_count(), 133);
        assert_eq!(state.skipped_count(), 67);
        assert_eq!(state.target_urls().len(), 200);
    }

    #[tokio::test]
    async fn test_live_blog_records_count_one_url() {
        let aggregator = Aggregator::new(Source::Cnn, vec!["u".to_string()]);
        let p = aggregator.accept_all(vec![record(1), record(2), record(3)]).await;
        assert_eq!(p.accepted, 3);
        assert_eq!(p.processed, 1);
    }

    #[tokio::test]
    async fn test_progress_is_monotonic() {
        let aggregator = Aggregator::new(Source::Cnn, vec!["a".into(), "b".into(), "c".into()]);
        let p1 = aggregator.accept(record(1)).await;
        let p2 = aggregator.skip(SkipAuditEntry::new("b", SkipReason::FetchTimeout)).await;
        let p3 = aggregator.accept(record(3)).await;
        for (a, b) in [(p1, p2), (p2, p3)] {
            assert!(b.accepted >= a.accepted);
            assert!(b.skipped >= a.skipped);
            assert!(b.processed > a.processed);
        }
    }

    #[tokio::test]
    async fn test_frozen_state_keeps_skips() {
        let aggregator = Aggregator::new(Source::Cnn, vec!["a".into()]);
        aggregator.skip(SkipAuditEntry::new("a", SkipReason::IrrelevantSection)).await;
        let state = aggregator.freeze();
        assert!(state.accepted().is_empty());
        assert_eq!(state.skipped(), [SkipAuditEntry::new("a", SkipReason::IrrelevantSection)]);
    }
}
