//! Run-time configuration.
//!
//! Settings come from three layers, later layers winning:
//! 1. [`CrawlConfig::default`]
//! 2. An optional YAML file (`--config path`)
//! 3. CLI flags and their environment variables (see [`crate::cli::Cli`])
//!
//! # Example
//!
//! ```yaml
//! workers: 8
//! article_budget: 300
//! sources: [cnn, foxnews]
//! timeouts:
//!   live_blog_secs: 45
//! pauses:
//!   request: { min_ms: 300, max_ms: 700 }
//! junk_phrases:
//!   foxnews: ["cyberguy.com", "click here"]
//! output:
//!   save: true
//!   dir: ./data
//! ```

use crate::cli::Cli;
use crate::models::Source;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::time::Duration;
use tokio::fs;
use tracing::{info, instrument};

/// Inclusive bounds of a randomized pause, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct PauseRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl PauseRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    #[cfg(test)]
    pub const ZERO: PauseRange = PauseRange::new(0, 0);
}

/// Load bounds for each kind of navigation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Timeouts {
    pub standard_secs: u64,
    pub live_blog_secs: u64,
    pub discovery_secs: u64,
    pub load_more_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            standard_secs: 15,
            live_blog_secs: 30,
            discovery_secs: 30,
            load_more_secs: 10,
        }
    }
}

impl Timeouts {
    pub fn standard(&self) -> Duration {
        Duration::from_secs(self.standard_secs)
    }

    pub fn live_blog(&self) -> Duration {
        Duration::from_secs(self.live_blog_secs)
    }

    pub fn discovery(&self) -> Duration {
        Duration::from_secs(self.discovery_secs)
    }

    pub fn load_more(&self) -> Duration {
        Duration::from_secs(self.load_more_secs)
    }
}

/// Randomized pause ranges.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Pauses {
    /// Before each article navigation.
    pub request: PauseRange,
    /// Between discovery scroll steps.
    pub scroll: PauseRange,
    /// Between live-blog scroll steps.
    pub live_scroll: PauseRange,
}

impl Default for Pauses {
    fn default() -> Self {
        Self {
            request: PauseRange::new(300, 700),
            scroll: PauseRange::new(150, 200),
            live_scroll: PauseRange::new(100, 200),
        }
    }
}

impl Pauses {
    /// No waiting at all; used by tests.
    #[cfg(test)]
    pub fn none() -> Self {
        Self {
            request: PauseRange::ZERO,
            scroll: PauseRange::ZERO,
            live_scroll: PauseRange::ZERO,
        }
    }
}

/// Where and whether to write results.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub save: bool,
    pub dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            save: false,
            dir: "./data".to_string(),
        }
    }
}

/// Complete configuration of one crawl run.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CrawlConfig {
    pub workers: usize,
    pub article_budget: usize,
    pub min_content_chars: usize,
    pub preload_next_source: bool,
    pub concurrent_page_discovery: bool,
    pub sources: Vec<Source>,
    pub headless: bool,
    pub timeouts: Timeouts,
    pub pauses: Pauses,
    pub max_scroll_steps: usize,
    pub max_live_blog_scrolls: usize,
    pub probe_attempts: u32,
    pub markup_attempts: u32,
    pub junk_phrases: BTreeMap<Source, Vec<String>>,
    pub output: OutputConfig,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        let mut junk_phrases = BTreeMap::new();
        junk_phrases.insert(Source::Cnn, Vec::new());
        junk_phrases.insert(
            Source::FoxNews,
            vec!["cyberguy.com".to_string(), "click here".to_string()],
        );
        Self {
            workers: 4,
            article_budget: 200,
            min_content_chars: 10,
            preload_next_source: true,
            concurrent_page_discovery: true,
            sources: vec![Source::Cnn, Source::FoxNews],
            headless: true,
            timeouts: Timeouts::default(),
            pauses: Pauses::default(),
            max_scroll_steps: 10,
            max_live_blog_scrolls: 100,
            probe_attempts: 10,
            markup_attempts: 2,
            junk_phrases,
            output: OutputConfig::default(),
        }
    }
}

impl CrawlConfig {
    /// Parse a YAML document; missing keys fall back to defaults.
    pub fn from_yaml(text: &str) -> Result<Self, Box<dyn Error>> {
        let config: CrawlConfig = serde_yaml::from_str(text)?;
        Ok(config)
    }

    /// Load the YAML file at `path`, or the defaults when no path is given.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&str>) -> Result<Self, Box<dyn Error>> {
        match path {
            Some(path) => {
                let text = fs::read_to_string(path).await?;
                let config = Self::from_yaml(&text)?;
                info!(path, "Loaded configuration");
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply CLI flags on top of the file/default values.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(workers) = cli.workers {
            self.workers = workers;
        }
        if let Some(budget) = cli.budget {
            self.article_budget = budget;
        }
        if let Some(min_chars) = cli.min_chars {
            self.min_content_chars = min_chars;
        }
        if cli.save {
            self.output.save = true;
        }
        if let Some(dir) = &cli.output_dir {
            self.output.dir = dir.clone();
        }
        if cli.no_preload {
            self.preload_next_source = false;
        }
        if cli.headful {
            self.headless = false;
        }
    }

    /// Reject settings the crawl cannot run with.
    pub fn validate(&self) -> Result<(), Box<dyn Error>> {
        if self.workers == 0 {
            return Err("workers must be at least 1".into());
        }
        if self.sources.is_empty() {
            return Err("at least one source must be configured".into());
        }
        if self.probe_attempts == 0 || self.markup_attempts == 0 {
            return Err("probe_attempts and markup_attempts must be at least 1".into());
        }
        Ok(())
    }

    /// Junk phrases configured for `source`.
    pub fn junk_for(&self, source: Source) -> &[String] {
        self.junk_phrases
            .get(&source)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// A configuration with no pauses and tiny timeouts; used by tests.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            pauses: Pauses::none(),
            timeouts: Timeouts {
                standard_secs: 1,
                live_blog_secs: 1,
                discovery_secs: 1,
                load_more_secs: 0,
            },
            ..Self::default()
        }
    }
}
