//! # News Sweep
//!
//! Discovers article URLs on news search pages with a pool of headless
//! browser sessions, extracts every article into a normalized record, and
//! reports why each rejected URL was skipped.
//!
//! ## Features
//!
//! - Scroll-convergence discovery (Fox News) and paged discovery (CNN), both
//!   bounded by a per-source article budget
//! - Static partitioning of URLs over N browser tabs with a completion barrier
//! - Standard-article and live-blog extraction with length, all-caps, and
//!   junk-phrase filters
//! - Optional preloading of the next source's discovery on a spare tab
//! - JSON output of records, skip audits, and a run summary
//!
//! ## Usage
//!
//! ```sh
//! news_sweep "interest rates" --workers 8 --budget 300 --save -o ./data
//! ```
//!
//! ## Architecture
//!
//! For each configured source, in order:
//! 1. **Discovery**: collect a deduplicated URL set from the search results
//! 2. **Distribution**: split the URLs into one contiguous chunk per tab
//! 3. **Extraction**: classify, fetch, parse, and filter each URL
//! 4. **Aggregation**: collect records and skips, freeze after every worker finishes
//! 5. **Output**: write JSON when `--save` is given

use chrono::Local;
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod aggregator;
mod cli;
mod config;
mod controller;
mod discovery;
mod distributor;
mod extract;
mod markup;
mod models;
mod outputs;
mod retry;
mod scrapers;
mod session;
mod utils;

use cli::Cli;
use config::CrawlConfig;
use controller::RunController;
use outputs::json;
use scrapers::adapter_for;
use session::SessionPool;
use session::chrome::ChromeBrowser;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let started_at = Local::now();
    info!("news_sweep starting up");

    // Parse CLI, then layer it over the config file
    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let mut config = CrawlConfig::load(args.config.as_deref()).await?;
    config.apply_cli(&args);
    config.validate()?;
    let keyword = args.keyword.trim();
    if keyword.is_empty() {
        return Err("search keyword must not be blank".into());
    }
    info!(
        keyword,
        workers = config.workers,
        budget = config.article_budget,
        sources = ?config.sources,
        preload = config.preload_next_source,
        "Configuration ready"
    );

    // Early check: ensure output dir is writable before spending time crawling
    if config.output.save {
        if let Err(e) = ensure_writable_dir(&config.output.dir).await {
            error!(
                path = %config.output.dir,
                error = %e,
                "Output directory is not writable (fix perms or choose a different path)"
            );
            return Err(e);
        }
    }

    // ---- Browser and session pool ----
    let browser = ChromeBrowser::launch(config.headless).await?;
    let sessions = match browser.open_sessions(config.workers).await {
        Ok(sessions) => sessions,
        Err(e) => {
            error!(error = %e, "Failed to open browser tabs");
            browser.shutdown().await;
            return Err(e);
        }
    };
    let mut pool = SessionPool::new(sessions);
    if pool.is_empty() {
        browser.shutdown().await;
        return Err("no browser sessions could be opened".into());
    }
    info!(sessions = pool.len(), "Session pool ready");

    // ---- Crawl every source ----
    let adapters: Vec<_> = config.sources.iter().copied().map(adapter_for).collect();
    let states = RunController::new(&mut pool, &config)
        .run_all(&adapters, keyword)
        .await;

    pool.close_all().await;
    browser.shutdown().await;

    for state in &states {
        let progress = state.progress();
        info!(
            source = %state.source(),
            discovered = progress.total,
            accepted = progress.accepted,
            skipped = progress.skipped,
            "Source complete"
        );
    }

    // ---- Output ----
    if config.output.save {
        for state in &states {
            if let Err(e) = json::write_source(state, &config.output.dir).await {
                error!(source = %state.source(), error = %e, "Failed to write source output");
            }
        }
        let summary = json::RunSummary::new(keyword, started_at, &states);
        if let Err(e) = json::write_summary(&summary, &config.output.dir).await {
            error!(error = %e, "Failed to write run summary");
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        accepted = states.iter().map(|s| s.accepted_count()).sum::<usize>(),
        skipped = states.iter().map(|s| s.skipped_count()).sum::<usize>(),
        "Execution complete"
    );

    Ok(())
}
