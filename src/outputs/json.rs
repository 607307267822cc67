//! JSON output of run results.
//!
//! Each source gets its accepted records as a JSON array of table rows
//! (`publish_date, headline, main_text, media, type, url`) and its skip audit
//! as a separate array of `{url, reason}` objects. A `summary.json` records
//! the keyword, start and finish times, and per-source counts.

use crate::aggregator::RunState;
use crate::models::Source;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::error::Error;
use tokio::fs;
use tracing::{error, info, instrument};

/// Counts for one source in the run summary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SourceSummary {
    pub source: Source,
    pub discovered: usize,
    pub accepted: usize,
    pub skipped: usize,
}

impl From<&RunState> for SourceSummary {
    fn from(state: &RunState) -> Self {
        Self {
            source: state.source(),
            discovered: state.target_urls().len(),
            accepted: state.accepted_count(),
            skipped: state.skipped_count(),
        }
    }
}

/// Contents of `summary.json`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RunSummary {
    pub keyword: String,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub sources: Vec<SourceSummary>,
}

impl RunSummary {
    pub fn new(keyword: &str, started_at: DateTime<Local>, states: &[RunState]) -> Self {
        Self {
            keyword: keyword.to_string(),
            started_at,
            finished_at: Local::now(),
            sources: states.iter().map(SourceSummary::from).collect(),
        }
    }
}

async fn write_json<T: Serialize + ?Sized>(value: &T, path: &str) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).await?;
    info!(path, "Wrote JSON file");
    Ok(())
}

fn path_in(dir: &str, file: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), file)
}

/// Write `{dir}/{source}.json` and `{dir}/{source}_skipped.json`.
#[instrument(level = "info", skip_all, fields(source = %state.source(), output_dir = %dir))]
pub async fn write_source(state: &RunState, dir: &str) -> Result<(), Box<dyn Error>> {
    if let Err(e) = fs::create_dir_all(dir).await {
        error!(error = %e, "Failed to create output dir");
        return Err(e.into());
    }
    let slug = state.source().slug();
    write_json(state.accepted(), &path_in(dir, &format!("{slug}.json"))).await?;
    write_json(state.skipped(), &path_in(dir, &format!("{slug}_skipped.json"))).await?;
    Ok(())
}

/// Write `{dir}/summary.json`.
#[instrument(level = "info", skip_all, fields(output_dir = %dir))]
pub async fn write_summary(summary: &RunSummary, dir: &str) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(dir).await?;
    write_json(summary, &path_in(dir, "summary.json")).await
}
