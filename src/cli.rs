//! Command-line interface definitions for News Sweep.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Every option except the search keyword can also come from an environment
//! variable or the YAML config file.

use clap::Parser;

/// Command-line arguments for the News Sweep application.
///
/// # Examples
///
/// ```sh
/// # Crawl with defaults
/// news_sweep "interest rates"
///
/// # Eight browser sessions, 300 articles per source, write JSON to ./data
/// news_sweep "interest rates" --workers 8 --budget 300 --save -o ./data
///
/// # Load settings from a file
/// news_sweep "interest rates" -c crawl.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Keyword to search for on every source
    pub keyword: String,

    /// Optional path to a YAML config file
    #[arg(short, long, env = "NEWS_SWEEP_CONFIG")]
    pub config: Option<String>,

    /// Number of concurrent browser sessions
    #[arg(short, long, env = "NEWS_SWEEP_WORKERS")]
    pub workers: Option<usize>,

    /// Maximum number of candidate articles to discover per source
    #[arg(short, long, env = "NEWS_SWEEP_BUDGET")]
    pub budget: Option<usize>,

    /// Minimum article text length, in characters
    #[arg(long, env = "NEWS_SWEEP_MIN_CHARS")]
    pub min_chars: Option<usize>,

    /// Write per-source JSON tables and the skip audit
    #[arg(short, long)]
    pub save: bool,

    /// Output directory used with --save
    #[arg(short, long, env = "NEWS_SWEEP_OUTPUT_DIR")]
    pub output_dir: Option<String>,

    /// Discover each source cold instead of preloading it during the previous extraction
    #[arg(long)]
    pub no_preload: bool,

    /// Show the browser windows
    #[arg(long)]
    pub headful: bool,
}
