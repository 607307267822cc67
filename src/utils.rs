//! Utility functions for text cleanup, paragraph filtering, pacing, and file system checks.
//!
//! This module provides helpers used throughout the crawl:
//! - Whitespace normalization for scraped text
//! - Paragraph filters (all-caps lines, junk phrases)
//! - Randomized pauses between browser commands
//! - String truncation for logging
//! - File system validation for output directories

use crate::config::PauseRange;
use once_cell::sync::Lazy;
use rand::{Rng, rng};
use regex::Regex;
use std::error::Error;
use std::fs as stdfs;
use std::time::Duration;
use tokio::fs;
use tracing::{info, instrument};

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s\x{a0}]+").unwrap());

/// Collapse every whitespace run (including non-breaking spaces) to one
/// plain space and trim both ends.
///
/// Normalizing an already normalized string returns it unchanged.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(normalize_text("  Hello\u{a0}\u{a0}world \n"), "Hello world");
/// ```
pub fn normalize_text(s: &str) -> String {
    WHITESPACE_RUN.replace_all(s, " ").trim().to_string()
}

/// Remove leading labels such as `"Published"` or `"Updated"` from a date
/// line, then normalize it.
pub fn strip_leading_labels(s: &str, labels: &[&str]) -> String {
    let mut rest = normalize_text(s);
    loop {
        let before = rest.len();
        for label in labels {
            if let Some(stripped) = rest.strip_prefix(label) {
                rest = stripped.trim_start().to_string();
            }
        }
        if rest.len() == before {
            return rest;
        }
    }
}

/// `true` when the text has at least one cased letter and no lower-case letter.
///
/// Such paragraphs are bylines, section banners, or shouted promos.
pub fn is_all_upper(s: &str) -> bool {
    s.chars().any(char::is_uppercase) && !s.chars().any(char::is_lowercase)
}

fn trim_punctuation(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_ascii_punctuation() || c == '\u{2026}')
}

/// Case-insensitive exact/token matcher for junk paragraphs.
///
/// A paragraph is junk when, lower-cased and normalized with surrounding
/// punctuation trimmed, it either equals one of the phrases or contains a
/// whitespace token equal to one of them. A phrase that merely appears as a
/// substring of a longer sentence does not make it junk.
#[derive(Debug, Clone, Default)]
pub struct JunkFilter {
    phrases: Vec<String>,
}

impl JunkFilter {
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let phrases = phrases
            .into_iter()
            .map(|p| trim_punctuation(&normalize_text(&p.as_ref().to_lowercase())).to_string())
            .filter(|p| !p.is_empty())
            .collect();
        Self { phrases }
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    /// Whether `paragraph` should be dropped.
    pub fn matches(&self, paragraph: &str) -> bool {
        if self.phrases.is_empty() {
            return false;
        }
        let lowered = normalize_text(&paragraph.to_lowercase());
        let whole = trim_punctuation(&lowered);
        if self.phrases.iter().any(|p| p == whole) {
            return true;
        }
        lowered
            .split(' ')
            .map(trim_punctuation)
            .any(|token| self.phrases.iter().any(|p| p == token))
    }
}

/// Pick a random duration inside `range`.
pub fn jittered(range: &PauseRange) -> Duration {
    let (lo, hi) = if range.min_ms <= range.max_ms {
        (range.min_ms, range.max_ms)
    } else {
        (range.max_ms, range.min_ms)
    };
    if lo == hi {
        return Duration::from_millis(lo);
    }
    Duration::from_millis(rng().random_range(lo..=hi))
}

/// Sleep for a random duration inside `range`.
///
/// Workers pause before each browser command so their requests do not line up.
pub async fn pause(range: &PauseRange) {
    let d = jittered(range);
    if !d.is_zero() {
        tokio::time::sleep(d).await;
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` characters with an ellipsis and
/// byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log("a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Ensure a directory exists and is writable.
///
/// This function creates the directory if it doesn't exist, then performs
/// a write test by creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Output directory is writable");
    Ok(())
}
