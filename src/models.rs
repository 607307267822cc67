//! Data models for discovered and extracted articles.
//!
//! This module defines the core data structures used throughout the crawl:
//! - [`Source`]: The news outlet a record was scraped from
//! - [`ContentType`]: Whether a record is a whole article or one live-blog entry
//! - [`ArticleRecord`]: An accepted, normalized article
//! - [`SkipReason`] / [`SkipAuditEntry`]: Why a candidate URL was rejected
//!
//! Records serialize with the column names of the exported table
//! (`publish_date, headline, main_text, media, type, url`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A news outlet with a dedicated site adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// cnn.com, paged search with live-news blogs.
    Cnn,
    /// foxnews.com, infinite-scroll search.
    FoxNews,
}

impl Source {
    /// Lowercase identifier used in config keys and output file names.
    pub fn slug(&self) -> &'static str {
        match self {
            Source::Cnn => "cnn",
            Source::FoxNews => "foxnews",
        }
    }

    /// Display name written to the `media` column.
    pub fn media_name(&self) -> &'static str {
        match self {
            Source::Cnn => "CNN",
            Source::FoxNews => "FoxNews",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Shape of an accepted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum ContentType {
    #[serde(rename = "article")]
    Article,
    #[serde(rename = "live-news")]
    LiveBlogEntry,
}

/// An accepted article.
///
/// Live-blog pages produce one record per surviving entry, all sharing the
/// parent page's `url`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct ArticleRecord {
    pub publish_date: String,
    pub headline: String,
    pub main_text: String,
    #[serde(rename = "media", with = "media_column")]
    pub source: Source,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub url: String,
}

/// The `media` column carries the outlet's display name ("CNN", "FoxNews").
mod media_column {
    use super::Source;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(source: &Source, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(source.media_name())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Source, D::Error> {
        let name = String::deserialize(d)?;
        match name.as_str() {
            "CNN" => Ok(Source::Cnn),
            "FoxNews" => Ok(Source::FoxNews),
            other => Err(D::Error::custom(format!("unknown media {other:?}"))),
        }
    }
}

/// Why a candidate URL produced no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The expected header or entries container was absent.
    NoContentMarkup,
    /// Content was present but shorter than the configured minimum.
    BelowMinLength,
    /// The URL belongs to a promotional section; it was never fetched.
    IrrelevantSection,
    /// Navigation exceeded its load timeout.
    FetchTimeout,
    /// Navigation or snapshot failed for a reason other than a timeout.
    FetchFailed,
    /// A live-blog page yielded zero usable entries.
    AllSubentriesFiltered,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::NoContentMarkup => "no_content_markup",
            SkipReason::BelowMinLength => "below_min_length",
            SkipReason::IrrelevantSection => "irrelevant_section",
            SkipReason::FetchTimeout => "fetch_timeout",
            SkipReason::FetchFailed => "fetch_failed",
            SkipReason::AllSubentriesFiltered => "all_subentries_filtered",
        };
        f.write_str(s)
    }
}

/// One rejected candidate, kept for observability only.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SkipAuditEntry {
    pub url: String,
    pub reason: SkipReason,
}

impl SkipAuditEntry {
    pub fn new(url: impl Into<String>, reason: SkipReason) -> Self {
        Self {
            url: url.into(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ArticleRecord {
        ArticleRecord {
            publish_date: "May 6, 2025".to_string(),
            headline: "Test Article".to_string(),
            main_text: "Body text".to_string(),
            source: Source::Cnn,
            content_type: ContentType::LiveBlogEntry,
            url: "https://www.cnn.com/2025/05/06/live-news/x".to_string(),
        }
    }

    #[test]
    fn test_record_serializes_with_table_columns() {
        let json = serde_json::to_value(record()).unwrap();
        assert_eq!(json["media"], "CNN");
        assert_eq!(json["type"], "live-news");
        assert_eq!(json["headline"], "Test Article");
        assert!(json.get("source").is_none());
        assert!(json.get("content_type").is_none());
    }

    #[test]
    fn test_record_deserializes_from_table_row() {
        let json = r#"{
            "publish_date": "May 6, 2025",
            "headline": "Fox headline",
            "main_text": "Body",
            "media": "FoxNews",
            "type": "article",
            "url": "https://www.foxnews.com/politics/a"
        }"#;
        let record: ArticleRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.source, Source::FoxNews);
        assert_eq!(record.content_type, ContentType::Article);
    }

    #[test]
    fn test_unknown_media_is_rejected() {
        let json = r#"{"publish_date":"","headline":"h","main_text":"b","media":"BBC","type":"article","url":"u"}"#;
        assert!(serde_json::from_str::<ArticleRecord>(json).is_err());
    }

    #[test]
    fn test_skip_reason_display_matches_serde() {
        for reason in [
            SkipReason::NoContentMarkup,
            SkipReason::BelowMinLength,
            SkipReason::IrrelevantSection,
            SkipReason::FetchTimeout,
            SkipReason::FetchFailed,
            SkipReason::AllSubentriesFiltered,
        ] {
            let json = serde_json::to_string(&reason).unwrap();
            assert_eq!(json.trim_matches('"'), reason.to_string());
        }
    }

    #[test]
    fn test_source_names() {
        assert_eq!(Source::FoxNews.slug(), "foxnews");
        assert_eq!(Source::FoxNews.media_name(), "FoxNews");
        assert_eq!(Source::Cnn.to_string(), "cnn");
        let parsed: Source = serde_yaml::from_str("foxnews").unwrap();
        assert_eq!(parsed, Source::FoxNews);
    }
}
