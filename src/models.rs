//! Data models for scraped news and the content derived from it.
//!
//! This module defines the structures that flow through the pipeline:
//! - [`ArticleReference`]: a candidate article found on the listing page
//! - [`ArticleRecord`]: a fully extracted article
//! - [`GeneratedContent`]: the caption/title/description derived from a record
//! - [`HistoryEntry`]: one processed article id in the dedup history
//! - [`ManifestEntry`]: one row of the per-batch `news.json` manifest
//!
//! Article ids are a pure function of the article URL (see [`article_id`]),
//! so the same story always maps to the same id across runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

/// A candidate article discovered on the listing page.
///
/// The listing often carries a title, a short summary, and a thumbnail
/// alongside each link. Those are kept as fallbacks for fields the article
/// page itself fails to yield.
#[derive(Debug, Clone)]
pub struct ArticleReference {
    /// Absolute URL of the article page.
    pub url: String,
    /// Title as shown on the listing, if any.
    pub listing_title: Option<String>,
    /// Teaser paragraph from the listing, if any.
    pub listing_summary: Option<String>,
    /// Thumbnail image URL from the listing, if any.
    pub listing_image: Option<String>,
}

/// A fully extracted news article.
#[derive(Debug, Clone, Serialize)]
pub struct ArticleRecord {
    /// Stable identifier derived from the URL via [`article_id`].
    pub id: String,
    /// Absolute URL of the article page.
    pub url: String,
    /// Article headline.
    pub title: String,
    /// Lead/summary text. May be empty when only body text was found.
    pub summary: String,
    /// Opening body paragraphs, joined.
    pub body_excerpt: String,
    /// Featured image URL, when one was found.
    pub image_url: Option<String>,
    /// When this record was extracted.
    pub fetched_at: DateTime<Utc>,
}

/// Social-media content derived from an [`ArticleRecord`].
///
/// Produced by a pure function of the record and the configuration; the same
/// inputs always yield byte-identical output. All length limits are measured
/// in Unicode characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedContent {
    /// Full post caption, at most `caption_max_length` characters.
    pub caption: String,
    /// Article title, unmodified.
    pub title: String,
    /// Title plus body text, at most `description_length` characters.
    pub description: String,
    /// Truncated summary used inside the caption, at most `summary_length`
    /// characters.
    pub summary_fragment: String,
}

/// One processed article id in the history file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Article id as produced by [`article_id`].
    pub id: String,
    /// When the article was first processed.
    pub added_at: DateTime<Utc>,
}

/// One entry of the per-batch `news.json` manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub title: String,
    pub description: String,
    pub url: String,
    /// Filename of the downloaded image inside the article folder, or `null`
    /// when the download failed or no image was found.
    pub image_filename: Option<String>,
    pub caption: String,
}

/// Derive a stable article id from a URL.
///
/// The URL is normalized before hashing so cosmetic differences collapse to
/// the same id: the host is lowercased, a trailing slash on the path is
/// trimmed, and query string and fragment are dropped. The id is the SHA-256
/// hex digest of `host|path`.
///
/// URLs that fail to parse are hashed verbatim (trimmed) so the function
/// stays total.
pub fn article_id(url: &str) -> String {
    let normalized = match Url::parse(url.trim()) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or_default().to_lowercase();
            let path = parsed.path().trim_end_matches('/').to_string();
            format!("{host}|{path}")
        }
        Err(_) => url.trim().to_string(),
    };

    let digest = Sha256::digest(normalized.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
