//! Runtime configuration, loaded from an optional YAML file.
//!
//! Every field has a default, so the program runs with no config file at all.
//! A file passed via `--config` must exist and parse; a missing default file
//! is silently ignored.
//!
//! ```yaml
//! news_count: 5
//! caption_max_length: 150
//! hashtags: [Gaming, Videojuegos]
//! output_root: ./gaming_news_output
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// How many new articles to process per run.
    pub news_count: usize,
    /// Maximum caption length, in characters.
    pub caption_max_length: usize,
    /// Maximum length of the summary fragment inside the caption.
    pub summary_length: usize,
    /// Maximum description length, in characters.
    pub description_length: usize,
    /// Hashtags appended to every caption, in order.
    pub hashtags: Vec<String>,
    /// Maximum number of ids kept in the history file.
    pub history_limit: usize,
    /// Retry attempts per HTTP request after the initial try.
    pub max_retries: usize,
    /// Base delay for exponential backoff, in milliseconds.
    pub backoff_base_ms: u64,
    /// Per-request timeout, in seconds.
    pub request_timeout_secs: u64,
    /// When a caption exceeds its limit, drop hashtags before shrinking the
    /// summary fragment. Set to `false` to shrink the summary first.
    pub trim_hashtags_first: bool,
    /// Base directory for all output (content, history, logs).
    pub output_root: PathBuf,
    /// Site root, used to resolve relative links.
    pub base_url: String,
    /// Path of the news listing page, relative to `base_url`.
    pub listing_path: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            news_count: 5,
            caption_max_length: 150,
            summary_length: 80,
            description_length: 200,
            hashtags: [
                "Gaming",
                "Videojuegos",
                "Noticias",
                "Gamer",
                "PlayStation",
                "Xbox",
                "Nintendo",
                "PC",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            history_limit: 500,
            max_retries: 3,
            backoff_base_ms: 500,
            request_timeout_secs: 15,
            trim_hashtags_first: true,
            output_root: PathBuf::from("gaming_news_output"),
            base_url: "https://vandal.elespanol.com".to_string(),
            listing_path: "/noticias/videojuegos".to_string(),
        }
    }
}

impl AppConfig {
    /// Load the configuration from `path`, or return the defaults when no
    /// path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Absolute URL of the news listing page.
    pub fn listing_url(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.listing_path
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    /// Directory holding the dated content batches.
    pub fn content_dir(&self) -> PathBuf {
        self.output_root.join("contenido")
    }

    /// Directory for date-keyed log files.
    pub fn logs_dir(&self) -> PathBuf {
        self.output_root.join("logs").join("logs")
    }

    /// Directory for raw HTML debug dumps.
    pub fn debug_dir(&self) -> PathBuf {
        self.output_root.join("logs").join("debug")
    }

    /// Path of the history file.
    pub fn history_file(&self) -> PathBuf {
        self.output_root.join("news_history.json")
    }
}
