//! Bounded, persisted history of processed article ids.
//!
//! The history file is a JSON array of `{id, added_at}` objects in FIFO
//! order (oldest first), capped at `history_limit` entries. A missing or
//! corrupt file degrades to an empty history with a warning; a history read
//! failure is never allowed to kill the pipeline. Persisting replaces the
//! file atomically (write to a temp sibling, then rename).

use crate::models::HistoryEntry;
use chrono::Utc;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Errors raised while persisting the history file.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to write history file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize history: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// FIFO-bounded set of processed article ids, backed by a JSON file.
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    limit: usize,
    entries: Vec<HistoryEntry>,
    index: HashSet<String>,
}

impl HistoryStore {
    /// Load the history from `path`.
    ///
    /// A missing file starts an empty history silently; an unreadable or
    /// unparseable file starts an empty history with a warning. Entries past
    /// `limit` are evicted oldest-first on load.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path, limit: usize) -> Self {
        let entries = match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<Vec<HistoryEntry>>(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(error = %e, "History file is corrupt; starting empty");
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No history file yet; starting empty");
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "Could not read history file; starting empty");
                Vec::new()
            }
        };

        let mut store = Self {
            path: path.to_path_buf(),
            limit,
            entries: Vec::new(),
            index: HashSet::new(),
        };
        for entry in entries {
            if store.index.insert(entry.id.clone()) {
                store.entries.push(entry);
            }
        }
        store.evict();
        info!(count = store.entries.len(), "Loaded history");
        store
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record `id` as processed.
    ///
    /// Idempotent: an id already present keeps its position and timestamp.
    /// Eviction keeps the store at `limit` entries, oldest out first.
    pub fn add(&mut self, id: &str) {
        if !self.index.insert(id.to_string()) {
            return;
        }
        self.entries.push(HistoryEntry {
            id: id.to_string(),
            added_at: Utc::now(),
        });
        self.evict();
    }

    /// Write the history file, replacing it atomically.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    pub fn persist(&self) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| HistoryError::Write {
                path: self.path.clone(),
                source,
            })?;
        }

        let json = serde_json::to_vec_pretty(&self.entries)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|source| HistoryError::Write {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|source| HistoryError::Write {
            path: self.path.clone(),
            source,
        })?;
        info!(count = self.entries.len(), "Persisted history");
        Ok(())
    }

    fn evict(&mut self) {
        while self.entries.len() > self.limit {
            let evicted = self.entries.remove(0);
            self.index.remove(&evicted.id);
            debug!(id = %evicted.id, "Evicted oldest history entry");
        }
    }
}
