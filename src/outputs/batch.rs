//! Batch directory allocation and per-article files.

use crate::models::GeneratedContent;
use chrono::NaiveDate;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// A run's output directory. Article slots are numbered from 1 in the order
/// they are claimed.
#[derive(Debug)]
pub struct Batch {
    dir: PathBuf,
    next_slot: usize,
}

/// Allocate the batch directory for `date` under `content_root`.
///
/// The plain `YYYY-MM-DD` name is used when free; otherwise version suffixes
/// `_V1`, `_V2`, … are probed in order. Existing batches are never reused.
#[instrument(level = "info", skip_all, fields(%date))]
pub fn allocate_batch(content_root: &Path, date: NaiveDate) -> io::Result<Batch> {
    let stem = date.format("%Y-%m-%d").to_string();
    let mut dir = content_root.join(&stem);
    let mut version = 1usize;
    while dir.exists() {
        dir = content_root.join(format!("{stem}_V{version}"));
        version += 1;
    }
    std::fs::create_dir_all(&dir)?;
    info!(dir = %dir.display(), "Allocated output batch");
    Ok(Batch { dir, next_slot: 1 })
}

impl Batch {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Claim the next `noticia_<k>` subfolder, creating it.
    pub fn claim_slot(&mut self) -> io::Result<PathBuf> {
        let slot = self.dir.join(format!("noticia_{}", self.next_slot));
        std::fs::create_dir_all(&slot)?;
        self.next_slot += 1;
        Ok(slot)
    }

    /// Remove the most recently claimed slot and free its number for reuse.
    ///
    /// Processing is sequential, so a slot whose article files could not be
    /// written is always the last one claimed. Without this, a mid-write
    /// failure would leave an empty `noticia_<k>` folder and a gap in the
    /// numbering.
    pub fn discard_slot(&mut self, slot: &Path) {
        if let Err(e) = std::fs::remove_dir_all(slot) {
            warn!(slot = %slot.display(), error = %e, "Could not remove discarded slot");
        }
        self.next_slot = self.next_slot.saturating_sub(1).max(1);
    }
}

/// Write `caption.txt` and `description.txt` for one article into its slot.
pub fn write_article_files(slot: &Path, content: &GeneratedContent) -> io::Result<()> {
    std::fs::write(slot.join("caption.txt"), &content.caption)?;
    let description = format!(
        "Título: {}\n\nDescripción: {}",
        content.title, content.description
    );
    std::fs::write(slot.join("description.txt"), description)?;
    Ok(())
}
