//! Small helpers shared across the pipeline.

use std::error::Error;
use std::path::Path;
use tracing::{info, instrument};

/// Turn a title into a filesystem-safe slug.
///
/// Lowercases, collapses every run of non-alphanumeric characters to a
/// single underscore, trims leading/trailing underscores, and bounds the
/// result to `max_chars` characters to keep paths short.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(safe_slug("Hollow Knight: Silksong", 50), "hollow_knight_silksong");
/// ```
pub fn safe_slug(title: &str, max_chars: usize) -> String {
    let mut slug = String::new();
    let mut last_was_sep = true;
    for c in title.to_lowercase().chars() {
        if c.is_alphanumeric() {
            slug.push(c);
            last_was_sep = false;
        } else if !last_was_sep {
            slug.push('_');
            last_was_sep = true;
        }
        if slug.chars().count() >= max_chars {
            break;
        }
    }
    slug.trim_matches('_').to_string()
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then probes it with a throwaway file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    std::fs::create_dir_all(path)?;
    let probe = path.join("..__probe_write__");
    std::fs::File::create(&probe)?;
    let _ = std::fs::remove_file(&probe);
    info!("Output directory is writable");
    Ok(())
}
