//! Featured-image download.
//!
//! The image is a best-effort extra: a failed download is reported as a
//! typed error that the pipeline logs and ignores, and the article proceeds
//! without an image file.

use crate::fetch::{FetchAsync, FetchError};
use crate::models::ArticleRecord;
use crate::utils::safe_slug;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, instrument};

/// Extensions accepted from a URL suffix.
const KNOWN_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

const FALLBACK_EXTENSION: &str = "jpg";

/// Maximum characters of the title slug inside the image filename.
const SLUG_MAX_CHARS: usize = 50;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("article has no image URL")]
    NoImage,
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("failed to write image {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Pick the image file extension from the Content-Type header, falling back
/// to the URL suffix, falling back to `jpg`.
pub fn image_extension(content_type: Option<&str>, url: &str) -> &'static str {
    if let Some(content_type) = content_type {
        let subtype = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .strip_prefix("image/");
        match subtype {
            Some("jpeg") => return "jpg",
            Some("png") => return "png",
            Some("gif") => return "gif",
            Some("webp") => return "webp",
            _ => {}
        }
    }

    let path_ext = url
        .split('?')
        .next()
        .unwrap_or(url)
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_lowercase();
    for known in KNOWN_EXTENSIONS.iter().copied() {
        if path_ext == known {
            return if known == "jpeg" { "jpg" } else { known };
        }
    }
    FALLBACK_EXTENSION
}

/// Download the article's featured image into `dir`.
///
/// The filename is `image_<safe_slug(title)>.<ext>`. Returns the written
/// path, or a [`DownloadError`] the caller is expected to tolerate.
#[instrument(level = "info", skip_all, fields(article = %record.id))]
pub async fn download_image<F: FetchAsync>(
    fetcher: &F,
    record: &ArticleRecord,
    dir: &Path,
) -> Result<PathBuf, DownloadError> {
    let url = record.image_url.as_deref().ok_or(DownloadError::NoImage)?;
    let (bytes, content_type) = fetcher.fetch_bytes(url).await?;

    let extension = image_extension(content_type.as_deref(), url);
    let slug = safe_slug(&record.title, SLUG_MAX_CHARS);
    let path = dir.join(format!("image_{slug}.{extension}"));

    std::fs::write(&path, bytes).map_err(|source| DownloadError::Write {
        path: path.clone(),
        source,
    })?;
    info!(path = %path.display(), "Downloaded image");
    Ok(path)
}
