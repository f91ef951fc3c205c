//! Batch manifest (`news.json`) and consolidated captions file.

use crate::models::ManifestEntry;
use std::io;
use std::path::Path;
use tracing::{info, instrument};

/// Write `news.json`: a JSON array of one object per successfully processed
/// article, in processing order. A partial batch still yields a structurally
/// valid (possibly shorter) array.
#[instrument(level = "info", skip_all, fields(dir = %dir.display(), count = entries.len()))]
pub fn write_manifest(dir: &Path, entries: &[ManifestEntry]) -> io::Result<()> {
    let json = serde_json::to_vec_pretty(entries).map_err(io::Error::other)?;
    let path = dir.join("news.json");
    std::fs::write(&path, json)?;
    info!(path = %path.display(), "Wrote manifest");
    Ok(())
}

/// Write `all_captions.txt`: every caption in processing order, separated by
/// `=== CAPTION k ===` headers.
#[instrument(level = "info", skip_all, fields(dir = %dir.display(), count = captions.len()))]
pub fn write_all_captions(dir: &Path, captions: &[String]) -> io::Result<()> {
    let mut out = String::new();
    for (i, caption) in captions.iter().enumerate() {
        out.push_str(&format!("=== CAPTION {} ===\n{}\n\n", i + 1, caption));
    }
    let path = dir.join("all_captions.txt");
    std::fs::write(&path, out)?;
    info!(path = %path.display(), "Wrote consolidated captions");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "vandal_shorts_manifest_{}_{tag}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn entry(title: &str) -> ManifestEntry {
        ManifestEntry {
            title: title.to_string(),
            description: format!("{title}. Cuerpo."),
            url: format!("https://vandal.elespanol.com/noticia/{title}"),
            image_filename: None,
            caption: format!("🎮 {title}"),
        }
    }

    #[test]
    fn test_manifest_is_ordered_array() {
        let dir = temp_dir("array");
        write_manifest(&dir, &[entry("uno"), entry("dos")]).unwrap();

        let raw = std::fs::read_to_string(dir.join("news.json")).unwrap();
        let parsed: Vec<ManifestEntry> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].title, "uno");
        assert_eq!(parsed[1].title, "dos");
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_empty_manifest_is_valid_json() {
        let dir = temp_dir("empty");
        write_manifest(&dir, &[]).unwrap();
        let raw = std::fs::read_to_string(dir.join("news.json")).unwrap();
        let parsed: Vec<ManifestEntry> = serde_json::from_str(&raw).unwrap();
        assert!(parsed.is_empty());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_all_captions_delimited_in_order() {
        let dir = temp_dir("captions");
        write_all_captions(
            &dir,
            &["primera".to_string(), "segunda".to_string()],
        )
        .unwrap();

        let raw = std::fs::read_to_string(dir.join("all_captions.txt")).unwrap();
        let first = raw.find("=== CAPTION 1 ===\nprimera").unwrap();
        let second = raw.find("=== CAPTION 2 ===\nsegunda").unwrap();
        assert!(first < second);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
