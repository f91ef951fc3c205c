//! The pipeline orchestrator.
//!
//! One run walks an explicit state machine:
//!
//! ```text
//! Start → ListingFetched → Filtered → Processing → Persisting → Done
//!   └──────────────────────── Failed (fatal conditions only) ──────┘
//! ```
//!
//! Fatal means: the listing fetch exhausted its retries, or zero articles
//! remain even after relaxing the history filter. Everything else degrades:
//! a single article's failure is logged and skipped, a failed image download
//! leaves the article without an image, and a history persist failure is a
//! warning. Failed articles are not recorded in history, so a later run
//! retries them.

use crate::config::AppConfig;
use crate::content;
use crate::debug::DebugSink;
use crate::fetch::{FetchAsync, FetchError};
use crate::history::HistoryStore;
use crate::image::{self, DownloadError};
use crate::models::{ArticleReference, ManifestEntry, article_id};
use crate::outputs::batch::{self, Batch};
use crate::outputs::manifest;
use crate::scrapers::{ExtractError, vandal};
use chrono::Local;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Pipeline states, in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Start,
    ListingFetched,
    Filtered,
    Processing,
    Persisting,
    Done,
    Failed,
}

/// Events that move the pipeline between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEvent {
    ListingReady,
    CandidatesSelected,
    ProcessingStarted,
    ArticlesAttempted,
    OutputsWritten,
    Fatal,
}

/// Pure transition function. Any event outside the expected order, and the
/// explicit `Fatal` event, land in [`RunState::Failed`].
pub fn advance(state: RunState, event: RunEvent) -> RunState {
    use RunEvent::*;
    use RunState::*;
    match (state, event) {
        (Start, ListingReady) => ListingFetched,
        (ListingFetched, CandidatesSelected) => Filtered,
        (Filtered, ProcessingStarted) => Processing,
        (Processing, ArticlesAttempted) => Persisting,
        (Persisting, OutputsWritten) => Done,
        _ => Failed,
    }
}

/// Unrecoverable pipeline failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("listing fetch failed: {0}")]
    Listing(#[from] FetchError),
    #[error("invalid base URL in configuration: {0}")]
    BadBaseUrl(String),
    #[error("no articles available, even after relaxing the history filter")]
    NoArticles,
    #[error("output write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Summary of one completed run.
#[derive(Debug)]
pub struct RunReport {
    pub batch_dir: PathBuf,
    pub processed: usize,
    pub failed: usize,
    pub skipped_seen: usize,
    pub fallback_used: bool,
}

/// Pick the references to process this run.
///
/// References whose id is already in history are filtered out and the rest
/// capped at `news_count`. When everything was already seen, the dedup
/// filter is relaxed: the most recent `news_count` references are taken
/// regardless of history, so a run with a stale listing still produces
/// output. Returns the candidates and whether the fallback was used.
pub fn select_candidates<'a>(
    references: &'a [ArticleReference],
    history: &HistoryStore,
    news_count: usize,
) -> (Vec<&'a ArticleReference>, bool) {
    let fresh: Vec<&ArticleReference> = references
        .iter()
        .filter(|r| !history.contains(&article_id(&r.url)))
        .take(news_count)
        .collect();
    if !fresh.is_empty() || references.is_empty() {
        return (fresh, false);
    }
    warn!(
        count = references.len(),
        "All listed articles already in history; relaxing the dedup filter"
    );
    (references.iter().take(news_count).collect(), true)
}

/// Run the full pipeline once.
#[instrument(level = "info", skip_all)]
pub async fn run<F: FetchAsync>(
    config: &AppConfig,
    fetcher: &F,
    history: &mut HistoryStore,
    debug_sink: &dyn DebugSink,
) -> Result<RunReport, PipelineError> {
    let mut state = RunState::Start;
    let base = Url::parse(&config.base_url)
        .map_err(|_| PipelineError::BadBaseUrl(config.base_url.clone()))?;

    // 1. Listing. A fetch failure here is fatal; no batch directory is
    // created.
    let listing_url = config.listing_url();
    let listing = match fetcher.fetch_text(&listing_url).await {
        Ok(doc) => doc,
        Err(e) => {
            let state = advance(state, RunEvent::Fatal);
            error!(?state, url = %listing_url, error = %e, "Listing fetch failed");
            return Err(e.into());
        }
    };
    debug_sink.dump_html("listing", &listing.body);
    let references = vandal::extract_listing(&listing.body, &base);
    state = advance(state, RunEvent::ListingReady);
    info!(?state, count = references.len(), "Listing extracted");

    // 2.-3. Filter by history, falling back to reprocessing when stale.
    let skipped_seen = references
        .iter()
        .filter(|r| history.contains(&article_id(&r.url)))
        .count();
    let (candidates, fallback_used) = select_candidates(&references, history, config.news_count);
    if candidates.is_empty() {
        let state = advance(state, RunEvent::Fatal);
        error!(?state, "Nothing to process");
        return Err(PipelineError::NoArticles);
    }
    state = advance(state, RunEvent::CandidatesSelected);
    info!(
        ?state,
        candidates = candidates.len(),
        skipped_seen,
        fallback_used,
        "Candidates selected"
    );

    // 4. Process each candidate independently.
    let mut batch = batch::allocate_batch(&config.content_dir(), Local::now().date_naive())?;
    state = advance(state, RunEvent::ProcessingStarted);

    let mut entries: Vec<ManifestEntry> = Vec::new();
    let mut captions: Vec<String> = Vec::new();
    let mut new_ids: Vec<String> = Vec::new();
    let mut failed = 0usize;

    for reference in candidates {
        match process_article(config, fetcher, debug_sink, &mut batch, reference).await {
            Ok(processed) => {
                info!(url = %reference.url, "Article processed");
                captions.push(processed.entry.caption.clone());
                entries.push(processed.entry);
                new_ids.push(processed.id);
            }
            Err(e) => {
                warn!(url = %reference.url, error = %e, "Article failed; skipping");
                failed += 1;
            }
        }
    }
    state = advance(state, RunEvent::ArticlesAttempted);

    // 5. Only successfully processed ids enter the history.
    for id in &new_ids {
        history.add(id);
    }
    if let Err(e) = history.persist() {
        warn!(error = %e, "Could not persist history; next run may reprocess");
    }

    // 6. Manifest and consolidated captions.
    manifest::write_manifest(batch.dir(), &entries)?;
    manifest::write_all_captions(batch.dir(), &captions)?;
    state = advance(state, RunEvent::OutputsWritten);

    let report = RunReport {
        batch_dir: batch.dir().to_path_buf(),
        processed: entries.len(),
        failed,
        skipped_seen,
        fallback_used,
    };
    info!(
        ?state,
        processed = report.processed,
        failed = report.failed,
        batch = %report.batch_dir.display(),
        "Pipeline finished"
    );
    Ok(report)
}

/// Failures isolated to a single article.
#[derive(Debug, Error)]
enum ArticleError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("failed to write article files: {0}")]
    Io(#[from] std::io::Error),
}

struct Processed {
    id: String,
    entry: ManifestEntry,
}

async fn process_article<F: FetchAsync>(
    config: &AppConfig,
    fetcher: &F,
    debug_sink: &dyn DebugSink,
    batch: &mut Batch,
    reference: &ArticleReference,
) -> Result<Processed, ArticleError> {
    let doc = fetcher.fetch_text(&reference.url).await?;
    let id = article_id(&reference.url);
    debug_sink.dump_html(&format!("article_{}", &id[..8]), &doc.body);

    let record = vandal::extract_article(&doc.body, reference)?;
    let content = content::generate(&record, config);

    let slot = batch.claim_slot()?;
    if let Err(e) = batch::write_article_files(&slot, &content) {
        batch.discard_slot(&slot);
        return Err(e.into());
    }

    let image_filename = match image::download_image(fetcher, &record, &slot).await {
        Ok(path) => path.file_name().map(|n| n.to_string_lossy().into_owned()),
        Err(DownloadError::NoImage) => {
            debug!(article = %record.id, "No image URL for article");
            None
        }
        Err(e) => {
            warn!(article = %record.id, error = %e, "Image download failed; continuing without image");
            None
        }
    };

    Ok(Processed {
        id: record.id,
        entry: ManifestEntry {
            title: content.title,
            description: content.description,
            url: record.url,
            image_filename,
            caption: content.caption,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_happy_path_transitions() {
        let mut state = RunState::Start;
        state = advance(state, RunEvent::ListingReady);
        assert_eq!(state, RunState::ListingFetched);
        state = advance(state, RunEvent::CandidatesSelected);
        assert_eq!(state, RunState::Filtered);
        state = advance(state, RunEvent::ProcessingStarted);
        assert_eq!(state, RunState::Processing);
        state = advance(state, RunEvent::ArticlesAttempted);
        assert_eq!(state, RunState::Persisting);
        state = advance(state, RunEvent::OutputsWritten);
        assert_eq!(state, RunState::Done);
    }

    #[test]
    fn test_fatal_from_any_state() {
        for state in [
            RunState::Start,
            RunState::ListingFetched,
            RunState::Filtered,
            RunState::Processing,
            RunState::Persisting,
        ] {
            assert_eq!(advance(state, RunEvent::Fatal), RunState::Failed);
        }
    }

    #[test]
    fn test_out_of_order_event_fails() {
        assert_eq!(
            advance(RunState::Start, RunEvent::OutputsWritten),
            RunState::Failed
        );
        assert_eq!(
            advance(RunState::Done, RunEvent::ListingReady),
            RunState::Failed
        );
    }

    fn reference(url: &str) -> ArticleReference {
        ArticleReference {
            url: url.to_string(),
            listing_title: None,
            listing_summary: None,
            listing_image: None,
        }
    }

    fn empty_history(tag: &str) -> HistoryStore {
        let path = PathBuf::from(std::env::temp_dir()).join(format!(
            "vandal_shorts_pipeline_{}_{tag}.json",
            std::process::id()
        ));
        HistoryStore::load(&path, 100)
    }

    #[test]
    fn test_select_candidates_filters_seen_and_caps() {
        let refs: Vec<ArticleReference> = (0..8)
            .map(|i| reference(&format!("https://vandal.elespanol.com/noticia/{i}/x")))
            .collect();
        let mut history = empty_history("filter");
        history.add(&article_id(&refs[0].url));
        history.add(&article_id(&refs[2].url));

        let (candidates, fallback) = select_candidates(&refs, &history, 3);
        assert!(!fallback);
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].url, refs[1].url);
        assert_eq!(candidates[1].url, refs[3].url);
        assert_eq!(candidates[2].url, refs[4].url);
    }

    #[test]
    fn test_select_candidates_fallback_when_all_seen() {
        let refs: Vec<ArticleReference> = (0..4)
            .map(|i| reference(&format!("https://vandal.elespanol.com/noticia/{i}/y")))
            .collect();
        let mut history = empty_history("fallback");
        for r in &refs {
            history.add(&article_id(&r.url));
        }

        let (candidates, fallback) = select_candidates(&refs, &history, 2);
        assert!(fallback);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].url, refs[0].url);
    }

    #[test]
    fn test_select_candidates_empty_listing() {
        let history = empty_history("empty");
        let (candidates, fallback) = select_candidates(&[], &history, 5);
        assert!(candidates.is_empty());
        assert!(!fallback);
    }

    use crate::debug::NullDebugSink;
    use crate::fetch::RawDocument;
    use std::collections::HashMap;

    /// Serves pre-baked documents by URL; any other URL is a 404.
    struct CannedFetcher {
        pages: HashMap<String, String>,
    }

    impl FetchAsync for CannedFetcher {
        async fn fetch_text(&self, url: &str) -> Result<RawDocument, FetchError> {
            match self.pages.get(url) {
                Some(body) => Ok(RawDocument {
                    url: url.to_string(),
                    body: body.clone(),
                    content_type: Some("text/html".to_string()),
                }),
                None => Err(FetchError::ClientError {
                    url: url.to_string(),
                    status: reqwest::StatusCode::NOT_FOUND,
                }),
            }
        }

        async fn fetch_bytes(&self, url: &str) -> Result<(Vec<u8>, Option<String>), FetchError> {
            Err(FetchError::ClientError {
                url: url.to_string(),
                status: reqwest::StatusCode::NOT_FOUND,
            })
        }
    }

    fn article_url(i: usize) -> String {
        format!("https://vandal.elespanol.com/noticia/{i}/juego-{i}")
    }

    fn listing_entry(i: usize, with_summary: bool) -> String {
        let summary = if with_summary {
            format!("<p class=\"texto\">Resumen breve de la noticia {i}.</p>")
        } else {
            String::new()
        };
        format!(
            "<article class=\"noticia\"><h2 class=\"titular\">\
             <a href=\"/noticia/{i}/juego-{i}\">Noticia número {i}</a></h2>{summary}</article>"
        )
    }

    fn article_page(i: usize) -> String {
        format!(
            "<html><body><h1 class=\"titulo\">Noticia número {i}</h1>\
             <div class=\"entradilla\">Resumen breve de la noticia {i}.</div>\
             <div class=\"texto\"><p>Primer párrafo de la noticia {i}.</p></div></body></html>"
        )
    }

    fn run_config(tag: &str) -> AppConfig {
        let mut config = AppConfig::default();
        config.output_root = std::env::temp_dir()
            .join(format!("vandal_shorts_run_{}_{tag}", std::process::id()));
        std::fs::create_dir_all(&config.output_root).unwrap();
        config
    }

    #[tokio::test]
    async fn test_run_processes_unseen_articles_end_to_end() {
        let config = run_config("full");
        let mut pages = HashMap::new();
        pages.insert(
            config.listing_url(),
            (1..=5).map(|i| listing_entry(i, true)).collect(),
        );
        for i in 1..=5 {
            pages.insert(article_url(i), article_page(i));
        }
        let fetcher = CannedFetcher { pages };
        let mut history = HistoryStore::load(&config.history_file(), config.history_limit);

        let report = run(&config, &fetcher, &mut history, &NullDebugSink)
            .await
            .unwrap();

        assert_eq!(report.processed, 5);
        assert_eq!(report.failed, 0);
        assert!(!report.fallback_used);
        for k in 1..=5 {
            assert!(report.batch_dir.join(format!("noticia_{k}")).is_dir());
        }
        assert!(!report.batch_dir.join("noticia_6").exists());

        let manifest: Vec<ManifestEntry> = serde_json::from_str(
            &std::fs::read_to_string(report.batch_dir.join("news.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(manifest.len(), 5);
        assert_eq!(manifest[0].url, article_url(1));

        for i in 1..=5 {
            assert!(history.contains(&article_id(&article_url(i))));
        }
        // The updated history made it to disk.
        let reloaded = HistoryStore::load(&config.history_file(), config.history_limit);
        assert_eq!(reloaded.len(), 5);

        std::fs::remove_dir_all(&config.output_root).unwrap();
    }

    #[tokio::test]
    async fn test_failed_article_is_skipped_and_not_remembered() {
        let config = run_config("isolated");
        // Entry 3 carries no listing summary and its page has no content,
        // so extraction fails for that article alone.
        let mut pages = HashMap::new();
        pages.insert(
            config.listing_url(),
            (1..=5).map(|i| listing_entry(i, i != 3)).collect(),
        );
        for i in [1, 2, 4, 5] {
            pages.insert(article_url(i), article_page(i));
        }
        pages.insert(article_url(3), "<html><body></body></html>".to_string());
        let fetcher = CannedFetcher { pages };
        let mut history = HistoryStore::load(&config.history_file(), config.history_limit);

        let report = run(&config, &fetcher, &mut history, &NullDebugSink)
            .await
            .unwrap();

        assert_eq!(report.processed, 4);
        assert_eq!(report.failed, 1);
        for k in 1..=4 {
            assert!(report.batch_dir.join(format!("noticia_{k}")).is_dir());
        }
        assert!(!report.batch_dir.join("noticia_5").exists());

        let manifest: Vec<ManifestEntry> = serde_json::from_str(
            &std::fs::read_to_string(report.batch_dir.join("news.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(manifest.len(), 4);
        assert!(manifest.iter().all(|e| e.url != article_url(3)));

        assert!(!history.contains(&article_id(&article_url(3))));
        assert_eq!(history.len(), 4);

        std::fs::remove_dir_all(&config.output_root).unwrap();
    }
}
