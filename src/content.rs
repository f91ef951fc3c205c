//! Caption, title, and description generation.
//!
//! Everything in this module is a pure function of an [`ArticleRecord`] and
//! the configuration: no clock, no randomness, no I/O. The same inputs
//! always produce byte-identical output, which is what makes regeneration
//! and testing trivial.
//!
//! All limits are measured in Unicode characters, never bytes, and
//! truncation never splits a word: text is cut at the last whitespace
//! boundary that fits and an ellipsis is appended.
//!
//! # Caption trimming
//!
//! A caption is composed from title, summary fragment, URL, and hashtags.
//! When the composition exceeds `caption_max_length`, content is removed in
//! priority order: hashtags from the end first, then the summary fragment is
//! shortened, keeping title and URL intact whenever possible. The order is
//! configurable via `trim_hashtags_first`.

use crate::config::AppConfig;
use crate::models::{ArticleRecord, GeneratedContent};

/// Truncate `s` to at most `max_chars` characters at a word boundary.
///
/// Strings within the limit are returned unchanged. Otherwise the text is
/// cut back to the last whitespace boundary that leaves room for the `…`
/// marker. When the very first word already exceeds the window it is
/// hard-cut; there is no boundary to respect.
pub fn truncate_at_word(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }

    let window: String = s.chars().take(max_chars - 1).collect();
    match window.rfind(char::is_whitespace) {
        Some(cut) => format!("{}…", window[..cut].trim_end()),
        None => format!("{window}…"),
    }
}

/// The summary fragment used inside the caption: the article summary (or the
/// body excerpt when the summary is empty) bounded by `summary_length`.
pub fn summary_fragment(record: &ArticleRecord, config: &AppConfig) -> String {
    let source = if record.summary.is_empty() {
        record.body_excerpt.as_str()
    } else {
        record.summary.as_str()
    };
    truncate_at_word(source.trim(), config.summary_length)
}

/// Title plus body text, bounded by `description_length`.
pub fn description(record: &ArticleRecord, config: &AppConfig) -> String {
    let body = if record.summary.is_empty() {
        record.body_excerpt.as_str()
    } else {
        record.summary.as_str()
    };
    let composed = if body.trim().is_empty() {
        record.title.clone()
    } else {
        format!("{}. {}", record.title, body.trim())
    };
    truncate_at_word(&composed, config.description_length)
}

/// Compose the full caption, trimming to `caption_max_length`.
pub fn caption(record: &ArticleRecord, config: &AppConfig) -> String {
    let fragment = summary_fragment(record, config);
    let mut tags: Vec<&str> = config.hashtags.iter().map(String::as_str).collect();
    let mut fragment = fragment;

    let mut composed = compose_caption(&record.title, &fragment, &record.url, &tags);
    if char_len(&composed) <= config.caption_max_length {
        return composed;
    }

    if config.trim_hashtags_first {
        composed = drop_tags(record, config, &fragment, &mut tags);
        if char_len(&composed) <= config.caption_max_length {
            return composed;
        }
        composed = shrink_fragment(record, config, &mut fragment, &tags);
    } else {
        composed = shrink_fragment(record, config, &mut fragment, &tags);
        if char_len(&composed) <= config.caption_max_length {
            return composed;
        }
        composed = drop_tags(record, config, &fragment, &mut tags);
    }
    if char_len(&composed) <= config.caption_max_length {
        return composed;
    }

    // Title plus URL alone exceed the limit. Last resort.
    truncate_at_word(&composed, config.caption_max_length)
}

/// Generate all content for one article.
pub fn generate(record: &ArticleRecord, config: &AppConfig) -> GeneratedContent {
    GeneratedContent {
        caption: caption(record, config),
        title: record.title.clone(),
        description: description(record, config),
        summary_fragment: summary_fragment(record, config),
    }
}

fn compose_caption(title: &str, fragment: &str, url: &str, tags: &[&str]) -> String {
    let mut caption = format!("🎮 {title}\n\n");
    if !fragment.is_empty() {
        caption.push_str(fragment);
        caption.push_str("\n\n");
    }
    caption.push_str(&format!("👉 {url}"));
    if !tags.is_empty() {
        caption.push_str("\n\n");
        let rendered: Vec<String> = tags.iter().map(|t| format!("#{t}")).collect();
        caption.push_str(&rendered.join(" "));
    }
    caption
}

/// Drop hashtags from the end until the caption fits or none remain.
fn drop_tags(
    record: &ArticleRecord,
    config: &AppConfig,
    fragment: &str,
    tags: &mut Vec<&str>,
) -> String {
    let mut composed = compose_caption(&record.title, fragment, &record.url, tags);
    while char_len(&composed) > config.caption_max_length && !tags.is_empty() {
        tags.pop();
        composed = compose_caption(&record.title, fragment, &record.url, tags);
    }
    composed
}

/// Shorten the summary fragment by the current overflow, at word boundaries.
fn shrink_fragment(
    record: &ArticleRecord,
    config: &AppConfig,
    fragment: &mut String,
    tags: &[&str],
) -> String {
    let composed = compose_caption(&record.title, fragment, &record.url, tags);
    let overflow = char_len(&composed).saturating_sub(config.caption_max_length);
    if overflow == 0 || fragment.is_empty() {
        return composed;
    }
    let budget = char_len(fragment).saturating_sub(overflow);
    *fragment = truncate_at_word(fragment, budget);
    compose_caption(&record.title, fragment, &record.url, tags)
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(title: &str, summary: &str, body: &str) -> ArticleRecord {
        ArticleRecord {
            id: "id".to_string(),
            url: "https://vandal.elespanol.com/noticia/1/a".to_string(),
            title: title.to_string(),
            summary: summary.to_string(),
            body_excerpt: body.to_string(),
            image_url: None,
            fetched_at: Utc::now(),
        }
    }

    fn config() -> AppConfig {
        AppConfig::default()
    }

    #[test]
    fn test_truncate_within_limit_unchanged() {
        assert_eq!(truncate_at_word("hola mundo", 20), "hola mundo");
        assert_eq!(truncate_at_word("hola mundo", 10), "hola mundo");
    }

    #[test]
    fn test_truncate_cuts_at_word_boundary() {
        let out = truncate_at_word("uno dos tres cuatro", 12);
        assert_eq!(out, "uno dos…");
        assert!(out.chars().count() <= 12);
    }

    #[test]
    fn test_truncate_never_splits_words() {
        let input = "alpha beta gamma delta epsilon zeta";
        // Start past the first word so the hard-cut fallback never applies.
        for max in 7..input.chars().count() {
            let out = truncate_at_word(input, max);
            let stripped = out.trim_end_matches('…');
            for word in stripped.split_whitespace() {
                assert!(
                    input.split_whitespace().any(|w| w == word),
                    "split word {word:?} at max {max}"
                );
            }
            assert!(out.chars().count() <= max, "overflow at max {max}");
        }
    }

    #[test]
    fn test_truncate_counts_characters_not_bytes() {
        // 10 two-byte characters; within a 10-char limit despite 20 bytes.
        let s = "ñññññ ññññ";
        assert_eq!(truncate_at_word(s, 10), s);
        let cut = truncate_at_word(s, 8);
        assert_eq!(cut, "ñññññ…");
    }

    #[test]
    fn test_truncate_single_long_word_hard_cuts() {
        let out = truncate_at_word("supercalifragilistico", 10);
        assert_eq!(out.chars().count(), 10);
        assert!(out.ends_with('…'));
    }

    #[test]
    fn test_summary_fragment_respects_limit() {
        let long = "palabra ".repeat(40);
        let record = record("Titulo", &long, "");
        let fragment = summary_fragment(&record, &config());
        assert!(fragment.chars().count() <= config().summary_length);
        assert!(fragment.ends_with('…'));
    }

    #[test]
    fn test_summary_fragment_falls_back_to_body() {
        let record = record("Titulo", "", "Texto del cuerpo del articulo.");
        assert_eq!(
            summary_fragment(&record, &config()),
            "Texto del cuerpo del articulo."
        );
    }

    #[test]
    fn test_description_contains_title_and_respects_limit() {
        let long = "palabra ".repeat(60);
        let record = record("El titular", &long, "");
        let description = description(&record, &config());
        assert!(description.starts_with("El titular. "));
        assert!(description.chars().count() <= config().description_length);
    }

    #[test]
    fn test_caption_within_limit() {
        let record = record("Titulo corto", "Resumen corto.", "");
        let caption = caption(&record, &config());
        assert!(caption.chars().count() <= config().caption_max_length);
        assert!(caption.starts_with("🎮 Titulo corto"));
        assert!(caption.contains(&record.url));
    }

    #[test]
    fn test_caption_drops_hashtags_before_summary() {
        let mut config = config();
        config.caption_max_length = 120;
        let record = record("Un titular razonable", "Un resumen breve de la noticia.", "");
        let caption = caption(&record, &config);
        assert!(caption.chars().count() <= 120);
        // Title, summary, and URL survive; the tag list gets trimmed.
        assert!(caption.contains("Un titular razonable"));
        assert!(caption.contains("Un resumen breve"));
        assert!(caption.contains(&record.url));
        let full_tags: String = config
            .hashtags
            .iter()
            .map(|t| format!("#{t} "))
            .collect();
        assert!(!caption.contains(full_tags.trim_end()));
    }

    #[test]
    fn test_caption_preserves_title_and_url_when_tight() {
        let mut config = config();
        config.caption_max_length = 75;
        let record = record("Titular", "resumen ".repeat(30).trim(), "");
        let caption = caption(&record, &config);
        assert!(caption.chars().count() <= 75);
        assert!(caption.contains("Titular"));
        assert!(caption.contains(&record.url));
    }

    #[test]
    fn test_caption_summary_first_order() {
        let mut config = config();
        config.trim_hashtags_first = false;
        config.caption_max_length = 110;
        let record = record("Titular", "resumen largo de la noticia aqui mismo", "");
        let caption = caption(&record, &config);
        assert!(caption.chars().count() <= 110);
        assert!(caption.contains(&record.url));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let record = record("Titulo", "Resumen de la noticia.", "Cuerpo.");
        let a = generate(&record, &config());
        let b = generate(&record, &config());
        assert_eq!(a, b);
    }

    #[test]
    fn test_generated_content_limits() {
        let config = config();
        let record = record(
            "Un titular bastante largo para una noticia de videojuegos",
            &"resumen ".repeat(50),
            &"cuerpo ".repeat(80),
        );
        let content = generate(&record, &config);
        assert!(content.caption.chars().count() <= config.caption_max_length);
        assert!(content.description.chars().count() <= config.description_length);
        assert!(content.summary_fragment.chars().count() <= config.summary_length);
    }
}
