//! Extractors for vandal.elespanol.com listing and article pages.
//!
//! Vandal has redesigned its markup more than once, so nothing here assumes
//! a single container class. Each field is resolved through a cascade of
//! selectors ordered from the current markup to older fallbacks, and the
//! listing falls back to a bare anchor scan when no known container matches.

use crate::models::{ArticleRecord, ArticleReference, article_id};
use crate::scrapers::ExtractError;
use chrono::Utc;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Container shapes a listing entry may use, newest first.
const CONTAINER_SELECTORS: &[&str] = &[
    "article.noticia",
    "div.article",
    "div.card",
    ".cardNoticia",
    ".noticia",
    "div.item",
    "article",
    ".article-item",
];

const TITLE_LINK_SELECTORS: &[&str] = &[
    "h2.titular a",
    "h2 a",
    "h1 a",
    "h3 a",
    ".title a",
    "a.title",
    "a[title]",
];

const LISTING_SUMMARY_SELECTORS: &[&str] =
    &["p.texto", "p.description", ".summary", ".excerpt", "p"];

const LISTING_IMAGE_SELECTORS: &[&str] = &["img", ".image img", ".thumbnail img", "figure img"];

const ARTICLE_TITLE_SELECTORS: &[&str] = &["h1.titulo", "article h1", "h1"];

const ARTICLE_SUMMARY_SELECTORS: &[&str] = &[
    "div.entradilla",
    ".article-summary",
    ".summary",
    ".intro",
    ".excerpt",
];

const ARTICLE_BODY_SELECTORS: &[&str] = &["div.texto p", "article p", ".content p", "p"];

const ARTICLE_IMAGE_SELECTORS: &[&str] = &[
    "div.imagen img",
    ".article-featured-image img",
    ".featured-image img",
    "article img",
    ".content img",
];

/// Attributes an `<img>` may carry its source in, checked in order.
const IMAGE_SRC_ATTRS: &[&str] = &["src", "data-src", "data-lazy-src", "data-srcset"];

/// Extract the ordered list of article references from a listing page.
///
/// Order follows the document (most recent first, as the site publishes it);
/// entries without a resolvable title link are skipped and duplicate URLs
/// are collapsed keeping the first occurrence.
#[instrument(level = "info", skip(html))]
pub fn extract_listing(html: &str, base: &Url) -> Vec<ArticleReference> {
    let document = Html::parse_document(html);
    let mut references = Vec::new();
    let mut seen_urls = HashSet::new();

    let containers = select_containers(&document);
    if containers.is_empty() {
        warn!("No listing containers matched; falling back to anchor scan");
        for reference in anchor_fallback(&document, base) {
            if seen_urls.insert(reference.url.clone()) {
                references.push(reference);
            }
        }
    } else {
        debug!(count = containers.len(), "Listing containers found");
        for container in containers {
            let Some(reference) = reference_from_container(&container, base) else {
                continue;
            };
            if seen_urls.insert(reference.url.clone()) {
                references.push(reference);
            }
        }
    }

    info!(count = references.len(), "Extracted listing references");
    references
}

/// Extract a full [`ArticleRecord`] from an article page.
///
/// Fields missing from the page fall back to the listing metadata carried in
/// `reference`. A missing image is fine; a missing title or a page with
/// neither summary nor body text is a structural mismatch.
#[instrument(level = "info", skip(html, reference), fields(url = %reference.url))]
pub fn extract_article(
    html: &str,
    reference: &ArticleReference,
) -> Result<ArticleRecord, ExtractError> {
    let document = Html::parse_document(html);
    let base = Url::parse(&reference.url).ok();

    let title = first_text(&document, ARTICLE_TITLE_SELECTORS)
        .or_else(|| reference.listing_title.clone())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ExtractError::MissingTitle {
            url: reference.url.clone(),
        })?;

    let summary = first_text(&document, ARTICLE_SUMMARY_SELECTORS)
        .or_else(|| meta_content(&document, "meta[name=\"description\"]"))
        .or_else(|| reference.listing_summary.clone())
        .unwrap_or_default();

    let body_excerpt = body_paragraphs(&document);

    if summary.is_empty() && body_excerpt.is_empty() {
        return Err(ExtractError::MissingBody {
            url: reference.url.clone(),
        });
    }

    let image_url = first_image(&document, ARTICLE_IMAGE_SELECTORS, base.as_ref())
        .or_else(|| meta_content(&document, "meta[property=\"og:image\"]"))
        .or_else(|| reference.listing_image.clone());

    debug!(
        title = %title,
        has_image = image_url.is_some(),
        body_chars = body_excerpt.chars().count(),
        "Extracted article"
    );

    Ok(ArticleRecord {
        id: article_id(&reference.url),
        url: reference.url.clone(),
        title,
        summary,
        body_excerpt,
        image_url,
        fetched_at: Utc::now(),
    })
}

fn select_containers(document: &Html) -> Vec<ElementRef<'_>> {
    for raw in CONTAINER_SELECTORS {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        let matches: Vec<_> = document.select(&selector).collect();
        if !matches.is_empty() {
            debug!(selector = raw, count = matches.len(), "Container selector matched");
            return matches;
        }
    }
    Vec::new()
}

fn reference_from_container(container: &ElementRef<'_>, base: &Url) -> Option<ArticleReference> {
    let link = first_in(container, TITLE_LINK_SELECTORS)?;
    let title = normalized_text(&link);
    let href = link.value().attr("href")?;
    let url = resolve(Some(base), href)?;
    if title.is_empty() {
        return None;
    }

    let listing_summary = first_in(container, LISTING_SUMMARY_SELECTORS)
        .map(|el| normalized_text(&el))
        .filter(|s| !s.is_empty());
    let listing_image = first_in(container, LISTING_IMAGE_SELECTORS)
        .and_then(|el| image_src(&el))
        .and_then(|src| resolve(Some(base), &src));

    Some(ArticleReference {
        url,
        listing_title: Some(title),
        listing_summary,
        listing_image,
    })
}

/// Last-resort listing scan: any heading anchor whose href looks like a news
/// page.
fn anchor_fallback(document: &Html, base: &Url) -> Vec<ArticleReference> {
    let mut references = Vec::new();
    for raw in ["h2 a", "h1 a", "h3 a"] {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        for anchor in document.select(&selector) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            if !href.to_lowercase().contains("noticia") {
                continue;
            }
            let title = normalized_text(&anchor);
            if title.is_empty() {
                continue;
            }
            if let Some(url) = resolve(Some(base), href) {
                references.push(ArticleReference {
                    url,
                    listing_title: Some(title),
                    listing_summary: None,
                    listing_image: None,
                });
            }
        }
    }
    references
}

fn body_paragraphs(document: &Html) -> String {
    for raw in ARTICLE_BODY_SELECTORS {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        let paragraphs: Vec<String> = document
            .select(&selector)
            .map(|el| normalized_text(&el))
            .filter(|p| !p.is_empty())
            .collect();
        if !paragraphs.is_empty() {
            return paragraphs.join("\n\n");
        }
    }
    String::new()
}

fn first_in<'a>(scope: &ElementRef<'a>, selectors: &[&str]) -> Option<ElementRef<'a>> {
    for raw in selectors {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        if let Some(element) = scope.select(&selector).next() {
            return Some(element);
        }
    }
    None
}

fn first_text(document: &Html, selectors: &[&str]) -> Option<String> {
    for raw in selectors {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        if let Some(element) = document.select(&selector).next() {
            let text = normalized_text(&element);
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

fn first_image(document: &Html, selectors: &[&str], base: Option<&Url>) -> Option<String> {
    for raw in selectors {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        if let Some(element) = document.select(&selector).next() {
            if let Some(src) = image_src(&element) {
                return resolve(base, &src);
            }
        }
    }
    None
}

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Pull an image URL out of an `<img>`, handling lazy-loading attributes.
/// `data-srcset` style values keep only the first URL token.
fn image_src(element: &ElementRef<'_>) -> Option<String> {
    for attr in IMAGE_SRC_ATTRS {
        if let Some(value) = element.value().attr(attr) {
            let first = value.split_whitespace().next().unwrap_or(value);
            if !first.is_empty() {
                return Some(first.to_string());
            }
        }
    }
    None
}

fn normalized_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn resolve(base: Option<&Url>, href: &str) -> Option<String> {
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    base.and_then(|b| b.join(href).ok()).map(|u| u.to_string())
}
