//! HTML extractors for the configured news source.
//!
//! Parsing is heuristic: the site publishes no stable schema, so every field
//! is located through a cascade of selectors tried in order, and malformed
//! entries are skipped instead of failing the whole document. Selector logic
//! lives entirely inside this module; a site redesign should only ever touch
//! the [`vandal`] submodule.
//!
//! Extractors are pure functions over an HTML string, so they are tested
//! against inline fixtures without any network access.

use thiserror::Error;

pub mod vandal;

/// Errors raised when an article document does not match the expected
/// structure. These are not retried; retrying cannot fix a schema change.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("article at {url} has no recognizable title")]
    MissingTitle { url: String },
    #[error("article at {url} has no readable summary or body text")]
    MissingBody { url: String },
}
