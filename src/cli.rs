//! Command-line interface definitions.
//!
//! Most knobs live in the YAML config file; the CLI only carries the
//! per-invocation overrides.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Defaults: writes under ./gaming_news_output
/// vandal_shorts
///
/// # Custom output root and article count
/// vandal_shorts -o /srv/shorts -n 3
///
/// # Explicit config file
/// vandal_shorts -c ./vandal_shorts.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Base output directory (overrides the config file)
    #[arg(short, long)]
    pub output_root: Option<PathBuf>,

    /// Number of new articles to process (overrides the config file)
    #[arg(short, long)]
    pub news_count: Option<usize>,
}
