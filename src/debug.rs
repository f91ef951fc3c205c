//! Raw HTML debug dumps.
//!
//! The pipeline hands every fetched page to a [`DebugSink`] so a site
//! redesign can be diagnosed from the exact HTML the run saw. The sink is
//! injected as a capability: the filesystem implementation is used in
//! production and [`NullDebugSink`] in tests. Dumps are diagnostic only,
//! nothing reads them back, and a failed write never fails the run.

use std::path::PathBuf;
use tracing::{debug, warn};

/// Destination for raw HTML captured during a run.
pub trait DebugSink {
    /// Persist `body` under `key`. Must not fail the caller.
    fn dump_html(&self, key: &str, body: &str);
}

/// Writes dumps as `debug_<key>.html` files inside a directory.
#[derive(Debug)]
pub struct FsDebugSink {
    dir: PathBuf,
}

impl FsDebugSink {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

impl DebugSink for FsDebugSink {
    fn dump_html(&self, key: &str, body: &str) {
        let path = self.dir.join(format!("debug_{key}.html"));
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            warn!(dir = %self.dir.display(), error = %e, "Could not create debug dir");
            return;
        }
        match std::fs::write(&path, body) {
            Ok(()) => debug!(path = %path.display(), "Wrote debug dump"),
            Err(e) => warn!(path = %path.display(), error = %e, "Could not write debug dump"),
        }
    }
}

/// Sink that drops everything. Used in tests.
#[derive(Debug, Default)]
pub struct NullDebugSink;

impl DebugSink for NullDebugSink {
    fn dump_html(&self, _key: &str, _body: &str) {}
}
