use crate::metrics::Metrics;
use crate::pipeline::JobSender;
use crate::transfer::STAGING_PREFIX;
use glob::Pattern;
use std::path::Path;
use tracing::{debug, error, trace, warn};
use walkdir::WalkDir;

/// Glob ignore patterns plus the archive's own staging files.
#[derive(Debug, Default, Clone)]
pub struct PathFilter {
    patterns: Vec<Pattern>,
}

impl PathFilter {
    pub fn new(ignore_globs: &[String]) -> Self {
        let patterns = ignore_globs
            .iter()
            .filter_map(|glob| match Pattern::new(glob) {
                Ok(p) => Some(p),
                Err(e) => {
                    error!("Invalid glob pattern '{}': {}", glob, e);
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        let staging = path
            .file_name()
            .map(|name| name.to_string_lossy().starts_with(STAGING_PREFIX))
            .unwrap_or(false);
        staging || self.patterns.iter().any(|pattern| pattern.matches_path(path))
    }
}

/// Queue every regular file below `root`, blocking while the queue is full.
/// Unreadable entries are logged and skipped. Returns the number of files queued.
pub fn walk_and_enqueue(
    root: &Path,
    filter: &PathFilter,
    queue: &JobSender,
    metrics: &Metrics,
) -> usize {
    if !root.is_dir() {
        debug!(path = %root.display(), "Nothing to walk, directory does not exist");
        return 0;
    }

    let mut queued = 0;
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !filter.is_ignored(entry.path()));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = ?e.path(), error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        trace!(path = %entry.path().display(), "Found file in scan");
        if queue.send(entry.into_path()).is_err() {
            warn!(root = %root.display(), "Job queue closed, abandoning walk");
            break;
        }
        metrics.inc_files_scanned();
        queued += 1;
    }
    queued
}
