//! Per-file state machines for the two worker pools.
//!
//! One [`Pipeline`] type serves both pools: in `Ingest` mode a source file is
//! hashed, deduplicated against the archive and, if new, copied into place;
//! in `Index` mode an archive file is only hashed and recorded.

pub mod pool;

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::hasher::{self, ContentHash};
use crate::metadata;
use crate::metrics::Metrics;
use crate::placement::Placement;
use crate::platform;
use crate::storage::{IdentityIndex, RecordOutcome};
use crate::transfer::{self, TransferOutcome};
use dashmap::DashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, trace, warn};

pub use pool::{job_queue, JobReceiver, JobSender, WorkerPool};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineMode {
    /// Source tree jobs: dedup, place, copy, record.
    Ingest,
    /// Archive tree jobs: hash and record, never copy.
    Index,
}

impl PipelineMode {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineMode::Ingest => "ingest",
            PipelineMode::Index => "index",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Source path is already in the seen-set.
    AlreadySeen,
    /// Content is already archived; only the seen-set was updated.
    Duplicate { hash: ContentHash },
    /// New content placed at `dst`. `transfer` is `None` in dry-run.
    Archived {
        hash: ContentHash,
        dst: PathBuf,
        transfer: Option<TransferOutcome>,
    },
    /// Archive path is already in the index.
    AlreadyIndexed,
    Indexed {
        hash: ContentHash,
        record: RecordOutcome,
    },
}

pub struct Pipeline {
    mode: PipelineMode,
    config: Arc<AppConfig>,
    index: Arc<IdentityIndex>,
    metrics: Arc<Metrics>,
    /// One lock per hash currently being archived. Entries are dropped once
    /// no worker holds or waits on them.
    in_flight: DashMap<ContentHash, Arc<Mutex<()>>>,
}

impl Pipeline {
    pub fn new(
        mode: PipelineMode,
        config: Arc<AppConfig>,
        index: Arc<IdentityIndex>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            mode,
            config,
            index,
            metrics,
            in_flight: DashMap::new(),
        }
    }

    pub fn mode(&self) -> PipelineMode {
        self.mode
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn process(&self, path: &Path) -> Result<JobOutcome> {
        match self.mode {
            PipelineMode::Ingest => self.ingest(path),
            PipelineMode::Index => self.index(path),
        }
    }

    fn hash(&self, path: &Path) -> Result<ContentHash> {
        hasher::hash_file(path).map_err(|e| Error::file_io(path, e))
    }

    fn ingest(&self, path: &Path) -> Result<JobOutcome> {
        if self.index.lookup_source_hash(path)?.is_some() {
            return Ok(JobOutcome::AlreadySeen);
        }

        info!(path = %path.display(), "Hashing unseen source file");
        let hash = self.hash(path)?;

        self.metrics.inc_hashes_checked();
        if self.index.hash_exists_in_destination(&hash)? {
            return self.record_duplicate(path, hash);
        }

        // Identical content queued twice: the second worker waits here and
        // then finds the first worker's record.
        let lock = self.hash_lock(hash);
        let outcome = {
            let _held = lock.lock().unwrap_or_else(PoisonError::into_inner);
            match self.index.hash_exists_in_destination(&hash) {
                Ok(true) => self.record_duplicate(path, hash),
                Ok(false) => self.archive(path, hash),
                Err(e) => Err(e),
            }
        };
        drop(lock);
        self.release_hash_lock(&hash);
        outcome
    }

    fn record_duplicate(&self, path: &Path, hash: ContentHash) -> Result<JobOutcome> {
        debug!(
            path = %path.display(),
            hash = %hash,
            decision = "duplicate",
            "Content already archived, skipping copy"
        );
        self.index.record_source(path, &hash)?;
        Ok(JobOutcome::Duplicate { hash })
    }

    fn hash_lock(&self, hash: ContentHash) -> Arc<Mutex<()>> {
        Arc::clone(self.in_flight.entry(hash).or_default().value())
    }

    fn release_hash_lock(&self, hash: &ContentHash) {
        self.in_flight.remove_if(hash, |_, lock| Arc::strong_count(lock) == 1);
    }

    fn archive(&self, path: &Path, hash: ContentHash) -> Result<JobOutcome> {
        let date = metadata::resolve_capture_date(path);
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| Error::Other(format!("{} has no file name", path.display())))?;
        let placement = Placement::compute(&self.config.archive_root, &hash, &date, &file_name);

        if self.config.dry_run {
            info!(
                path = %path.display(),
                dst = %placement.file.display(),
                hash = %hash,
                date = %date,
                decision = "copy",
                "Would have copied file to long term storage"
            );
            self.index.record_destination(&hash, &placement.file)?;
            self.index.record_source(path, &hash)?;
            return Ok(JobOutcome::Archived {
                hash,
                dst: placement.file,
                transfer: None,
            });
        }

        platform::create_dir_all_permissive(&placement.folder)
            .map_err(|e| Error::file_io(&placement.folder, e))?;
        info!(
            path = %path.display(),
            dst = %placement.file.display(),
            hash = %hash,
            date = %date,
            decision = "copy",
            "Copying file to long term storage"
        );
        let outcome = transfer::transfer(path, &placement.file)?;
        if let Some(duplicate) = self.settle_copy(path, hash, &placement.file, outcome)? {
            return Ok(duplicate);
        }
        match outcome {
            TransferOutcome::AlreadyPresent => {
                debug!(dst = %placement.file.display(), "Archive already holds identical file")
            }
            TransferOutcome::Linked | TransferOutcome::Copied { .. } => {
                self.metrics.inc_files_copied()
            }
        }

        // Destination first: a crash before the seen-set write only causes a
        // harmless re-hash of this path on the next cycle.
        if let RecordOutcome::Alias { canonical } =
            self.index.record_destination(&hash, &placement.file)?
        {
            warn!(
                dst = %placement.file.display(),
                canonical = %canonical.display(),
                "Archived a second copy of content indexed concurrently"
            );
        }
        self.index.record_source(path, &hash)?;

        Ok(JobOutcome::Archived {
            hash,
            dst: placement.file,
            transfer: Some(outcome),
        })
    }

    /// An index worker may have recorded the same content from an existing
    /// archive file while this one was being copied. The fresh copy is then
    /// removed and the source counts as a duplicate.
    fn settle_copy(
        &self,
        path: &Path,
        hash: ContentHash,
        dst: &Path,
        outcome: TransferOutcome,
    ) -> Result<Option<JobOutcome>> {
        if outcome == TransferOutcome::AlreadyPresent {
            return Ok(None);
        }
        let canonical = match self.index.destination_path_for(&hash)? {
            Some(canonical) if canonical != dst => canonical,
            _ => return Ok(None),
        };
        warn!(
            dst = %dst.display(),
            canonical = %canonical.display(),
            hash = %hash,
            "Content was indexed elsewhere during the copy, removing the new copy"
        );
        fs::remove_file(dst).map_err(|e| Error::file_io(dst, e))?;
        self.record_duplicate(path, hash).map(Some)
    }

    fn index(&self, path: &Path) -> Result<JobOutcome> {
        if let Some(hash) = self.index.lookup_destination_hash(path)? {
            trace!(path = %path.display(), hash = %hash, "Archive file already indexed");
            return Ok(JobOutcome::AlreadyIndexed);
        }

        info!(path = %path.display(), "Hashing unseen archive file");
        let hash = self.hash(path)?;
        self.metrics.inc_hashes_checked();

        let record = self.index.record_destination(&hash, path)?;
        if record == RecordOutcome::Recorded {
            self.metrics.inc_files_indexed();
        }
        Ok(JobOutcome::Indexed { hash, record })
    }
}
