//! Daemon counters, rendered in the Prometheus text exposition format.

pub mod server;

use std::sync::atomic::{AtomicU64, Ordering};

pub use server::spawn_metrics_server;

#[derive(Debug, Default)]
pub struct Metrics {
    files_scanned: AtomicU64,
    files_copied: AtomicU64,
    hashes_checked: AtomicU64,
    files_indexed: AtomicU64,
    job_failures: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub files_scanned: u64,
    pub files_copied: u64,
    pub hashes_checked: u64,
    pub files_indexed: u64,
    pub job_failures: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// A file was handed to one of the worker queues.
    #[inline]
    pub fn inc_files_scanned(&self) {
        self.files_scanned.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_files_copied(&self) {
        self.files_copied.fetch_add(1, Ordering::Relaxed);
    }

    /// A content hash was looked up against the archive.
    #[inline]
    pub fn inc_hashes_checked(&self) {
        self.hashes_checked.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_files_indexed(&self) {
        self.files_indexed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_job_failures(&self) {
        self.job_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            files_scanned: self.files_scanned.load(Ordering::Relaxed),
            files_copied: self.files_copied.load(Ordering::Relaxed),
            hashes_checked: self.hashes_checked.load(Ordering::Relaxed),
            files_indexed: self.files_indexed.load(Ordering::Relaxed),
            job_failures: self.job_failures.load(Ordering::Relaxed),
        }
    }

    pub fn prometheus_format(&self) -> String {
        let s = self.snapshot();
        format!(
            r#"# HELP photoimportd_files_scanned The total number of files queued by the scanner
# TYPE photoimportd_files_scanned counter
photoimportd_files_scanned {}

# HELP photoimportd_files_copied The total number of files copied to the archive
# TYPE photoimportd_files_copied counter
photoimportd_files_copied {}

# HELP photoimportd_hashes_checked The total number of hashes checked since startup
# TYPE photoimportd_hashes_checked counter
photoimportd_hashes_checked {}

# HELP photoimportd_files_indexed The total number of archive files added to the index
# TYPE photoimportd_files_indexed counter
photoimportd_files_indexed {}

# HELP photoimportd_job_failures The total number of jobs abandoned after an error
# TYPE photoimportd_job_failures counter
photoimportd_job_failures {}
"#,
            s.files_scanned, s.files_copied, s.hashes_checked, s.files_indexed, s.job_failures,
        )
    }
}
