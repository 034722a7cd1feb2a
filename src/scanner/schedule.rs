use super::walk::{walk_and_enqueue, PathFilter};
use crate::config::AppConfig;
use crate::metrics::Metrics;
use crate::pipeline::JobSender;
use crate::platform;
use chrono::{Datelike, Local};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub archive_files: usize,
    pub source_files: usize,
    pub duration: Duration,
}

/// Feeds the two worker queues from periodic walks of the archive and
/// source trees.
pub struct ScanScheduler {
    config: Arc<AppConfig>,
    filter: PathFilter,
    ingest_queue: JobSender,
    index_queue: JobSender,
    metrics: Arc<Metrics>,
}

impl ScanScheduler {
    pub fn new(
        config: Arc<AppConfig>,
        ingest_queue: JobSender,
        index_queue: JobSender,
        metrics: Arc<Metrics>,
    ) -> Self {
        let filter = PathFilter::new(&config.ignore_patterns);
        Self {
            config,
            filter,
            ingest_queue,
            index_queue,
            metrics,
        }
    }

    /// `<archive>/<YYYY>/<YYYY>-<MM>`
    pub fn archive_partition<D: Datelike>(&self, now: &D) -> PathBuf {
        self.config
            .archive_root
            .join(format!("{:04}", now.year()))
            .join(format!("{:04}-{:02}", now.year(), now.month()))
    }

    /// `<source>/<YYYY>/<MM>`
    pub fn source_partition<D: Datelike>(&self, now: &D) -> PathBuf {
        self.config
            .source_root
            .join(format!("{:04}", now.year()))
            .join(format!("{:02}", now.month()))
    }

    /// One pass over the partitions for `now`: archive first so content that
    /// is already stored is indexed before the source side looks for it.
    pub fn scan_cycle<D: Datelike>(&self, now: &D) -> CycleStats {
        let start = Instant::now();

        let archive_dir = self.archive_partition(now);
        trace!(path = %archive_dir.display(), "Walking archive partition");
        self.ensure_partition(&archive_dir);
        let archive_files =
            walk_and_enqueue(&archive_dir, &self.filter, &self.index_queue, &self.metrics);

        let source_dir = if self.config.walk_all_source {
            self.config.source_root.clone()
        } else {
            let dir = self.source_partition(now);
            self.ensure_partition(&dir);
            dir
        };
        trace!(path = %source_dir.display(), "Walking source partition");
        let source_files =
            walk_and_enqueue(&source_dir, &self.filter, &self.ingest_queue, &self.metrics);

        CycleStats {
            archive_files,
            source_files,
            duration: start.elapsed(),
        }
    }

    /// Walk both trees completely.
    pub fn full_scan(&self) -> CycleStats {
        let start = Instant::now();
        info!(
            archive = %self.config.archive_root.display(),
            source = %self.config.source_root.display(),
            "Starting full rescan"
        );
        let archive_files = walk_and_enqueue(
            &self.config.archive_root,
            &self.filter,
            &self.index_queue,
            &self.metrics,
        );
        let source_files = walk_and_enqueue(
            &self.config.source_root,
            &self.filter,
            &self.ingest_queue,
            &self.metrics,
        );
        CycleStats {
            archive_files,
            source_files,
            duration: start.elapsed(),
        }
    }

    /// Scan, sleep, repeat. Never returns; the daemon ends by process exit.
    pub fn run(&self) -> ! {
        if self.config.rescan {
            let stats = self.full_scan();
            log_cycle("Full rescan", &stats);
        }
        loop {
            let stats = self.scan_cycle(&Local::now());
            log_cycle("Scan cycle", &stats);
            thread::sleep(self.config.sleep_interval());
        }
    }

    /// Partitions roll over with the calendar, so the new month's folder may
    /// not exist yet.
    fn ensure_partition(&self, dir: &Path) {
        if self.config.dry_run || dir.is_dir() {
            return;
        }
        if let Err(e) = platform::create_dir_all_permissive(dir) {
            warn!(path = %dir.display(), error = %e, "Could not create partition folder");
        }
    }
}

fn log_cycle(label: &str, stats: &CycleStats) {
    debug!(
        archive_files = stats.archive_files,
        source_files = stats.source_files,
        duration_secs = stats.duration.as_secs_f64(),
        "{} finished",
        label
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{job_queue, JobReceiver};
    use chrono::NaiveDate;
    use std::fs;

    fn scheduler(config: AppConfig) -> (ScanScheduler, JobReceiver, JobReceiver) {
        let (ingest_tx, ingest_rx) = job_queue(64);
        let (index_tx, index_rx) = job_queue(64);
        let metrics = Arc::new(Metrics::new());
        let scheduler = ScanScheduler::new(Arc::new(config), ingest_tx, index_tx, metrics);
        (scheduler, ingest_rx, index_rx)
    }

    #[test]
    fn test_partition_layout() {
        let (s, _, _) = scheduler(AppConfig::new("/src", "/dst", "/db"));
        let now = NaiveDate::from_ymd_opt(2024, 2, 9).unwrap();
        assert_eq!(s.archive_partition(&now), PathBuf::from("/dst/2024/2024-02"));
        assert_eq!(s.source_partition(&now), PathBuf::from("/src/2024/02"));
    }

    #[test]
    fn test_cycle_creates_and_walks_current_partitions() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        let now = NaiveDate::from_ymd_opt(2024, 2, 9).unwrap();

        fs::create_dir_all(src.join("2024/02")).unwrap();
        fs::create_dir_all(src.join("2023/12")).unwrap();
        fs::write(src.join("2024/02/new.jpg"), b"new").unwrap();
        fs::write(src.join("2023/12/old.jpg"), b"old").unwrap();

        let (s, ingest_rx, index_rx) = scheduler(AppConfig::new(&src, &dst, dir.path().join("db")));
        let stats = s.scan_cycle(&now);

        assert!(dst.join("2024/2024-02").is_dir());
        assert_eq!(stats.source_files, 1);
        assert_eq!(stats.archive_files, 0);
        assert_eq!(ingest_rx.try_iter().collect::<Vec<_>>(), vec![src.join("2024/02/new.jpg")]);
        assert!(index_rx.try_iter().next().is_none());
    }

    #[test]
    fn test_walk_all_source_covers_every_partition() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("2024/02")).unwrap();
        fs::create_dir_all(src.join("2023/12")).unwrap();
        fs::write(src.join("2024/02/new.jpg"), b"new").unwrap();
        fs::write(src.join("2023/12/old.jpg"), b"old").unwrap();

        let mut config = AppConfig::new(&src, dir.path().join("dst"), dir.path().join("db"));
        config.walk_all_source = true;
        let (s, ingest_rx, _) = scheduler(config);
        let stats = s.scan_cycle(&NaiveDate::from_ymd_opt(2024, 2, 9).unwrap());

        assert_eq!(stats.source_files, 2);
        assert_eq!(ingest_rx.try_iter().count(), 2);
    }

    #[test]
    fn test_dry_run_creates_no_partitions() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        let mut config = AppConfig::new(&src, &dst, dir.path().join("db"));
        config.dry_run = true;
        let (s, _, _) = scheduler(config);
        let stats = s.scan_cycle(&NaiveDate::from_ymd_opt(2024, 2, 9).unwrap());

        assert_eq!(stats, CycleStats { duration: stats.duration, ..Default::default() });
        assert!(!dst.exists());
        assert!(!src.exists());
    }

    #[test]
    fn test_full_scan_routes_each_tree_to_its_queue() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        fs::create_dir_all(src.join("2019/07")).unwrap();
        fs::create_dir_all(dst.join("2019/2019-07/2019-07-04")).unwrap();
        fs::write(src.join("2019/07/a.jpg"), b"a").unwrap();
        fs::write(dst.join("2019/2019-07/2019-07-04/b.jpg"), b"b").unwrap();

        let (s, ingest_rx, index_rx) = scheduler(AppConfig::new(&src, &dst, dir.path().join("db")));
        let stats = s.full_scan();

        assert_eq!((stats.archive_files, stats.source_files), (1, 1));
        assert_eq!(ingest_rx.try_iter().collect::<Vec<_>>(), vec![src.join("2019/07/a.jpg")]);
        assert_eq!(
            index_rx.try_iter().collect::<Vec<_>>(),
            vec![dst.join("2019/2019-07/2019-07-04/b.jpg")]
        );
    }
}
