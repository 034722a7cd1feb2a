use crate::config::AppConfig;
use crate::error::Result;
use crate::metrics::{self, Metrics};
use crate::pipeline::{job_queue, Pipeline, PipelineMode, WorkerPool};
use crate::scanner::ScanScheduler;
use crate::storage::IdentityIndex;
use std::sync::Arc;
use tracing::info;

/// Owns the long-lived pieces of the daemon: configuration, index and counters.
pub struct Daemon {
    config: Arc<AppConfig>,
    index: Arc<IdentityIndex>,
    metrics: Arc<Metrics>,
}

/// Worker pools plus the scheduler feeding them.
pub struct Running {
    scheduler: ScanScheduler,
    ingest_pool: WorkerPool,
    index_pool: WorkerPool,
}

impl Daemon {
    /// Validate the configuration and open the identity index. Failing to
    /// open the index is fatal for the daemon.
    pub fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;
        let index = IdentityIndex::open(&config.db_path)?.with_dry_run(config.dry_run);
        Ok(Self {
            config: Arc::new(config),
            index: Arc::new(index),
            metrics: Arc::new(Metrics::new()),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn index(&self) -> &IdentityIndex {
        &self.index
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn pipeline(&self, mode: PipelineMode) -> Pipeline {
        Pipeline::new(
            mode,
            Arc::clone(&self.config),
            Arc::clone(&self.index),
            Arc::clone(&self.metrics),
        )
    }

    /// Spawn both worker pools and build the scheduler that feeds them.
    pub fn start(&self) -> Result<Running> {
        let capacity = self.config.queue_capacity();
        let (ingest_tx, ingest_rx) = job_queue(capacity);
        let (index_tx, index_rx) = job_queue(capacity);

        let ingest_pool = WorkerPool::spawn(
            self.config.workers,
            Arc::new(self.pipeline(PipelineMode::Ingest)),
            ingest_rx,
        )?;
        let index_pool = WorkerPool::spawn(
            self.config.workers,
            Arc::new(self.pipeline(PipelineMode::Index)),
            index_rx,
        )?;
        info!(
            workers = self.config.workers,
            queue_capacity = capacity,
            "Worker pools started"
        );

        let scheduler = ScanScheduler::new(
            Arc::clone(&self.config),
            ingest_tx,
            index_tx,
            Arc::clone(&self.metrics),
        );
        Ok(Running {
            scheduler,
            ingest_pool,
            index_pool,
        })
    }

    /// Run until the process exits.
    pub fn run(self) -> Result<()> {
        info!(
            source = %self.config.source_root.display(),
            archive = %self.config.archive_root.display(),
            db = %self.config.db_path.display(),
            sleep_secs = self.config.sleep_interval_secs,
            dry_run = self.config.dry_run,
            "Starting up"
        );
        if self.config.metrics.enabled {
            metrics::spawn_metrics_server(Arc::clone(&self.metrics), self.config.metrics.port)?;
        }
        let running = self.start()?;
        running.scheduler.run()
    }
}

impl Running {
    pub fn scheduler(&self) -> &ScanScheduler {
        &self.scheduler
    }

    /// Close both queues and wait for the workers to drain them.
    pub fn shutdown(self) -> Result<()> {
        drop(self.scheduler);
        self.ingest_pool.join()?;
        self.index_pool.join()
    }
}
