use super::Pipeline;
use crate::error::{Error, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{error, trace};

pub type JobSender = Sender<PathBuf>;
pub type JobReceiver = Receiver<PathBuf>;

/// Bounded FIFO of file paths; `send` blocks the scanner while it is full.
pub fn job_queue(capacity: usize) -> (JobSender, JobReceiver) {
    bounded(capacity)
}

/// A fixed number of named worker threads draining one job queue.
///
/// Workers run until every sender of the queue has been dropped, which in the
/// daemon never happens: the process exits underneath them.
pub struct WorkerPool {
    name: &'static str,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn spawn(size: usize, pipeline: Arc<Pipeline>, receiver: JobReceiver) -> Result<Self> {
        let name = pipeline.mode().name();
        let mut handles = Vec::with_capacity(size);
        for id in 1..=size {
            let pipeline = Arc::clone(&pipeline);
            let receiver = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("{}-{}", name, id))
                .spawn(move || run_worker(id, &pipeline, &receiver))?;
            handles.push(handle);
        }
        Ok(Self { name, handles })
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every worker to drain the closed queue.
    pub fn join(self) -> Result<()> {
        for (i, handle) in self.handles.into_iter().enumerate() {
            handle
                .join()
                .map_err(|_| Error::Other(format!("{} worker {} panicked", self.name, i + 1)))?;
        }
        Ok(())
    }
}

fn run_worker(id: usize, pipeline: &Pipeline, receiver: &JobReceiver) {
    let mode = pipeline.mode().name();
    for path in receiver.iter() {
        match pipeline.process(&path) {
            Ok(outcome) => trace!(worker = id, mode, path = %path.display(), ?outcome, "Job done"),
            Err(e) => {
                pipeline.metrics().inc_job_failures();
                if pipeline.config().fail_fast && e.is_io() {
                    error!(
                        worker = id,
                        mode,
                        path = %path.display(),
                        error = %e,
                        "Read failure with fail_fast set, terminating"
                    );
                    process::exit(1);
                }
                error!(
                    worker = id,
                    mode,
                    path = %path.display(),
                    error = %e,
                    "Job failed, skipping"
                );
            }
        }
    }
}
