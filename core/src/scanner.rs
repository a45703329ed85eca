//! # Scan Coordinator
//!
//! Drives one run through its phases:
//!
//! 1. **Starting**: build the bounded job queue and spawn the worker pool.
//! 2. **Producing + probing**: a single producer task moves candidates from
//!    the address source into the queue, waiting whenever it is full.
//! 3. **Draining**: once the source is exhausted the producer drops its end
//!    of the queue; each worker exits after the queue runs dry, so joining
//!    every worker means every queued candidate has been probed and recorded.
//! 4. **Reporting**: the caller prints the [`RunSummary`] from the shared
//!    [`RunMetrics`], including after an interrupt or a fatal error.
//!
//! Memory stays bounded by the queue capacity plus one candidate per worker,
//! however large the address source is.

use std::future::Future;
use std::net::Ipv4Addr;
use std::sync::Arc;

use reachr_common::config::Config;
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, warn};

use crate::ledger::LedgerError;
use crate::metrics::{RunMetrics, RunSummary};
use crate::probe::Prober;
use crate::recorder::Recorder;

mod producer;
mod worker;

use worker::WorkerContext;

/// Called with the running probe total after every probe.
pub type ProgressCallback = Arc<dyn Fn(u64) + Send + Sync>;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("scan task stopped unexpectedly: {0}")]
    Task(#[from] JoinError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunReport {
    pub summary: RunSummary,
    /// The run was cut short; counts cover only what finished before.
    pub interrupted: bool,
}

pub struct Coordinator {
    concurrency: usize,
    queue_capacity: usize,
    progress_interval: Option<u64>,
    on_progress: Option<ProgressCallback>,
    prober: Arc<dyn Prober>,
    recorder: Arc<dyn Recorder>,
    metrics: Arc<RunMetrics>,
}

impl Coordinator {
    pub fn new(cfg: &Config, prober: Arc<dyn Prober>, recorder: Arc<dyn Recorder>) -> Self {
        let progress_interval = cfg.progress.then_some(cfg.progress_interval.max(1));
        Self {
            concurrency: cfg.concurrency.max(1),
            queue_capacity: cfg.queue_capacity.max(1),
            progress_interval,
            on_progress: None,
            prober,
            recorder,
            metrics: Arc::new(RunMetrics::new()),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    /// Shared counters, readable while the run is in flight.
    pub fn metrics(&self) -> Arc<RunMetrics> {
        self.metrics.clone()
    }

    /// Probes every address from `source` and records the good ones.
    ///
    /// Resolving `interrupt` stops the producer and all workers; the report
    /// then covers only the probes that completed. A recorder failure stops
    /// the run and is returned as the error.
    pub async fn run<I, F>(self, source: I, interrupt: F) -> Result<RunReport, ScanError>
    where
        I: Iterator<Item = Ipv4Addr> + Send + 'static,
        F: Future<Output = ()>,
    {
        let (job_tx, job_rx) = mpsc::channel::<Ipv4Addr>(self.queue_capacity);
        let job_rx = Arc::new(Mutex::new(job_rx));

        let ctx = Arc::new(WorkerContext {
            prober: self.prober,
            recorder: self.recorder,
            metrics: self.metrics.clone(),
            progress_interval: self.progress_interval,
            on_progress: self.on_progress,
        });

        let mut workers: JoinSet<Result<(), ScanError>> = JoinSet::new();
        for worker_id in 0..self.concurrency {
            workers.spawn(worker::run(worker_id, job_rx.clone(), ctx.clone()));
        }
        drop(job_rx);
        debug!(
            "Started {} workers behind a queue of {}",
            self.concurrency, self.queue_capacity
        );

        let producer = tokio::spawn(producer::run(source, job_tx));

        let drained: Option<Result<(), ScanError>> = tokio::select! {
            result = drain(&mut workers) => Some(result),
            () = interrupt => None,
        };

        let interrupted = drained.is_none();
        if interrupted {
            warn!("Interrupted, abandoning {} in-flight workers", workers.len());
        }

        match drained {
            Some(Ok(())) => {
                producer.await?;
            }
            Some(Err(e)) => {
                producer.abort();
                workers.shutdown().await;
                return Err(e);
            }
            None => {
                producer.abort();
                workers.shutdown().await;
            }
        }

        Ok(RunReport {
            summary: self.metrics.summary(),
            interrupted,
        })
    }
}

/// Waits for every worker to exit. The first failure wins.
async fn drain(workers: &mut JoinSet<Result<(), ScanError>>) -> Result<(), ScanError> {
    while let Some(joined) = workers.join_next().await {
        joined??;
    }
    Ok(())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
