use std::any::Any;
use std::net::Ipv4Addr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{Mutex, mpsc};
use tracing::{error, info, trace};

use super::{ProgressCallback, ScanError};
use crate::metrics::RunMetrics;
use crate::probe::{FailureKind, ProbeOutcome, Prober};
use crate::recorder::Recorder;

pub(super) struct WorkerContext {
    pub prober: Arc<dyn Prober>,
    pub recorder: Arc<dyn Recorder>,
    pub metrics: Arc<RunMetrics>,
    pub progress_interval: Option<u64>,
    pub on_progress: Option<ProgressCallback>,
}

impl WorkerContext {
    fn report_progress(&self, probed: u64) {
        if let Some(interval) = self.progress_interval {
            if probed % interval == 0 {
                info!("Tested {probed} ips.");
            }
        }
        if let Some(callback) = &self.on_progress {
            callback(probed);
        }
    }
}

/// Takes candidates off the shared queue until it is closed and empty.
pub(super) async fn run(
    worker_id: usize,
    jobs: Arc<Mutex<mpsc::Receiver<Ipv4Addr>>>,
    ctx: Arc<WorkerContext>,
) -> Result<(), ScanError> {
    loop {
        let job = {
            let mut rx = jobs.lock().await;
            rx.recv().await
        };

        let Some(addr) = job else {
            trace!("Worker {worker_id} found the queue closed");
            break;
        };

        process(addr, &ctx).await?;
    }
    Ok(())
}

/// Probes one candidate. Only a recorder failure escapes.
async fn process(addr: Ipv4Addr, ctx: &WorkerContext) -> Result<(), ScanError> {
    let outcome: ProbeOutcome = match AssertUnwindSafe(ctx.prober.probe(addr))
        .catch_unwind()
        .await
    {
        Ok(outcome) => outcome,
        Err(panic) => {
            error!("Probe of {addr} panicked: {}", panic_message(panic.as_ref()));
            ProbeOutcome::failed(FailureKind::Other)
        }
    };

    let probed: u64 = ctx.metrics.record_probe();
    ctx.report_progress(probed);

    if outcome.is_good() {
        info!("Found good ip: {addr}");
        ctx.recorder.record(addr).await?;
        ctx.metrics.record_good();
    }
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic"
    }
}
