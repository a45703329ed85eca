use std::net::Ipv4Addr;

use tokio::sync::mpsc;
use tracing::debug;

/// Feeds `source` into the job queue, suspending while it is full.
///
/// A slot is reserved before the next address is pulled, so an address only
/// leaves the source once the queue has room for it. Returns the number of
/// candidates queued.
pub(super) async fn run<I>(mut source: I, jobs: mpsc::Sender<Ipv4Addr>) -> u64
where
    I: Iterator<Item = Ipv4Addr> + Send,
{
    let mut queued: u64 = 0;

    loop {
        let Ok(permit) = jobs.reserve().await else {
            debug!("Job queue closed after {queued} candidates");
            break;
        };
        let Some(addr) = source.next() else {
            debug!("Source exhausted after {queued} candidates, draining");
            break;
        };
        permit.send(addr);
        queued += 1;
    }

    queued
}
