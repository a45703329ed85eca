use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use reachr_common::config::Config;
use reachr_core::probe::{ProbeOutcome, Prober};

/// Answers good for a fixed set of addresses and 503 for the rest.
pub struct ScriptedProber {
    good: HashSet<Ipv4Addr>,
    calls: AtomicUsize,
}

impl ScriptedProber {
    pub fn new<I: IntoIterator<Item = Ipv4Addr>>(good: I) -> Arc<Self> {
        Arc::new(Self {
            good: good.into_iter().collect(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, addr: Ipv4Addr) -> ProbeOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.good.contains(&addr) {
            ProbeOutcome::Good
        } else {
            ProbeOutcome::status(503)
        }
    }
}

pub fn v4(a: u8, b: u8, c: u8, d: u8) -> Ipv4Addr {
    Ipv4Addr::new(a, b, c, d)
}

pub fn config(concurrency: usize, queue_capacity: usize) -> Config {
    Config {
        concurrency,
        queue_capacity,
        ..Config::default()
    }
}
