use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Live counters for one run.
///
/// Every worker bumps these, so they are plain atomics; they only ever
/// grow for the lifetime of a run.
#[derive(Debug)]
pub struct RunMetrics {
    probed: AtomicU64,
    good: AtomicU64,
    started: Instant,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self {
            probed: AtomicU64::new(0),
            good: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    /// Counts one finished probe and returns the new total.
    pub fn record_probe(&self) -> u64 {
        self.probed.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn record_good(&self) -> u64 {
        self.good.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn probed(&self) -> u64 {
        self.probed.load(Ordering::Relaxed)
    }

    pub fn good(&self) -> u64 {
        self.good.load(Ordering::Relaxed)
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            probed: self.probed(),
            good: self.good(),
            elapsed: self.started.elapsed(),
        }
    }
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub probed: u64,
    pub good: u64,
    pub elapsed: Duration,
}

impl RunSummary {
    /// Probes per second over the whole run.
    pub fn qps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.probed as f64 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Tested: {} ips", self.probed)?;
        writeln!(f, "Found {} good ips", self.good)?;
        write!(f, "Qps: {:.2}", self.qps())
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
