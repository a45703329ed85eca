//! # Verification Mode
//!
//! Re-probes the addresses already in the ledger through the same queue and
//! worker pipeline as a scan. Confirmed addresses are collected in memory;
//! the ledger itself is left alone. The complement, addresses that did not
//! answer this time, can be written to a separate "removed" record for an
//! operator to review.

use std::collections::BTreeSet;
use std::future::Future;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use reachr_common::config::{Config, REMOVED_SUFFIX};
use tracing::info;

use crate::ledger::{self, LedgerError};
use crate::metrics::RunMetrics;
use crate::probe::Prober;
use crate::recorder::Accumulator;
use crate::scanner::{Coordinator, ProgressCallback, RunReport, ScanError};

pub struct Verification {
    prior: BTreeSet<Ipv4Addr>,
    confirmed: Arc<Accumulator>,
    coordinator: Coordinator,
}

impl Verification {
    pub fn new(cfg: &Config, prober: Arc<dyn Prober>, prior: BTreeSet<Ipv4Addr>) -> Self {
        let confirmed = Arc::new(Accumulator::new());
        // No point in idle workers when the input is this small.
        let concurrency = cfg.concurrency.min(prior.len());
        let coordinator = Coordinator::new(cfg, prober, confirmed.clone()).with_concurrency(concurrency);

        Self {
            prior,
            confirmed,
            coordinator,
        }
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.coordinator = self.coordinator.with_progress(callback);
        self
    }

    pub fn metrics(&self) -> Arc<RunMetrics> {
        self.coordinator.metrics()
    }

    pub fn is_empty(&self) -> bool {
        self.prior.is_empty()
    }

    pub async fn run<F>(self, interrupt: F) -> Result<VerifyReport, ScanError>
    where
        F: Future<Output = ()>,
    {
        let source = self.prior.clone().into_iter();
        let run: RunReport = self.coordinator.run(source, interrupt).await?;

        Ok(VerifyReport {
            run,
            prior: self.prior,
            confirmed: self.confirmed.snapshot(),
        })
    }
}

#[derive(Debug)]
pub struct VerifyReport {
    pub run: RunReport,
    pub prior: BTreeSet<Ipv4Addr>,
    pub confirmed: BTreeSet<Ipv4Addr>,
}

impl VerifyReport {
    /// Addresses from the input that were not confirmed good this run.
    pub fn removed(&self) -> BTreeSet<Ipv4Addr> {
        self.prior.difference(&self.confirmed).copied().collect()
    }

    /// Writes the removed record, replacing any previous one.
    ///
    /// Returns how many addresses it holds.
    pub fn write_removed(&self, path: &Path) -> Result<usize, LedgerError> {
        let removed = self.removed();
        ledger::write_record(path, &removed)?;
        info!("Wrote {} stale addresses to {}", removed.len(), path.display());
        Ok(removed.len())
    }
}

/// `good_ips` becomes `good_ips_removed`.
pub fn removed_path(ledger: &Path) -> PathBuf {
    let mut name = ledger.as_os_str().to_owned();
    name.push(REMOVED_SUFFIX);
    PathBuf::from(name)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProbeOutcome;
    use async_trait::async_trait;

    struct OnlyProber(Ipv4Addr);

    #[async_trait]
    impl Prober for OnlyProber {
        async fn probe(&self, addr: Ipv4Addr) -> ProbeOutcome {
            if addr == self.0 {
                ProbeOutcome::Good
            } else {
                ProbeOutcome::status(502)
            }
        }
    }

    fn ip(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_removed_is_complement_of_confirmed() {
        let prior = BTreeSet::from([ip("1.1.1.1"), ip("2.2.2.2")]);
        let verification =
            Verification::new(&Config::default(), Arc::new(OnlyProber(ip("1.1.1.1"))), prior);
        let report = verification.run(std::future::pending()).await.unwrap();

        assert_eq!(report.run.summary.probed, 2);
        assert_eq!(report.run.summary.good, 1);
        assert_eq!(report.confirmed, BTreeSet::from([ip("1.1.1.1")]));
        assert_eq!(report.removed(), BTreeSet::from([ip("2.2.2.2")]));
    }

    #[tokio::test]
    async fn test_write_removed_record() {
        let dir = tempfile::tempdir().unwrap();
        let ledger_path = dir.path().join("good_ips");
        std::fs::write(&ledger_path, "1.1.1.1|2.2.2.2|3.3.3.3").unwrap();

        let prior = ledger::read_record(&ledger_path).unwrap();
        let verification =
            Verification::new(&Config::default(), Arc::new(OnlyProber(ip("3.3.3.3"))), prior);
        let report = verification.run(std::future::pending()).await.unwrap();

        let out = removed_path(&ledger_path);
        assert_eq!(report.write_removed(&out).unwrap(), 2);
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "1.1.1.1|2.2.2.2");
        // the live ledger is never touched
        assert_eq!(
            std::fs::read_to_string(&ledger_path).unwrap(),
            "1.1.1.1|2.2.2.2|3.3.3.3"
        );
    }

    #[tokio::test]
    async fn test_empty_prior_set() {
        let verification =
            Verification::new(&Config::default(), Arc::new(OnlyProber(ip("1.1.1.1"))), BTreeSet::new());
        assert!(verification.is_empty());

        let report = verification.run(std::future::pending()).await.unwrap();
        assert_eq!(report.run.summary.probed, 0);
        assert!(report.removed().is_empty());
    }

    #[test]
    fn test_removed_path() {
        assert_eq!(
            removed_path(Path::new("/var/lib/reachr/good_ips")),
            PathBuf::from("/var/lib/reachr/good_ips_removed")
        );
    }
}
