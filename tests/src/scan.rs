use std::collections::BTreeSet;
use std::net::{Ipv4Addr, TcpListener};
use std::sync::Arc;
use std::time::Duration;

use reachr_common::config::ProbeTarget;
use reachr_common::network::netblocks;
use reachr_common::network::rotation::RoundRobin;
use reachr_core::ledger::{self, Ledger};
use reachr_core::probe::{FailureTable, HttpsProber};
use reachr_core::scanner::{Coordinator, RunReport};
use tempfile::TempDir;

use crate::mock::{ScriptedProber, config, v4};

/// Scans a /30 where one of the two usable hosts answers.
#[tokio::test]
async fn scan_small_block_records_the_good_host() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let ledger_path = dir.path().join("good_ips");
    let ranges = netblocks::parse_netblocks("10.0.0.0/30\n")?;

    let ledger = Arc::new(Ledger::open(&ledger_path)?);
    let prober = ScriptedProber::new([v4(10, 0, 0, 1)]);

    let report: RunReport = Coordinator::new(&config(3000, 200), prober.clone(), ledger)
        .run(RoundRobin::new(&ranges, false), std::future::pending())
        .await?;

    assert!(!report.interrupted);
    assert_eq!(prober.calls(), 2);
    assert_eq!(report.summary.probed, 2);
    assert_eq!(report.summary.good, 1);
    assert!(
        report
            .summary
            .to_string()
            .starts_with("Tested: 2 ips\nFound 1 good ips\nQps: ")
    );

    let recorded: BTreeSet<Ipv4Addr> = ledger::read_record(&ledger_path)?;
    assert_eq!(recorded, BTreeSet::from([v4(10, 0, 0, 1)]));
    assert_eq!(std::fs::read_to_string(&ledger_path)?, "10.0.0.1");
    Ok(())
}

/// Many workers hitting one ledger must leave every good address in it once.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn scan_many_blocks_keeps_ledger_consistent() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let ledger_path = dir.path().join("good_ips");
    let ranges = netblocks::parse_netblocks(
        "10.1.0.0/26, 10.2.0.0/26 10.3.0.0/26\n# spare\n10.4.0.0/26\nip6:2001:db8::/32\n",
    )?;
    assert_eq!(ranges.len(), 4);

    // Every fourth host in each block answers.
    let good: Vec<Ipv4Addr> = (1..=4u8)
        .flat_map(|b| (1..=62u8).filter(|h| h % 4 == 0).map(move |h| v4(10, b, 0, h)))
        .collect();
    let prober = ScriptedProber::new(good.iter().copied());
    let ledger = Arc::new(Ledger::open(&ledger_path)?);

    let coordinator = Coordinator::new(&config(64, 8), prober.clone(), ledger);
    let metrics = coordinator.metrics();
    let report = coordinator
        .run(RoundRobin::new(&ranges, false), std::future::pending())
        .await?;

    assert_eq!(report.summary.probed, 4 * 62);
    assert_eq!(prober.calls(), 4 * 62);

    // Counters are final once the run returns.
    assert_eq!(metrics.probed(), report.summary.probed);

    let recorded = ledger::read_record(&ledger_path)?;
    let expected: BTreeSet<Ipv4Addr> = good.into_iter().collect();
    assert_eq!(recorded, expected);
    assert_eq!(report.summary.good as usize, recorded.len());
    Ok(())
}

/// A second scan over the same blocks adds nothing new.
#[tokio::test]
async fn rescan_does_not_duplicate_entries() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let ledger_path = dir.path().join("good_ips");
    let ranges = netblocks::parse_blocks(&["192.0.2.0/29"])?;
    let good = [v4(192, 0, 2, 3), v4(192, 0, 2, 5)];

    for _ in 0..2 {
        let ledger = Arc::new(Ledger::open(&ledger_path)?);
        Coordinator::new(&config(4, 2), ScriptedProber::new(good), ledger)
            .run(RoundRobin::new(&ranges, true), std::future::pending())
            .await?;
    }

    assert_eq!(std::fs::read_to_string(&ledger_path)?.matches('|').count(), 1);
    assert_eq!(ledger::read_record(&ledger_path)?, BTreeSet::from(good));
    Ok(())
}

/// Real HTTPS probes against loopback addresses where nothing listens.
#[tokio::test]
async fn https_scan_of_closed_port_records_nothing() -> anyhow::Result<()> {
    let port: u16 = {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        listener.local_addr()?.port()
    };

    let dir = TempDir::new()?;
    let ledger_path = dir.path().join("good_ips");
    let mut target = ProbeTarget::new("reachr.test", "/");
    target.port = port;
    let prober = Arc::new(HttpsProber::new(
        target,
        Duration::from_secs(2),
        FailureTable::default(),
    ));
    let ranges = netblocks::parse_blocks(&["127.0.0.0/30"])?;

    let report = Coordinator::new(&config(8, 4), prober, Arc::new(Ledger::open(&ledger_path)?))
        .run(RoundRobin::new(&ranges, false), std::future::pending())
        .await?;

    assert_eq!(report.summary.probed, 2);
    assert_eq!(report.summary.good, 0);
    assert!(ledger::read_record(&ledger_path)?.is_empty());
    Ok(())
}
