use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use reachr_core::ledger::{self, Ledger};
use reachr_core::verify::{self, Verification};
use tempfile::TempDir;

use crate::mock::{ScriptedProber, config, v4};

/// Of three known addresses only two still answer.
#[tokio::test]
async fn verify_writes_the_stale_addresses() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let ledger_path = dir.path().join("good_ips");
    std::fs::write(&ledger_path, "1.1.1.1|2.2.2.2|3.3.3.3")?;

    let prior: BTreeSet<Ipv4Addr> = ledger::read_record(&ledger_path)?;
    let prober = ScriptedProber::new([v4(1, 1, 1, 1), v4(3, 3, 3, 3)]);

    let report = Verification::new(&config(3000, 200), prober.clone(), prior)
        .run(std::future::pending())
        .await?;

    assert_eq!(prober.calls(), 3);
    assert_eq!(report.run.summary.probed, 3);
    assert_eq!(report.run.summary.good, 2);
    assert_eq!(
        report.confirmed,
        BTreeSet::from([v4(1, 1, 1, 1), v4(3, 3, 3, 3)])
    );

    let removed_path = verify::removed_path(&ledger_path);
    assert_eq!(removed_path, dir.path().join("good_ips_removed"));
    assert_eq!(report.write_removed(&removed_path)?, 1);
    assert_eq!(std::fs::read_to_string(&removed_path)?, "2.2.2.2");

    // The ledger itself is left alone.
    assert_eq!(
        std::fs::read_to_string(&ledger_path)?,
        "1.1.1.1|2.2.2.2|3.3.3.3"
    );
    Ok(())
}

/// A scan followed by a verify of its own ledger confirms everything.
#[tokio::test]
async fn verify_after_scan_confirms_every_entry() -> anyhow::Result<()> {
    use std::sync::Arc;

    use reachr_common::network::netblocks;
    use reachr_common::network::rotation::RoundRobin;
    use reachr_core::scanner::Coordinator;

    let dir = TempDir::new()?;
    let ledger_path = dir.path().join("good_ips");
    let good = [v4(198, 51, 100, 7), v4(198, 51, 100, 9)];
    let ranges = netblocks::parse_blocks(&["198.51.100.0/28"])?;

    let ledger = Arc::new(Ledger::open(&ledger_path)?);
    Coordinator::new(&config(16, 4), ScriptedProber::new(good), ledger)
        .run(RoundRobin::new(&ranges, false), std::future::pending())
        .await?;

    let prior = ledger::read_record(&ledger_path)?;
    let report = Verification::new(&config(16, 4), ScriptedProber::new(good), prior)
        .run(std::future::pending())
        .await?;

    assert_eq!(report.confirmed, BTreeSet::from(good));
    assert!(report.removed().is_empty());
    Ok(())
}

/// An empty ledger gives an empty run.
#[tokio::test]
async fn verify_empty_ledger_probes_nothing() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let ledger_path = dir.path().join("missing");

    let prior = ledger::read_record(&ledger_path)?;
    let prober = ScriptedProber::new([]);
    let verification = Verification::new(&config(3000, 200), prober.clone(), prior);
    assert!(verification.is_empty());

    let report = verification.run(std::future::pending()).await?;

    assert_eq!(prober.calls(), 0);
    assert_eq!(report.run.summary.probed, 0);
    assert!(report.removed().is_empty());
    Ok(())
}
