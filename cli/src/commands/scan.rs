use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, ensure};
use colored::*;
use reachr_common::config::{Config, DEFAULT_NETBLOCKS_PATH};
use reachr_common::network::netblocks;
use reachr_common::network::range::AddressRange;
use reachr_common::network::rotation::RoundRobin;
use reachr_core::ledger::Ledger;
use reachr_core::scanner::Coordinator;

use crate::commands::{self, RunArgs, ScanArgs};
use crate::terminal::{print, spinner::ProgressSpinner};

pub async fn scan(run: &RunArgs, args: ScanArgs, cfg: &Config) -> anyhow::Result<()> {
    let ranges: Vec<AddressRange> = load_ranges(&args)?;
    ensure!(
        !ranges.is_empty(),
        "no address ranges to scan, add some to the netblocks file or pass --block"
    );

    let walk = RoundRobin::new(&ranges, cfg.reverse);
    let prober = run.prober(cfg)?;
    let ledger = Arc::new(
        Ledger::open(&run.ledger)
            .with_context(|| format!("cannot use ledger {}", run.ledger.display()))?,
    );

    print::aligned_lines(&[
        ("Target", prober.target().url().normal()),
        ("Blocks", walk.active().to_string().normal()),
        ("Addresses", walk.remaining().to_string().normal()),
        ("Workers", cfg.concurrency.to_string().normal()),
        ("Ledger", run.ledger.display().to_string().normal()),
    ]);

    let mut coordinator = Coordinator::new(cfg, prober, ledger);
    let metrics = coordinator.metrics();
    let spinner = cfg.progress.then(|| ProgressSpinner::start(metrics.clone()));
    if let Some(spinner) = &spinner {
        coordinator = coordinator.with_progress(spinner.callback());
    }

    let result = coordinator.run(walk, commands::interrupted()).await;

    if let Some(spinner) = spinner {
        spinner.finish();
    }
    let interrupted = result.as_ref().is_ok_and(|report| report.interrupted);
    print::summary(&metrics.summary(), interrupted, cfg.quiet);

    result.context("scan aborted")?;
    Ok(())
}

fn load_ranges(args: &ScanArgs) -> anyhow::Result<Vec<AddressRange>> {
    let mut ranges: Vec<AddressRange> = Vec::new();

    let path: PathBuf = args
        .netblocks
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_NETBLOCKS_PATH));

    // The default file is optional when blocks are given on the command line.
    if args.netblocks.is_some() || args.blocks.is_empty() || path.exists() {
        let loaded = netblocks::load_netblocks(&path).context("cannot load address ranges")?;
        ranges.extend(loaded);
    }

    let extra = netblocks::parse_blocks(&args.blocks).context("invalid --block")?;
    ranges.extend(extra);

    Ok(ranges)
}
