use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use anyhow::Context;
use colored::*;
use reachr_common::config::Config;
use reachr_core::ledger;
use reachr_core::verify::{self, Verification};
use tracing::warn;

use crate::commands::{self, RunArgs, VerifyArgs};
use crate::terminal::{print, spinner::ProgressSpinner};

pub async fn verify(run: &RunArgs, args: VerifyArgs, cfg: &Config) -> anyhow::Result<()> {
    let prior: BTreeSet<Ipv4Addr> = ledger::read_record(&run.ledger)
        .with_context(|| format!("cannot read ledger {}", run.ledger.display()))?;
    if prior.is_empty() {
        warn!("Ledger {} is empty, nothing to verify", run.ledger.display());
    }

    let prober = run.prober(cfg)?;
    print::aligned_lines(&[
        ("Target", prober.target().url().normal()),
        ("Known", prior.len().to_string().normal()),
        ("Ledger", run.ledger.display().to_string().normal()),
    ]);

    let mut verification = Verification::new(cfg, prober, prior);
    let metrics = verification.metrics();
    let spinner = cfg.progress.then(|| ProgressSpinner::start(metrics.clone()));
    if let Some(spinner) = &spinner {
        verification = verification.with_progress(spinner.callback());
    }

    let result = verification.run(commands::interrupted()).await;

    if let Some(spinner) = spinner {
        spinner.finish();
    }
    let interrupted = result.as_ref().is_ok_and(|report| report.run.interrupted);
    print::summary(&metrics.summary(), interrupted, cfg.quiet);

    let report = result.context("verification aborted")?;

    if !args.remove {
        return Ok(());
    }
    if report.run.interrupted {
        warn!("Run was interrupted, the removed record was not written");
        return Ok(());
    }

    let path = verify::removed_path(&run.ledger);
    let count = report
        .write_removed(&path)
        .with_context(|| format!("cannot write removed record {}", path.display()))?;
    print::print_status(format!(
        "{} addresses no longer answer, listed in {}",
        count.to_string().yellow().bold(),
        path.display()
    ));
    Ok(())
}
