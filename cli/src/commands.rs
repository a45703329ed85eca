pub mod scan;
pub mod verify;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, ensure};
use clap::{Args, Parser, Subcommand};
use reachr_common::config::{
    Config, DEFAULT_CONCURRENCY, DEFAULT_EXPECTED_STATUS, DEFAULT_LEDGER_PATH,
    DEFAULT_PROGRESS_INTERVAL, DEFAULT_QUEUE_CAPACITY, ProbeTarget,
};
use reachr_core::probe::{FailureKind, FailureTable, HttpsProber};

#[derive(Parser)]
#[command(name = "reachr")]
#[command(about = "Finds the addresses that currently answer for an HTTPS endpoint.")]
#[command(version)]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Option<Commands>,
    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Walk the netblocks and record every address that answers (default)
    #[command(alias = "s")]
    Scan(ScanArgs),
    /// Re-check the addresses already in the ledger
    #[command(alias = "v")]
    Verify(VerifyArgs),
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Scan(ScanArgs::default())
    }
}

/// Settings shared by every run mode.
#[derive(Args)]
pub struct RunArgs {
    /// Hostname the probes ask for, e.g. myapp.appspot.com
    #[arg(long, global = true)]
    pub host: Option<String>,
    /// Request path
    #[arg(long, global = true, default_value = "/")]
    pub path: String,
    /// Status code that marks an address as good
    #[arg(long, global = true, default_value_t = DEFAULT_EXPECTED_STATUS)]
    pub expect_status: u16,
    /// File holding the good addresses, joined by '|'
    #[arg(long, global = true, default_value = DEFAULT_LEDGER_PATH)]
    pub ledger: PathBuf,
    /// Number of probes running at once
    #[arg(short, long, global = true, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,
    /// Capacity of the job queue
    #[arg(long, global = true, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue: usize,
    /// Per-probe timeout in seconds
    #[arg(long, global = true, default_value_t = 5.0)]
    pub timeout: f64,
    /// Show progress while working
    #[arg(long, global = true)]
    pub progress: bool,
    /// Also print diagnostics for these failure kinds
    /// (timeout, refused, unreachable, tls, exhausted, other)
    #[arg(long, global = true, value_delimiter = ',')]
    pub report: Vec<FailureKind>,
    /// Less decoration; repeat for less
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub quiet: u8,
}

#[derive(Args, Default)]
pub struct ScanArgs {
    /// File with CIDR blocks to walk (default: netblocks.txt)
    #[arg(long)]
    pub netblocks: Option<PathBuf>,
    /// Extra CIDR block to walk; may be repeated
    #[arg(long = "block", value_name = "CIDR")]
    pub blocks: Vec<String>,
    /// Walk every block from its highest address down
    #[arg(long)]
    pub reverse: bool,
}

#[derive(Args, Default)]
pub struct VerifyArgs {
    /// Write the addresses that no longer answer to <ledger>_removed
    #[arg(long)]
    pub remove: bool,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl RunArgs {
    pub fn to_config(&self, reverse: bool) -> anyhow::Result<Config> {
        ensure!(
            self.timeout.is_finite() && self.timeout > 0.0,
            "--timeout must be a positive number of seconds"
        );
        let probe_timeout: Duration = Duration::try_from_secs_f64(self.timeout)
            .with_context(|| format!("--timeout {} is out of range", self.timeout))?;
        ensure!(self.concurrency > 0, "--concurrency must be at least 1");
        ensure!(self.queue > 0, "--queue must be at least 1");

        Ok(Config {
            concurrency: self.concurrency,
            queue_capacity: self.queue,
            probe_timeout,
            progress: self.progress,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            reverse,
            quiet: self.quiet,
        })
    }

    pub fn target(&self) -> anyhow::Result<ProbeTarget> {
        let hostname = self
            .host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .context("no target host given, pass --host <HOSTNAME>")?;

        let mut target = ProbeTarget::new(hostname, self.path.as_str());
        target.expected_status = self.expect_status;
        Ok(target)
    }

    pub fn prober(&self, cfg: &Config) -> anyhow::Result<Arc<HttpsProber>> {
        let failures = FailureTable::default().reporting(self.report.iter().copied());
        Ok(Arc::new(HttpsProber::new(
            self.target()?,
            cfg.probe_timeout,
            failures,
        )))
    }
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
pub async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
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
