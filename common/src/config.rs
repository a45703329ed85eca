use std::fmt;
use std::time::Duration;

pub const DEFAULT_CONCURRENCY: usize = 3000;
pub const DEFAULT_QUEUE_CAPACITY: usize = 200;
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 10_000;
pub const DEFAULT_EXPECTED_STATUS: u16 = 200;
pub const DEFAULT_HTTPS_PORT: u16 = 443;
pub const DEFAULT_LEDGER_PATH: &str = "good_ips";
pub const DEFAULT_NETBLOCKS_PATH: &str = "netblocks.txt";
pub const REMOVED_SUFFIX: &str = "_removed";

#[derive(Debug)]
pub struct Config {
    /// Number of probing workers running at once.
    ///
    /// Every worker may hold one socket open, so this is bounded in
    /// practice by the process file-descriptor limit.
    pub concurrency: usize,
    /// Capacity of the job queue between the producer and the workers.
    pub queue_capacity: usize,
    pub probe_timeout: Duration,
    /// Enables the periodic "Tested N ips." line.
    pub progress: bool,
    pub progress_interval: u64,
    /// Walk every block from its highest host downwards.
    pub reverse: bool,
    pub quiet: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            progress: false,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            reverse: false,
            quiet: 0,
        }
    }
}

/// The single endpoint every probe requests.
///
/// Only the address the connection is routed to changes between probes;
/// the hostname is still sent for SNI and the `Host` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub hostname: String,
    pub path: String,
    pub port: u16,
    pub expected_status: u16,
}

impl ProbeTarget {
    pub fn new(hostname: impl Into<String>, path: impl Into<String>) -> Self {
        let path: String = path.into();
        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };
        Self {
            hostname: hostname.into(),
            path,
            port: DEFAULT_HTTPS_PORT,
            expected_status: DEFAULT_EXPECTED_STATUS,
        }
    }

    pub fn url(&self) -> String {
        if self.port == DEFAULT_HTTPS_PORT {
            format!("https://{}{}", self.hostname, self.path)
        } else {
            format!("https://{}:{}{}", self.hostname, self.port, self.path)
        }
    }
}

impl fmt::Display for ProbeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url())
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
