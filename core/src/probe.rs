//! # Probe Executor
//!
//! A probe is one HTTPS request to the fixed target, routed to a candidate
//! address. Anything other than the expected status is [`ProbeOutcome::Bad`].
//!
//! Failures carry a [`FailureKind`] which only decides whether an operator
//! diagnostic is emitted (see [`classify::FailureTable`]); it never turns a
//! bad outcome into a good one.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use async_trait::async_trait;

pub mod classify;
pub mod https;

pub use classify::FailureTable;
pub use https::HttpsProber;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FailureKind {
    Timeout,
    ConnectionRefused,
    HostUnreachable,
    TlsError,
    /// File descriptors or sockets ran out; the concurrency is too high
    /// for the host's limits.
    ResourceExhausted,
    Other,
}

impl FailureKind {
    pub const ALL: [FailureKind; 6] = [
        FailureKind::Timeout,
        FailureKind::ConnectionRefused,
        FailureKind::HostUnreachable,
        FailureKind::TlsError,
        FailureKind::ResourceExhausted,
        FailureKind::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Timeout => "timeout",
            FailureKind::ConnectionRefused => "refused",
            FailureKind::HostUnreachable => "unreachable",
            FailureKind::TlsError => "tls",
            FailureKind::ResourceExhausted => "exhausted",
            FailureKind::Other => "other",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailureKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        FailureKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lower)
            .ok_or_else(|| {
                let known: Vec<&str> = FailureKind::ALL.iter().map(FailureKind::as_str).collect();
                format!("unknown failure kind '{s}', expected one of: {}", known.join(", "))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Good,
    Bad {
        /// Status code when the target answered with something unexpected.
        status: Option<u16>,
        failure: Option<FailureKind>,
    },
}

impl ProbeOutcome {
    pub fn status(status: u16) -> Self {
        Self::Bad {
            status: Some(status),
            failure: None,
        }
    }

    pub fn failed(kind: FailureKind) -> Self {
        Self::Bad {
            status: None,
            failure: Some(kind),
        }
    }

    pub fn is_good(&self) -> bool {
        matches!(self, Self::Good)
    }

    pub fn failure(&self) -> Option<FailureKind> {
        match self {
            Self::Good => None,
            Self::Bad { failure, .. } => *failure,
        }
    }
}

/// Performs one reachability check of an address.
///
/// Implementations must release every per-attempt resource before
/// returning, whatever the outcome.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, addr: Ipv4Addr) -> ProbeOutcome;
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
