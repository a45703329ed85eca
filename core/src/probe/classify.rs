//! Failure classification.
//!
//! Most probe failures are expected: the bulk of any netblock does not serve
//! the target, so timeouts, refusals and TLS mismatches are counted and
//! otherwise ignored. The [`FailureTable`] decides which kinds reach the
//! operator and which OS error codes mean the process ran out of sockets.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Display;
use std::io;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error, warn};

use super::FailureKind;

#[cfg(unix)]
const DEFAULT_EXHAUSTION_CODES: &[i32] = &[
    24, // EMFILE
    23, // ENFILE
];
#[cfg(windows)]
const DEFAULT_EXHAUSTION_CODES: &[i32] = &[
    10024, // WSAEMFILE
    10055, // WSAENOBUFS
];
#[cfg(not(any(unix, windows)))]
const DEFAULT_EXHAUSTION_CODES: &[i32] = &[];

const EXHAUSTION_WARNING: &str = "Too many open files. Raise the open file limit \
    (ulimit -n) or lower --concurrency.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnostic {
    Silent,
    Warn,
    Error,
}

pub struct FailureTable {
    policy: BTreeMap<FailureKind, Diagnostic>,
    exhaustion_codes: Vec<i32>,
    exhaustion_reported: AtomicBool,
}

impl Default for FailureTable {
    fn default() -> Self {
        let policy = BTreeMap::from([
            (FailureKind::Timeout, Diagnostic::Silent),
            (FailureKind::ConnectionRefused, Diagnostic::Silent),
            (FailureKind::HostUnreachable, Diagnostic::Silent),
            (FailureKind::TlsError, Diagnostic::Silent),
            (FailureKind::ResourceExhausted, Diagnostic::Warn),
            (FailureKind::Other, Diagnostic::Error),
        ]);

        Self {
            policy,
            exhaustion_codes: DEFAULT_EXHAUSTION_CODES.to_vec(),
            exhaustion_reported: AtomicBool::new(false),
        }
    }
}

impl FailureTable {
    pub fn with_policy(mut self, kind: FailureKind, diagnostic: Diagnostic) -> Self {
        self.policy.insert(kind, diagnostic);
        self
    }

    /// Makes every kind in `kinds` at least a warning.
    pub fn reporting<I>(self, kinds: I) -> Self
    where
        I: IntoIterator<Item = FailureKind>,
    {
        kinds.into_iter().fold(self, |table, kind| match table.diagnostic(kind) {
            Diagnostic::Silent => table.with_policy(kind, Diagnostic::Warn),
            _ => table,
        })
    }

    pub fn with_exhaustion_codes(mut self, codes: Vec<i32>) -> Self {
        self.exhaustion_codes = codes;
        self
    }

    pub fn diagnostic(&self, kind: FailureKind) -> Diagnostic {
        self.policy.get(&kind).copied().unwrap_or(Diagnostic::Error)
    }

    pub fn is_exhaustion_code(&self, code: i32) -> bool {
        self.exhaustion_codes.contains(&code)
    }

    /// Emits the diagnostic for one failed probe, if the policy wants one.
    ///
    /// The exhaustion warning is printed once per table. Returns whether
    /// anything was logged above debug level.
    pub fn report(&self, addr: Ipv4Addr, kind: FailureKind, err: &dyn Display) -> bool {
        if kind == FailureKind::ResourceExhausted
            && self.exhaustion_reported.swap(true, Ordering::Relaxed)
        {
            debug!("{addr}: {kind}: {err}");
            return false;
        }

        match (self.diagnostic(kind), kind) {
            (Diagnostic::Silent, _) => {
                debug!("{addr}: {kind}: {err}");
                return false;
            }
            (Diagnostic::Warn, FailureKind::ResourceExhausted) => warn!("{EXHAUSTION_WARNING}"),
            (Diagnostic::Warn, _) => warn!("{addr}: {kind}: {err}"),
            (Diagnostic::Error, FailureKind::ResourceExhausted) => error!("{EXHAUSTION_WARNING}"),
            (Diagnostic::Error, _) => error!("Unexpected failure probing {addr}: {err}"),
        }
        true
    }

    /// Classifies a failed request.
    pub fn classify(&self, err: &reqwest::Error) -> FailureKind {
        if let Some(kind) = self.classify_chain(err) {
            return kind;
        }
        if err.is_timeout() {
            return FailureKind::Timeout;
        }
        if err.is_connect() {
            return FailureKind::ConnectionRefused;
        }
        FailureKind::Other
    }

    /// Walks the source chain looking for an I/O or TLS cause.
    fn classify_chain(&self, err: &(dyn Error + 'static)) -> Option<FailureKind> {
        let io_kind = causes(err).find_map(|cause| {
            cause
                .downcast_ref::<io::Error>()
                .and_then(|io_err| self.classify_io(io_err))
        });
        if io_kind.is_some() {
            return io_kind;
        }

        // The outermost message embeds the request URL, so only the causes
        // below it are inspected.
        causes(err)
            .skip(1)
            .any(|cause| looks_like_tls(cause))
            .then_some(FailureKind::TlsError)
    }

    fn classify_io(&self, err: &io::Error) -> Option<FailureKind> {
        if let Some(code) = err.raw_os_error() {
            if self.is_exhaustion_code(code) {
                return Some(FailureKind::ResourceExhausted);
            }
        }

        match err.kind() {
            io::ErrorKind::TimedOut => Some(FailureKind::Timeout),
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => Some(FailureKind::ConnectionRefused),
            io::ErrorKind::HostUnreachable
            | io::ErrorKind::NetworkUnreachable
            | io::ErrorKind::AddrNotAvailable => Some(FailureKind::HostUnreachable),
            // rustls reports handshake and certificate failures this way
            io::ErrorKind::InvalidData => Some(FailureKind::TlsError),
            _ => None,
        }
    }
}

fn causes<'a>(err: &'a (dyn Error + 'static)) -> impl Iterator<Item = &'a (dyn Error + 'static)> {
    std::iter::successors(Some(err), |cause| (*cause).source())
}

fn looks_like_tls(err: &(dyn Error + 'static)) -> bool {
    let msg = err.to_string().to_ascii_lowercase();
    msg.contains("certificate") || msg.contains("tls") || msg.contains("handshake")
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
