//! Sinks for confirmed-good addresses.
//!
//! A normal scan records into the [`Ledger`]; a verification run collects
//! into an in-memory [`Accumulator`] instead, because its input already
//! comes from the ledger.

use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::ledger::{Ledger, LedgerError};

#[async_trait]
pub trait Recorder: Send + Sync {
    /// Stores `addr`. Returns `true` if it was not stored before.
    async fn record(&self, addr: Ipv4Addr) -> Result<bool, LedgerError>;
}

#[async_trait]
impl Recorder for Ledger {
    async fn record(&self, addr: Ipv4Addr) -> Result<bool, LedgerError> {
        self.add(addr).await
    }
}

#[derive(Default)]
pub struct Accumulator {
    addrs: Mutex<BTreeSet<Ipv4Addr>>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    fn addrs(&self) -> MutexGuard<'_, BTreeSet<Ipv4Addr>> {
        self.addrs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> BTreeSet<Ipv4Addr> {
        self.addrs().clone()
    }

    pub fn len(&self) -> usize {
        self.addrs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Recorder for Accumulator {
    async fn record(&self, addr: Ipv4Addr) -> Result<bool, LedgerError> {
        Ok(self.addrs().insert(addr))
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
