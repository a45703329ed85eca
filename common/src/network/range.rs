//! # Address Range Model
//!
//! An [`AddressRange`] is one CIDR block loaded from the netblocks source.
//! Its hosts are walked with a [`HostCursor`], which follows the usual host
//! enumeration rules: the network and broadcast addresses are skipped,
//! except for `/31` and `/32` blocks where every address is a host.

use std::fmt;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::str::FromStr;

use ipnetwork::Ipv4Network;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RangeError {
    #[error("invalid CIDR block '{input}': {reason}")]
    InvalidCidr { input: String, reason: String },
    #[error("failed to read netblocks from {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RangeError {
    fn invalid(input: &str, reason: impl fmt::Display) -> Self {
        Self::InvalidCidr {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressRange {
    network: Ipv4Network,
}

impl AddressRange {
    pub fn new(addr: Ipv4Addr, prefix: u8) -> Result<Self, RangeError> {
        let network = Ipv4Network::new(addr, prefix)
            .map_err(|e| RangeError::invalid(&format!("{addr}/{prefix}"), e))?;
        if network.network() != addr {
            return Err(RangeError::invalid(
                &format!("{addr}/{prefix}"),
                "host bits set",
            ));
        }
        Ok(Self { network })
    }

    pub fn network(&self) -> Ipv4Network {
        self.network
    }

    /// First and last host, inclusive, as integers.
    pub fn bounds(&self) -> (u32, u32) {
        let network: u32 = u32::from(self.network.network());
        let broadcast: u32 = u32::from(self.network.broadcast());
        match self.network.prefix() {
            31 | 32 => (network, broadcast),
            _ => (network + 1, broadcast - 1),
        }
    }

    pub fn hosts(&self) -> HostCursor {
        let (first, last) = self.bounds();
        HostCursor::new(first, last)
    }

    /// Number of host addresses, never zero.
    pub fn len(&self) -> u64 {
        let (first, last) = self.bounds();
        u64::from(last - first) + 1
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        self.network.contains(addr)
    }
}

impl FromStr for AddressRange {
    type Err = RangeError;

    /// Parses `a.b.c.d/n`. A bare address is a `/32` block.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (ip_str, prefix_str) = s.split_once('/').unwrap_or((s, "32"));

        let addr = ip_str
            .parse::<Ipv4Addr>()
            .map_err(|e| RangeError::invalid(s, format!("bad address '{ip_str}': {e}")))?;

        let prefix = prefix_str
            .parse::<u8>()
            .map_err(|e| RangeError::invalid(s, format!("bad prefix '{prefix_str}': {e}")))?;

        if prefix > 32 {
            return Err(RangeError::invalid(s, format!("prefix {prefix} > 32")));
        }

        Self::new(addr, prefix).map_err(|_| RangeError::invalid(s, "host bits set"))
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network.network(), self.network.prefix())
    }
}

/// Forward cursor over the hosts of one range.
///
/// Walking from the back (`next_back`) gives the descending order.
#[derive(Debug, Clone)]
pub struct HostCursor {
    front: u64,
    end: u64,
}

impl HostCursor {
    pub(crate) fn new(first: u32, last: u32) -> Self {
        Self {
            front: u64::from(first),
            end: u64::from(last) + 1,
        }
    }

    pub fn remaining(&self) -> u64 {
        self.end.saturating_sub(self.front)
    }
}

impl Iterator for HostCursor {
    type Item = Ipv4Addr;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.end {
            return None;
        }
        let addr = Ipv4Addr::from(self.front as u32);
        self.front += 1;
        Some(addr)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.remaining()).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl DoubleEndedIterator for HostCursor {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.end {
            return None;
        }
        self.end -= 1;
        Some(Ipv4Addr::from(self.end as u32))
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
