//! # Round-Robin Address Walk
//!
//! Interleaves the hosts of several [`AddressRange`]s so that every block is
//! visited evenly instead of draining one block before starting the next.
//!
//! The walker keeps an ordered list of live cursors and an index into it.
//! When a cursor runs dry it is removed in place, so the index already points
//! at the next block and the relative order of the survivors is unchanged.

use std::net::Ipv4Addr;

use tracing::debug;

use crate::network::range::{AddressRange, HostCursor};

pub struct RoundRobin {
    cursors: Vec<HostCursor>,
    index: usize,
    reverse: bool,
}

impl RoundRobin {
    /// Builds the walk. Hosts of a block nested inside a larger (or an
    /// earlier identical) block are left to that block, so no address is
    /// produced twice. Edge hosts the outer block does not walk, such as its
    /// network address given as a `/32`, stay with the nested block.
    pub fn new(ranges: &[AddressRange], reverse: bool) -> Self {
        let cursors: Vec<HostCursor> = unclaimed_hosts(ranges)
            .into_iter()
            .map(|(first, last)| HostCursor::new(first, last))
            .collect();

        Self {
            cursors,
            index: 0,
            reverse,
        }
    }

    /// Number of blocks that still have hosts left.
    pub fn active(&self) -> usize {
        self.cursors.len()
    }

    pub fn remaining(&self) -> u64 {
        self.cursors.iter().map(HostCursor::remaining).sum()
    }
}

impl Iterator for RoundRobin {
    type Item = Ipv4Addr;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.cursors.is_empty() {
            if self.index >= self.cursors.len() {
                self.index = 0;
            }

            let cursor = &mut self.cursors[self.index];
            let next = if self.reverse {
                cursor.next_back()
            } else {
                cursor.next()
            };

            match next {
                Some(addr) => {
                    self.index += 1;
                    return Some(addr);
                }
                None => {
                    self.cursors.remove(self.index);
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.remaining()).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

/// Host spans of every block minus the hosts already walked by a larger
/// block, in input order. Fully shadowed blocks disappear.
fn unclaimed_hosts(ranges: &[AddressRange]) -> Vec<(u32, u32)> {
    let mut by_size: Vec<usize> = (0..ranges.len()).collect();
    by_size.sort_by_key(|&idx| ranges[idx].network().prefix());

    let mut claimed: Vec<(u32, u32)> = Vec::new();
    let mut spans: Vec<Vec<(u32, u32)>> = vec![Vec::new(); ranges.len()];

    for idx in by_size {
        let mut free: Vec<(u32, u32)> = vec![ranges[idx].bounds()];
        for &taken in &claimed {
            free = free.into_iter().flat_map(|span| subtract(span, taken)).collect();
        }

        if free.is_empty() {
            debug!("Skipping {}, already covered by another block", ranges[idx]);
        }
        claimed.extend(free.iter().copied());
        spans[idx] = free;
    }

    spans.into_iter().flatten().collect()
}

/// `span` without the addresses of `cut`, as zero, one or two spans.
fn subtract(span: (u32, u32), cut: (u32, u32)) -> Vec<(u32, u32)> {
    let (first, last) = span;
    let (cut_first, cut_last) = cut;
    if cut_last < first || cut_first > last {
        return vec![span];
    }

    let mut rest = Vec::with_capacity(2);
    if first < cut_first {
        rest.push((first, cut_first - 1));
    }
    if cut_last < last {
        rest.push((cut_last + 1, last));
    }
    rest
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
