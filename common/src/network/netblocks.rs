//! # Netblocks Source
//!
//! Loads the list of CIDR blocks to walk. The text format is deliberately
//! loose so that the output of an SPF/TXT lookup can be pasted in as-is:
//!
//! * entries are separated by whitespace, commas or newlines;
//! * `#` starts a comment that runs to the end of the line;
//! * an `ip4:` prefix is stripped, `ip6:` entries are skipped.
//!
//! Any other malformed entry fails the whole load.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::network::range::{AddressRange, RangeError};

const SPF_IPV4_PREFIX: &str = "ip4:";
const SPF_IPV6_PREFIX: &str = "ip6:";

pub fn parse_netblocks(text: &str) -> Result<Vec<AddressRange>, RangeError> {
    let mut ranges: Vec<AddressRange> = Vec::new();

    for line in text.lines() {
        let line = line.split_once('#').map_or(line, |(content, _)| content);

        for entry in line.split(|c: char| c.is_whitespace() || c == ',') {
            if entry.is_empty() {
                continue;
            }
            if entry.starts_with(SPF_IPV6_PREFIX) {
                debug!("Skipping IPv6 block {entry}");
                continue;
            }
            let entry = entry.strip_prefix(SPF_IPV4_PREFIX).unwrap_or(entry);
            ranges.push(entry.parse::<AddressRange>()?);
        }
    }

    Ok(ranges)
}

pub fn load_netblocks(path: &Path) -> Result<Vec<AddressRange>, RangeError> {
    let text = fs::read_to_string(path).map_err(|source| RangeError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    parse_netblocks(&text)
}

/// Parses blocks given one by one, e.g. from repeated command-line flags.
pub fn parse_blocks<S: AsRef<str>>(blocks: &[S]) -> Result<Vec<AddressRange>, RangeError> {
    blocks.iter().map(|b| b.as_ref().parse::<AddressRange>()).collect()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
