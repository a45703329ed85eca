//! # Good-Address Ledger
//!
//! The ledger is a single line of IPv4 addresses joined by `|`, with no
//! trailing delimiter. A missing file is an empty ledger.
//!
//! Writers go through [`Ledger::add`], which holds the ledger's lock for the
//! whole read, membership check and append. The file work runs on the
//! blocking pool and owns the lock guard, so the lock is only released once
//! the write has finished, even if the caller is cancelled meanwhile.

use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

pub const RECORD_DELIMITER: char = '|';

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("failed to {action} ledger {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("ledger {} holds an invalid address '{entry}'", path.display())]
    Corrupt { path: PathBuf, entry: String },
}

impl LedgerError {
    fn io<'a>(action: &'static str, path: &'a Path) -> impl FnOnce(io::Error) -> Self + 'a {
        move |source| Self::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

pub struct Ledger {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl Ledger {
    /// Opens the ledger for appending, creating an empty file when needed.
    ///
    /// Existing content is never truncated. Failing here means the run has
    /// nowhere to put its results, so callers treat it as fatal.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let path: PathBuf = path.into();
        let file: File = open_for_append(&path)?;
        let mut contents = String::new();
        (&file)
            .read_to_string(&mut contents)
            .map_err(LedgerError::io("read", &path))?;
        let existing = parse_record(&path, &contents)?;
        debug!("Opened ledger {} with {} addresses", path.display(), existing.len());

        Ok(Self {
            path,
            lock: Arc::new(Mutex::new(())),
        })
    }

    pub async fn load(&self) -> Result<BTreeSet<Ipv4Addr>, LedgerError> {
        let _guard = self.lock.lock().await;
        read_record(&self.path)
    }

    pub async fn contains(&self, addr: Ipv4Addr) -> Result<bool, LedgerError> {
        Ok(self.load().await?.contains(&addr))
    }

    /// Appends `addr` unless it is already recorded.
    ///
    /// Returns `true` when the address was written.
    pub async fn add(&self, addr: Ipv4Addr) -> Result<bool, LedgerError> {
        let guard = self.lock.clone().lock_owned().await;
        let path: PathBuf = self.path.clone();

        tokio::task::spawn_blocking(move || {
            let _guard = guard;
            append_unique(&path, addr)
        })
        .await
        .map_err(|e| LedgerError::io("append to", &self.path)(io::Error::other(e)))?
    }
}

/// Read, check and append. Callers hold the ledger lock.
fn append_unique(path: &Path, addr: Ipv4Addr) -> Result<bool, LedgerError> {
    let mut file: File = open_for_append(path)?;
    let mut contents = String::new();
    (&file)
        .read_to_string(&mut contents)
        .map_err(LedgerError::io("read", path))?;

    let mut records = parse_record(path, &contents)?;
    if records.contains(&addr) {
        return Ok(false);
    }

    if !is_single_line(&contents) {
        // Appending would land on a later line, so the record is rewritten
        // as one line instead.
        records.insert(addr);
        drop(file);
        write_record(path, &records)?;
        return Ok(true);
    }

    let entry = if records.is_empty() {
        addr.to_string()
    } else {
        format!("{RECORD_DELIMITER}{addr}")
    };
    file.write_all(entry.as_bytes())
        .and_then(|()| file.sync_data())
        .map_err(LedgerError::io("append to", path))?;

    Ok(true)
}

fn is_single_line(contents: &str) -> bool {
    !contents.contains('\n') && contents.trim_end().len() == contents.len()
}

fn open_for_append(path: &Path) -> Result<File, LedgerError> {
    OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .open(path)
        .map_err(LedgerError::io("open", path))
}

/// Reads a record file. A missing file is an empty set.
pub fn read_record(path: &Path) -> Result<BTreeSet<Ipv4Addr>, LedgerError> {
    match fs::read_to_string(path) {
        Ok(contents) => parse_record(path, &contents),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeSet::new()),
        Err(e) => Err(LedgerError::io("read", path)(e)),
    }
}

/// Replaces `path` with the `|`-joined record of `addrs`.
///
/// The record is written next to the target and renamed over it, so readers
/// see either the old or the new record.
pub fn write_record<'a, I>(path: &Path, addrs: I) -> Result<(), LedgerError>
where
    I: IntoIterator<Item = &'a Ipv4Addr>,
{
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let record = format_record(addrs);
    let mut file = File::create(&tmp_path).map_err(LedgerError::io("create", &tmp_path))?;
    file.write_all(record.as_bytes())
        .and_then(|()| file.sync_all())
        .map_err(LedgerError::io("write", &tmp_path))?;
    fs::rename(&tmp_path, path).map_err(LedgerError::io("replace", path))
}

pub fn format_record<'a, I>(addrs: I) -> String
where
    I: IntoIterator<Item = &'a Ipv4Addr>,
{
    addrs
        .into_iter()
        .map(ToString::to_string)
        .collect::<Vec<String>>()
        .join(&RECORD_DELIMITER.to_string())
}

/// Parses a record. Hand-edited files may spread it over several lines;
/// blank lines are ignored and blank content is an empty set.
pub fn parse_record(path: &Path, contents: &str) -> Result<BTreeSet<Ipv4Addr>, LedgerError> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .flat_map(|line| line.split(RECORD_DELIMITER))
        .map(|entry| {
            entry.trim().parse::<Ipv4Addr>().map_err(|_| LedgerError::Corrupt {
                path: path.to_path_buf(),
                entry: entry.to_string(),
            })
        })
        .collect()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn ip(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("good_ips");
        assert!(read_record(&path).unwrap().is_empty());

        let ledger = Ledger::open(&path).unwrap();
        assert!(ledger.load().await.unwrap().is_empty());
        assert!(!ledger.contains(ip("1.2.3.4")).await.unwrap());
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("good_ips");
        let ledger = Ledger::open(&path).unwrap();

        assert!(ledger.add(ip("1.2.3.4")).await.unwrap());
        let once = fs::read_to_string(&path).unwrap();
        assert!(!ledger.add(ip("1.2.3.4")).await.unwrap());
        let twice = fs::read_to_string(&path).unwrap();

        assert_eq!(once, "1.2.3.4");
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn test_record_format_has_no_trailing_delimiter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("good_ips");
        let ledger = Ledger::open(&path).unwrap();

        ledger.add(ip("5.6.7.8")).await.unwrap();
        ledger.add(ip("1.2.3.4")).await.unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "5.6.7.8|1.2.3.4");
        assert!(ledger.contains(ip("1.2.3.4")).await.unwrap());
    }

    #[tokio::test]
    async fn test_open_never_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("good_ips");
        fs::write(&path, "9.9.9.9|8.8.8.8").unwrap();

        let ledger = Ledger::open(&path).unwrap();
        ledger.add(ip("7.7.7.7")).await.unwrap();

        let expected: BTreeSet<Ipv4Addr> =
            [ip("9.9.9.9"), ip("8.8.8.8"), ip("7.7.7.7")].into_iter().collect();
        assert_eq!(ledger.load().await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_trailing_newline_is_normalised() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("good_ips");
        fs::write(&path, "9.9.9.9\n").unwrap();

        let ledger = Ledger::open(&path).unwrap();
        ledger.add(ip("1.1.1.1")).await.unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "1.1.1.1|9.9.9.9");
    }

    #[tokio::test]
    async fn test_multi_line_ledger_is_rewritten_as_one_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("good_ips");
        fs::write(&path, "9.9.9.9\n8.8.8.8").unwrap();

        let ledger = Ledger::open(&path).unwrap();
        assert!(ledger.add(ip("1.1.1.1")).await.unwrap());
        assert!(!ledger.add(ip("1.1.1.1")).await.unwrap());
        assert!(!ledger.add(ip("8.8.8.8")).await.unwrap());

        assert_eq!(fs::read_to_string(&path).unwrap(), "1.1.1.1|8.8.8.8|9.9.9.9");
        let expected: BTreeSet<Ipv4Addr> =
            [ip("1.1.1.1"), ip("8.8.8.8"), ip("9.9.9.9")].into_iter().collect();
        assert_eq!(ledger.load().await.unwrap(), expected);
    }

    #[test]
    fn test_parse_reads_every_line() {
        let set = parse_record(Path::new("good_ips"), "1.1.1.1|2.2.2.2\n\n3.3.3.3\n").unwrap();
        assert_eq!(set.len(), 3);
        assert!(set.contains(&ip("3.3.3.3")));
    }

    #[test]
    fn test_round_trip_ignores_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let forward = dir.path().join("forward");
        let backward = dir.path().join("backward");

        write_record(&forward, &[ip("1.2.3.4"), ip("5.6.7.8")]).unwrap();
        write_record(&backward, &[ip("5.6.7.8"), ip("1.2.3.4")]).unwrap();

        let expected: BTreeSet<Ipv4Addr> = [ip("1.2.3.4"), ip("5.6.7.8")].into_iter().collect();
        assert_eq!(read_record(&forward).unwrap(), expected);
        assert_eq!(read_record(&backward).unwrap(), expected);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = parse_record(Path::new("good_ips"), "1.2.3.4|nope").unwrap_err();
        assert!(matches!(err, LedgerError::Corrupt { ref entry, .. } if entry == "nope"));
    }

    #[test]
    fn test_format_record() {
        let set: BTreeSet<Ipv4Addr> = [ip("2.2.2.2"), ip("1.1.1.1")].into_iter().collect();
        assert_eq!(format_record(&set), "1.1.1.1|2.2.2.2");
        assert_eq!(format_record(&BTreeSet::new()), "");
    }

    #[test]
    fn test_open_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Ledger::open(dir.path()).err().unwrap();
        assert!(matches!(err, LedgerError::Io { action: "open", .. }));
    }

    #[tokio::test]
    async fn test_cancelled_add_leaves_record_consistent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("good_ips");
        let ledger = Arc::new(Ledger::open(&path).unwrap());

        let first = {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.add(ip("1.1.1.1")).await })
        };
        tokio::task::yield_now().await;
        first.abort();

        assert!(ledger.add(ip("2.2.2.2")).await.unwrap());
        let raw = fs::read_to_string(&path).unwrap();
        let set = read_record(&path).unwrap();
        assert!(set.contains(&ip("2.2.2.2")));
        assert_eq!(raw.split(RECORD_DELIMITER).count(), set.len());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_keep_distinct_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("good_ips");
        let ledger = Arc::new(Ledger::open(&path).unwrap());

        let mut handles = Vec::new();
        for i in 0..400u32 {
            let ledger = ledger.clone();
            // 40 distinct addresses, each added ten times
            let addr = Ipv4Addr::new(10, 0, 0, (i % 40) as u8);
            handles.push(tokio::spawn(async move { ledger.add(addr).await }));
        }
        let mut written = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() {
                written += 1;
            }
        }

        assert_eq!(written, 40);
        let raw = fs::read_to_string(&path).unwrap();
        assert_eq!(raw.split(RECORD_DELIMITER).count(), 40);
        assert_eq!(read_record(&path).unwrap().len(), 40);
    }
}
