//! Snapshot storage abstraction.
//!
//! Snapshots are one file per device per day, named `{device}-{YYYYMMDD}`,
//! under a per-segment directory. Three backends implement the same
//! [`SnapshotStore`] contract; which one a process uses is decided once at
//! startup by [`BackupServers::open_store`](crate::config::BackupServers):
//! the designated primary backup host writes its local filesystem, every
//! other host reaches the primary over FTP or SFTP.

use std::future::Future;

use chrono::NaiveDate;

use crate::config::{BackupServers, TransferProtocol};
use crate::error::Result;

use super::ftp::FtpStore;
use super::local::LocalStore;
use super::sftp::SftpStore;

/// A dated capture of one device's full configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Device the configuration belongs to.
    pub device: String,

    /// Capture day (snapshots have day granularity).
    pub date: NaiveDate,

    /// Configuration lines.
    pub lines: Vec<String>,
}

impl Snapshot {
    /// Build a snapshot from newline-joined file content.
    pub fn from_content(device: impl Into<String>, date: NaiveDate, content: &str) -> Self {
        Self {
            device: device.into(),
            date,
            lines: content.lines().map(str::to_string).collect(),
        }
    }

    /// Newline-joined file content.
    pub fn content(&self) -> String {
        self.lines.join("\n")
    }
}

/// Which snapshot of a device to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSelector {
    /// The most recent snapshot.
    Latest,
    /// The snapshot taken on a specific day.
    On(NaiveDate),
}

/// Snapshot filename for a device and day: `{device}-{YYYYMMDD}`.
pub fn snapshot_filename(device: &str, date: NaiveDate) -> String {
    format!("{}-{}", device, date.format("%Y%m%d"))
}

/// Split a snapshot filename into device and date.
///
/// Returns `None` for names that do not end in `-YYYYMMDD`.
pub(crate) fn split_snapshot_name(filename: &str) -> Option<(&str, NaiveDate)> {
    let (device, date) = filename.rsplit_once('-')?;
    if device.is_empty() || date.len() != 8 || !date.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let date = NaiveDate::parse_from_str(date, "%Y%m%d").ok()?;
    Some((device, date))
}

/// Filter raw directory names down to snapshots and order them by date
/// descending.
///
/// The device match is a case-insensitive name comparison; the sort is
/// stable, so snapshots sharing a date keep their listing order.
pub(crate) fn filter_and_order(names: Vec<String>, device: Option<&str>) -> Vec<String> {
    let mut snapshots: Vec<(String, NaiveDate)> = names
        .into_iter()
        .filter_map(|name| {
            let (file_device, date) = split_snapshot_name(&name)?;
            if let Some(device) = device {
                if !file_device.eq_ignore_ascii_case(device) {
                    return None;
                }
            }
            Some((name, date))
        })
        .collect();

    snapshots.sort_by(|a, b| b.1.cmp(&a.1));
    snapshots.into_iter().map(|(name, _)| name).collect()
}

/// Storage backend for configuration snapshots.
///
/// `list` returns snapshot filenames ordered newest-first; `fetch` and
/// `write` move raw file content. `read` is derived from the two and maps
/// "no snapshot for this device" to `Ok(None)` rather than an error.
pub trait SnapshotStore: Send + Sync {
    /// List snapshot filenames in a segment, newest first, optionally
    /// restricted to one device.
    fn list(
        &self,
        segment: &str,
        device: Option<&str>,
    ) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Fetch one snapshot file's content.
    fn fetch(&self, segment: &str, filename: &str) -> impl Future<Output = Result<String>> + Send;

    /// Write one snapshot file, creating the segment directory as needed
    /// and replacing any existing file of the same name.
    fn write(
        &self,
        segment: &str,
        filename: &str,
        content: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Read a device's snapshot per the selector.
    ///
    /// `Ok(None)` means the device has no prior backup.
    fn read(
        &self,
        segment: &str,
        device: &str,
        selector: DateSelector,
    ) -> impl Future<Output = Result<Option<Snapshot>>> + Send
    where
        Self: Sized,
    {
        async move {
            let names = self.list(segment, Some(device)).await?;
            let chosen = match selector {
                DateSelector::Latest => names.first().cloned(),
                DateSelector::On(date) => names
                    .iter()
                    .find(|n| split_snapshot_name(n).is_some_and(|(_, d)| d == date))
                    .cloned(),
            };
            let Some(filename) = chosen else {
                return Ok(None);
            };
            // The name came out of filter_and_order, so it parses.
            let Some((_, date)) = split_snapshot_name(&filename) else {
                return Ok(None);
            };
            let content = self.fetch(segment, &filename).await?;
            Ok(Some(Snapshot::from_content(device, date, &content)))
        }
    }
}

/// The storage variant a process is bound to.
pub enum BackupStore {
    /// Local filesystem on the primary backup host.
    Local(LocalStore),
    /// FTP towards the primary.
    Ftp(FtpStore),
    /// SFTP towards the primary.
    Sftp(SftpStore),
}

impl BackupServers {
    /// Bind to the storage variant for this host.
    ///
    /// Running on the designated primary backup host means local
    /// filesystem; anywhere else means the configured transfer protocol.
    pub fn open_store(&self) -> BackupStore {
        let hostname = gethostname::gethostname().to_string_lossy().into_owned();
        self.open_store_as(&hostname)
    }

    /// Bind to the storage variant as if running on `hostname`.
    pub fn open_store_as(&self, hostname: &str) -> BackupStore {
        if hostname == self.primary.host {
            BackupStore::Local(LocalStore::new(self.primary.local_root.clone()))
        } else {
            match self.transfer.protocol {
                TransferProtocol::Ftp => BackupStore::Ftp(FtpStore::new(self.transfer.clone())),
                TransferProtocol::Sftp => BackupStore::Sftp(SftpStore::new(self.transfer.clone())),
            }
        }
    }
}

impl SnapshotStore for BackupStore {
    async fn list(&self, segment: &str, device: Option<&str>) -> Result<Vec<String>> {
        match self {
            Self::Local(store) => store.list(segment, device).await,
            Self::Ftp(store) => store.list(segment, device).await,
            Self::Sftp(store) => store.list(segment, device).await,
        }
    }

    async fn fetch(&self, segment: &str, filename: &str) -> Result<String> {
        match self {
            Self::Local(store) => store.fetch(segment, filename).await,
            Self::Ftp(store) => store.fetch(segment, filename).await,
            Self::Sftp(store) => store.fetch(segment, filename).await,
        }
    }

    async fn write(&self, segment: &str, filename: &str, content: &str) -> Result<()> {
        match self {
            Self::Local(store) => store.write(segment, filename, content).await,
            Self::Ftp(store) => store.write(segment, filename, content).await,
            Self::Sftp(store) => store.write(segment, filename, content).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PrimaryServer, TransferServer};
    use crate::inventory::Credential;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_snapshot_filename() {
        assert_eq!(snapshot_filename("R1", date(2025, 3, 7)), "R1-20250307");
    }

    #[test]
    fn test_split_snapshot_name() {
        let (device, parsed) = split_snapshot_name("CORE-SW1-20250307").unwrap();
        assert_eq!(device, "CORE-SW1");
        assert_eq!(parsed, date(2025, 3, 7));

        assert!(split_snapshot_name("README").is_none());
        assert!(split_snapshot_name("R1-2025030").is_none());
        assert!(split_snapshot_name("R1-2025030a").is_none());
        assert!(split_snapshot_name("-20250307").is_none());
    }

    #[test]
    fn test_filter_and_order_newest_first() {
        let names = vec![
            "R1-20250101".to_string(),
            "R1-20250301".to_string(),
            "R2-20250401".to_string(),
            "notes.txt".to_string(),
            "R1-20250201".to_string(),
        ];
        let ordered = filter_and_order(names, Some("R1"));
        assert_eq!(ordered, vec!["R1-20250301", "R1-20250201", "R1-20250101"]);
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let names = vec!["r1-20250101".to_string(), "R1-20250201".to_string()];
        let ordered = filter_and_order(names, Some("R1"));
        assert_eq!(ordered.len(), 2);
        assert_eq!(ordered[0], "R1-20250201");
    }

    #[test]
    fn test_same_date_keeps_listing_order() {
        let names = vec![
            "r1-20250101".to_string(),
            "R1-20250101".to_string(),
            "R1-20250102".to_string(),
        ];
        let ordered = filter_and_order(names, Some("R1"));
        assert_eq!(ordered, vec!["R1-20250102", "r1-20250101", "R1-20250101"]);
    }

    #[test]
    fn test_filter_without_device_keeps_all_snapshots() {
        let names = vec![
            "R1-20250101".to_string(),
            "R2-20250301".to_string(),
            "junk".to_string(),
        ];
        let ordered = filter_and_order(names, None);
        assert_eq!(ordered, vec!["R2-20250301", "R1-20250101"]);
    }

    #[test]
    fn test_store_binding_by_hostname() {
        let servers = BackupServers {
            primary: PrimaryServer {
                host: "backup01".to_string(),
                local_root: "/var/backups/fleet".into(),
            },
            transfer: TransferServer {
                protocol: TransferProtocol::Sftp,
                host: "backup01".to_string(),
                port: None,
                root: "/var/backups/fleet".to_string(),
                credential: Credential::new("backup", "pw"),
            },
        };

        assert!(matches!(
            servers.open_store_as("backup01"),
            BackupStore::Local(_)
        ));
        assert!(matches!(
            servers.open_store_as("mgmt02"),
            BackupStore::Sftp(_)
        ));
    }
}
