//! Local-filesystem snapshot store.
//!
//! Used when the process runs on the designated primary backup host.

use std::path::PathBuf;

use log::debug;

use crate::error::{Result, StorageError};

use super::store::{SnapshotStore, filter_and_order};

/// Snapshot store rooted at a directory on the local filesystem.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Create a store rooted at `root`; segments are subdirectories.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn segment_dir(&self, segment: &str) -> PathBuf {
        self.root.join(segment)
    }
}

impl SnapshotStore for LocalStore {
    async fn list(&self, segment: &str, device: Option<&str>) -> Result<Vec<String>> {
        let dir = self.segment_dir(segment);
        let mut names = Vec::new();

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            // A segment nobody has backed up yet is an empty listing,
            // not an error.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(StorageError::Io(e).into()),
        };

        while let Some(entry) = entries.next_entry().await.map_err(StorageError::Io)? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        // Directory order is arbitrary; date ties need a stable base.
        names.sort();

        Ok(filter_and_order(names, device))
    }

    async fn fetch(&self, segment: &str, filename: &str) -> Result<String> {
        let path = self.segment_dir(segment).join(filename);
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| StorageError::Io(e).into())
    }

    async fn write(&self, segment: &str, filename: &str, content: &str) -> Result<()> {
        let dir = self.segment_dir(segment);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(StorageError::Io)?;

        let path = dir.join(filename);
        debug!("writing snapshot {}", path.display());
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| StorageError::Io(e).into())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::backup::store::{DateSelector, snapshot_filename};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_write_list_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());

        store
            .write("core", &snapshot_filename("R1", date(2025, 3, 1)), "hostname r1\n!")
            .await
            .unwrap();
        store
            .write("core", &snapshot_filename("R1", date(2025, 3, 5)), "hostname r1-new\n!")
            .await
            .unwrap();
        store
            .write("core", &snapshot_filename("R2", date(2025, 3, 2)), "hostname r2")
            .await
            .unwrap();

        let listed = store.list("core", Some("R1")).await.unwrap();
        assert_eq!(listed, vec!["R1-20250305", "R1-20250301"]);

        let latest = store
            .read("core", "R1", DateSelector::Latest)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.date, date(2025, 3, 5));
        assert_eq!(latest.lines, vec!["hostname r1-new", "!"]);

        let dated = store
            .read("core", "R1", DateSelector::On(date(2025, 3, 1)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(dated.lines[0], "hostname r1");
    }

    #[tokio::test]
    async fn test_missing_segment_lists_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());

        assert!(store.list("nowhere", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_prior_backup_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());

        let read = store.read("core", "R9", DateSelector::Latest).await.unwrap();
        assert!(read.is_none());
    }

    #[tokio::test]
    async fn test_write_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        let name = snapshot_filename("R1", date(2025, 3, 1));

        store.write("core", &name, "old").await.unwrap();
        store.write("core", &name, "new").await.unwrap();

        assert_eq!(store.fetch("core", &name).await.unwrap(), "new");
        assert_eq!(store.list("core", Some("R1")).await.unwrap().len(), 1);
    }
}
