//! Idempotent backup-on-change orchestration.
//!
//! A backup attempt walks a fixed path: fetch the running config, fetch
//! the latest snapshot, classify (no prior backup / identical / differs),
//! then write or skip. At most one snapshot is written per device per
//! calendar day unless an overwrite is explicitly requested; a fleet
//! polled several times a day must not accumulate daily duplicates.

use std::fmt;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use futures_util::future::join_all;
use indexmap::IndexMap;
use log::{info, warn};

use crate::connector::{ConnectOutcome, Connector};
use crate::error::{BackupError, Result};
use crate::inventory::{Device, DeviceFilter, Inventory};
use crate::platform::PlatformCatalog;
use crate::transport::Session;

use super::differ::{DiffResult, check_identity, diff_configs};
use super::store::{DateSelector, SnapshotStore, snapshot_filename};

/// Terminal code of one backup attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupOutcome {
    /// No prior snapshot existed; written unconditionally.
    FirstBackup,

    /// Current config equals the latest snapshot; nothing written.
    Unchanged,

    /// Config changed but today's snapshot already exists; skipped.
    SameDaySkipped,

    /// Config changed, today's snapshot replaced on request.
    SameDayOverwritten,

    /// Config changed since an older snapshot; new dated snapshot written.
    NewVersion,
}

impl BackupOutcome {
    /// Whether the attempt wrote a snapshot.
    pub fn wrote(&self) -> bool {
        matches!(
            self,
            Self::FirstBackup | Self::SameDayOverwritten | Self::NewVersion
        )
    }
}

impl fmt::Display for BackupOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Self::FirstBackup => "first backup",
            Self::Unchanged => "unchanged",
            Self::SameDaySkipped => "same-day, no overwrite",
            Self::SameDayOverwritten => "same-day, overwrite requested",
            Self::NewVersion => "new version written",
        };
        f.write_str(code)
    }
}

/// Composes dispatch, storage, and diffing into backup semantics.
pub struct BackupOrchestrator<C: Connector, S: SnapshotStore> {
    inventory: Arc<Inventory>,
    catalog: Arc<PlatformCatalog>,
    connector: Arc<C>,
    store: S,
    ignore_patterns: Vec<String>,
}

impl<C: Connector, S: SnapshotStore> BackupOrchestrator<C, S> {
    /// Create an orchestrator bound to one storage variant.
    ///
    /// `ignore_patterns` are applied when diffing for drift reports (they
    /// do not affect the backup identity check, which uses the platform's
    /// volatile-line patterns).
    pub fn new(
        inventory: Arc<Inventory>,
        catalog: Arc<PlatformCatalog>,
        connector: Arc<C>,
        store: S,
        ignore_patterns: Vec<String>,
    ) -> Self {
        Self {
            inventory,
            catalog,
            connector,
            store,
            ignore_patterns,
        }
    }

    /// The bound snapshot store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Back up one device into `segment`, dated today.
    pub async fn backup(
        &self,
        segment: &str,
        device: &str,
        overwrite: bool,
    ) -> Result<BackupOutcome> {
        self.backup_as_of(segment, device, overwrite, Local::now().date_naive())
            .await
    }

    /// Back up one device as of an explicit calendar day.
    pub async fn backup_as_of(
        &self,
        segment: &str,
        device_name: &str,
        overwrite: bool,
        today: NaiveDate,
    ) -> Result<BackupOutcome> {
        let device = self.inventory.resolve(device_name)?;
        let platform = self.catalog.get(&device.platform)?;

        let current = self.fetch_current(device).await?;
        let latest = self
            .store
            .read(segment, device_name, DateSelector::Latest)
            .await?;

        let outcome = match latest {
            None => {
                self.write_snapshot(segment, device_name, today, &current)
                    .await?;
                BackupOutcome::FirstBackup
            }
            Some(snapshot) => {
                if check_identity(&current, &snapshot.lines, &platform.volatile_patterns)? {
                    BackupOutcome::Unchanged
                } else if snapshot.date == today {
                    if overwrite {
                        self.write_snapshot(segment, device_name, today, &current)
                            .await?;
                        BackupOutcome::SameDayOverwritten
                    } else {
                        BackupOutcome::SameDaySkipped
                    }
                } else {
                    self.write_snapshot(segment, device_name, today, &current)
                        .await?;
                    BackupOutcome::NewVersion
                }
            }
        };

        info!("backup of {}: {}", device_name, outcome);
        Ok(outcome)
    }

    /// Back up every device in a segment, isolating per-device failures.
    pub async fn backup_segment(
        &self,
        segment: &str,
        overwrite: bool,
    ) -> IndexMap<String, std::result::Result<BackupOutcome, String>> {
        let names: Vec<String> = self
            .inventory
            .select(&DeviceFilter::new().segment(segment))
            .into_iter()
            .map(|d| d.name.clone())
            .collect();

        let attempts = names.into_iter().map(|name| async move {
            let outcome = self
                .backup(segment, &name, overwrite)
                .await
                .map_err(|e| e.to_string());
            if let Err(ref e) = outcome {
                warn!("backup of {} failed: {}", name, e);
            }
            (name, outcome)
        });

        join_all(attempts).await.into_iter().collect()
    }

    /// Diff a device's running config against its latest snapshot.
    ///
    /// With no prior snapshot, everything current counts as added.
    pub async fn diff(&self, device_name: &str) -> Result<DiffResult> {
        let device = self.inventory.resolve(device_name)?;
        let current = self.fetch_current(device).await?;
        let latest = self
            .store
            .read(&device.segment, device_name, DateSelector::Latest)
            .await?;

        match latest {
            Some(snapshot) => diff_configs(&current, &snapshot.lines, &self.ignore_patterns),
            None => Ok(DiffResult::all_added(&current)),
        }
    }

    /// List snapshot filenames, newest first.
    pub async fn list_snapshots(
        &self,
        segment: &str,
        device: Option<&str>,
    ) -> Result<Vec<String>> {
        self.store.list(segment, device).await
    }

    /// Fetch and post-process one device's running configuration.
    async fn fetch_current(&self, device: &Device) -> Result<Vec<String>> {
        let platform = self.catalog.get(&device.platform)?;
        let command = platform.render_dialect("current_config", None)?;

        let mut session = match self.connector.connect(device).await {
            ConnectOutcome::Connected(session) => session,
            ConnectOutcome::Unreachable => {
                return Err(BackupError::Unreachable {
                    device: device.name.clone(),
                }
                .into());
            }
            ConnectOutcome::AuthFailed => {
                return Err(BackupError::AuthFailed {
                    device: device.name.clone(),
                }
                .into());
            }
            ConnectOutcome::Failed(e) => {
                return Err(BackupError::FetchFailed {
                    device: device.name.clone(),
                    message: e.to_string(),
                }
                .into());
            }
        };

        let result = session.run(&command).await;
        if let Err(e) = Session::close(session).await {
            warn!("session close failed for {}: {}", device.name, e);
        }
        let output = result?;

        let lines: Vec<String> = output.lines().map(str::to_string).collect();
        Ok(truncate_preamble(
            lines,
            platform.config_preamble_marker.as_deref(),
        ))
    }

    async fn write_snapshot(
        &self,
        segment: &str,
        device: &str,
        date: NaiveDate,
        lines: &[String],
    ) -> Result<()> {
        let filename = snapshot_filename(device, date);
        self.store
            .write(segment, &filename, &lines.join("\n"))
            .await?;
        info!("snapshot saved: {} -> {}/{}", device, segment, filename);
        Ok(())
    }
}

/// Drop console chatter before the marker line; the marker itself is
/// blanked, not configuration.
fn truncate_preamble(lines: Vec<String>, marker: Option<&str>) -> Vec<String> {
    let Some(marker) = marker else {
        return lines;
    };
    match lines.iter().position(|l| l.starts_with(marker)) {
        Some(pos) => {
            let mut kept = lines[pos..].to_vec();
            kept[0] = String::new();
            kept
        }
        None => lines,
    }
}
