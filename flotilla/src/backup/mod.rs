//! Configuration snapshot storage, diffing, and backup orchestration.

pub mod differ;
pub mod ftp;
pub mod local;
pub mod orchestrator;
pub mod sftp;
pub mod store;

pub use differ::{ChangedLine, DiffResult, check_identity, diff_configs};
pub use ftp::FtpStore;
pub use local::LocalStore;
pub use orchestrator::{BackupOrchestrator, BackupOutcome};
pub use sftp::SftpStore;
pub use store::{BackupStore, DateSelector, Snapshot, SnapshotStore, snapshot_filename};
