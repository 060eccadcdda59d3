//! # Flotilla
//!
//! Async fleet command dispatch and configuration backup engine for
//! network devices.
//!
//! Flotilla fans show and configuration commands out across a
//! heterogeneous fleet of routers and switches over SSH, isolating every
//! device's failures, and keeps dated configuration snapshots with
//! backup-on-change semantics across local, FTP, and SFTP storage.
//!
//! ## Features
//!
//! - Async SSH sessions via russh with prompt-pattern detection
//! - Reachability gating and multi-credential auth fallback
//! - Bounded-concurrency dispatch with a three-way result partition
//!   (succeeded / failed / unreachable)
//! - Multi-vendor command dialects as data (Cisco IOS, Huawei VRP)
//! - Idempotent daily configuration backups over three storage backends
//! - Structured per-device logging through an injectable sink
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use flotilla::{
//!     CommandSet, DispatchMode, DispatchEngine, FleetConfig, Inventory,
//!     PingProbe, PlatformCatalog, SessionConnector, SshDialer,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), flotilla::Error> {
//!     let config = FleetConfig::load("flotilla.yaml")?;
//!     let inventory = Arc::new(Inventory::load(
//!         "inventory.yaml",
//!         &config.credentials.default,
//!     )?);
//!     let catalog = Arc::new(PlatformCatalog::builtin());
//!
//!     let dialer = SshDialer::new(config.connect.clone(), catalog.clone())?;
//!     let probe = PingProbe::from_options(&config.connect);
//!     let connector = Arc::new(SessionConnector::new(
//!         dialer,
//!         probe,
//!         config.credentials.fallback.clone(),
//!     ));
//!
//!     let engine = DispatchEngine::new(
//!         inventory,
//!         catalog,
//!         connector,
//!         config.dispatch.clone(),
//!         config.settle_delay(),
//!     );
//!
//!     let result = engine
//!         .dispatch(["R1", "R2"], CommandSet::single("show version"), DispatchMode::Show)
//!         .await;
//!     println!("{}", result.summary());
//!     Ok(())
//! }
//! ```

pub mod backup;
pub mod config;
pub mod connector;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod inventory;
pub mod platform;
pub mod probe;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types for convenience
pub use backup::{
    BackupOrchestrator, BackupOutcome, BackupStore, DiffResult, Snapshot, SnapshotStore,
    diff_configs,
};
pub use config::{BackupServers, ConnectOptions, DispatchLimits, FleetConfig};
pub use connector::{ConnectOutcome, Connector, SessionConnector};
pub use dispatch::{
    CommandSet, DispatchEngine, DispatchMode, DispatchResult, LogEntry, LogSink,
};
pub use error::Error;
pub use executor::{CommandExecutor, ConfigReport};
pub use inventory::{Credential, Device, DeviceFilter, DeviceLevel, Inventory};
pub use platform::{PlatformCatalog, PlatformDefinition};
pub use probe::{PingProbe, ReachabilityProbe};
pub use transport::{Dialer, Session, SshDialer};
