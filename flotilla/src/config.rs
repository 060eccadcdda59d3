//! Process configuration.
//!
//! One immutable [`FleetConfig`] value is deserialized at startup and passed
//! into the constructors that need it. There is no global configuration
//! object; components keep only the slices they were given.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigError, Result};
use crate::inventory::Credential;

/// Top-level configuration for a flotilla process.
#[derive(Debug, Clone, Deserialize)]
pub struct FleetConfig {
    /// Default and fallback credentials for device authentication.
    pub credentials: CredentialSet,

    /// Connection and reachability-probe options.
    #[serde(default)]
    pub connect: ConnectOptions,

    /// Dispatch concurrency limits.
    #[serde(default)]
    pub dispatch: DispatchLimits,

    /// Seconds to wait after leaving config mode before asking the device
    /// to persist its configuration.
    #[serde(default = "default_settle_delay")]
    pub settle_delay_secs: u64,

    /// Regex patterns stripped from both sides before computing a diff.
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Backup server topology.
    pub backup: BackupServers,
}

impl FleetConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        let config: Self = serde_yaml::from_str(&text).map_err(ConfigError::Parse)?;
        Ok(config)
    }

    /// Settle delay as a [`Duration`].
    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }
}

/// Device credentials: one default plus an ordered fallback list.
///
/// The fallback list is shared process-wide and read-only after load.
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialSet {
    /// Credential tried first on every device without an explicit override.
    pub default: Credential,

    /// Ordered alternates tried after an authentication failure.
    #[serde(default)]
    pub fallback: Vec<Credential>,
}

/// Options for session establishment and the reachability pre-check.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectOptions {
    /// SSH management port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Connect/auth/read timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub timeout_secs: u64,

    /// ICMP probe attempts before declaring a device unreachable.
    #[serde(default = "default_ping_attempts")]
    pub ping_attempts: u32,

    /// Also require a TCP connect to the management port to pass the
    /// pre-check.
    #[serde(default)]
    pub tcp_probe: bool,
}

impl ConnectOptions {
    /// Connect timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            port: default_port(),
            timeout_secs: default_connect_timeout(),
            ping_attempts: default_ping_attempts(),
            tcp_probe: false,
        }
    }
}

/// Concurrency limits for one dispatch call.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchLimits {
    /// Maximum in-flight device workers per dispatch call.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    /// Optional deadline for the whole dispatch call, in seconds.
    /// Workers still running at the deadline are abandoned and their
    /// devices reported as failed.
    #[serde(default)]
    pub overall_timeout_secs: Option<u64>,
}

impl DispatchLimits {
    /// Overall deadline as a [`Duration`], if configured.
    pub fn overall_timeout(&self) -> Option<Duration> {
        self.overall_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for DispatchLimits {
    fn default() -> Self {
        Self {
            max_in_flight: default_max_in_flight(),
            overall_timeout_secs: None,
        }
    }
}

/// Backup server topology.
///
/// The process binds to exactly one storage variant at startup: the local
/// filesystem when running on the designated primary backup host, otherwise
/// a transfer protocol towards that host.
#[derive(Debug, Clone, Deserialize)]
pub struct BackupServers {
    /// The designated primary backup host.
    pub primary: PrimaryServer,

    /// How secondary hosts reach the primary's snapshot tree.
    pub transfer: TransferServer,
}

/// The host that owns the snapshot tree on its local filesystem.
#[derive(Debug, Clone, Deserialize)]
pub struct PrimaryServer {
    /// Hostname of the primary backup host.
    pub host: String,

    /// Root of the per-segment snapshot tree on the primary.
    pub local_root: PathBuf,
}

/// Remote access to the primary's snapshot tree.
#[derive(Debug, Clone, Deserialize)]
pub struct TransferServer {
    /// Transfer protocol used from secondary hosts.
    pub protocol: TransferProtocol,

    /// Host to connect to (normally the primary backup host).
    pub host: String,

    /// Port for the transfer protocol.
    #[serde(default = "default_transfer_port")]
    pub port: Option<u16>,

    /// Remote root of the snapshot tree.
    pub root: String,

    /// Account on the backup host.
    pub credential: Credential,
}

/// Transfer protocols supported for remote snapshot storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferProtocol {
    /// Plain FTP.
    Ftp,
    /// SFTP over SSH.
    Sftp,
}

fn default_port() -> u16 {
    22
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_ping_attempts() -> u32 {
    3
}

fn default_settle_delay() -> u64 {
    10
}

fn default_max_in_flight() -> usize {
    20
}

fn default_transfer_port() -> Option<u16> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
credentials:
  default: { username: netops, password: hunter2 }
  fallback:
    - { username: legacy, password: old-secret }
    - { username: rescue, password: break-glass }
connect:
  timeout_secs: 15
  tcp_probe: true
dispatch:
  max_in_flight: 8
  overall_timeout_secs: 600
ignore_patterns:
  - "ntp clock-period"
backup:
  primary:
    host: backup01
    local_root: /var/backups/fleet
  transfer:
    protocol: sftp
    host: backup01
    root: /var/backups/fleet
    credential: { username: backup, password: transfer-secret }
"#;

    #[test]
    fn test_parse_full_config() {
        let config: FleetConfig = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(config.credentials.default.username, "netops");
        assert_eq!(config.credentials.fallback.len(), 2);
        assert_eq!(config.connect.timeout(), Duration::from_secs(15));
        assert!(config.connect.tcp_probe);
        assert_eq!(config.connect.port, 22);
        assert_eq!(config.dispatch.max_in_flight, 8);
        assert_eq!(
            config.dispatch.overall_timeout(),
            Some(Duration::from_secs(600))
        );
        assert_eq!(config.settle_delay(), Duration::from_secs(10));
        assert_eq!(config.backup.transfer.protocol, TransferProtocol::Sftp);
        assert_eq!(config.backup.primary.host, "backup01");
    }

    #[test]
    fn test_limit_defaults() {
        let limits = DispatchLimits::default();
        assert_eq!(limits.max_in_flight, 20);
        assert!(limits.overall_timeout().is_none());

        let connect = ConnectOptions::default();
        assert_eq!(connect.port, 22);
        assert_eq!(connect.ping_attempts, 3);
        assert!(!connect.tcp_probe);
    }
}
