//! Reachability pre-check.
//!
//! Devices fail in two very different ways: a dead host and a live host
//! that refuses our credentials. The probe distinguishes the first before
//! any session is attempted, so unreachable devices never produce
//! authentication noise.

use std::future::Future;
use std::process::Stdio;
use std::time::Duration;

use log::{debug, warn};
use tokio::net::TcpStream;
use tokio::process::Command;

use crate::config::ConnectOptions;

/// Pre-flight reachability check for one address.
pub trait ReachabilityProbe: Send + Sync {
    /// Whether the address answers before any session is attempted.
    fn is_reachable(&self, address: &str) -> impl Future<Output = bool> + Send;
}

/// ICMP probe via the system `ping`, optionally followed by a TCP connect
/// to the management port.
pub struct PingProbe {
    attempts: u32,
    tcp_port: Option<u16>,
    tcp_timeout: Duration,
}

impl PingProbe {
    /// Create a probe with the given number of ICMP attempts.
    ///
    /// `attempts == 0` skips the ICMP stage (useful where raw sockets are
    /// unavailable and the TCP check is authoritative).
    pub fn new(attempts: u32) -> Self {
        Self {
            attempts,
            tcp_port: None,
            tcp_timeout: Duration::from_secs(5),
        }
    }

    /// Also require a TCP connect to `port` to pass.
    pub fn with_tcp_port(mut self, port: u16) -> Self {
        self.tcp_port = Some(port);
        self
    }

    /// Build a probe from connection options.
    pub fn from_options(options: &ConnectOptions) -> Self {
        let probe = Self::new(options.ping_attempts);
        if options.tcp_probe {
            probe.with_tcp_port(options.port)
        } else {
            probe
        }
    }

    async fn ping(&self, address: &str) -> bool {
        let count = self.attempts.to_string();

        #[cfg(target_os = "windows")]
        let args = ["-n", count.as_str(), address];
        #[cfg(not(target_os = "windows"))]
        let args = ["-c", count.as_str(), "-n", address];

        let status = Command::new("ping")
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) => status.success(),
            Err(e) => {
                warn!("ping check failed for {}: {}", address, e);
                false
            }
        }
    }

    async fn tcp_check(&self, address: &str, port: u16) -> bool {
        let connect = TcpStream::connect((address, port));
        match tokio::time::timeout(self.tcp_timeout, connect).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!("tcp probe to {}:{} refused: {}", address, port, e);
                false
            }
            Err(_) => {
                debug!("tcp probe to {}:{} timed out", address, port);
                false
            }
        }
    }
}

impl ReachabilityProbe for PingProbe {
    async fn is_reachable(&self, address: &str) -> bool {
        if self.attempts > 0 && !self.ping(address).await {
            return false;
        }
        match self.tcp_port {
            Some(port) => self.tcp_check(address, port).await,
            None => true,
        }
    }
}
