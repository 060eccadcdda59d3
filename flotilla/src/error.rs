//! Error types for flotilla.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Main error type for flotilla operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Configuration loading errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Inventory lookup and loading errors
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),

    /// Platform/vendor definition errors
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// Snapshot storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Backup orchestration errors
    #[error("Backup error: {0}")]
    Backup(#[from] BackupError),
}

/// Transport layer errors (SSH connection, authentication, prompt reads).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Prompt not seen within the read deadline
    #[error("Prompt not found within {0:?}")]
    PromptTimeout(Duration),

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config file: {0}")]
    Io(#[from] io::Error),

    /// Config file could not be parsed
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Inventory errors (device catalog loading and lookups).
#[derive(Error, Debug)]
pub enum InventoryError {
    /// Device name not present in the catalog
    #[error("Device '{name}' not found in inventory")]
    NotFound { name: String },

    /// Catalog file could not be read
    #[error("Failed to read inventory file: {0}")]
    Io(#[from] io::Error),

    /// Catalog file could not be parsed
    #[error("Failed to parse inventory: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Platform/vendor definition errors.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// Platform tag not present in the catalog
    #[error("Unknown platform '{name}'")]
    Unknown { name: String },

    /// Invalid platform definition
    #[error("Invalid platform definition: {message}")]
    InvalidDefinition { message: String },

    /// No command dialect registered for (command id, platform)
    #[error("No '{id}' command registered for platform '{platform}'")]
    UnknownCommand { platform: String, id: String },
}

/// Snapshot storage errors (local filesystem, FTP, SFTP backends).
#[derive(Error, Debug)]
pub enum StorageError {
    /// Local filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// FTP backend error
    #[error("FTP error: {0}")]
    Ftp(#[from] suppaftp::FtpError),

    /// SFTP backend error
    #[error("SFTP error: {0}")]
    Sftp(#[from] russh_sftp::client::error::Error),

    /// Backend could not be reached at all
    #[error("Storage backend unavailable: {message}")]
    Unavailable { message: String },
}

/// Backup orchestration errors (per-device; never abort a batch).
#[derive(Error, Debug)]
pub enum BackupError {
    /// Device failed the reachability pre-check
    #[error("Device '{device}' is unreachable")]
    Unreachable { device: String },

    /// All credentials exhausted against the device
    #[error("Authentication failed for device '{device}'")]
    AuthFailed { device: String },

    /// Could not fetch the running configuration
    #[error("Failed to fetch configuration from '{device}': {message}")]
    FetchFailed { device: String, message: String },
}

/// Result type alias using flotilla's Error.
pub type Result<T> = std::result::Result<T, Error>;
