//! SFTP snapshot store over russh.
//!
//! Used from secondary hosts when the primary exposes its snapshot tree
//! over SSH. A connection is opened per call and disconnected before
//! returning, no pooled state survives between devices.

use std::sync::Arc;

use log::debug;
use russh::Disconnect;
use russh::client;
use russh_sftp::client::SftpSession;
use secrecy::ExposeSecret;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::config::TransferServer;
use crate::error::{Result, StorageError, TransportError};
use crate::transport::AcceptingHandler;

use super::store::{SnapshotStore, filter_and_order};

/// Snapshot store talking SFTP to the primary backup host.
pub struct SftpStore {
    server: TransferServer,
}

impl SftpStore {
    /// Create a store for the given transfer endpoint.
    pub fn new(server: TransferServer) -> Self {
        Self { server }
    }

    fn segment_path(&self, segment: &str) -> String {
        format!("{}/{}", self.server.root.trim_end_matches('/'), segment)
    }

    async fn open(&self) -> Result<(client::Handle<AcceptingHandler>, SftpSession)> {
        let config = Arc::new(client::Config::default());
        let port = self.server.port.unwrap_or(22);

        let mut handle = client::connect(
            config,
            (self.server.host.as_str(), port),
            AcceptingHandler,
        )
        .await
        .map_err(TransportError::Ssh)?;

        let auth = handle
            .authenticate_password(
                &self.server.credential.username,
                self.server.credential.password.expose_secret(),
            )
            .await
            .map_err(TransportError::Ssh)?;
        if !auth.success() {
            return Err(TransportError::AuthenticationFailed {
                user: self.server.credential.username.clone(),
            }
            .into());
        }

        let channel = handle
            .channel_open_session()
            .await
            .map_err(TransportError::Ssh)?;
        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(TransportError::Ssh)?;

        let sftp = SftpSession::new(channel.into_stream())
            .await
            .map_err(StorageError::Sftp)?;

        Ok((handle, sftp))
    }

    async fn disconnect(handle: client::Handle<AcceptingHandler>) {
        let _ = handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await;
    }
}

impl SnapshotStore for SftpStore {
    async fn list(&self, segment: &str, device: Option<&str>) -> Result<Vec<String>> {
        let (handle, sftp) = self.open().await?;
        let dir = self.segment_path(segment);

        let mut names = Vec::new();
        // A segment nobody has backed up yet lists empty.
        if let Ok(entries) = sftp.read_dir(&dir).await {
            for entry in entries {
                names.push(entry.file_name());
            }
        }
        Self::disconnect(handle).await;

        names.sort();
        Ok(filter_and_order(names, device))
    }

    async fn fetch(&self, segment: &str, filename: &str) -> Result<String> {
        let (handle, sftp) = self.open().await?;
        let path = format!("{}/{}", self.segment_path(segment), filename);

        let result = async {
            let mut file = sftp.open(&path).await.map_err(StorageError::Sftp)?;
            let mut content = String::new();
            file.read_to_string(&mut content)
                .await
                .map_err(StorageError::Io)?;
            Ok::<_, crate::error::Error>(content)
        }
        .await;

        Self::disconnect(handle).await;
        result
    }

    async fn write(&self, segment: &str, filename: &str, content: &str) -> Result<()> {
        let (handle, sftp) = self.open().await?;
        let dir = self.segment_path(segment);
        let path = format!("{}/{}", dir, filename);
        debug!("uploading snapshot {}", path);

        let result = async {
            // Already-existing directory is fine.
            let _ = sftp.create_dir(&dir).await;
            let mut file = sftp.create(&path).await.map_err(StorageError::Sftp)?;
            file.write_all(content.as_bytes())
                .await
                .map_err(StorageError::Io)?;
            file.shutdown().await.map_err(StorageError::Io)?;
            Ok::<_, crate::error::Error>(())
        }
        .await;

        Self::disconnect(handle).await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransferProtocol;
    use crate::inventory::Credential;

    #[test]
    fn test_segment_path_normalizes_root() {
        let store = SftpStore::new(TransferServer {
            protocol: TransferProtocol::Sftp,
            host: "backup01".to_string(),
            port: None,
            root: "/var/backups/fleet/".to_string(),
            credential: Credential::new("backup", "pw"),
        });
        assert_eq!(store.segment_path("core"), "/var/backups/fleet/core");
    }
}
