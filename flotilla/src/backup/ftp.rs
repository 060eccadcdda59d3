//! FTP snapshot store.
//!
//! Used from secondary hosts when the primary exposes its snapshot tree
//! over plain FTP. The client is synchronous, so every operation runs on
//! the blocking pool; a connection is opened per call and closed before
//! returning, no pooled state survives between devices.

use std::io::Cursor;

use log::debug;
use secrecy::ExposeSecret;
use suppaftp::FtpStream;

use crate::config::TransferServer;
use crate::error::{Result, StorageError};

use super::store::{SnapshotStore, filter_and_order};

/// Snapshot store talking FTP to the primary backup host.
pub struct FtpStore {
    server: TransferServer,
}

impl FtpStore {
    /// Create a store for the given transfer endpoint.
    pub fn new(server: TransferServer) -> Self {
        Self { server }
    }

    fn segment_path(server: &TransferServer, segment: &str) -> String {
        format!("{}/{}", server.root.trim_end_matches('/'), segment)
    }

    fn open(server: &TransferServer) -> std::result::Result<FtpStream, StorageError> {
        let port = server.port.unwrap_or(21);
        let mut ftp = FtpStream::connect((server.host.as_str(), port))?;
        ftp.login(
            server.credential.username.as_str(),
            server.credential.password.expose_secret(),
        )?;
        Ok(ftp)
    }

    async fn run_blocking<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(TransferServer) -> std::result::Result<T, StorageError> + Send + 'static,
    {
        let server = self.server.clone();
        let result = tokio::task::spawn_blocking(move || op(server))
            .await
            .map_err(|e| StorageError::Unavailable {
                message: format!("ftp task failed: {e}"),
            })?;
        result.map_err(Into::into)
    }
}

impl SnapshotStore for FtpStore {
    async fn list(&self, segment: &str, device: Option<&str>) -> Result<Vec<String>> {
        let segment = segment.to_string();
        let device = device.map(str::to_string);

        let names = self
            .run_blocking(move |server| {
                let mut ftp = Self::open(&server)?;
                let dir = Self::segment_path(&server, &segment);
                // A segment nobody has backed up yet lists empty.
                let names = ftp.nlst(Some(&dir)).unwrap_or_default();
                ftp.quit().ok();
                Ok(names)
            })
            .await?;

        // Servers may return full paths; keep the final component.
        let mut names: Vec<String> = names
            .into_iter()
            .map(|n| n.rsplit('/').next().unwrap_or(&n).to_string())
            .collect();
        names.sort();

        Ok(filter_and_order(names, device.as_deref()))
    }

    async fn fetch(&self, segment: &str, filename: &str) -> Result<String> {
        let segment = segment.to_string();
        let filename = filename.to_string();

        self.run_blocking(move |server| {
            let mut ftp = Self::open(&server)?;
            let path = format!("{}/{}", Self::segment_path(&server, &segment), filename);
            let buffer = ftp.retr_as_buffer(&path)?;
            ftp.quit().ok();
            Ok(String::from_utf8_lossy(&buffer.into_inner()).into_owned())
        })
        .await
    }

    async fn write(&self, segment: &str, filename: &str, content: &str) -> Result<()> {
        let segment = segment.to_string();
        let filename = filename.to_string();
        let content = content.to_string();

        self.run_blocking(move |server| {
            let mut ftp = Self::open(&server)?;
            let dir = Self::segment_path(&server, &segment);
            // Already-existing directory is fine.
            ftp.mkdir(&dir).ok();
            let path = format!("{}/{}", dir, filename);
            debug!("uploading snapshot {}", path);
            ftp.put_file(&path, &mut Cursor::new(content.into_bytes()))?;
            ftp.quit().ok();
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransferProtocol;
    use crate::inventory::Credential;

    #[test]
    fn test_segment_path_normalizes_root() {
        let server = TransferServer {
            protocol: TransferProtocol::Ftp,
            host: "backup01".to_string(),
            port: None,
            root: "/var/backups/fleet/".to_string(),
            credential: Credential::new("backup", "pw"),
        };
        assert_eq!(
            FtpStore::segment_path(&server, "core"),
            "/var/backups/fleet/core"
        );
    }
}
