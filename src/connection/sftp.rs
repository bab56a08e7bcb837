//! File transfer onto the device over SSH/SFTP (russh).
//!
//! The SSH login uses the same resolved credentials as NX-API. Checksums of
//! files already on the device are read through NX-API.

use super::nxapi::NxApiClient;
use super::{remote_name, ConnectionError, ConnectionResult, Credentials, FileTransfer};
use async_trait::async_trait;
use russh::client::{Handle, Handler};
use russh::keys::key::PublicKey;
use russh_sftp::client::SftpSession;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Default SSH port on the device
pub const DEFAULT_SSH_PORT: u16 = 22;

/// SSH session settings for file transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SftpSettings {
    /// SSH port on the device
    pub port: u16,
    /// Connect and inactivity timeout in seconds
    pub timeout: u64,
    /// Accept hosts missing from known_hosts (a changed key is always refused)
    pub accept_new_host_keys: bool,
}

impl Default for SftpSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_SSH_PORT,
            timeout: super::nxapi::NXAPI_DEFAULT_TIMEOUT,
            accept_new_host_keys: true,
        }
    }
}

/// Host key policy for the transfer session.
struct DeviceHostKeys {
    host: String,
    port: u16,
    accept_new: bool,
}

#[async_trait]
impl Handler for DeviceHostKeys {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        match russh::keys::check_known_hosts(&self.host, self.port, server_public_key) {
            Ok(true) => {
                debug!(host = %self.host, "host key verified against known_hosts");
                Ok(true)
            }
            Ok(false) if self.accept_new => {
                warn!(host = %self.host, "host not in known_hosts, accepting");
                Ok(true)
            }
            Ok(false) => {
                warn!(host = %self.host, "host not in known_hosts, rejecting");
                Ok(false)
            }
            Err(e) => {
                warn!(host = %self.host, error = %e, "host key verification failed");
                Ok(false)
            }
        }
    }
}

/// Uploads files to `<file system><name>` over SFTP; checksums come from
/// NX-API.
#[derive(Clone)]
pub struct SftpFileTransfer {
    client: Arc<NxApiClient>,
    host: String,
    credentials: Credentials,
    file_system: String,
    settings: SftpSettings,
}

impl std::fmt::Debug for SftpFileTransfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SftpFileTransfer")
            .field("host", &self.host)
            .field("credentials", &self.credentials)
            .field("file_system", &self.file_system)
            .field("settings", &self.settings)
            .finish()
    }
}

impl SftpFileTransfer {
    pub fn new(
        client: Arc<NxApiClient>,
        host: String,
        credentials: Credentials,
        file_system: String,
        settings: SftpSettings,
    ) -> Self {
        Self {
            client,
            host,
            credentials,
            file_system,
            settings,
        }
    }

    /// Destination path on the device for a file name.
    pub fn remote_path(&self, name: &str) -> String {
        format!("{}{}", self.file_system, name)
    }

    async fn open_session(&self) -> ConnectionResult<Handle<DeviceHostKeys>> {
        let timeout = Duration::from_secs(self.settings.timeout);
        let addr = (self.host.as_str(), self.settings.port);

        let socket = tokio::time::timeout(timeout, tokio::net::TcpStream::connect(addr))
            .await
            .map_err(|_| ConnectionError::Timeout(self.settings.timeout))?
            .map_err(|e| {
                ConnectionError::TransferFailed(format!(
                    "failed to reach {}:{}: {}",
                    self.host, self.settings.port, e
                ))
            })?;

        let config = russh::client::Config {
            inactivity_timeout: Some(timeout),
            ..Default::default()
        };
        let handler = DeviceHostKeys {
            host: self.host.clone(),
            port: self.settings.port,
            accept_new: self.settings.accept_new_host_keys,
        };

        let mut session = russh::client::connect_stream(Arc::new(config), socket, handler)
            .await
            .map_err(|e| {
                ConnectionError::TransferFailed(format!(
                    "SSH handshake with {} failed: {}",
                    self.host, e
                ))
            })?;

        let authenticated = session
            .authenticate_password(&self.credentials.username, &self.credentials.password)
            .await
            .map_err(|e| {
                ConnectionError::AuthenticationFailed(format!(
                    "SSH password authentication on {} failed: {}",
                    self.host, e
                ))
            })?;
        if !authenticated {
            return Err(ConnectionError::AuthenticationFailed(format!(
                "SSH on {} rejected user '{}'",
                self.host, self.credentials.username
            )));
        }

        debug!(host = %self.host, port = self.settings.port, "SSH session established");
        Ok(session)
    }

    async fn open_sftp(handle: &Handle<DeviceHostKeys>) -> ConnectionResult<SftpSession> {
        let channel = handle.channel_open_session().await.map_err(|e| {
            ConnectionError::TransferFailed(format!("Failed to open channel: {}", e))
        })?;

        channel.request_subsystem(true, "sftp").await.map_err(|e| {
            ConnectionError::TransferFailed(format!("Failed to request SFTP subsystem: {}", e))
        })?;

        SftpSession::new(channel.into_stream()).await.map_err(|e| {
            ConnectionError::TransferFailed(format!("Failed to create SFTP session: {}", e))
        })
    }
}

#[async_trait]
impl FileTransfer for SftpFileTransfer {
    async fn remote_checksum(&self, remote_path: &str) -> ConnectionResult<Option<String>> {
        self.client.file_checksum(remote_path).await
    }

    async fn transfer(&self, local_path: &Path) -> ConnectionResult<String> {
        let content = tokio::fs::read(local_path).await.map_err(|e| {
            ConnectionError::TransferFailed(format!(
                "Failed to read local file {}: {}",
                local_path.display(),
                e
            ))
        })?;
        let name = remote_name(local_path)?;
        let destination = self.remote_path(&name);

        let handle = self.open_session().await?;
        let sftp = Self::open_sftp(&handle).await?;

        let mut remote_file = sftp.create(&destination).await.map_err(|e| {
            ConnectionError::TransferFailed(format!(
                "Failed to create remote file {}: {}",
                destination, e
            ))
        })?;
        remote_file.write_all(&content).await.map_err(|e| {
            ConnectionError::TransferFailed(format!("Failed to write to remote file: {}", e))
        })?;
        remote_file.shutdown().await.map_err(|e| {
            ConnectionError::TransferFailed(format!("Failed to close remote file: {}", e))
        })?;
        drop(sftp);

        if let Err(e) = handle
            .disconnect(russh::Disconnect::ByApplication, "", "English")
            .await
        {
            debug!(host = %self.host, error = %e, "SSH disconnect after transfer failed");
        }

        info!(host = %self.host, file = %destination, bytes = content.len(), "transferred file to device");
        Ok(name)
    }
}
