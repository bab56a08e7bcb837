//! Connection layer for NX-OS device communication.
//!
//! Modules never talk HTTP or SSH directly. They go through the narrow
//! collaborator traits defined here:
//!
//! - [`DeviceConnector`] opens a [`DeviceSession`] for a target and credentials
//! - [`NxosDevice`] reads state and pushes configuration
//! - [`FileTransfer`] fingerprints and copies files onto the device
//! - [`CredentialSource`] resolves usernames and passwords
//!
//! The default implementations speak NX-API ([`nxapi`]) and upload over
//! SSH/SFTP ([`sftp`]). Tests substitute in-memory mocks.
//!
//! # Example
//!
//! ```rust,ignore
//! use nexible::connection::{Credentials, DeviceConnector, DeviceTarget, Transport};
//! use nexible::connection::nxapi::NxApiConnector;
//!
//! let connector = NxApiConnector::default();
//! let target = DeviceTarget::new("n9k-1.lab", Transport::Https);
//! let session = connector
//!     .connect(&target, Credentials::new("admin", "secret"))
//!     .await?;
//!
//! let existing = session.device.fetch_vrf("yankees").await?;
//! ```

/// Credential resolution (explicit parameters and the persisted store).
pub mod credentials;

/// NX-API JSON client.
pub mod nxapi;

/// File upload onto the device over SSH/SFTP.
pub mod sftp;

use crate::modules::network::nxos_vrf::VrfSpec;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

pub use credentials::{
    ChainedCredentials, CredentialSource, CredentialStore, Credentials, ExplicitCredentials,
    PartialCredentials,
};

/// Errors that can occur while talking to a device.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// Failed to reach the device at all.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The device rejected the credentials, or none could be resolved.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The device accepted the request but a command failed.
    #[error("NX-API command failed with code {code}: {msg}")]
    ApiError {
        /// NX-API output code (e.g. "400")
        code: String,
        /// Message returned by the device
        msg: String,
    },

    /// The response could not be decoded.
    #[error("Invalid response from device: {0}")]
    InvalidResponse(String),

    /// File upload failed.
    #[error("File transfer failed: {0}")]
    TransferFailed(String),

    /// The request timed out.
    #[error("Connection timeout after {0} seconds")]
    Timeout(u64),

    /// The device hostname could not be resolved.
    #[error("Host not found: {0}")]
    HostNotFound(String),

    /// Configuration is invalid or incomplete.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error during connection operations.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for connection operations.
pub type ConnectionResult<T> = Result<T, ConnectionError>;

/// Transport protocol used to reach NX-API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Plain HTTP (default)
    #[default]
    Http,
    /// HTTP over TLS
    Https,
}

impl Transport {
    /// URL scheme for this transport.
    pub fn scheme(self) -> &'static str {
        match self {
            Transport::Http => "http",
            Transport::Https => "https",
        }
    }

    /// Port NX-API listens on when none is configured.
    pub fn default_port(self) -> u16 {
        match self {
            Transport::Http => 80,
            Transport::Https => 443,
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

impl std::str::FromStr for Transport {
    type Err = ConnectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "http" => Ok(Transport::Http),
            "https" => Ok(Transport::Https),
            _ => Err(ConnectionError::InvalidConfig(format!(
                "Invalid protocol '{}'. Valid options: http, https",
                s
            ))),
        }
    }
}

/// Where to find a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTarget {
    /// Hostname or IP address
    pub host: String,
    /// Explicit port; falls back to the transport default
    pub port: Option<u16>,
    /// Transport protocol
    pub transport: Transport,
}

impl DeviceTarget {
    pub fn new(host: impl Into<String>, transport: Transport) -> Self {
        Self {
            host: host.into(),
            port: None,
            transport,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// The port actually used.
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.transport.default_port())
    }
}

/// Device operations the modules depend on.
///
/// Remote paths are file names relative to the device file system
/// (`bootflash:` by default); implementations add the prefix.
#[async_trait]
pub trait NxosDevice: Send + Sync {
    /// Identifier used in logs and results (usually the host).
    fn identifier(&self) -> &str;

    /// Observed VRF state, or `None` when the VRF does not exist.
    async fn fetch_vrf(&self, name: &str) -> ConnectionResult<Option<VrfSpec>>;

    /// Push configuration commands in order.
    async fn apply(&self, commands: &[String]) -> ConnectionResult<()>;

    /// The full running configuration.
    async fn running_config(&self) -> ConnectionResult<String>;

    /// Rollback-patch diff between the running config and a file on the device.
    async fn diff(&self, remote_path: &str) -> ConnectionResult<String>;

    /// Save the running config to a checkpoint file on the device.
    async fn save_checkpoint(&self, label: &str) -> ConnectionResult<()>;

    /// Replace the running config with a file on the device.
    ///
    /// Returns `false` when the device refused the rollback.
    async fn rollback_to(&self, remote_path: &str) -> ConnectionResult<bool>;
}

/// File operations on the device file system.
#[async_trait]
pub trait FileTransfer: Send + Sync {
    /// Lowercase hex SHA-256 of a file on the device, or `None` when absent.
    async fn remote_checksum(&self, remote_path: &str) -> ConnectionResult<Option<String>>;

    /// Copy a local file onto the device, returning its remote name.
    async fn transfer(&self, local_path: &Path) -> ConnectionResult<String>;
}

/// An open session against one device.
#[derive(Clone)]
pub struct DeviceSession {
    pub device: Arc<dyn NxosDevice>,
    pub files: Arc<dyn FileTransfer>,
}

impl fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceSession")
            .field("device", &self.device.identifier())
            .finish()
    }
}

/// Opens sessions to devices.
#[async_trait]
pub trait DeviceConnector: Send + Sync {
    async fn connect(
        &self,
        target: &DeviceTarget,
        credentials: Credentials,
    ) -> ConnectionResult<DeviceSession>;
}

/// Remote file name for a local path (its final component).
pub fn remote_name(local_path: &Path) -> ConnectionResult<String> {
    local_path
        .file_name()
        .and_then(|n| n.to_str())
        .map(String::from)
        .ok_or_else(|| {
            ConnectionError::TransferFailed(format!(
                "'{}' has no usable file name",
                local_path.display()
            ))
        })
}
