//! Configuration module for Nexible
//!
//! Handles loading and merging configuration from multiple sources:
//! - Default values
//! - System configuration (/etc/nexible/nexible.cfg)
//! - User configuration (~/.nexible.cfg)
//! - Project configuration (./nexible.cfg)
//! - Environment variables
//! - Command-line arguments

use crate::connection::nxapi::{NxApiConnector, NxApiSettings, DEFAULT_FILE_SYSTEM};
use crate::connection::sftp::{SftpSettings, DEFAULT_SSH_PORT};
use crate::connection::{CredentialStore, Transport};
use crate::error::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default connection settings
    pub defaults: Defaults,

    /// Credential store settings
    pub credentials: CredentialsConfig,

    /// SSH file transfer settings
    pub ssh: SshConfig,

    /// Colors and output settings
    pub colors: ColorsConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// Default configuration values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// NX-API request timeout in seconds
    pub timeout: u64,

    /// Protocol used when a module does not name one
    pub protocol: Transport,

    /// Device file system for transferred files and checkpoints
    pub file_system: String,

    /// Verify TLS certificates for https
    pub validate_certs: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: 30,
            protocol: Transport::Http,
            file_system: DEFAULT_FILE_SYSTEM.to_string(),
            validate_certs: true,
        }
    }
}

/// Credential store settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Path of the YAML credential store (default: ~/.netauth)
    pub store: Option<PathBuf>,
}

/// SSH settings for file transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    /// SSH port on the devices
    pub port: u16,

    /// Accept devices missing from ~/.ssh/known_hosts
    pub accept_new_host_keys: bool,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_SSH_PORT,
            accept_new_host_keys: true,
        }
    }
}

/// Colors configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorsConfig {
    /// Enable colors
    pub enabled: bool,
}

impl Default for ColorsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log filter used when neither `-v` nor `RUST_LOG` is given
    pub log_level: Option<String>,

    /// Log format: `text` or `json`
    pub log_format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: None,
            log_format: "text".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from all sources
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Config::default();

        let config_paths = Self::get_config_paths(config_path);

        for path in config_paths {
            if path.exists() {
                config = config.merge_from_file(&path)?;
            }
        }

        config.apply_env_overrides()?;

        Ok(config)
    }

    /// Get the list of configuration file paths to check
    fn get_config_paths(explicit_path: Option<&PathBuf>) -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // Explicit path takes priority
        if let Some(path) = explicit_path {
            paths.push(path.clone());
            return paths;
        }

        // System-wide config
        paths.push(PathBuf::from("/etc/nexible/nexible.cfg"));

        // User config
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".nexible.cfg"));
        }

        // Project config (current directory)
        paths.push(PathBuf::from("nexible.cfg"));

        // Environment variable
        if let Ok(env_config) = std::env::var("NEXIBLE_CONFIG") {
            paths.push(PathBuf::from(env_config));
        }

        paths
    }

    /// Merge configuration from a file
    fn merge_from_file(&self, path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        // Determine format based on extension
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let file_config: Config = match extension {
            "yml" | "yaml" => serde_yaml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            "toml" => toml::from_str(&content)?,
            _ => {
                // Try TOML first (for .cfg files), then YAML
                toml::from_str(&content)
                    .or_else(|_| serde_yaml::from_str(&content))
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))?
            }
        };

        Ok(self.merge(file_config))
    }

    /// Merge another config into this one; values the other file sets win
    fn merge(&self, other: Config) -> Config {
        let base = Defaults::default();
        let ssh_base = SshConfig::default();
        Config {
            defaults: Defaults {
                timeout: if other.defaults.timeout != base.timeout {
                    other.defaults.timeout
                } else {
                    self.defaults.timeout
                },
                protocol: if other.defaults.protocol != base.protocol {
                    other.defaults.protocol
                } else {
                    self.defaults.protocol
                },
                file_system: if other.defaults.file_system != base.file_system {
                    other.defaults.file_system
                } else {
                    self.defaults.file_system.clone()
                },
                validate_certs: other.defaults.validate_certs && self.defaults.validate_certs,
            },
            credentials: CredentialsConfig {
                store: other
                    .credentials
                    .store
                    .or_else(|| self.credentials.store.clone()),
            },
            ssh: SshConfig {
                port: if other.ssh.port != ssh_base.port {
                    other.ssh.port
                } else {
                    self.ssh.port
                },
                accept_new_host_keys: other.ssh.accept_new_host_keys
                    && self.ssh.accept_new_host_keys,
            },
            colors: ColorsConfig {
                enabled: other.colors.enabled && self.colors.enabled,
            },
            logging: LoggingConfig {
                log_level: other
                    .logging
                    .log_level
                    .or_else(|| self.logging.log_level.clone()),
                log_format: if other.logging.log_format != LoggingConfig::default().log_format {
                    other.logging.log_format
                } else {
                    self.logging.log_format.clone()
                },
            },
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        // NEXIBLE_TIMEOUT
        if let Ok(timeout) = std::env::var("NEXIBLE_TIMEOUT") {
            self.defaults.timeout = timeout.parse().map_err(|_| Error::InvalidConfig {
                key: "NEXIBLE_TIMEOUT".to_string(),
                message: format!("'{}' is not a number of seconds", timeout),
            })?;
        }

        // NEXIBLE_PROTOCOL
        if let Ok(protocol) = std::env::var("NEXIBLE_PROTOCOL") {
            self.defaults.protocol = protocol.parse().map_err(|e| Error::InvalidConfig {
                key: "NEXIBLE_PROTOCOL".to_string(),
                message: format!("{}", e),
            })?;
        }

        // NEXIBLE_NETAUTH
        if let Ok(path) = std::env::var("NEXIBLE_NETAUTH") {
            self.credentials.store = Some(PathBuf::from(path));
        }

        // NEXIBLE_SSH_PORT
        if let Ok(port) = std::env::var("NEXIBLE_SSH_PORT") {
            self.ssh.port = port.parse().map_err(|_| Error::InvalidConfig {
                key: "NEXIBLE_SSH_PORT".to_string(),
                message: format!("'{}' is not a port number", port),
            })?;
        }

        // NO_COLOR
        if std::env::var("NO_COLOR").is_ok() {
            self.colors.enabled = false;
        }

        Ok(())
    }

    /// NX-API client settings
    pub fn nxapi_settings(&self) -> NxApiSettings {
        NxApiSettings {
            timeout: self.defaults.timeout,
            file_system: self.defaults.file_system.clone(),
            validate_certs: self.defaults.validate_certs,
        }
    }

    /// SSH session settings for file transfer
    pub fn sftp_settings(&self) -> SftpSettings {
        SftpSettings {
            port: self.ssh.port,
            timeout: self.defaults.timeout,
            accept_new_host_keys: self.ssh.accept_new_host_keys,
        }
    }

    /// The credential store to consult after explicit parameters
    pub fn credential_store(&self) -> CredentialStore {
        match self.credentials.store {
            Some(ref path) => CredentialStore::new(path),
            None => CredentialStore::default_location(),
        }
    }

    /// Connector for real devices built from these settings
    pub fn connector(&self) -> NxApiConnector {
        NxApiConnector::new(self.nxapi_settings(), self.sftp_settings())
    }

    /// Load from a specific file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Config::default().merge_from_file(path.as_ref())
    }
}
