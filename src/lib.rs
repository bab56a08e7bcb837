//! # Nexible - Declarative Cisco NX-OS Automation
//!
//! Nexible manages Cisco Nexus switches through NX-API. Each module reads the
//! device, works out what differs from the requested state, and sends only
//! the commands needed to close the gap.
//!
//! ## Core Concepts
//!
//! - **Modules**: Units of work (`nxos_vrf`, `nxos_install_config`) driven by a
//!   parameter map and returning a structured result
//! - **Reconciler**: Computes the minimal command set from desired and observed state
//! - **Connections**: Collaborator traits for device reads, configuration pushes
//!   and file transfer, with NX-API and SFTP implementations
//! - **Credentials**: Explicit parameters layered over a persisted credential store
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                           CLI Interface                             │
//! │                    (clap-based command parsing)                     │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                    │
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          Module Registry                            │
//! │                  (nxos_vrf, nxos_install_config)                    │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                    │
//!          ┌─────────────────────────┼─────────────────────────┐
//!          ▼                         ▼                         ▼
//! ┌─────────────────┐   ┌─────────────────────┐   ┌─────────────────────┐
//! │   Reconciler    │   │  Credential Chain   │   │  Device Connector   │
//! │  (delta over    │   │  (params, then      │   │  (NX-API + SFTP)    │
//! │   attributes)   │   │   ~/.netauth)       │   │                     │
//! └─────────────────┘   └─────────────────────┘   └─────────────────────┘
//!                                                              │
//!                                                              ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         NX-OS Switches                              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use nexible::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let registry = ModuleRegistry::with_builtins();
//!     let context = ModuleContext::new().with_check_mode(true);
//!
//!     let params: ModuleParams = serde_json::from_value(serde_json::json!({
//!         "vrf": "blue",
//!         "description": "tenant blue",
//!         "host": "n9k-1",
//!     }))?;
//!
//!     let output = registry
//!         .execute("nxos_vrf", &params, &context)
//!         .await
//!         .map_err(|e| Error::module("nxos_vrf", e))?;
//!     println!("{}", output.msg);
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

// Re-export commonly used items in prelude
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    // Connection types
    pub use crate::connection::nxapi::{NxApiClient, NxApiConnector, NxApiSettings};
    pub use crate::connection::sftp::{SftpFileTransfer, SftpSettings};
    pub use crate::connection::{
        ChainedCredentials, ConnectionError, ConnectionResult, CredentialSource, CredentialStore,
        Credentials, DeviceConnector, DeviceSession, DeviceTarget, ExplicitCredentials,
        FileTransfer, NxosDevice, Transport,
    };

    // Error handling
    pub use crate::error::{Error, Result};

    // Configuration
    pub use crate::config::Config;

    // Module system
    pub use crate::modules::network::{
        reconcile, AdminState, CommandSet, DesiredState, ManagedResource, NxosInstallConfigModule,
        NxosVrfModule, VrfSpec,
    };
    pub use crate::modules::{
        Diff, Module, ModuleContext, ModuleError, ModuleOutput, ModuleParams, ModuleRegistry,
        ModuleResult, ModuleStatus, ParamExt,
    };
}

// ============================================================================
// Core Modules
// ============================================================================

/// Error types and result aliases for Nexible operations.
///
/// The crate-level [`Error`](error::Error) wraps module, connection,
/// configuration and serialization failures and maps them to exit codes.
pub mod error;

/// Configuration loading from files and environment.
pub mod config;

/// Connection layer for NX-OS devices.
///
/// This module provides the collaborator traits the modules depend on
/// ([`NxosDevice`](connection::NxosDevice), [`FileTransfer`](connection::FileTransfer),
/// [`DeviceConnector`](connection::DeviceConnector)) together with:
/// - **NX-API**: JSON-RPC style CLI over HTTP(S)
/// - **SFTP**: file upload onto the device file system
/// - **Credentials**: explicit, stored and chained credential sources
pub mod connection;

/// Module system and the built-in NX-OS modules.
pub mod modules;

// ============================================================================
// Version Information
// ============================================================================

/// Returns the current version of Nexible.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Returns detailed version information including build metadata.
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION"),
        rust_version: option_env!("CARGO_PKG_RUST_VERSION").unwrap_or("unknown"),
        target: std::env::consts::ARCH,
        profile: if cfg!(debug_assertions) {
            "debug"
        } else {
            "release"
        },
    }
}

/// Detailed version information for the Nexible build.
#[derive(Debug, Clone)]
pub struct VersionInfo {
    /// Semantic version string
    pub version: &'static str,
    /// Minimum Rust version required
    pub rust_version: &'static str,
    /// Target architecture for the build
    pub target: &'static str,
    /// Build profile (debug or release)
    pub profile: &'static str,
}

impl std::fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "nexible {} ({}, {})",
            self.version, self.target, self.profile
        )
    }
}
