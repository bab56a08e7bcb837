//! Network Device Modules
//!
//! Declarative modules for Cisco NX-OS (Nexus) switches, driven over NX-API.
//!
//! - **`nxos_vrf`**: Ensure a VRF exists with the given attributes, or is gone.
//!   Only the attributes that differ from the device are pushed.
//! - **`nxos_install_config`**: Install a configuration file as the running
//!   config, with a device-side diff and a checkpoint taken first.
//!
//! # Example Usage
//!
//! ```yaml
//! - name: Tenant VRF
//!   nxos_vrf:
//!     vrf: blue
//!     description: tenant blue
//!     admin_state: up
//!     host: n9k-1
//!
//! - name: Install golden config
//!   nxos_install_config:
//!     config_file: configs/n9k-1.cfg
//!     diff_file: diffs/n9k-1.diff
//!     commit: true
//!     host: n9k-1
//! ```
//!
//! # Architecture
//!
//! ```text
//! +---------------------+     +------------------+
//! |   nxos_vrf          |---->|   reconcile      |
//! +---------------------+     +------------------+
//!          |
//!          v
//! +---------------------+     +------------------+
//! |  DeviceConnector    |---->|  NxosDevice      |  NX-API
//! |                     |---->|  FileTransfer    |  sftp
//! +---------------------+     +------------------+
//!          ^
//!          |
//! +---------------------+
//! | nxos_install_config |
//! +---------------------+
//! ```

pub mod common;
pub mod nxos_install_config;
pub mod nxos_vrf;
pub mod reconcile;

// Re-export main types for convenience
pub use common::{
    calculate_config_checksum, diff_lines, generate_backup_filename, generate_config_diff,
    parse_config_sections, ConfigSection, ConnectionParams,
};
pub use nxos_install_config::NxosInstallConfigModule;
pub use nxos_vrf::{AdminState, NxosVrfModule, VrfAttribute, VrfSpec};
pub use reconcile::{compute_delta, reconcile, CommandSet, Delta, DesiredState, ManagedResource};

use crate::modules::ModuleRegistry;
use std::sync::Arc;

/// Register all network modules with the registry
pub fn register_network_modules(registry: &mut ModuleRegistry) {
    registry.register(Arc::new(NxosVrfModule));
    registry.register(Arc::new(NxosInstallConfigModule));
}

/// Get a list of all available network module names
pub fn network_module_names() -> Vec<&'static str> {
    vec!["nxos_vrf", "nxos_install_config"]
}
