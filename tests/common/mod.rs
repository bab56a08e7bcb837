//! Shared test utilities for the Nexible test suite.
//!
//! This module provides:
//! - An in-memory NX-OS device that interprets VRF configuration commands
//! - Mock file transfer and connector implementations
//! - A static credential source
//! - Helpers for building module parameters and contexts
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use nexible::connection::{
    remote_name, ConnectionError, ConnectionResult, CredentialSource, Credentials,
    DeviceConnector, DeviceSession, DeviceTarget, FileTransfer, NxosDevice, PartialCredentials,
};
use nexible::modules::network::common::calculate_config_checksum;
use nexible::modules::network::{AdminState, VrfSpec};
use nexible::modules::{ModuleContext, ModuleParams};

// ============================================================================
// Helper Functions
// ============================================================================

/// Build module parameters from a JSON literal
pub fn params(value: serde_json::Value) -> ModuleParams {
    serde_json::from_value(value).expect("parameters must be a JSON object")
}

/// A module context wired to the given mocks with fixed credentials
pub fn mock_context(connector: Arc<MockConnector>) -> ModuleContext {
    ModuleContext::new()
        .with_credentials(Arc::new(StaticCredentials::new("admin", "admin")))
        .with_connector(connector)
}

// ============================================================================
// Mock Device
// ============================================================================

/// In-memory NX-OS device.
///
/// `apply` interprets the subset of CLI the VRF module emits, so a second
/// run against the same device sees the result of the first.
#[derive(Default)]
pub struct MockDevice {
    vrfs: Mutex<Vec<VrfSpec>>,
    applied: Mutex<Vec<Vec<String>>>,
    checkpoints: Mutex<Vec<String>>,
    rollbacks: Mutex<Vec<String>>,
    diff_output: Mutex<String>,
    rollback_result: AtomicBool,
    fail_apply: AtomicBool,
    fail_diff: AtomicBool,
    fetches: AtomicUsize,
}

impl MockDevice {
    pub fn new() -> Self {
        let device = Self::default();
        device.rollback_result.store(true, Ordering::SeqCst);
        device
    }

    /// Seed a VRF that already exists on the device
    pub fn with_vrf(self, name: &str, description: Option<&str>, admin_state: AdminState) -> Self {
        let mut spec = VrfSpec::new(name);
        spec.set_description(description);
        spec.admin_state = Some(admin_state);
        self.vrfs.lock().unwrap().push(spec);
        self
    }

    /// Text returned by the rollback-patch diff
    pub fn with_diff(self, diff: &str) -> Self {
        *self.diff_output.lock().unwrap() = diff.to_string();
        self
    }

    pub fn with_rollback_result(self, result: bool) -> Self {
        self.rollback_result.store(result, Ordering::SeqCst);
        self
    }

    pub fn failing_apply(self) -> Self {
        self.fail_apply.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_diff(self) -> Self {
        self.fail_diff.store(true, Ordering::SeqCst);
        self
    }

    /// Every batch of commands pushed so far
    pub fn applied(&self) -> Vec<Vec<String>> {
        self.applied.lock().unwrap().clone()
    }

    pub fn checkpoints(&self) -> Vec<String> {
        self.checkpoints.lock().unwrap().clone()
    }

    pub fn rollbacks(&self) -> Vec<String> {
        self.rollbacks.lock().unwrap().clone()
    }

    pub fn vrf(&self, name: &str) -> Option<VrfSpec> {
        self.vrfs
            .lock()
            .unwrap()
            .iter()
            .find(|v| v.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    pub fn vrf_count(&self) -> usize {
        self.vrfs.lock().unwrap().len()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn interpret(&self, commands: &[String]) -> ConnectionResult<()> {
        let mut vrfs = self.vrfs.lock().unwrap();
        let mut current: Option<usize> = None;

        for command in commands {
            let command = command.trim();
            if let Some(name) = command.strip_prefix("no vrf context ") {
                vrfs.retain(|v| !v.name.eq_ignore_ascii_case(name));
                current = None;
            } else if let Some(name) = command.strip_prefix("vrf context ") {
                let index = match vrfs.iter().position(|v| v.name.eq_ignore_ascii_case(name)) {
                    Some(index) => index,
                    None => {
                        let mut spec = VrfSpec::new(name);
                        spec.admin_state = Some(AdminState::Up);
                        vrfs.push(spec);
                        vrfs.len() - 1
                    }
                };
                current = Some(index);
            } else {
                let index = current.ok_or_else(|| ConnectionError::ApiError {
                    code: "400".to_string(),
                    msg: format!("'{}' outside of a vrf context", command),
                })?;
                let vrf = &mut vrfs[index];
                if command == "shutdown" {
                    vrf.admin_state = Some(AdminState::Down);
                } else if command == "no shutdown" {
                    vrf.admin_state = Some(AdminState::Up);
                } else if command == "no description" {
                    vrf.description = None;
                } else if let Some(text) = command.strip_prefix("description ") {
                    vrf.set_description(Some(text));
                } else {
                    return Err(ConnectionError::ApiError {
                        code: "400".to_string(),
                        msg: format!("unrecognized command '{}'", command),
                    });
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl NxosDevice for MockDevice {
    fn identifier(&self) -> &str {
        "mock-n9k"
    }

    async fn fetch_vrf(&self, name: &str) -> ConnectionResult<Option<VrfSpec>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.vrf(name))
    }

    async fn apply(&self, commands: &[String]) -> ConnectionResult<()> {
        if self.fail_apply.load(Ordering::SeqCst) {
            return Err(ConnectionError::ApiError {
                code: "400".to_string(),
                msg: "Syntax error while parsing".to_string(),
            });
        }
        self.applied.lock().unwrap().push(commands.to_vec());
        self.interpret(commands)
    }

    async fn running_config(&self) -> ConnectionResult<String> {
        let vrfs = self.vrfs.lock().unwrap();
        let mut text = String::from("!Command: show running-config\nhostname mock-n9k\n");
        for vrf in vrfs.iter() {
            text.push_str(&vrf.to_config());
            text.push('\n');
        }
        Ok(text)
    }

    async fn diff(&self, remote_path: &str) -> ConnectionResult<String> {
        if self.fail_diff.load(Ordering::SeqCst) {
            return Err(ConnectionError::ApiError {
                code: "400".to_string(),
                msg: format!("{} is not a valid checkpoint", remote_path),
            });
        }
        Ok(self.diff_output.lock().unwrap().clone())
    }

    async fn save_checkpoint(&self, label: &str) -> ConnectionResult<()> {
        self.checkpoints.lock().unwrap().push(label.to_string());
        Ok(())
    }

    async fn rollback_to(&self, remote_path: &str) -> ConnectionResult<bool> {
        self.rollbacks.lock().unwrap().push(remote_path.to_string());
        Ok(self.rollback_result.load(Ordering::SeqCst))
    }
}

// ============================================================================
// Mock File Transfer
// ============================================================================

/// Device file system keyed by name, holding each file's SHA-256.
#[derive(Default)]
pub struct MockFileTransfer {
    present: Mutex<BTreeMap<String, String>>,
    transferred: Mutex<Vec<String>>,
}

impl MockFileTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file already on the device with the given content
    pub fn with_file(self, name: &str, content: &str) -> Self {
        self.present
            .lock()
            .unwrap()
            .insert(name.to_string(), calculate_config_checksum(content));
        self
    }

    pub fn transferred(&self) -> Vec<String> {
        self.transferred.lock().unwrap().clone()
    }
}

#[async_trait]
impl FileTransfer for MockFileTransfer {
    async fn remote_checksum(&self, remote_path: &str) -> ConnectionResult<Option<String>> {
        Ok(self.present.lock().unwrap().get(remote_path).cloned())
    }

    async fn transfer(&self, local_path: &Path) -> ConnectionResult<String> {
        let name = remote_name(local_path)?;
        let content = std::fs::read_to_string(local_path)?;
        self.present
            .lock()
            .unwrap()
            .insert(name.clone(), calculate_config_checksum(&content));
        self.transferred.lock().unwrap().push(name.clone());
        Ok(name)
    }
}

// ============================================================================
// Mock Connector
// ============================================================================

/// Hands out sessions over the shared mocks and remembers who asked.
pub struct MockConnector {
    pub device: Arc<MockDevice>,
    pub files: Arc<MockFileTransfer>,
    connections: Mutex<Vec<(DeviceTarget, Credentials)>>,
    refuse: AtomicBool,
}

impl MockConnector {
    pub fn new(device: MockDevice, files: MockFileTransfer) -> Self {
        Self {
            device: Arc::new(device),
            files: Arc::new(files),
            connections: Mutex::new(Vec::new()),
            refuse: AtomicBool::new(false),
        }
    }

    pub fn with_device(device: MockDevice) -> Self {
        Self::new(device, MockFileTransfer::new())
    }

    pub fn refusing(self) -> Self {
        self.refuse.store(true, Ordering::SeqCst);
        self
    }

    pub fn connections(&self) -> Vec<(DeviceTarget, Credentials)> {
        self.connections.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeviceConnector for MockConnector {
    async fn connect(
        &self,
        target: &DeviceTarget,
        credentials: Credentials,
    ) -> ConnectionResult<DeviceSession> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(ConnectionError::ConnectionFailed(format!(
                "{} refused the connection",
                target.host
            )));
        }
        self.connections
            .lock()
            .unwrap()
            .push((target.clone(), credentials));

        let device: Arc<dyn NxosDevice> = self.device.clone();
        let files: Arc<dyn FileTransfer> = self.files.clone();
        Ok(DeviceSession { device, files })
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// Credential source that always answers with the same pair.
pub struct StaticCredentials {
    username: Option<String>,
    password: Option<String>,
}

impl StaticCredentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
        }
    }

    pub fn empty() -> Self {
        Self {
            username: None,
            password: None,
        }
    }
}

impl CredentialSource for StaticCredentials {
    fn resolve(&self, _vendor: &str, _model: &str) -> ConnectionResult<PartialCredentials> {
        Ok(PartialCredentials {
            username: self.username.clone(),
            password: self.password.clone(),
        })
    }
}
