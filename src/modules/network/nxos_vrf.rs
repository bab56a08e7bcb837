//! Cisco NX-OS VRF Module
//!
//! Manages the presence and basic attributes of a VRF (`vrf context`) on a
//! Nexus switch. The module reads the VRF from the device, computes the
//! missing or differing attributes, and pushes only those.
//!
//! ## Parameters
//!
//! - `vrf`: Name of the VRF (required). `default` is reserved and rejected
//! - `admin_state`: `up` or `down` (default: `up`)
//! - `description`: Free-form description
//! - `state`: `present` or `absent` (default: `present`)
//! - `host`: Device address (required)
//! - `username` / `password`: Login; falls back to the credential store
//! - `protocol`: `http` or `https` (default: `http`)
//! - `port`: NX-API port (default: 80 for http, 443 for https)
//!
//! ## Examples
//!
//! ```yaml
//! # Ensure a VRF exists and is up
//! - nxos_vrf:
//!     vrf: ntc
//!     description: testing
//!     host: 192.168.1.10
//!
//! # Remove it
//! - nxos_vrf:
//!     vrf: ntc
//!     state: absent
//!     host: 192.168.1.10
//! ```

use super::common::{generate_config_diff, parse_config_sections, ConnectionParams};
use super::reconcile::{reconcile, CommandSet, Delta, DesiredState, ManagedResource};
use crate::connection::ConnectionError;
use crate::modules::{
    Module, ModuleContext, ModuleError, ModuleOutput, ModuleParams, ModuleResult, ParamExt,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// VRF name NX-OS reserves for the global routing table
pub const RESERVED_VRF_NAME: &str = "default";

const VRF_HEADER: &str = "vrf context ";

// ============================================================================
// Resource Types
// ============================================================================

/// Administrative state of a VRF
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminState {
    Up,
    Down,
}

impl fmt::Display for AdminState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdminState::Up => write!(f, "up"),
            AdminState::Down => write!(f, "down"),
        }
    }
}

impl FromStr for AdminState {
    type Err = ModuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "up" => Ok(AdminState::Up),
            "down" => Ok(AdminState::Down),
            _ => Err(ModuleError::InvalidParameter(format!(
                "Invalid admin_state '{}'. Valid options: up, down",
                s
            ))),
        }
    }
}

/// Attributes of a VRF, in command emission order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VrfAttribute {
    Name,
    AdminState,
    Description,
}

impl VrfAttribute {
    /// Key used in module parameters and results
    pub fn as_str(self) -> &'static str {
        match self {
            VrfAttribute::Name => "vrf",
            VrfAttribute::AdminState => "admin_state",
            VrfAttribute::Description => "description",
        }
    }
}

/// Desired or observed state of one VRF.
///
/// Optional fields are `None` when not given (desired) or not configured
/// (observed); empty descriptions are never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VrfSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_state: Option<AdminState>,
}

impl VrfSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            admin_state: None,
        }
    }

    /// Set the description, trimmed, dropping blank values.
    ///
    /// The device stores descriptions without surrounding whitespace, so the
    /// trimmed form is what later comparisons see.
    pub fn set_description(&mut self, description: Option<&str>) {
        self.description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(String::from);
    }

    pub fn has_description(&self) -> bool {
        self.description
            .as_deref()
            .is_some_and(|d| !d.trim().is_empty())
    }

    /// Whether `name` is the reserved VRF, in any letter case.
    pub fn is_reserved_name(name: &str) -> bool {
        name.eq_ignore_ascii_case(RESERVED_VRF_NAME)
    }

    /// Adopt the device's spelling of the name when they differ only by case.
    pub fn normalize_identity(&mut self, observed: &VrfSpec) {
        if self.name != observed.name && self.name.eq_ignore_ascii_case(&observed.name) {
            debug!(desired = %self.name, observed = %observed.name, "using device spelling of VRF name");
            self.name = observed.name.clone();
        }
    }

    /// Find `vrf context <name>` in running-config text.
    ///
    /// The name matches case-insensitively and the returned spec keeps the
    /// device's spelling. `shutdown` in the block means admin down.
    pub fn from_running_config(name: &str, text: &str) -> Option<VrfSpec> {
        let section = parse_config_sections(text).into_iter().find(|section| {
            section
                .header_argument(VRF_HEADER)
                .is_some_and(|found| found.eq_ignore_ascii_case(name))
        })?;

        let mut spec = VrfSpec::new(section.header_argument(VRF_HEADER).unwrap_or(name));
        let mut admin_state = AdminState::Up;
        for line in &section.lines {
            if line == "shutdown" {
                admin_state = AdminState::Down;
            } else if let Some(text) = line.strip_prefix("description ") {
                spec.set_description(Some(text));
            }
        }
        spec.admin_state = Some(admin_state);
        Some(spec)
    }

    /// Present attributes keyed the way module results report them.
    pub fn to_data(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .attributes()
            .into_iter()
            .map(|(key, value)| (key.as_str().to_string(), serde_json::Value::String(value)))
            .collect();
        serde_json::Value::Object(map)
    }

    /// The running-config block this spec corresponds to.
    pub fn to_config(&self) -> String {
        let mut lines = vec![format!("{}{}", VRF_HEADER, self.name)];
        if let Some(ref description) = self.description {
            lines.push(format!("  description {}", description));
        }
        if self.admin_state == Some(AdminState::Down) {
            lines.push("  shutdown".to_string());
        }
        let mut config = lines.join("\n");
        config.push('\n');
        config
    }

    /// The state the device should report after `desired` is applied.
    fn predict(existing: Option<&VrfSpec>, desired: &VrfSpec, intent: DesiredState) -> Option<VrfSpec> {
        match intent {
            DesiredState::Absent => None,
            DesiredState::Present => {
                let mut next = existing.cloned().unwrap_or_else(|| VrfSpec::new(&desired.name));
                if desired.has_description() {
                    next.description = desired.description.clone();
                }
                if let Some(state) = desired.admin_state {
                    next.admin_state = Some(state);
                }
                Some(next)
            }
        }
    }
}

impl ManagedResource for VrfSpec {
    type Attribute = VrfAttribute;

    const IDENTITY: VrfAttribute = VrfAttribute::Name;

    fn identity(&self) -> &str {
        &self.name
    }

    fn attributes(&self) -> BTreeMap<VrfAttribute, String> {
        let mut attrs = BTreeMap::new();
        attrs.insert(VrfAttribute::Name, self.name.clone());
        if let Some(state) = self.admin_state {
            attrs.insert(VrfAttribute::AdminState, state.to_string());
        }
        if let Some(ref description) = self.description {
            if !description.trim().is_empty() {
                attrs.insert(VrfAttribute::Description, description.clone());
            }
        }
        attrs
    }

    fn configure_commands(identity: &str, delta: &Delta<VrfAttribute>) -> CommandSet {
        let mut commands = CommandSet::new();
        commands.push(format!("{}{}", VRF_HEADER, identity));
        for (attribute, value) in delta {
            match attribute {
                VrfAttribute::Name => {}
                VrfAttribute::AdminState => {
                    if value == "down" {
                        commands.push("shutdown");
                    } else {
                        commands.push("no shutdown");
                    }
                }
                VrfAttribute::Description => commands.push(format!("description {}", value)),
            }
        }
        commands
    }

    fn remove_commands(identity: &str) -> CommandSet {
        let mut commands = CommandSet::new();
        commands.push(format!("no {}{}", VRF_HEADER, identity));
        commands
    }
}

// ============================================================================
// Module Parameters
// ============================================================================

/// Parsed `nxos_vrf` parameters
#[derive(Debug, Clone)]
struct VrfRequest {
    desired: VrfSpec,
    state: DesiredState,
    connection: ConnectionParams,
}

/// Characters that would end or split a command in an NX-API batch.
const COMMAND_SEPARATORS: [char; 3] = [';', '\n', '\r'];

fn reject_command_separators(param: &str, value: &str) -> ModuleResult<()> {
    if value.contains(COMMAND_SEPARATORS) {
        return Err(ModuleError::InvalidParameter(format!(
            "{} must not contain ';' or line breaks: {:?}",
            param, value
        )));
    }
    Ok(())
}

impl VrfRequest {
    fn from_params(params: &ModuleParams) -> ModuleResult<Self> {
        let name = params.get_string_required("vrf")?;
        reject_command_separators("vrf", &name)?;
        if VrfSpec::is_reserved_name(&name) {
            return Err(ModuleError::InvalidParameter(format!(
                "cannot use name of \"{}\": this is a reserved VRF name",
                name
            )));
        }

        let admin_state = match params.get_string("admin_state")? {
            Some(s) => s.parse::<AdminState>()?,
            None => AdminState::Up,
        };

        let state = match params.get_string("state")? {
            Some(s) => s.parse::<DesiredState>()?,
            None => DesiredState::default(),
        };

        let mut desired = VrfSpec::new(name);
        desired.admin_state = Some(admin_state);
        let description = params.get_string("description")?;
        if let Some(ref text) = description {
            reject_command_separators("description", text)?;
        }
        desired.set_description(description.as_deref());

        Ok(Self {
            desired,
            state,
            connection: ConnectionParams::from_params(params)?,
        })
    }
}

// ============================================================================
// NX-OS VRF Module Implementation
// ============================================================================

/// Module for managing VRFs on NX-OS
pub struct NxosVrfModule;

fn spec_data(spec: Option<&VrfSpec>) -> serde_json::Value {
    spec.map(VrfSpec::to_data)
        .unwrap_or_else(|| serde_json::json!({}))
}

fn apply_error(err: ConnectionError) -> ModuleError {
    if matches!(err, ConnectionError::ApiError { .. }) {
        ModuleError::ApplyFailed(err.to_string())
    } else {
        ModuleError::Connection(err)
    }
}

#[async_trait]
impl Module for NxosVrfModule {
    fn name(&self) -> &'static str {
        "nxos_vrf"
    }

    fn description(&self) -> &'static str {
        "Manage VRF presence and attributes on Cisco NX-OS"
    }

    fn required_params(&self) -> &[&'static str] {
        &["vrf", "host"]
    }

    fn validate_params(&self, params: &ModuleParams) -> ModuleResult<()> {
        VrfRequest::from_params(params).map(|_| ())
    }

    async fn execute(
        &self,
        params: &ModuleParams,
        context: &ModuleContext,
    ) -> ModuleResult<ModuleOutput> {
        let VrfRequest {
            mut desired,
            state,
            connection,
        } = VrfRequest::from_params(params)?;

        let session = connection.open_session(context).await?;
        let device = &session.device;

        let existing = device.fetch_vrf(&desired.name).await?;
        if let Some(ref observed) = existing {
            desired.normalize_identity(observed);
        }

        let commands = reconcile(&desired, existing.as_ref(), state);
        debug!(vrf = %desired.name, %state, ?commands, "reconciled VRF");

        let end_state = if commands.is_empty() || context.check_mode {
            existing.clone()
        } else {
            device
                .apply(commands.as_slice())
                .await
                .map_err(apply_error)?;
            info!(host = %device.identifier(), vrf = %desired.name, count = commands.len(), "applied VRF configuration");
            device.fetch_vrf(&desired.name).await?
        };

        let changed = !commands.is_empty();
        let msg = match (changed, context.check_mode) {
            (false, _) => format!("VRF '{}' already in desired state", desired.name),
            (true, true) => format!("Would send {} command(s) for VRF '{}'", commands.len(), desired.name),
            (true, false) => format!("Sent {} command(s) for VRF '{}'", commands.len(), desired.name),
        };

        let mut output = if changed {
            ModuleOutput::changed(msg)
        } else {
            ModuleOutput::ok(msg)
        };

        if context.diff_mode {
            let before = existing.as_ref().map(VrfSpec::to_config).unwrap_or_default();
            let next = if context.check_mode {
                VrfSpec::predict(existing.as_ref(), &desired, state)
            } else {
                end_state.clone()
            };
            let after = next.as_ref().map(VrfSpec::to_config).unwrap_or_default();
            output = output.with_diff(generate_config_diff(&before, &after));
        }

        Ok(output
            .with_data("proposed", desired.to_data())
            .with_data("existing", spec_data(existing.as_ref()))
            .with_data("end_state", spec_data(end_state.as_ref()))
            .with_data("state", serde_json::json!(state))
            .with_data("commands", serde_json::json!(commands))
            .with_data("changed", serde_json::json!(changed)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn params(value: serde_json::Value) -> ModuleParams {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_admin_state_from_str() {
        assert_eq!("up".parse::<AdminState>().unwrap(), AdminState::Up);
        assert_eq!("DOWN".parse::<AdminState>().unwrap(), AdminState::Down);
        assert!("sideways".parse::<AdminState>().is_err());
    }

    #[test]
    fn test_module_metadata() {
        let module = NxosVrfModule;
        assert_eq!(module.name(), "nxos_vrf");
        assert_eq!(module.required_params(), &["vrf", "host"]);
    }

    #[test]
    fn test_reserved_name_rejected_any_case() {
        for name in ["default", "DEFAULT", "Default"] {
            let err = VrfRequest::from_params(&params(serde_json::json!({
                "vrf": name, "host": "n9k-1"
            })))
            .unwrap_err();
            assert!(matches!(err, ModuleError::InvalidParameter(ref m) if m.contains("reserved")));
        }
    }

    #[test]
    fn test_request_defaults() {
        let request = VrfRequest::from_params(&params(serde_json::json!({
            "vrf": "blue", "host": "n9k-1", "description": ""
        })))
        .unwrap();
        assert_eq!(request.desired.admin_state, Some(AdminState::Up));
        assert_eq!(request.desired.description, None);
        assert_eq!(request.state, DesiredState::Present);
    }

    #[test]
    fn test_request_rejects_bad_values() {
        assert!(VrfRequest::from_params(&params(serde_json::json!({
            "vrf": "blue", "host": "n9k-1", "admin_state": "sideways"
        })))
        .is_err());
        assert!(VrfRequest::from_params(&params(serde_json::json!({
            "vrf": "blue", "host": "n9k-1", "state": "gone"
        })))
        .is_err());
    }

    #[test]
    fn test_request_trims_description() {
        let request = VrfRequest::from_params(&params(serde_json::json!({
            "vrf": "blue", "host": "n9k-1", "description": "  tenant blue "
        })))
        .unwrap();
        assert_eq!(request.desired.description.as_deref(), Some("tenant blue"));
    }

    #[test]
    fn test_request_rejects_command_separators() {
        for description in ["blue ; no feature nxapi", "blue\nno vrf context red", "blue\r"] {
            let err = VrfRequest::from_params(&params(serde_json::json!({
                "vrf": "blue", "host": "n9k-1", "description": description
            })))
            .unwrap_err();
            assert!(matches!(err, ModuleError::InvalidParameter(ref m) if m.contains("description")));
        }

        let err = VrfRequest::from_params(&params(serde_json::json!({
            "vrf": "blue;red", "host": "n9k-1"
        })))
        .unwrap_err();
        assert!(matches!(err, ModuleError::InvalidParameter(_)));
    }

    #[test]
    fn test_from_running_config() {
        let text = "!Command: show running-config vrf blue\n\
            \n\
            version 9.3(8)\n\
            vrf context Blue\n\
            \x20 description tenant blue\n\
            \x20 ip route 0.0.0.0/0 10.0.0.1\n";
        let vrf = VrfSpec::from_running_config("blue", text).unwrap();
        assert_eq!(vrf.name, "Blue");
        assert_eq!(vrf.description.as_deref(), Some("tenant blue"));
        assert_eq!(vrf.admin_state, Some(AdminState::Up));

        assert!(VrfSpec::from_running_config("red", text).is_none());
    }

    #[test]
    fn test_attributes_are_sparse() {
        let vrf = VrfSpec::new("blue");
        let attrs = vrf.attributes();
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs.get(&VrfAttribute::Name).map(String::as_str), Some("blue"));
        assert_eq!(vrf.to_data(), serde_json::json!({ "vrf": "blue" }));
    }

    #[test]
    fn test_to_config() {
        let mut vrf = VrfSpec::new("blue");
        vrf.admin_state = Some(AdminState::Down);
        vrf.set_description(Some("tenant"));
        assert_eq!(
            vrf.to_config(),
            "vrf context blue\n  description tenant\n  shutdown\n"
        );
    }

    #[test]
    fn test_normalize_identity() {
        let mut desired = VrfSpec::new("yankees");
        desired.normalize_identity(&VrfSpec::new("Yankees"));
        assert_eq!(desired.name, "Yankees");

        let mut desired = VrfSpec::new("mets");
        desired.normalize_identity(&VrfSpec::new("Yankees"));
        assert_eq!(desired.name, "mets");
    }

    #[test]
    fn test_predict() {
        let mut desired = VrfSpec::new("blue");
        desired.admin_state = Some(AdminState::Down);
        let mut existing = VrfSpec::new("blue");
        existing.admin_state = Some(AdminState::Up);
        existing.set_description(Some("kept"));

        let next = VrfSpec::predict(Some(&existing), &desired, DesiredState::Present).unwrap();
        assert_eq!(next.admin_state, Some(AdminState::Down));
        assert_eq!(next.description.as_deref(), Some("kept"));
        assert!(VrfSpec::predict(Some(&existing), &desired, DesiredState::Absent).is_none());
    }
}
