//! `vrf` subcommand: drive the `nxos_vrf` module from flags

use super::{CommandContext, ConnectionArgs};
use anyhow::Result;
use clap::Args;
use nexible::modules::ModuleParams;

/// Arguments for the vrf command
#[derive(Args, Debug, Clone)]
pub struct VrfArgs {
    /// VRF name
    #[arg(long, visible_alias = "vrf")]
    pub name: String,

    /// Administrative state of the VRF
    #[arg(long, value_parser = ["up", "down"])]
    pub admin_state: Option<String>,

    /// VRF description
    #[arg(long)]
    pub description: Option<String>,

    /// Whether the VRF should exist
    #[arg(long, value_parser = ["present", "absent"])]
    pub state: Option<String>,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

impl VrfArgs {
    /// Module parameters for `nxos_vrf`
    pub fn to_params(&self) -> ModuleParams {
        let mut params = ModuleParams::new();
        params.insert("vrf".to_string(), serde_json::json!(self.name));
        if let Some(ref admin_state) = self.admin_state {
            params.insert("admin_state".to_string(), serde_json::json!(admin_state));
        }
        if let Some(ref description) = self.description {
            params.insert("description".to_string(), serde_json::json!(description));
        }
        if let Some(ref state) = self.state {
            params.insert("state".to_string(), serde_json::json!(state));
        }
        self.connection.apply(&mut params);
        params
    }

    /// Execute the vrf command
    pub async fn execute(&self, ctx: &CommandContext) -> Result<i32> {
        ctx.run_module("nxos_vrf", self.to_params()).await
    }
}
