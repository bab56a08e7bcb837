//! `install-config` subcommand: drive the `nxos_install_config` module

use super::{CommandContext, ConnectionArgs};
use anyhow::Result;
use clap::Args;
use nexible::modules::ModuleParams;
use std::path::PathBuf;

/// Arguments for the install-config command
#[derive(Args, Debug, Clone)]
pub struct InstallConfigArgs {
    /// Local configuration file to install
    #[arg(long)]
    pub config_file: PathBuf,

    /// Write the computed diff to this file
    #[arg(long)]
    pub diff_file: Option<PathBuf>,

    /// Write the device's running config to this file
    #[arg(long)]
    pub current_config_file: Option<PathBuf>,

    /// Replace the running config when the diff is non-empty
    #[arg(long)]
    pub commit: bool,

    /// Checkpoint name saved before committing
    #[arg(long)]
    pub backup_name: Option<String>,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

impl InstallConfigArgs {
    /// Module parameters for `nxos_install_config`
    pub fn to_params(&self) -> ModuleParams {
        let mut params = ModuleParams::new();
        params.insert(
            "config_file".to_string(),
            serde_json::json!(self.config_file.display().to_string()),
        );
        if let Some(ref path) = self.diff_file {
            params.insert(
                "diff_file".to_string(),
                serde_json::json!(path.display().to_string()),
            );
        }
        if let Some(ref path) = self.current_config_file {
            params.insert(
                "current_config_file".to_string(),
                serde_json::json!(path.display().to_string()),
            );
        }
        params.insert("commit".to_string(), serde_json::json!(self.commit));
        if let Some(ref name) = self.backup_name {
            params.insert("backup_name".to_string(), serde_json::json!(name));
        }
        self.connection.apply(&mut params);
        params
    }

    /// Execute the install-config command
    pub async fn execute(&self, ctx: &CommandContext) -> Result<i32> {
        ctx.run_module("nxos_install_config", self.to_params()).await
    }
}
