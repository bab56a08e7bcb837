//! Subcommands module for Nexible CLI
//!
//! This module contains all the subcommand implementations.

pub mod install_config;
pub mod run;
pub mod vrf;

use crate::cli::output::OutputFormatter;
use anyhow::Result;
use clap::Args;
use nexible::config::Config;
use nexible::connection::Transport;
use nexible::error::Error;
use nexible::modules::{ModuleContext, ModuleParams, ModuleRegistry, ModuleResult, ParamExt};
use std::sync::Arc;

/// Common context shared between commands
pub struct CommandContext {
    /// Configuration
    pub config: Config,
    /// Output formatter
    pub output: OutputFormatter,
    /// Check mode (dry-run)
    pub check_mode: bool,
    /// Diff mode
    pub diff_mode: bool,
    /// Available modules
    pub registry: ModuleRegistry,
}

impl CommandContext {
    /// Create a new command context from CLI arguments
    pub fn new(cli: &crate::cli::Cli, config: Config) -> Self {
        let use_color = !cli.no_color && config.colors.enabled;
        let output = OutputFormatter::new(use_color, cli.is_json(), cli.verbosity());

        Self {
            config,
            output,
            check_mode: cli.check_mode,
            diff_mode: cli.diff_mode,
            registry: ModuleRegistry::with_builtins(),
        }
    }

    /// The module context for real devices, built from configuration
    pub fn module_context(&self) -> ModuleContext {
        ModuleContext::new()
            .with_check_mode(self.check_mode)
            .with_diff_mode(self.diff_mode)
            .with_credentials(Arc::new(self.config.credential_store()))
            .with_connector(Arc::new(self.config.connector()))
    }

    /// Run a module, print its result and return the exit code
    pub async fn run_module(&self, module: &str, mut params: ModuleParams) -> Result<i32> {
        with_default_protocol(&mut params, self.config.defaults.protocol)
            .map_err(|e| Error::module(module, e))?;

        let host = params
            .get("host")
            .and_then(|h| h.as_str())
            .unwrap_or("-")
            .to_string();
        self.output.task_header(module, &host);
        if self.check_mode {
            self.output.info("check mode: no configuration will be committed");
        }

        let output = self
            .registry
            .execute(module, &params, &self.module_context())
            .await
            .map_err(|e| Error::module(module, e))?;

        self.output.module_result(module, &host, &output);
        Ok(0)
    }

    /// Print the registered modules
    pub fn list_modules(&self) -> Result<i32> {
        let items: Vec<(&str, &str)> = self
            .registry
            .names()
            .into_iter()
            .filter_map(|name| self.registry.get(name).map(|m| (name, m.description())))
            .collect();
        self.output.listing(&items);
        Ok(0)
    }
}

/// Fill in the configured protocol when the parameters leave it unset.
///
/// A null or empty `protocol` counts as unset.
fn with_default_protocol(params: &mut ModuleParams, protocol: Transport) -> ModuleResult<()> {
    if params.get_string("protocol")?.is_none() {
        params.insert(
            "protocol".to_string(),
            serde_json::json!(protocol.to_string()),
        );
    }
    Ok(())
}

/// Device address and login flags shared by the device subcommands
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Device hostname or IP address
    #[arg(long)]
    pub host: String,

    /// Login user (falls back to the credential store)
    #[arg(short = 'u', long, env = "NEXIBLE_USERNAME")]
    pub username: Option<String>,

    /// Login password (falls back to the credential store)
    #[arg(short = 'p', long, env = "NEXIBLE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// NX-API protocol
    #[arg(long, value_parser = ["http", "https"])]
    pub protocol: Option<String>,

    /// NX-API port
    #[arg(long)]
    pub port: Option<u16>,
}

impl ConnectionArgs {
    /// Add the connection parameters to a module parameter map
    pub fn apply(&self, params: &mut ModuleParams) {
        params.insert("host".to_string(), serde_json::json!(self.host));
        if let Some(ref username) = self.username {
            params.insert("username".to_string(), serde_json::json!(username));
        }
        if let Some(ref password) = self.password {
            params.insert("password".to_string(), serde_json::json!(password));
        }
        if let Some(ref protocol) = self.protocol {
            params.insert("protocol".to_string(), serde_json::json!(protocol));
        }
        if let Some(port) = self.port {
            params.insert("port".to_string(), serde_json::json!(port));
        }
    }
}
