//! `run` subcommand: execute any registered module with JSON parameters

use super::CommandContext;
use anyhow::Result;
use clap::Args;
use nexible::error::Error;
use nexible::modules::ModuleParams;

/// Arguments for the run command
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Module name (see `list-modules`)
    pub module: String,

    /// Module parameters as a JSON object
    #[arg(long, default_value = "{}")]
    pub params: String,
}

impl RunArgs {
    /// Parse the JSON parameter object
    pub fn parse_params(&self) -> Result<ModuleParams, Error> {
        serde_json::from_str(&self.params).map_err(|e| {
            Error::module_args(
                &self.module,
                format!("--params must be a JSON object: {}", e),
            )
        })
    }

    /// Execute the run command
    pub async fn execute(&self, ctx: &CommandContext) -> Result<i32> {
        let params = self.parse_params()?;
        ctx.run_module(&self.module, params).await
    }
}
