//! CLI module for Nexible
//!
//! This module provides the command-line interface for Nexible,
//! including argument parsing and subcommand handling.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Nexible - declarative Cisco NX-OS automation
///
/// Manage VRFs and install configuration files on Nexus switches over NX-API.
#[derive(Parser, Debug, Clone)]
#[command(name = "nexible")]
#[command(author = "Nexible Contributors")]
#[command(version)]
#[command(about = "Declarative Cisco NX-OS automation over NX-API", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Run in check mode (dry-run, don't make changes)
    #[arg(long = "check", global = true)]
    pub check_mode: bool,

    /// Run in diff mode (show differences)
    #[arg(long = "diff", global = true)]
    pub diff_mode: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human")]
    pub output: OutputFormat,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output with colors
    #[default]
    Human,
    /// JSON output for scripting
    Json,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Ensure a VRF is present with the given attributes, or absent
    Vrf(commands::vrf::VrfArgs),

    /// Install a configuration file as the running config
    #[command(name = "install-config")]
    InstallConfig(commands::install_config::InstallConfigArgs),

    /// Run any module with JSON parameters
    Run(commands::run::RunArgs),

    /// List available modules
    #[command(name = "list-modules")]
    ListModules,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Get the effective verbosity level (0-3)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }

    /// Check if JSON output is requested
    pub fn is_json(&self) -> bool {
        matches!(self.output, OutputFormat::Json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vrf_parsing() {
        let cli = Cli::try_parse_from([
            "nexible",
            "vrf",
            "--host",
            "n9k-1",
            "--name",
            "blue",
            "--admin-state",
            "down",
        ])
        .unwrap();
        match cli.command {
            Commands::Vrf(args) => {
                assert_eq!(args.name, "blue");
                assert_eq!(args.admin_state.as_deref(), Some("down"));
                assert_eq!(args.connection.host, "n9k-1");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_vrf_rejects_bad_admin_state() {
        assert!(Cli::try_parse_from([
            "nexible",
            "vrf",
            "--host",
            "n9k-1",
            "--name",
            "blue",
            "--admin-state",
            "sideways",
        ])
        .is_err());
    }

    #[test]
    fn test_install_config_parsing() {
        let cli = Cli::try_parse_from([
            "nexible",
            "--check",
            "install-config",
            "--host",
            "n9k-1",
            "--config-file",
            "n9k-1.cfg",
            "--commit",
        ])
        .unwrap();
        assert!(cli.check_mode);
        match cli.command {
            Commands::InstallConfig(args) => {
                assert!(args.commit);
                assert_eq!(args.config_file, PathBuf::from("n9k-1.cfg"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_verbosity() {
        let cli = Cli::try_parse_from(["nexible", "-vvvv", "list-modules"]).unwrap();
        assert_eq!(cli.verbosity(), 3);
    }

    #[test]
    fn test_json_output() {
        let cli = Cli::try_parse_from(["nexible", "--output", "json", "list-modules"]).unwrap();
        assert!(cli.is_json());
    }

    #[test]
    fn test_run_parsing() {
        let cli = Cli::try_parse_from([
            "nexible",
            "run",
            "nxos_vrf",
            "--params",
            r#"{"vrf":"blue","host":"n9k-1"}"#,
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Run(ref args) if args.module == "nxos_vrf"));
    }
}
