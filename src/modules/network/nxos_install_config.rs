//! Cisco NX-OS Install Config Module
//!
//! Installs a local configuration file as the device's running configuration.
//! The file is copied to the device file system when missing, the device
//! computes a rollback-patch diff against the running config, and with
//! `commit` set the running config is checkpointed and then rolled to the
//! new file.
//!
//! ## Parameters
//!
//! - `config_file`: Local path of the candidate configuration (required)
//! - `diff_file`: Local path to write the device diff to
//! - `current_config_file`: Local path to write the pre-change running config to
//! - `commit`: Replace the running config with the candidate (default: false)
//! - `backup_name`: Checkpoint file name (default: `<host>_nxos_running_<timestamp>.cfg`)
//! - `host`, `username`, `password`, `protocol`, `port`: as for `nxos_vrf`
//!
//! ## Examples
//!
//! ```yaml
//! # Preview the change
//! - nxos_install_config:
//!     config_file: configs/n9k-1.cfg
//!     diff_file: diffs/n9k-1.diff
//!     host: n9k-1
//!
//! # Install it, keeping a checkpoint
//! - nxos_install_config:
//!     config_file: configs/n9k-1.cfg
//!     commit: true
//!     backup_name: pre_change.cfg
//!     host: n9k-1
//! ```

use super::common::{
    calculate_config_checksum, diff_lines, generate_backup_filename, ConnectionParams,
};
use crate::connection::remote_name;
use crate::modules::{
    Diff, Module, ModuleContext, ModuleError, ModuleOutput, ModuleParams, ModuleResult, ParamExt,
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

// ============================================================================
// Configuration Types
// ============================================================================

/// Parsed `nxos_install_config` parameters
#[derive(Debug, Clone)]
struct InstallConfig {
    /// Candidate configuration on the local machine
    config_file: PathBuf,
    /// Where to write the device diff
    diff_file: Option<PathBuf>,
    /// Where to write the running config as it was before any change
    current_config_file: Option<PathBuf>,
    /// Whether to replace the running config
    commit: bool,
    /// Checkpoint name
    backup_name: Option<String>,
    connection: ConnectionParams,
}

impl InstallConfig {
    fn from_params(params: &ModuleParams) -> ModuleResult<Self> {
        let config_file = PathBuf::from(params.get_string_required("config_file")?);
        if !config_file.is_file() {
            return Err(ModuleError::InvalidParameter(format!(
                "config_file '{}' does not exist",
                config_file.display()
            )));
        }
        remote_name(&config_file).map_err(|e| ModuleError::InvalidParameter(e.to_string()))?;

        Ok(Self {
            config_file,
            diff_file: params.get_string("diff_file")?.map(PathBuf::from),
            current_config_file: params.get_string("current_config_file")?.map(PathBuf::from),
            commit: params.get_bool_or("commit", false)?,
            backup_name: params.get_string("backup_name")?,
            connection: ConnectionParams::from_params(params)?,
        })
    }
}

fn write_local(path: &Path, content: &str) -> ModuleResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    debug!(path = %path.display(), bytes = content.len(), "wrote local file");
    Ok(())
}

// ============================================================================
// NX-OS Install Config Module Implementation
// ============================================================================

/// Module for installing a configuration file on NX-OS
pub struct NxosInstallConfigModule;

#[async_trait]
impl Module for NxosInstallConfigModule {
    fn name(&self) -> &'static str {
        "nxos_install_config"
    }

    fn description(&self) -> &'static str {
        "Install a configuration file as the NX-OS running config, with checkpoint backup"
    }

    fn required_params(&self) -> &[&'static str] {
        &["config_file", "host"]
    }

    fn validate_params(&self, params: &ModuleParams) -> ModuleResult<()> {
        InstallConfig::from_params(params).map(|_| ())
    }

    async fn execute(
        &self,
        params: &ModuleParams,
        context: &ModuleContext,
    ) -> ModuleResult<ModuleOutput> {
        let config = InstallConfig::from_params(params)?;
        let candidate = std::fs::read_to_string(&config.config_file)?;
        let checksum = calculate_config_checksum(&candidate);

        let session = config.connection.open_session(context).await?;
        let host = session.device.identifier().to_string();

        // The file has to be on the device before it can be diffed, so the
        // copy happens in check mode as well.
        let mut remote_file = remote_name(&config.config_file)?;
        let transferred = match session.files.remote_checksum(&remote_file).await? {
            Some(ref existing) if existing.eq_ignore_ascii_case(&checksum) => {
                debug!(%host, file = %remote_file, "candidate already on device");
                false
            }
            existing => {
                if existing.is_some() {
                    info!(%host, file = %remote_file, "device copy differs from candidate, replacing");
                }
                remote_file = session.files.transfer(&config.config_file).await?;
                true
            }
        };

        let diff = session
            .device
            .diff(&remote_file)
            .await
            .map_err(|e| ModuleError::DiffFailed(e.to_string()))?;
        let lines = diff_lines(&diff);
        if let Some(ref path) = config.diff_file {
            write_local(path, &diff)?;
        }

        if let Some(ref path) = config.current_config_file {
            let running = session.device.running_config().await?;
            write_local(path, &running)?;
        }

        let will_commit = config.commit && !lines.is_empty();
        let mut backup_file = None;
        let mut committed = false;

        if will_commit && !context.check_mode {
            let label = config
                .backup_name
                .clone()
                .unwrap_or_else(|| generate_backup_filename(&host));
            session.device.save_checkpoint(&label).await?;
            backup_file = Some(label);

            info!(%host, file = %remote_file, "replacing running config");
            let rolled = session.device.rollback_to(&remote_file).await?;
            if !rolled {
                return Err(ModuleError::RollbackFailed(format!(
                    "device {} refused to roll running config to {}",
                    host, remote_file
                )));
            }
            committed = true;
        } else if config.commit && lines.is_empty() {
            debug!(%host, "running config already matches candidate");
        } else if !config.commit && !lines.is_empty() {
            warn!(%host, lines = lines.len(), "candidate differs from running config; commit not requested");
        }

        let changed = committed || (context.check_mode && will_commit);
        let msg = if committed {
            format!("Installed {} as running config", remote_file)
        } else if changed {
            format!("Would install {} as running config", remote_file)
        } else if lines.is_empty() {
            "Running config already matches candidate".to_string()
        } else {
            format!("{} diff line(s) pending; commit not requested", lines.len())
        };

        let mut output = if changed {
            ModuleOutput::changed(msg)
        } else {
            ModuleOutput::ok(msg)
        };

        if context.diff_mode {
            output = output.with_diff(
                Diff::new("running-config", remote_file.clone()).with_details(diff.clone()),
            );
        }

        output = output
            .with_data("remote_file", serde_json::json!(remote_file))
            .with_data("transferred", serde_json::json!(transferred))
            .with_data("diff_lines", serde_json::json!(lines))
            .with_data("checksum", serde_json::json!(checksum))
            .with_data("committed", serde_json::json!(committed));
        if let Some(ref path) = config.diff_file {
            output = output.with_data("diff_file", serde_json::json!(path.display().to_string()));
        }
        if let Some(ref path) = config.current_config_file {
            output = output.with_data(
                "current_config_file",
                serde_json::json!(path.display().to_string()),
            );
        }
        if let Some(label) = backup_file {
            output = output.with_data("backup_file", serde_json::json!(label));
        }

        Ok(output)
    }
}
