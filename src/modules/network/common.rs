//! Common network device utilities
//!
//! This module provides shared functionality for the NX-OS modules:
//! - Running-config section parsing
//! - Configuration diff rendering
//! - Backup naming and checksums

use crate::connection::credentials::{DEFAULT_MODEL, DEFAULT_VENDOR};
use crate::connection::{
    ChainedCredentials, CredentialSource, DeviceSession, DeviceTarget, ExplicitCredentials,
    Transport,
};
use crate::modules::{Diff, ModuleContext, ModuleError, ModuleParams, ModuleResult, ParamExt};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};
use std::sync::Arc;
use tracing::debug;

// ============================================================================
// Connection Parameters
// ============================================================================

/// Device address and login parameters shared by the NX-OS modules
#[derive(Clone)]
pub struct ConnectionParams {
    /// Where the device is
    pub target: DeviceTarget,
    /// Explicit username, overriding the credential store
    pub username: Option<String>,
    /// Explicit password, overriding the credential store
    pub password: Option<String>,
}

impl std::fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("target", &self.target)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "********"))
            .finish()
    }
}

impl ConnectionParams {
    /// Read `host`, `protocol`, `port`, `username` and `password`.
    pub fn from_params(params: &ModuleParams) -> ModuleResult<Self> {
        let host = params.get_string_required("host")?;

        let transport = match params.get_string("protocol")? {
            Some(p) => p.parse::<Transport>().map_err(|_| {
                ModuleError::InvalidParameter(format!(
                    "Invalid protocol '{}'. Valid options: http, https",
                    p
                ))
            })?,
            None => Transport::default(),
        };

        let mut target = DeviceTarget::new(host, transport);
        if let Some(port) = params.get_u32("port")? {
            let port = u16::try_from(port)
                .ok()
                .filter(|p| *p != 0)
                .ok_or_else(|| {
                    ModuleError::InvalidParameter(format!("port {} is out of range", port))
                })?;
            target = target.with_port(port);
        }

        Ok(Self {
            target,
            username: params.get_string("username")?,
            password: params.get_string("password")?,
        })
    }

    /// Resolve credentials (explicit first, then the context's store) and connect.
    pub async fn open_session(&self, context: &ModuleContext) -> ModuleResult<DeviceSession> {
        let explicit: Arc<dyn CredentialSource> = Arc::new(ExplicitCredentials::new(
            self.username.clone(),
            self.password.clone(),
        ));
        let chain = ChainedCredentials::new(vec![explicit, Arc::clone(&context.credentials)]);
        let credentials = chain
            .resolve(DEFAULT_VENDOR, DEFAULT_MODEL)?
            .into_credentials(DEFAULT_VENDOR, DEFAULT_MODEL)?;

        debug!(
            host = %self.target.host,
            port = self.target.effective_port(),
            transport = %self.target.transport,
            user = %credentials.username,
            "connecting to device"
        );
        Ok(context.connector.connect(&self.target, credentials).await?)
    }
}

// ============================================================================
// Configuration Sections
// ============================================================================

/// A top-level block of running configuration (e.g. a `vrf context` block)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSection {
    /// The section header (e.g. "vrf context blue")
    pub path: String,
    /// Trimmed body lines directly under the header
    pub lines: Vec<String>,
}

impl ConfigSection {
    /// The header words after a given keyword prefix, if the header starts with it.
    ///
    /// Matching of the prefix is case-insensitive, the remainder keeps device spelling.
    pub fn header_argument(&self, prefix: &str) -> Option<&str> {
        let head = self.path.get(..prefix.len())?;
        if head.eq_ignore_ascii_case(prefix) {
            Some(self.path[prefix.len()..].trim())
        } else {
            None
        }
    }
}

/// Split NX-OS configuration text into top-level sections.
///
/// Any non-indented line starts a section; indented lines belong to the
/// section above them. Comment lines (`!`, `#`) and blank lines are skipped.
pub fn parse_config_sections(content: &str) -> Vec<ConfigSection> {
    let mut sections = Vec::new();
    let mut current: Option<ConfigSection> = None;

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('!') || trimmed.starts_with('#') {
            continue;
        }

        let indented = line.starts_with(' ') || line.starts_with('\t');
        if !indented {
            if let Some(section) = current.take() {
                sections.push(section);
            }
            current = Some(ConfigSection {
                path: trimmed.to_string(),
                lines: Vec::new(),
            });
        } else if let Some(ref mut section) = current {
            section.lines.push(trimmed.to_string());
        }
    }

    if let Some(section) = current {
        sections.push(section);
    }

    sections
}

// ============================================================================
// Configuration Diff
// ============================================================================

/// Generate a unified-style diff between two configurations
pub fn generate_config_diff(before: &str, after: &str) -> Diff {
    let text_diff = TextDiff::from_lines(before, after);

    let mut details = String::new();
    let mut additions = 0;
    let mut deletions = 0;

    for change in text_diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => {
                deletions += 1;
                "-"
            }
            ChangeTag::Insert => {
                additions += 1;
                "+"
            }
            ChangeTag::Equal => " ",
        };
        details.push_str(&format!("{}{}", sign, change));
        if change.missing_newline() {
            details.push('\n');
        }
    }

    Diff {
        before: format!("{} lines", before.lines().count()),
        after: format!(
            "{} lines ({} additions, {} deletions)",
            after.lines().count(),
            additions,
            deletions
        ),
        details: Some(details),
    }
}

/// Meaningful lines of a rollback-patch diff.
///
/// Blank lines, `!`/`#` comment lines and the device's empty-patch notice are
/// dropped, so an empty result means the configs already match.
pub fn diff_lines(diff: &str) -> Vec<String> {
    diff.lines()
        .map(str::trim_end)
        .filter(|line| {
            let trimmed = line.trim_start();
            !trimmed.is_empty()
                && !trimmed.starts_with('!')
                && !trimmed.starts_with('#')
                && !trimmed.eq_ignore_ascii_case(EMPTY_PATCH_NOTICE)
        })
        .map(String::from)
        .collect()
}

const EMPTY_PATCH_NOTICE: &str = "Rollback Patch is Empty";

// ============================================================================
// Configuration Backup
// ============================================================================

/// Default checkpoint name for a device: `<host>_nxos_running_<timestamp>.cfg`
pub fn generate_backup_filename(hostname: &str) -> String {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let host: String = hostname
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("{}_nxos_running_{}.cfg", host, timestamp)
}

/// Calculate SHA256 checksum of configuration content
pub fn calculate_config_checksum(content: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
