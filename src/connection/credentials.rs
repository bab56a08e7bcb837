//! Credential resolution for device logins.
//!
//! Credentials come from two places: explicit module parameters and a
//! persisted YAML store (by default `~/.netauth`) keyed by vendor and model:
//!
//! ```yaml
//! cisco:
//!   nexus:
//!     username: admin
//!     password: secret
//! ```
//!
//! [`ChainedCredentials`] merges sources field by field, earlier sources
//! winning, so explicit parameters override the store.

use super::{ConnectionError, ConnectionResult};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Default vendor key in the credential store.
pub const DEFAULT_VENDOR: &str = "cisco";

/// Default model key in the credential store.
pub const DEFAULT_MODEL: &str = "nexus";

/// A complete username/password pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

/// Credentials where either field may still be unknown.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PartialCredentials {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl PartialCredentials {
    /// Fill unknown fields from `other`.
    pub fn or(self, other: PartialCredentials) -> PartialCredentials {
        PartialCredentials {
            username: self.username.or(other.username),
            password: self.password.or(other.password),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// Turn into complete credentials or report what is missing.
    pub fn into_credentials(self, vendor: &str, model: &str) -> ConnectionResult<Credentials> {
        match (self.username, self.password) {
            (Some(username), Some(password)) => Ok(Credentials { username, password }),
            (None, _) => Err(ConnectionError::AuthenticationFailed(format!(
                "no username given and none stored for {}/{}",
                vendor, model
            ))),
            (Some(_), None) => Err(ConnectionError::AuthenticationFailed(format!(
                "no password given and none stored for {}/{}",
                vendor, model
            ))),
        }
    }
}

impl fmt::Debug for PartialCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartialCredentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "********"))
            .finish()
    }
}

/// A source of (possibly partial) credentials.
pub trait CredentialSource: Send + Sync {
    fn resolve(&self, vendor: &str, model: &str) -> ConnectionResult<PartialCredentials>;
}

/// Credentials given directly as module parameters.
#[derive(Debug, Clone, Default)]
pub struct ExplicitCredentials {
    credentials: PartialCredentials,
}

impl ExplicitCredentials {
    pub fn new(username: Option<String>, password: Option<String>) -> Self {
        Self {
            credentials: PartialCredentials { username, password },
        }
    }
}

impl CredentialSource for ExplicitCredentials {
    fn resolve(&self, _vendor: &str, _model: &str) -> ConnectionResult<PartialCredentials> {
        Ok(self.credentials.clone())
    }
}

type StoreFile = HashMap<String, HashMap<String, PartialCredentials>>;

/// The persisted credential store.
///
/// A missing file resolves to nothing; a malformed one is an error.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.netauth`, or `.netauth` when no home directory is known.
    pub fn default_location() -> Self {
        let path = dirs::home_dir()
            .map(|home| home.join(".netauth"))
            .unwrap_or_else(|| PathBuf::from(".netauth"));
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> ConnectionResult<Option<StoreFile>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "credential store not present");
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        serde_yaml::from_str(&content).map(Some).map_err(|e| {
            ConnectionError::InvalidConfig(format!(
                "Failed to parse credential store '{}': {}",
                self.path.display(),
                e
            ))
        })
    }
}

impl CredentialSource for CredentialStore {
    fn resolve(&self, vendor: &str, model: &str) -> ConnectionResult<PartialCredentials> {
        let found = self
            .load()?
            .and_then(|mut store| store.remove(vendor))
            .and_then(|mut models| models.remove(model))
            .unwrap_or_default();
        Ok(found)
    }
}

/// Merges several sources; earlier sources take precedence per field.
#[derive(Clone, Default)]
pub struct ChainedCredentials {
    sources: Vec<Arc<dyn CredentialSource>>,
}

impl ChainedCredentials {
    pub fn new(sources: Vec<Arc<dyn CredentialSource>>) -> Self {
        Self { sources }
    }

    pub fn then(mut self, source: Arc<dyn CredentialSource>) -> Self {
        self.sources.push(source);
        self
    }
}

impl CredentialSource for ChainedCredentials {
    fn resolve(&self, vendor: &str, model: &str) -> ConnectionResult<PartialCredentials> {
        let mut merged = PartialCredentials::default();
        for source in &self.sources {
            if merged.is_complete() {
                break;
            }
            merged = merged.or(source.resolve(vendor, model)?);
        }
        Ok(merged)
    }
}
