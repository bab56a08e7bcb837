//! Error types for Nexible.
//!
//! Each layer has its own error enum ([`ModuleError`] wraps
//! [`ConnectionError`](crate::connection::ConnectionError)); this crate-level
//! [`Error`] wraps module failures together with configuration and
//! serialization failures and maps everything to a CLI exit status.

use crate::modules::ModuleError;
use thiserror::Error;

/// Result type alias for Nexible operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Nexible.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Module Errors
    // ========================================================================
    /// Module execution or parameter error.
    #[error("Module '{module}' failed: {source}")]
    Module {
        /// Module name
        module: String,
        /// Underlying module error
        #[source]
        source: ModuleError,
    },

    /// Module parameters could not be read.
    #[error("Invalid arguments for module '{module}': {message}")]
    ModuleArgs {
        /// Module name
        module: String,
        /// Error message
        message: String,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid configuration value.
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidConfig {
        /// Configuration key
        key: String,
        /// Error message
        message: String,
    },

    // ========================================================================
    // IO Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ========================================================================
    // Serialization Errors
    // ========================================================================
    /// YAML parsing error.
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    // ========================================================================
    // Other Errors
    // ========================================================================
    /// Generic error with source.
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
        /// Source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Creates a new module error.
    pub fn module(module: impl Into<String>, source: ModuleError) -> Self {
        Self::Module {
            module: module.into(),
            source,
        }
    }

    /// Creates a new module args error.
    pub fn module_args(module: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ModuleArgs {
            module: module.into(),
            message: message.into(),
        }
    }

    /// Returns the error code for CLI exit status.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Module { source, .. } => match source {
                ModuleError::NotFound(_)
                | ModuleError::InvalidParameter(_)
                | ModuleError::MissingParameter(_) => 4,
                ModuleError::Connection(_) => 3,
                _ => 2,
            },
            Error::ModuleArgs { .. } => 4,
            Error::InvalidConfig { .. }
            | Error::YamlParse(_)
            | Error::TomlParse(_) => 5,
            _ => 1,
        }
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Adds context with a closure that is only evaluated on error.
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Other {
            message: message.into(),
            source: Some(Box::new(e)),
        })
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| Error::Other {
            message: f().into(),
            source: Some(Box::new(e)),
        })
    }
}
