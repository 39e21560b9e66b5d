//! Error types for rendering.
//!
//! Configuration errors abort the render before any manifest is produced. The
//! remaining variants cover output and filesystem failures.

use thiserror::Error;

use crate::environment::EnvSource;

/// Error type for render operations
#[derive(Error, Debug)]
pub enum Error {
    /// Required field missing from the configuration
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Field present but holding an unusable value
    #[error("Validation error: {field}: {reason}")]
    Validation { field: String, reason: String },

    /// An environment source produced a mapping that cannot become env vars
    #[error("Malformed environment source '{origin}': {reason}")]
    MalformedSource { origin: EnvSource, reason: String },

    /// A `--set` override could not be applied
    #[error("Invalid override '{expr}': {reason}")]
    InvalidOverride { expr: String, reason: String },

    /// Values document is not valid YAML or does not match the schema
    #[error("Failed to parse values: {0}")]
    Parse(#[source] serde_yaml::Error),

    /// A manifest could not be rendered as YAML
    #[error("YAML serialization error: {0}")]
    Yaml(#[source] serde_yaml::Error),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reading values files or writing manifests failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a validation failure on `field`.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error stems from the supplied configuration rather than the environment
    pub fn is_configuration_error(&self) -> bool {
        match self {
            Error::MissingField(_)
            | Error::Validation { .. }
            | Error::MalformedSource { .. }
            | Error::InvalidOverride { .. }
            | Error::Parse(_) => true,
            Error::Yaml(_) | Error::Serialization(_) | Error::Io(_) => false,
        }
    }

    /// Process exit code for the CLI
    pub fn exit_code(&self) -> i32 {
        if self.is_configuration_error() { 2 } else { 1 }
    }
}

/// Result type alias for render operations
pub type Result<T> = std::result::Result<T, Error>;
