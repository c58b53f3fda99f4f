//! Error handling for ctrl-parfait
//!
//! One `thiserror` enum per concern, aggregated by [`ParfaitError`].
//! Row edits and asset option generation never fail: lookup misses and
//! malformed selections degrade to absence markers instead.

use std::path::PathBuf;

use parfait_types::{ExportFormat, TypeParseError};
use thiserror::Error;

/// Main error type for ctrl-parfait
#[derive(Error, Debug)]
pub enum ParfaitError {
    #[error("Taxonomy error: {0}")]
    Taxonomy(#[from] TaxonomyError),

    #[error("Attribute registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Parse error: {0}")]
    Parse(#[from] TypeParseError),
}

/// Errors loading or validating a taxonomy definition
#[derive(Error, Debug)]
pub enum TaxonomyError {
    #[error("Failed to read taxonomy file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse taxonomy {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Taxonomy {origin} failed validation: {}", .issues.join("; "))]
    Invalid { origin: String, issues: Vec<String> },
}

/// Errors from the attribute registry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Attribute '{id}' already exists")]
    DuplicateAttribute { id: String },

    #[error("Attribute name must not be empty")]
    EmptyName,
}

/// Errors producing an export artifact
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Unsupported export format '{0}'")]
    UnsupportedFormat(String),

    #[error("No encoder registered for {0} exports")]
    EncoderUnavailable(ExportFormat),

    #[error("Failed to encode {format} export: {message}")]
    Encoder {
        format: ExportFormat,
        message: String,
    },

    #[error("Failed to write export {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExportError {
    /// Create an encoder failure
    pub fn encoder(format: ExportFormat, message: impl Into<String>) -> Self {
        Self::Encoder {
            format,
            message: message.into(),
        }
    }
}

impl From<TypeParseError> for ExportError {
    fn from(error: TypeParseError) -> Self {
        match error {
            TypeParseError::UnsupportedFormat(tag) => ExportError::UnsupportedFormat(tag),
            other => ExportError::UnsupportedFormat(other.to_string()),
        }
    }
}

/// Result type for fallible ctrl-parfait operations
pub type Result<T> = std::result::Result<T, ParfaitError>;
