//! Error types for template loading, resolution and rendering.
//!
//! This module defines [`TemplateError`], the error type used throughout the
//! crate, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Use `TemplateError` for domain-specific errors that need distinct handling
//! - Use `anyhow::Error` (via `TemplateError::Other`) for unexpected errors
//! - Hooks and template functions report failures as `anyhow::Error`

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for template operations.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// A loader has no template under this name.
    #[error("template \"{name}\" is not defined")]
    NotDefined { name: String },

    /// The namespace of a template name has no registered search paths.
    #[error("there are no registered paths for namespace \"{namespace}\"")]
    NoPaths { namespace: String },

    /// No search path of the namespace contains the template.
    #[error("unable to find template \"{name}\" (looked into: {looked_into})")]
    Unresolved { name: String, looked_into: String },

    /// Every loader of a chain failed to provide the template.
    #[error("template \"{name}\" is not defined; {}", join_attempts(.attempts))]
    Lookup {
        name: String,
        attempts: Vec<(String, TemplateError)>,
    },

    /// A configured search path does not exist or is not a directory.
    #[error("the \"{path}\" directory does not exist")]
    DirectoryInvalid { path: PathBuf },

    /// An extends or include chain revisits a template being resolved.
    #[error("Circular extends detected: {cycle}")]
    CircularExtends { cycle: String },

    /// A post-resolution hook rejected a template.
    #[error("hook failed for template \"{name}\": {source}")]
    Hook {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// Template source is not valid UTF-8.
    #[error("template \"{name}\" is not valid UTF-8")]
    Encoding { name: String },

    /// Template source could not be parsed by the engine.
    #[error("template \"{name}\": {message}")]
    Syntax { name: String, message: String },

    /// A compiled template failed while executing.
    #[error("executing \"{name}\": {message}")]
    Render { name: String, message: String },

    /// Delimiters must be non-empty.
    #[error("Invalid delimiters: {left:?} {right:?}")]
    InvalidDelimiters { left: String, right: String },

    /// Configuration file not found at expected location.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse configuration file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TemplateError {
    /// Whether this error means "no such template" rather than a real failure.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            TemplateError::NotDefined { .. }
                | TemplateError::NoPaths { .. }
                | TemplateError::Unresolved { .. }
                | TemplateError::Lookup { .. }
        )
    }
}

fn join_attempts(attempts: &[(String, TemplateError)]) -> String {
    attempts
        .iter()
        .map(|(loader, err)| format!("[{}]: {}", loader, err))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type alias for template operations.
pub type Result<T> = std::result::Result<T, TemplateError>;
