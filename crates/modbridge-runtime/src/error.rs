//! Error types for the modbridge runtime.

use std::io::ErrorKind;
use thiserror::Error;

/// Errors that can occur while discovering and inspecting add-on modules.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The file is not a valid module image (foreign or malformed format).
    #[error("Invalid module image: {0}")]
    InvalidImage(String),

    /// A path could not be derived or is unusable.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// A bridge failed during activation or teardown.
    #[error("Bridge lifecycle error in '{type_name}': {message}")]
    Lifecycle { type_name: String, message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory walk error.
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RuntimeError {
    /// Build a lifecycle error for a bridge type.
    pub fn lifecycle(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        RuntimeError::Lifecycle {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// Whether this is an anticipated environmental failure.
    ///
    /// Only these are swallowed while resolving profiles or enumerating
    /// source directories; anything else is handed back to the host.
    pub fn is_recoverable(&self) -> bool {
        match self {
            RuntimeError::Io(_) | RuntimeError::Walk(_) => true,
            RuntimeError::InvalidImage(_) => true,
            _ => false,
        }
    }

    /// The IO error kind behind this error, if any.
    pub fn io_kind(&self) -> Option<ErrorKind> {
        match self {
            RuntimeError::Io(e) => Some(e.kind()),
            RuntimeError::Walk(e) => e.io_error().map(|io| io.kind()),
            _ => None,
        }
    }
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = std::result::Result<T, RuntimeError>;
