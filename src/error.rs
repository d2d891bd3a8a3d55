//! Error types for Waypost operations.
//!
//! This module defines [`WaypostError`], the error type used outside the
//! flow engine, and a [`Result`] type alias for convenience. The engine's
//! own errors live in [`crate::flow::error`].
//!
//! # Error Handling Strategy
//!
//! - Use `WaypostError` for errors that need distinct handling by the CLI
//! - Use `anyhow::Error` (via `WaypostError::Other`) for unexpected errors
//! - All errors should provide actionable messages for users

use std::path::PathBuf;
use thiserror::Error;

use crate::flow::{FlowError, SchemaError};

/// Core error type for Waypost operations.
#[derive(Debug, Error)]
pub enum WaypostError {
    /// Configuration file not found at expected location.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse configuration file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// Invalid configuration structure or values.
    #[error("Invalid configuration: {message}")]
    ConfigValidationError { message: String },

    /// No flow with this name is registered.
    #[error("Unknown flow: {name}")]
    UnknownFlow { name: String },

    /// A non-interactive run had no answer for a field.
    #[error("No answer for '{field}' in non-interactive mode (use --set {field}=VALUE)")]
    MissingInput { field: String },

    /// A flow definition failed registration checks.
    #[error("Flow '{flow}' is misconfigured: {source}")]
    Schema {
        flow: String,
        #[source]
        source: SchemaError,
    },

    /// A flow operation failed.
    #[error(transparent)]
    Flow(#[from] FlowError),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for Waypost operations.
pub type Result<T> = std::result::Result<T, WaypostError>;
