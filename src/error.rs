//! Error types for oci-discovery.
//!
//! This module defines the error hierarchy using `thiserror`. Every variant
//! records the source location where it was raised so that a failure deep in
//! a post-processing hook can be traced back without a backtrace.
//!
//! # Error Categories
//!
//! - **Discovery errors**: list/read calls that failed against the cloud API
//! - **Attribute errors**: a hook expected an attribute the live resource lacks
//! - **Render errors**: a renderer could not produce valid configuration
//! - **Registry errors**: unknown resource classes, cyclic association graphs
//! - **Config errors**: invalid configuration files
//!
//! # Example
//!
//! ```rust
//! use oci_discovery::error::{OciDiscoveryError, Result};
//!
//! fn read_snapshot(path: &str) -> Result<String> {
//!     std::fs::read_to_string(path).map_err(|e| OciDiscoveryError::Io {
//!         path: path.into(),
//!         source: e,
//!         src_path: file!(),
//!         src_line: line!(),
//!     })
//! }
//! ```

use crate::client::ClientError;
use std::path::PathBuf;
use thiserror::Error;

/// Macro to create errors with automatic source location tracking.
///
/// Usage:
/// ```ignore
/// return Err(err!(ConfigMissing { key: "compartment_id".to_string() }));
/// ```
#[macro_export]
macro_rules! err {
    ($variant:ident { $($field:ident: $value:expr),* $(,)? }) => {
        $crate::error::OciDiscoveryError::$variant {
            $($field: $value,)*
            src_path: file!(),
            src_line: line!(),
        }
    };
}

/// A specialized Result type for oci-discovery operations.
pub type Result<T> = std::result::Result<T, OciDiscoveryError>;

/// The main error type for oci-discovery.
#[derive(Error, Debug)]
pub enum OciDiscoveryError {
    // =========================================================================
    // I/O and File System Errors
    // =========================================================================
    /// I/O error with path context.
    #[error("I/O error at '{path}' ({src_path}:{src_line}): {source}")]
    Io {
        /// The path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// File not found.
    #[error("File not found: {path} ({src_path}:{src_line})")]
    FileNotFound {
        /// The missing file path
        path: PathBuf,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// A tenancy snapshot document could not be parsed.
    #[error("Failed to parse snapshot '{path}' ({src_path}:{src_line}): {message}")]
    SnapshotParse {
        /// The snapshot file
        path: PathBuf,
        /// Parser message
        message: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    // =========================================================================
    // Discovery Errors
    // =========================================================================
    /// A list/read/find call failed while discovering a resource class.
    #[error("Failed to discover '{resource_class}' ({src_path}:{src_line}): {message}")]
    DiscoveryFailure {
        /// The resource class being discovered
        resource_class: String,
        /// Error message
        message: String,
        /// The client error, when the failure came from an API call
        #[source]
        source: Option<ClientError>,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// A hook expected an attribute that the live resource does not have.
    #[error("Resource '{resource}' is missing required attribute '{attribute}' ({src_path}:{src_line})")]
    MissingRequiredAttribute {
        /// Terraform reference or id of the resource
        resource: String,
        /// The missing attribute
        attribute: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// An attribute holds a value of an unexpected type.
    #[error("Attribute '{attribute}' of '{resource}' is a {found}, expected {expected} ({src_path}:{src_line})")]
    AttributeType {
        /// Terraform reference or id of the resource
        resource: String,
        /// The attribute name
        attribute: String,
        /// Expected type name
        expected: &'static str,
        /// Actual type name
        found: &'static str,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    // =========================================================================
    // Rendering Errors
    // =========================================================================
    /// A renderer could not produce valid configuration.
    #[error("Failed to render '{resource}' ({src_path}:{src_line}): {message}")]
    RenderFailure {
        /// Terraform reference of the resource (or the output file)
        resource: String,
        /// Error message
        message: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    // =========================================================================
    // Registry Errors
    // =========================================================================
    /// No hint registered for a resource class.
    #[error("No resource hint registered for '{resource_class}' ({src_path}:{src_line})")]
    HintNotFound {
        /// The unknown class
        resource_class: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// No export step with the given name.
    #[error("Unknown export step '{step}' ({src_path}:{src_line})")]
    StepNotFound {
        /// The unknown step name
        step: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// Circular association detected.
    #[error("Circular association detected in step '{step}' ({src_path}:{src_line}): {cycle}")]
    CircularDependency {
        /// The step whose graph contains the cycle
        step: String,
        /// Description of the cycle
        cycle: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration parsing error.
    #[error("Failed to parse configuration ({src_path}:{src_line}): {message}")]
    ConfigParse {
        /// Error message
        message: String,
        /// The underlying error (if any)
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration value for '{key}' ({src_path}:{src_line}): {message}")]
    ConfigValue {
        /// The configuration key
        key: String,
        /// Error message
        message: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// Missing required configuration.
    #[error("Missing required configuration: {key} ({src_path}:{src_line})")]
    ConfigMissing {
        /// The missing configuration key
        key: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    // =========================================================================
    // Report Errors
    // =========================================================================
    /// Report generation error.
    #[error("Failed to generate report ({src_path}:{src_line}): {message}")]
    ReportGeneration {
        /// Error message
        message: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    // =========================================================================
    // Generic Errors
    // =========================================================================
    /// Internal error (should not happen in normal operation).
    #[error("Internal error ({src_path}:{src_line}): {message}")]
    Internal {
        /// Error message
        message: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },
}

impl OciDiscoveryError {
    /// Creates an `Io` error.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error, src_path: &'static str, src_line: u32) -> Self {
        Self::Io { path: path.into(), source, src_path, src_line }
    }

    /// Creates a `DiscoveryFailure` from a client error.
    #[must_use]
    pub fn discovery(resource_class: &str, source: ClientError, src_path: &'static str, src_line: u32) -> Self {
        Self::DiscoveryFailure {
            resource_class: resource_class.to_string(),
            message: source.to_string(),
            source: Some(source),
            src_path,
            src_line,
        }
    }

    /// Creates a `ConfigParse` error.
    #[must_use]
    pub fn config_parse(message: String, source: Option<Box<dyn std::error::Error + Send + Sync>>, src_path: &'static str, src_line: u32) -> Self {
        Self::ConfigParse { message, source, src_path, src_line }
    }

    /// Creates an `Internal` error.
    #[must_use]
    pub fn internal(message: String, src_path: &'static str, src_line: u32) -> Self {
        Self::Internal { message, src_path, src_line }
    }

    /// Whether the export may continue with other associations after this
    /// error when `continue_on_error` is enabled.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::DiscoveryFailure { .. }
                | Self::MissingRequiredAttribute { .. }
                | Self::AttributeType { .. }
                | Self::RenderFailure { .. }
        )
    }

    /// Returns the appropriate exit code for the error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Io { source, .. } if source.kind() == std::io::ErrorKind::PermissionDenied => 13,
            Self::FileNotFound { .. } => 14,
            Self::SnapshotParse { .. } => 15,
            Self::DiscoveryFailure { .. } => 16,
            Self::MissingRequiredAttribute { .. } | Self::AttributeType { .. } => 17,
            Self::ConfigParse { .. } => 18,
            Self::ConfigValue { .. } => 19,
            Self::ConfigMissing { .. } => 20,
            Self::RenderFailure { .. } => 22,
            _ => 1,
        }
    }
}

/// Extension trait for `Result` to add context to errors.
pub trait ResultExt<T> {
    /// Adds a file path context to an I/O error.
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| OciDiscoveryError::Io {
            path: path.into(),
            source: match e.into().downcast::<std::io::Error>() {
                Ok(io) => *io,
                Err(other) => std::io::Error::other(other),
            },
            src_path: file!(),
            src_line: line!(),
        })
    }
}

/// Causes of `error` whose text is not already part of the messages before
/// them, outermost first.
///
/// Several variants embed their source in their own message; printing the
/// whole chain would repeat it.
#[must_use]
pub fn distinct_causes(error: &(dyn std::error::Error + 'static)) -> Vec<String> {
    let mut told = error.to_string();
    let mut causes = Vec::new();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !told.contains(&text) {
            told.push('\n');
            told.push_str(&text);
            causes.push(text);
        }
        source = cause.source();
    }
    causes
}

impl From<serde_json::Error> for OciDiscoveryError {
    fn from(source: serde_json::Error) -> Self {
        Self::Internal {
            message: format!("JSON serialization/deserialization error: {source}"),
            src_path: file!(),
            src_line: line!(),
        }
    }
}
