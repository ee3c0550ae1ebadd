//! Error types for ECM telemetry processing.
//!
//! All errors implement the `std::error::Error` trait and carry structured context
//! for debugging and recovery guidance.
//!
//! ## Error Categories
//!
//! - **Schema Errors**: Malformed or duplicate field definitions (fatal at startup)
//! - **Lookup Errors**: Requests for field names the map does not contain
//! - **Packet Errors**: Packets too malformed to decode at all
//! - **Acquisition Errors**: Serial link failures and timeouts (recovered by fallback)
//! - **Sink Errors**: Client disconnects (terminate one streaming loop only)
//! - **Configuration Errors**: Invalid or unreadable configuration
//!
//! Per-field bounds misses are not errors: the decoder omits those fields and
//! returns everything else.
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use ecmwatch::EcmError;
//!
//! let error = EcmError::acquisition_failed("serial port not present");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for ECM operations.
pub type Result<T, E = EcmError> = std::result::Result<T, E>;

/// Main error type for ECM telemetry operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum EcmError {
    #[error("Invalid field spec '{name}': {reason}")]
    InvalidSpec { name: String, reason: String },

    #[error("Field '{name}' is already registered")]
    DuplicateName { name: String },

    #[error("Field '{name}' not found in field map")]
    UnknownField { name: String },

    #[error("Malformed packet: {reason}")]
    MalformedPacket { reason: String },

    #[error("ECM acquisition failed: {reason}")]
    Acquisition {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("Sink closed: {reason}")]
    SinkClosed { reason: String },

    #[error("Configuration error: {reason}")]
    Config { reason: String },

    #[error("I/O error: {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error in {context}: {details}")]
    Serialization { context: String, details: String },
}

impl EcmError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            EcmError::Acquisition { .. } => true,
            EcmError::Timeout { .. } => true,
            EcmError::MalformedPacket { .. } => true,
            EcmError::SinkClosed { .. } => false,
            EcmError::InvalidSpec { .. } => false,
            EcmError::DuplicateName { .. } => false,
            EcmError::UnknownField { .. } => false,
            EcmError::Config { .. } => false,
            EcmError::Io { .. } => false,
            EcmError::Serialization { .. } => false,
        }
    }

    /// Returns whether this error must stop the process during startup.
    pub fn is_fatal_at_startup(&self) -> bool {
        matches!(
            self,
            EcmError::InvalidSpec { .. }
                | EcmError::DuplicateName { .. }
                | EcmError::Config { .. }
                | EcmError::Io { .. }
        )
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            EcmError::InvalidSpec { .. } => vec![
                "Use a field width of 1, 2 or 4 bytes",
                "Check the field offset against the packet layout",
            ],
            EcmError::DuplicateName { .. } => vec![
                "Give every field a unique name",
                "Alias bytes by sharing an offset, not a name",
            ],
            EcmError::UnknownField { .. } => vec![
                "Check field name spelling",
                "Verify the field exists in the active field map",
            ],
            EcmError::MalformedPacket { .. } => vec![
                "Check the serial link for dropped bytes",
                "Verify the ECM responded to the data request",
            ],
            EcmError::Acquisition { .. } => vec![
                "Ensure the ECM is powered and the ignition is on",
                "Check the serial port path and permissions",
                "Verify the baud rate matches the ECM",
            ],
            EcmError::Timeout { .. } => vec![
                "Increase the acquisition timeout",
                "Check the ECM is responding to requests",
            ],
            EcmError::SinkClosed { .. } => vec!["Reconnect the dashboard client"],
            EcmError::Config { .. } => vec![
                "Check the configuration file syntax",
                "Verify intervals and timeouts are non-zero",
            ],
            EcmError::Io { .. } => vec![
                "Check file exists and is readable",
                "Check file permissions",
            ],
            EcmError::Serialization { .. } => vec![
                "Check the YAML or JSON document structure",
                "Verify every field entry has all required keys",
            ],
        }
    }

    /// Helper constructor for invalid field specs.
    pub fn invalid_spec(name: impl Into<String>, reason: impl Into<String>) -> Self {
        EcmError::InvalidSpec { name: name.into(), reason: reason.into() }
    }

    /// Helper constructor for unknown field lookups.
    pub fn unknown_field(name: impl Into<String>) -> Self {
        EcmError::UnknownField { name: name.into() }
    }

    /// Helper constructor for malformed packets.
    pub fn malformed_packet(reason: impl Into<String>) -> Self {
        EcmError::MalformedPacket { reason: reason.into() }
    }

    /// Helper constructor for acquisition failures.
    pub fn acquisition_failed(reason: impl Into<String>) -> Self {
        EcmError::Acquisition { reason: reason.into(), source: None }
    }

    /// Helper constructor for acquisition failures with source.
    pub fn acquisition_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        EcmError::Acquisition { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for closed sinks.
    pub fn sink_closed(reason: impl Into<String>) -> Self {
        EcmError::SinkClosed { reason: reason.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        EcmError::Config { reason: reason.into() }
    }

    /// Helper constructor for file errors with path context.
    pub fn io_error(path: PathBuf, source: std::io::Error) -> Self {
        EcmError::Io { path, source }
    }
}

impl From<std::io::Error> for EcmError {
    fn from(err: std::io::Error) -> Self {
        EcmError::Io { path: PathBuf::from("<unknown>"), source: err }
    }
}

impl From<serde_yaml_ng::Error> for EcmError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        EcmError::Serialization { context: "YAML".to_string(), details: err.to_string() }
    }
}

impl From<serde_json::Error> for EcmError {
    fn from(err: serde_json::Error) -> Self {
        EcmError::Serialization { context: "JSON".to_string(), details: err.to_string() }
    }
}

impl From<serialport::Error> for EcmError {
    fn from(err: serialport::Error) -> Self {
        EcmError::acquisition_failed_with_source("serial port error", Box::new(err))
    }
}
