//! Error types for Whiteboard operations
//!
//! The tracker never fails on its own: every error raised by this crate
//! originates in a collaborator (predicate, publish action, registration
//! release) or in loading configuration.
//!
//! # Example
//!
//! ```rust
//! use whiteboard_core::error::{ErrorCategory, WhiteboardError};
//!
//! let err = WhiteboardError::ReleaseFailed { reason: "endpoint gone".to_string() };
//! assert_eq!(err.category(), ErrorCategory::Collaborator);
//! assert_eq!(err.error_code(), "RELEASE_FAILED");
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for Whiteboard operations
pub type Result<T> = std::result::Result<T, WhiteboardError>;

/// Error category for grouping related errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Raised by a predicate, publish action or registration
    Collaborator,
    /// Configuration or filter definition is invalid
    Validation,
    /// I/O or serialization failure
    External,
}

/// Errors that can occur in Whiteboard operations
#[derive(Error, Debug)]
pub enum WhiteboardError {
    // ═══════════════════════════════════════════════════════════════════════
    // Collaborator errors (propagated unchanged to the caller)
    // ═══════════════════════════════════════════════════════════════════════

    /// Predicate evaluation failed
    #[error("Predicate evaluation failed: {reason}")]
    PredicateFailed { reason: String },

    /// The publish action could not produce a registration
    #[error("Publish failed: {reason}")]
    PublishFailed { reason: String },

    /// Releasing a registration failed. The registration is no longer tracked.
    #[error("Release failed: {reason}")]
    ReleaseFailed { reason: String },

    // ═══════════════════════════════════════════════════════════════════════
    // Configuration errors
    // ═══════════════════════════════════════════════════════════════════════

    /// Filter definition is malformed
    #[error("Invalid filter: {reason}")]
    InvalidFilter { reason: String },

    /// Publisher configuration is malformed
    #[error("Invalid publisher config: {reason}")]
    InvalidConfig { reason: String },

    // ═══════════════════════════════════════════════════════════════════════
    // Infrastructure errors
    // ═══════════════════════════════════════════════════════════════════════

    /// JSON serialization or deserialization failed
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// I/O operation failed
    #[error("IO error: {message}")]
    IoError { message: String },
}

impl WhiteboardError {
    /// Returns true if retrying the same call might succeed
    ///
    /// Only publish and release failures qualify; a failing predicate or
    /// bad configuration will fail again with the same input.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            WhiteboardError::PublishFailed { .. }
                | WhiteboardError::ReleaseFailed { .. }
                | WhiteboardError::IoError { .. }
        )
    }

    /// Returns the error category for grouping
    pub fn category(&self) -> ErrorCategory {
        match self {
            WhiteboardError::PredicateFailed { .. }
            | WhiteboardError::PublishFailed { .. }
            | WhiteboardError::ReleaseFailed { .. } => ErrorCategory::Collaborator,

            WhiteboardError::InvalidFilter { .. }
            | WhiteboardError::InvalidConfig { .. } => ErrorCategory::Validation,

            WhiteboardError::JsonError(_)
            | WhiteboardError::IoError { .. } => ErrorCategory::External,
        }
    }

    /// Returns the stable error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            WhiteboardError::PredicateFailed { .. } => "PREDICATE_FAILED",
            WhiteboardError::PublishFailed { .. } => "PUBLISH_FAILED",
            WhiteboardError::ReleaseFailed { .. } => "RELEASE_FAILED",
            WhiteboardError::InvalidFilter { .. } => "INVALID_FILTER",
            WhiteboardError::InvalidConfig { .. } => "INVALID_CONFIG",
            WhiteboardError::JsonError(_) => "JSON_ERROR",
            WhiteboardError::IoError { .. } => "IO_ERROR",
        }
    }
}

impl From<std::io::Error> for WhiteboardError {
    fn from(err: std::io::Error) -> Self {
        WhiteboardError::IoError {
            message: err.to_string(),
        }
    }
}
