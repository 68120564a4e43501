//! Error types for whaleprint.
//!
//! Errors are layered the same way the reconciliation cycle is: bundle and
//! settings problems surface as [`ConfigError`] before anything is planned,
//! incomparable trees abort the run with [`DiffError`], and control-plane
//! failures are [`BackendError`]s that the executor collects per entity.

use std::path::PathBuf;
use thiserror::Error;

use crate::planner::ActionKind;

/// The main error type for whaleprint.
#[derive(Debug, Error)]
pub enum WhaleprintError {
    /// Bundle, settings or argument errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The diff engine was handed incomparable trees.
    #[error("Diff error: {0}")]
    Diff(#[from] DiffError),

    /// Control-plane errors.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Reconciliation errors.
    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The bundle file was not found.
    #[error("Bundle file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The bundle file could not be parsed.
    #[error("Failed to parse bundle: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Bundle validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// No bundle file could be located.
    #[error("No .dab file found in {dir}; pass a stack name or --file")]
    NoBundleFound {
        /// Directory that was searched.
        dir: PathBuf,
    },

    /// More than one bundle file is present and none was selected.
    #[error("Multiple .dab files found ({candidates}); pass a stack name or --file")]
    AmbiguousBundle {
        /// Comma-separated candidate file names.
        candidates: String,
    },

    /// Bundles can only be read from the local filesystem.
    #[error("Remote bundles are not supported: {url}")]
    RemoteBundleUnsupported {
        /// The rejected location.
        url: String,
    },

    /// The control-plane address cannot be used.
    #[error("Invalid Docker host '{host}': {reason}")]
    InvalidDockerHost {
        /// The configured host.
        host: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Errors raised by the structural diff engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiffError {
    /// Two trees disagree on shape at the same path.
    #[error("Shape mismatch at '{path}': current is {current}, expected is {expected}")]
    ShapeMismatch {
        /// Dotted path where the shapes disagree.
        path: String,
        /// Shape found on the current side.
        current: String,
        /// Shape found on the expected side.
        expected: String,
    },
}

/// Control-plane errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// API request failed.
    #[error("API request failed: {status} - {message}")]
    ApiRequestFailed {
        /// HTTP status code.
        status: u16,
        /// Error message from the daemon.
        message: String,
    },

    /// Object not found.
    #[error("Not found: {id}")]
    NotFound {
        /// Id or name of the missing object.
        id: String,
    },

    /// The version token sent with an update is stale.
    #[error("Service {id} changed since it was read ({message}); retry the plan")]
    ConcurrencyConflict {
        /// Id of the service.
        id: String,
        /// Message from the daemon.
        message: String,
    },

    /// Transport error.
    #[error("Network error communicating with Docker: {message}")]
    NetworkError {
        /// Description of the network error.
        message: String,
    },

    /// Invalid response from the daemon.
    #[error("Invalid response from Docker API: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },

    /// An observed entity lacks the id or version an update needs.
    #[error("Service {name} has no remote id or version to update against")]
    MissingRemoteIdentity {
        /// Entity name.
        name: String,
    },
}

/// Reconciliation errors.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A prerequisite network could not be provisioned.
    #[error("Failed to provision network '{network}': {source}")]
    NetworkProvisioningFailed {
        /// Network name.
        network: String,
        /// Underlying backend failure.
        source: BackendError,
    },

    /// Reconciliation was aborted.
    #[error("Reconciliation aborted: {reason}")]
    Aborted {
        /// Reason for abort.
        reason: String,
    },
}

/// A single failed entity action, collected by the executor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{action} {name} failed: {source}")]
pub struct ExecutionError {
    /// Entity name.
    pub name: String,
    /// Action that failed.
    pub action: ActionKind,
    /// Backend failure.
    pub source: BackendError,
}

/// Result type alias for whaleprint operations.
pub type Result<T> = std::result::Result<T, WhaleprintError>;

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

impl BackendError {
    /// Creates an API request error.
    #[must_use]
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiRequestFailed {
            status,
            message: message.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    /// Returns true if running the plan again may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConcurrencyConflict { .. } | Self::NetworkError { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_is_retryable() {
        let conflict = BackendError::ConcurrencyConflict {
            id: String::from("abc"),
            message: String::from("update out of sequence"),
        };
        assert!(conflict.is_retryable());
        assert!(conflict.to_string().contains("retry the plan"));
        assert!(!BackendError::api_error(500, "boom").is_retryable());
    }

    #[test]
    fn test_execution_error_display() {
        let err = ExecutionError {
            name: String::from("app_web"),
            action: ActionKind::Create,
            source: BackendError::network("connection refused"),
        };
        assert_eq!(
            err.to_string(),
            "create app_web failed: Network error communicating with Docker: connection refused"
        );
    }
}
