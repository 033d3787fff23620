//! Error types for netalert
//!
//! The variants follow the failure taxonomy the reconciliation engine relies on:
//! transport failures, remote rejections, input validation, name resolution,
//! and cancellation. Annotation failures are never represented here as fatal;
//! the engine downgrades them to [`crate::engine::Warning`]s.

use std::fmt;
use thiserror::Error;

/// Result type alias for netalert operations
pub type Result<T> = std::result::Result<T, Error>;

/// Remote operation a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateAlert,
    FetchAlert,
    ReplaceFilters,
    DeleteAlert,
    AddTrigger,
    AddNotifier,
    DomainInfo,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::CreateAlert => "create alert",
            Operation::FetchAlert => "fetch alert",
            Operation::ReplaceFilters => "replace alert filters",
            Operation::DeleteAlert => "delete alert",
            Operation::AddTrigger => "add trigger",
            Operation::AddNotifier => "add notifier",
            Operation::DomainInfo => "domain info",
        };
        f.write_str(name)
    }
}

/// Core error type for netalert
#[derive(Error, Debug)]
pub enum Error {
    /// Request construction or connection failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-success status returned by the remote service
    #[error("{operation} failed for {target}: API request failed with status {status}: {body}")]
    Remote {
        /// Which remote operation was rejected
        operation: Operation,
        /// Alert id, domain, or alert name the request targeted
        target: String,
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// Fetch of an alert the remote service does not know
    #[error("Alert not found: {id}")]
    AlertNotFound {
        /// The alert id that was requested
        id: String,
    },

    /// Invalid input, rejected before any network call
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Name resolution failed or returned no addresses
    #[error("Failed to resolve domain {domain}: {message}")]
    Resolution {
        /// The domain being resolved
        domain: String,
        /// What went wrong
        message: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The caller abandoned the operation
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// A domain change deleted the old alert, then creating its
    /// replacement failed. The old id no longer exists remotely.
    #[error("alert {old_id} was deleted but its replacement could not be created: {source}")]
    ReplacementFailed {
        old_id: String,
        #[source]
        source: Box<Error>,
    },

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a remote rejection error
    pub fn remote(
        operation: Operation,
        target: impl Into<String>,
        status: u16,
        body: impl Into<String>,
    ) -> Self {
        Self::Remote {
            operation,
            target: target.into(),
            status,
            body: body.into(),
        }
    }

    /// Create an "alert not found" error
    pub fn alert_not_found(id: impl Into<String>) -> Self {
        Self::AlertNotFound { id: id.into() }
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a resolution error
    pub fn resolution(domain: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Resolution {
            domain: domain.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a cancellation error
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Wrap the failure to create the replacement of a deleted alert
    pub fn replacement_failed(old_id: impl Into<String>, source: Error) -> Self {
        Self::ReplacementFailed {
            old_id: old_id.into(),
            source: Box::new(source),
        }
    }

    /// True for a fetch against an unknown alert id
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::AlertNotFound { .. })
    }

    /// True for failures raised before any request was dispatched
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_) | Self::Resolution { .. } | Self::Config(_)
        )
    }

    /// HTTP status of a remote rejection, if this is one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { status, .. } => Some(*status),
            Self::AlertNotFound { .. } => Some(404),
            Self::ReplacementFailed { source, .. } => source.status(),
            _ => None,
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
