//! Error types for rostermerge.
//!
//! All errors are strongly typed using thiserror. "No match found" is never an
//! error: it is the ordinary `Added` outcome of a merge pass.

use thiserror::Error;

use crate::entity::EntityId;
use crate::source::SourceId;

/// Validation errors raised while constructing values or loading configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Name cannot be empty")]
    EmptyName,

    #[error("Invalid friend code '{value}': expected 12 digits")]
    InvalidFriendCode {
        value: String,
    },

    #[error("Invalid country code '{value}': expected two ASCII letters")]
    InvalidCountryCode {
        value: String,
    },

    #[error("Unknown source referenced by stored value: {id}")]
    UnknownSource {
        id: SourceId,
    },

    #[error("Invalid configuration for '{field}': {reason}")]
    InvalidConfig {
        field: String,
        reason: String,
    },
}

/// Errors raised by the merge engine itself.
#[derive(Debug, Error)]
pub enum MergeError {
    /// The finalize loop hit its iteration cap without reaching a fixpoint.
    ///
    /// This signals a scoring or ordering invariant violation and must not be
    /// retried.
    #[error("Merge did not converge after {iterations} iterations (cap: {cap})")]
    ConvergenceFailed {
        iterations: usize,
        cap: usize,
    },

    /// A merge record referenced an entity the perform phase could not locate.
    #[error("Entity missing during perform phase: {id}")]
    MissingEntity {
        id: EntityId,
    },
}

/// Top-level error type for rostermerge.
#[derive(Debug, Error)]
pub enum RosterError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Merge error: {0}")]
    Merge(#[from] MergeError),

    #[error("Snapshot error: {message}")]
    Snapshot {
        message: String,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl RosterError {
    /// Creates a snapshot error.
    #[must_use]
    pub fn snapshot(message: impl Into<String>) -> Self {
        Self::Snapshot {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a merge engine error.
    #[must_use]
    pub const fn is_merge(&self) -> bool {
        matches!(self, Self::Merge(_))
    }

    /// Returns true if this error is a convergence failure.
    #[must_use]
    pub const fn is_convergence_failure(&self) -> bool {
        matches!(self, Self::Merge(MergeError::ConvergenceFailed { .. }))
    }

    /// Returns true if this error is retryable.
    ///
    /// Snapshot I/O may succeed on a later attempt; everything else is
    /// deterministic and will fail the same way again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Snapshot { .. })
    }
}

impl From<serde_json::Error> for RosterError {
    fn from(err: serde_json::Error) -> Self {
        Self::snapshot(err.to_string())
    }
}

impl From<std::io::Error> for RosterError {
    fn from(err: std::io::Error) -> Self {
        Self::snapshot(err.to_string())
    }
}

/// Result type alias for rostermerge operations.
pub type RosterResult<T> = Result<T, RosterError>;
