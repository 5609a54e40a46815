//! # Engine Errors
//!
//! Policy gates return decisions, not errors. [`EngineError`] is what the
//! administrative service raises: lookups that miss, denials converted by
//! [`crate::AccessService::require`], and infrastructure failures.

use geoscope_core::{ActorId, ActorStatus, AssignmentError, ValidationError};
use geoscope_directory::DirectoryError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Actor or target absent.
    #[error("actor {0} not found")]
    NotFound(ActorId),

    /// A deadline, submission or other record is absent.
    #[error("{kind} {id} not found")]
    RecordNotFound { kind: &'static str, id: String },

    /// Actor exists but may not take part in access decisions.
    #[error("actor {id} is {status}")]
    Inactive { id: ActorId, status: ActorStatus },

    /// Policy said no.
    #[error("permission denied: {reason}")]
    PermissionDenied { reason: String },

    /// Geography inconsistent with the admin level or with the hierarchy.
    #[error("invalid assignment: {0}")]
    InvalidAssignment(#[from] AssignmentError),

    /// Username or email already registered.
    #[error("duplicate identity: {field} {value:?} is already registered")]
    DuplicateIdentity { field: &'static str, value: String },

    /// Malformed input.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A backing store could not be reached.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl EngineError {
    pub fn denied(reason: impl Into<String>) -> Self {
        Self::PermissionDenied {
            reason: reason.into(),
        }
    }

    /// Whether the caller should treat this as an outage rather than a
    /// rejected request.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<DirectoryError> for EngineError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound(id) => Self::NotFound(id),
            DirectoryError::Inactive { id, status } => Self::Inactive { id, status },
            DirectoryError::DuplicateIdentity { field, value } => {
                Self::DuplicateIdentity { field, value }
            }
            DirectoryError::Validation(e) => Self::Validation(e),
            DirectoryError::Unavailable(msg) => Self::Unavailable(msg),
        }
    }
}
