//! # Directory Errors

use geoscope_core::{ActorId, ActorStatus, ValidationError};
use thiserror::Error;

/// Failure reported by an [`crate::ActorDirectory`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// No actor with this id.
    #[error("actor {0} not found")]
    NotFound(ActorId),

    /// The actor exists but is not active.
    #[error("actor {id} is {status}")]
    Inactive { id: ActorId, status: ActorStatus },

    /// Username or email already belongs to another actor.
    #[error("duplicate identity: {field} {value:?} is already registered")]
    DuplicateIdentity { field: &'static str, value: String },

    /// Identity fields failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Backing store could not be reached.
    #[error("actor directory unavailable: {0}")]
    Unavailable(String),
}

impl DirectoryError {
    /// Whether this is an infrastructure failure rather than a lookup miss.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
