//! # Error Types
//!
//! Structured errors shared by every geoscope crate. All errors derive
//! `thiserror::Error`.
//!
//! - [`ValidationError`] covers malformed caller input: unparseable
//!   levels or resource types, bad identifiers, empty usernames.
//! - [`AssignmentError`] covers a geographic assignment that does not fit
//!   the admin level it is paired with, or contradicts the hierarchy.
//! - [`CanonicalizationError`] covers failures producing digest input.

use thiserror::Error;

use crate::level::AdminLevel;

/// Malformed input rejected at construction time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Identifier was zero, negative, or not a number.
    #[error("invalid {kind} id: {value}")]
    InvalidId {
        /// Which identifier namespace was being parsed.
        kind: &'static str,
        /// The offending value (0 when the input was not numeric).
        value: i64,
    },

    /// Admin level string did not name one of the five levels.
    #[error("unknown admin level: {0:?}")]
    UnknownAdminLevel(String),

    /// Actor status string did not name a known status.
    #[error("unknown actor status: {0:?}")]
    UnknownStatus(String),

    /// Resource type string did not map to a permission flag.
    #[error("unknown resource type: {0:?}")]
    UnknownResourceType(String),

    /// Resource action string is not recognised.
    #[error("unknown resource action: {0:?}")]
    UnknownAction(String),

    /// Permission flag name is not one of the five flags.
    #[error("unknown permission flag: {0:?}")]
    UnknownPermissionFlag(String),

    /// A required text field was empty or whitespace-only.
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    /// Email address failed the basic `local@domain` shape check.
    #[error("invalid email address: {0:?}")]
    InvalidEmail(String),
}

/// A geographic assignment that cannot be used for the given admin level.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssignmentError {
    /// A field the level requires is null.
    #[error("{level} assignment requires {field}")]
    MissingField {
        /// The admin level being validated.
        level: AdminLevel,
        /// The missing field name (e.g. `division_id`).
        field: &'static str,
    },

    /// A field the level forbids is set.
    #[error("{level} assignment must not set {field}")]
    UnexpectedField {
        /// The admin level being validated.
        level: AdminLevel,
        /// The unexpected field name.
        field: &'static str,
    },

    /// A referenced node is not present in the hierarchy.
    #[error("{kind} {id} does not exist")]
    UnknownNode {
        /// Node kind (`region`, `division`, ...).
        kind: &'static str,
        /// Raw identifier.
        id: i64,
    },

    /// A supplied ancestor contradicts the hierarchy.
    #[error("{kind} {id} belongs to {parent_kind} {actual}, not {claimed}")]
    AncestryMismatch {
        /// Kind of the node whose parent was checked.
        kind: &'static str,
        /// The node id.
        id: i64,
        /// Kind of the parent.
        parent_kind: &'static str,
        /// Parent id according to the hierarchy.
        actual: i64,
        /// Parent id the caller supplied.
        claimed: i64,
    },
}

/// Error producing canonical bytes for digest computation.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Floats are rejected: audit payloads must carry integers or strings.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
