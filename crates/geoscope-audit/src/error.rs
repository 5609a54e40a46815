//! # Audit Errors

use geoscope_core::CanonicalizationError;
use thiserror::Error;

/// Failure writing, reading or verifying audit events.
#[derive(Error, Debug)]
pub enum AuditError {
    /// The event could not be canonicalized for hashing.
    #[error("audit event canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// The event could not be encoded or a stored line could not be decoded.
    #[error("audit serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The sink's storage failed.
    #[error("audit sink i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored event does not link to its predecessor or its digest does
    /// not match its content.
    #[error("audit chain broken at sequence {sequence}: {reason}")]
    ChainBroken { sequence: u64, reason: String },

    /// The sink refused the write.
    #[error("audit sink unavailable: {0}")]
    Unavailable(String),
}
