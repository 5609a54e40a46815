//! # geoscope-audit — Audit Trail
//!
//! Append-only record of administrative actions. Each event is sealed with
//! a SHA-256 digest over its canonical form and the digest of the event
//! before it, so the log can be checked for edits, gaps and reordering
//! with [`verify_chain`].
//!
//! Sinks:
//!
//! - [`MemoryAuditLog`]: shared in-process log with simple queries.
//! - [`JsonlAuditLog`]: one JSON object per line, synced on every append.
//!
//! Callers go through [`AuditRecorder`], which never propagates a sink
//! failure into the operation being audited.

pub mod error;
pub mod event;
pub mod recorder;
pub mod sink;

pub use error::AuditError;
pub use event::{verify_chain, AuditEntry, AuditEvent, ClientInfo};
pub use recorder::{AuditRecorder, FailureHook, AUDIT_TARGET};
pub use sink::{read_events, AuditSink, JsonlAuditLog, MemoryAuditLog};
