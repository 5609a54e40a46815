//! # Audit Recorder
//!
//! Best-effort front end to an [`AuditSink`]. Recording never fails the
//! caller: a sink error is logged at `error` on the `geoscope::audit`
//! target, counted, and handed to the optional failure hook.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::AuditError;
use crate::event::{AuditEntry, AuditEvent};
use crate::sink::AuditSink;

/// Tracing target for audit records and failures.
pub const AUDIT_TARGET: &str = "geoscope::audit";

/// Called with the entry that could not be written and the error.
pub type FailureHook = Arc<dyn Fn(&AuditEntry, &AuditError) + Send + Sync>;

#[derive(Clone)]
pub struct AuditRecorder {
    sink: Arc<dyn AuditSink>,
    failures: Arc<AtomicU64>,
    on_failure: Option<FailureHook>,
}

impl fmt::Debug for AuditRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditRecorder")
            .field("recorded", &self.sink.len())
            .field("failures", &self.failure_count())
            .field("on_failure", &self.on_failure.is_some())
            .finish()
    }
}

impl AuditRecorder {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self {
            sink,
            failures: Arc::new(AtomicU64::new(0)),
            on_failure: None,
        }
    }

    pub fn with_failure_hook(mut self, hook: FailureHook) -> Self {
        self.on_failure = Some(hook);
        self
    }

    /// Record one entry. Returns the sealed event, or `None` if the sink
    /// failed.
    pub fn record(&self, entry: AuditEntry) -> Option<AuditEvent> {
        match self.sink.append(entry.clone()) {
            Ok(event) => {
                tracing::info!(
                    target: AUDIT_TARGET,
                    sequence = event.sequence,
                    actor_id = %event.actor_id,
                    action = %event.action,
                    resource_type = %event.resource_type,
                    resource_id = event.resource_id.as_deref().unwrap_or(""),
                    "audit event recorded"
                );
                Some(event)
            }
            Err(err) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("geoscope_audit_failures_total").increment(1);
                tracing::error!(
                    target: AUDIT_TARGET,
                    actor_id = %entry.actor_id,
                    action = %entry.action,
                    resource_type = %entry.resource_type,
                    error = %err,
                    "failed to record audit event"
                );
                if let Some(hook) = &self.on_failure {
                    hook(&entry, &err);
                }
                None
            }
        }
    }

    /// Number of entries the sink rejected since this recorder was built.
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn recorded(&self) -> u64 {
        self.sink.len()
    }
}
