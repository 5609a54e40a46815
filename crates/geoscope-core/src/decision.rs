//! # Access Decisions
//!
//! Every gate returns an [`AccessDecision`]: a boolean plus the reason the
//! calling layer shows to the user. A denial never comes back as a bare
//! `false`.

use serde::{Deserialize, Serialize};

/// Outcome of a policy gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    /// Whether the action may proceed.
    pub allowed: bool,
    /// Human-readable explanation, suitable for display.
    pub reason: String,
}

impl AccessDecision {
    /// An allow decision.
    pub fn allow(reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            reason: reason.into(),
        }
    }

    /// A deny decision.
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
        }
    }

    /// Whether the action may proceed.
    pub fn is_allowed(&self) -> bool {
        self.allowed
    }

    /// Short label for logs and metrics.
    pub fn outcome(&self) -> &'static str {
        if self.allowed {
            "allow"
        } else {
            "deny"
        }
    }

    /// Convert into a `Result`, mapping a deny onto `err(reason)`.
    pub fn into_result<E>(self, err: impl FnOnce(String) -> E) -> Result<(), E> {
        if self.allowed {
            Ok(())
        } else {
            Err(err(self.reason))
        }
    }
}

impl std::fmt::Display for AccessDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.outcome(), self.reason)
    }
}
