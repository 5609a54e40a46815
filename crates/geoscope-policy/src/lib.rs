//! # geoscope-policy — Scope Resolution and Permission Evaluation
//!
//! Decides what an administrative actor may see, create and act on in the
//! Central → Region → Division → District → School hierarchy.
//!
//! - [`scope`] resolves an actor into the subtree it may access.
//! - [`AccessEngine`] holds the gates: creation, management, resource and
//!   deadline. Gates return an [`AccessDecision`] with a reason.
//! - [`AccessService`] is the guard layer for request handlers: audited
//!   checks, account administration, deadlines and bulk submission review.
//!
//! Decisions are computed on every call from the directory and the
//! hierarchy. Nothing is cached, so an actor mutation takes effect on the
//! next check.
//!
//! [`AccessDecision`]: geoscope_core::AccessDecision

pub mod deadline;
pub mod error;
pub mod evaluator;
pub mod resource;
pub mod review;
pub mod scope;
pub mod service;

#[cfg(test)]
mod testing;

pub use deadline::{Deadline, DeadlineRegistry, DeadlineRequest};
pub use error::EngineError;
pub use evaluator::{can_see, AccessEngine};
pub use resource::{ResourceAction, ResourceLocation, ResourceType};
pub use review::{
    BulkReviewOutcome, ReviewAction, ReviewFailure, Submission, SubmissionStatus, SubmissionStore,
};
pub use scope::{resolve as resolve_actor_scope, AccessibleSet, GeoSet, ScopeDescriptor};
pub use service::{AccessService, ActorChanges, CentralInstruction, CreateActorRequest};
