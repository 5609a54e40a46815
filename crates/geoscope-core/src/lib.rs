//! # geoscope-core — Foundational Types
//!
//! Leaf crate of the geoscope workspace. Every other crate depends on it;
//! it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype identifiers.** `ActorId`, `RegionId`, `DivisionId`,
//!    `DistrictId`, `SchoolId` are distinct types with validated
//!    constructors. A division id can never be compared to a district id.
//!
//! 2. **No implicit level ordering.** `AdminLevel` is not `Ord`. The
//!    permission matrix is asymmetric and every gate matches on levels
//!    explicitly.
//!
//! 3. **Exhaustive flag lookup.** `PermissionFlag` addresses the five
//!    capability flags; there is no lookup by column-name string.
//!
//! 4. **Decisions are values.** `AccessDecision` always carries a reason.
//!
//! 5. **Digests flow through `CanonicalBytes`.** The audit hash chain only
//!    hashes canonicalized bytes.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `geoscope-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod assignment;
pub mod canonical;
pub mod decision;
pub mod digest;
pub mod error;
pub mod identity;
pub mod level;
pub mod permission;
pub mod temporal;

pub use assignment::{GeoAssignment, GeoRef};
pub use canonical::CanonicalBytes;
pub use decision::AccessDecision;
pub use digest::{sha256_digest, ContentDigest};
pub use error::{AssignmentError, CanonicalizationError, ValidationError};
pub use identity::{ActorId, DistrictId, DivisionId, RegionId, SchoolId};
pub use level::{ActorStatus, AdminLevel};
pub use permission::{default_permissions, PermissionFlag, PermissionFlags, PermissionOverrides};
pub use temporal::Timestamp;
