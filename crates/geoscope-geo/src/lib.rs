//! # geoscope-geo — Geographic Hierarchy Index
//!
//! Read-only index over the Region → Division → District → School tree.
//! The tables are owned by an external import collaborator; this crate
//! validates a snapshot of them (every node has exactly one existing
//! parent, ids are unique per tier) and answers parent/child queries.
//!
//! - [`GeoHierarchy`] is the query trait consumed by the policy crate.
//! - [`InMemoryHierarchy`] is the snapshot-backed implementation.
//! - [`GeoSnapshot`] is the YAML/JSON file format.

pub mod hierarchy;
pub mod node;
pub mod snapshot;

pub use hierarchy::{
    Ancestry, GeoHierarchy, HierarchyBuilder, HierarchyError, InMemoryHierarchy, Subtree,
};
pub use node::{District, Division, GeoNode, Region, School};
pub use snapshot::GeoSnapshot;
