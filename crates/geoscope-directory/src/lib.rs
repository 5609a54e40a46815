//! # geoscope-directory — Actor Directory
//!
//! Stores each administrative actor's level, geographic assignment,
//! status and permission flags, and enforces identity uniqueness at the
//! directory boundary.
//!
//! Access checks must fetch actors through
//! [`ActorDirectory::get_active`]; [`ActorDirectory::get`] also returns
//! inactive and suspended actors and exists for audit and lookup.
//!
//! Test fixtures are ordinary actors seeded through
//! [`InMemoryDirectory::seed`]. There is no privileged debug identity.

pub mod actor;
pub mod error;
pub mod snapshot;
pub mod store;

pub use actor::{Actor, NewActor};
pub use error::DirectoryError;
pub use snapshot::{load_directory, ActorSeed};
pub use store::{ActorDirectory, InMemoryDirectory};
