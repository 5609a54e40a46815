//! # Directory Snapshots
//!
//! Exported actor tables for loading an [`InMemoryDirectory`]. Seeds
//! carry only what an operator writes by hand: flags default to the level
//! table and may be overridden per field, timestamps default to load time.

use geoscope_core::{
    default_permissions, ActorId, ActorStatus, AdminLevel, GeoAssignment, PermissionOverrides,
    Timestamp,
};
use serde::{Deserialize, Serialize};

use crate::actor::Actor;
use crate::error::DirectoryError;
use crate::store::InMemoryDirectory;

/// One actor as written in a snapshot file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorSeed {
    pub id: ActorId,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    pub admin_level: AdminLevel,
    #[serde(default = "active")]
    pub status: ActorStatus,
    #[serde(flatten)]
    pub assignment: GeoAssignment,
    #[serde(default)]
    pub permissions: PermissionOverrides,
    #[serde(default)]
    pub created_by: Option<ActorId>,
}

fn active() -> ActorStatus {
    ActorStatus::Active
}

impl ActorSeed {
    /// Materialize the actor, stamping both timestamps with `now`.
    pub fn into_actor(self, now: Timestamp) -> Actor {
        Actor {
            id: self.id,
            username: self.username,
            email: self.email,
            full_name: self.full_name,
            admin_level: self.admin_level,
            status: self.status,
            assignment: self.assignment,
            permissions: default_permissions(self.admin_level).with_overrides(&self.permissions),
            created_by: self.created_by,
            created_at: now,
            updated_at: now,
            last_login: None,
        }
    }
}

/// Load seeds into a fresh directory.
///
/// # Errors
///
/// The first seed that collides with an earlier one.
pub fn load_directory(seeds: Vec<ActorSeed>) -> Result<InMemoryDirectory, DirectoryError> {
    let directory = InMemoryDirectory::new();
    let now = Timestamp::now();
    for seed in seeds {
        directory.seed(seed.into_actor(now))?;
    }
    tracing::debug!(actors = directory.len(), "actor directory loaded");
    Ok(directory)
}
