//! # Actor Records
//!
//! [`Actor`] is one administrative account. [`NewActor`] is what a caller
//! hands to the directory; the directory assigns the id and timestamps.

use geoscope_core::{
    ActorId, ActorStatus, AdminLevel, AssignmentError, DistrictId, DivisionId, GeoAssignment,
    PermissionFlag, PermissionFlags, RegionId, SchoolId, Timestamp, ValidationError,
};
use serde::{Deserialize, Serialize};

/// An administrative actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    pub admin_level: AdminLevel,
    pub status: ActorStatus,
    #[serde(flatten)]
    pub assignment: GeoAssignment,
    #[serde(flatten)]
    pub permissions: PermissionFlags,
    /// The actor that created this account. `None` for bootstrap accounts.
    pub created_by: Option<ActorId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<Timestamp>,
}

impl Actor {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn has(&self, flag: PermissionFlag) -> bool {
        self.permissions.get(flag)
    }

    pub fn region_id(&self) -> Option<RegionId> {
        self.assignment.region_id
    }

    pub fn division_id(&self) -> Option<DivisionId> {
        self.assignment.division_id
    }

    pub fn district_id(&self) -> Option<DistrictId> {
        self.assignment.district_id
    }

    pub fn school_id(&self) -> Option<SchoolId> {
        self.assignment.school_id
    }

    /// Check that the stored geography fits the stored level.
    pub fn validate_assignment(&self) -> Result<(), AssignmentError> {
        self.assignment.validate_for(self.admin_level)
    }
}

/// Input for [`crate::ActorDirectory::insert`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewActor {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    pub admin_level: AdminLevel,
    #[serde(flatten)]
    pub assignment: GeoAssignment,
    #[serde(flatten)]
    pub permissions: PermissionFlags,
    pub created_by: Option<ActorId>,
}

impl NewActor {
    /// Trim identity fields and lowercase the email.
    pub fn normalized(mut self) -> Self {
        self.username = self.username.trim().to_string();
        self.email = self.email.trim().to_ascii_lowercase();
        self.full_name = self.full_name.trim().to_string();
        self
    }

    /// Check the identity fields.
    ///
    /// # Errors
    ///
    /// [`ValidationError::EmptyField`] for a blank username,
    /// [`ValidationError::InvalidEmail`] for an email without a local part
    /// and a dotted domain.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_username(&self.username)?;
        validate_email(&self.email)
    }
}

pub(crate) fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.trim().is_empty() {
        return Err(ValidationError::EmptyField("username"));
    }
    Ok(())
}

pub(crate) fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail(email.to_string()))
    }
}
