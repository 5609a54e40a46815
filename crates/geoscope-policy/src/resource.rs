//! # Resources
//!
//! Each [`ResourceType`] is gated by exactly one permission flag. Parsing
//! an unknown resource type fails at construction with
//! [`ValidationError::UnknownResourceType`], so a typo can never turn into
//! a silent deny or a silent allow.

use geoscope_core::{GeoAssignment, PermissionFlag, ValidationError};
use serde::{Deserialize, Serialize};

/// Where a resource lives. Same shape as an actor's assignment; any subset
/// of the columns may be set.
pub type ResourceLocation = GeoAssignment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// Administrative accounts.
    User,
    /// Form submissions.
    Form,
    /// System and audit logs.
    System,
    /// Submission deadlines.
    Deadline,
}

impl ResourceType {
    pub const ALL: [ResourceType; 4] = [Self::User, Self::Form, Self::System, Self::Deadline];

    /// The flag an actor needs to act on this resource.
    pub fn required_flag(&self) -> PermissionFlag {
        match self {
            Self::User => PermissionFlag::CanManageUsers,
            Self::Form => PermissionFlag::CanApproveSubmissions,
            Self::System => PermissionFlag::CanViewSystemLogs,
            Self::Deadline => PermissionFlag::CanSetDeadlines,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Form => "form",
            Self::System => "system",
            Self::Deadline => "deadline",
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResourceType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "form" => Ok(Self::Form),
            "system" => Ok(Self::System),
            "deadline" => Ok(Self::Deadline),
            _ => Err(ValidationError::UnknownResourceType(s.to_string())),
        }
    }
}

/// What the actor intends to do. Recorded in audit events; the gate
/// itself depends only on the resource type and location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceAction {
    View,
    Create,
    Update,
    Delete,
    Approve,
    Export,
}

impl ResourceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Approve => "approve",
            Self::Export => "export",
        }
    }
}

impl std::fmt::Display for ResourceAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResourceAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "view" | "read" => Ok(Self::View),
            "create" => Ok(Self::Create),
            "update" | "edit" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            "approve" | "review" => Ok(Self::Approve),
            "export" => Ok(Self::Export),
            _ => Err(ValidationError::UnknownAction(s.to_string())),
        }
    }
}
