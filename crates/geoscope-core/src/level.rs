//! # Admin Levels and Actor Status
//!
//! [`AdminLevel`] is the actor's position in the geographic hierarchy.
//! It deliberately does not implement `Ord`: the permission matrix is not a
//! strict ordering (a division may create region accounts), so "higher
//! level wins" comparisons would be wrong. Use [`AdminLevel::depth`] when
//! only the tree position matters.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// One of the five administrative tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminLevel {
    /// Central Office: nationwide.
    Central,
    /// Regional office.
    Region,
    /// Schools division office.
    Division,
    /// District office.
    District,
    /// A single school.
    School,
}

impl AdminLevel {
    /// All levels, top of the tree first.
    pub const ALL: [AdminLevel; 5] = [
        Self::Central,
        Self::Region,
        Self::Division,
        Self::District,
        Self::School,
    ];

    /// Return the string value used in storage and reason strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Central => "central",
            Self::Region => "region",
            Self::Division => "division",
            Self::District => "district",
            Self::School => "school",
        }
    }

    /// Distance from the root of the tree (central = 0, school = 4).
    pub fn depth(&self) -> u8 {
        match self {
            Self::Central => 0,
            Self::Region => 1,
            Self::Division => 2,
            Self::District => 3,
            Self::School => 4,
        }
    }
}

impl std::fmt::Display for AdminLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AdminLevel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "central" => Ok(Self::Central),
            "region" => Ok(Self::Region),
            "division" => Ok(Self::Division),
            "district" => Ok(Self::District),
            "school" => Ok(Self::School),
            other => Err(ValidationError::UnknownAdminLevel(other.to_string())),
        }
    }
}

/// Account status. Only `Active` actors may pass an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorStatus {
    /// Usable for access decisions.
    Active,
    /// Soft-deleted.
    Inactive,
    /// Temporarily blocked by an operator.
    Suspended,
}

impl ActorStatus {
    /// Return the string value used in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Suspended => "suspended",
        }
    }

    /// Whether the actor may take part in access decisions.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl std::fmt::Display for ActorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActorStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "suspended" => Ok(Self::Suspended),
            other => Err(ValidationError::UnknownStatus(other.to_string())),
        }
    }
}
