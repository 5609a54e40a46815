//! # Permission Flags
//!
//! The five boolean capabilities carried by every actor, the level-based
//! default table applied at creation, and field-by-field overrides.
//!
//! Flags are addressed through the exhaustive [`PermissionFlag`] enum rather
//! than by column-name strings, so a lookup for a flag that does not exist
//! cannot compile.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::level::AdminLevel;

/// One of the five capability flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionFlag {
    /// May create administrative accounts.
    CanCreateUsers,
    /// May edit or deactivate administrative accounts.
    CanManageUsers,
    /// May publish submission deadlines.
    CanSetDeadlines,
    /// May approve or return form submissions.
    CanApproveSubmissions,
    /// May read system and audit logs.
    CanViewSystemLogs,
}

impl PermissionFlag {
    /// All five flags in column order.
    pub const ALL: [PermissionFlag; 5] = [
        Self::CanCreateUsers,
        Self::CanManageUsers,
        Self::CanSetDeadlines,
        Self::CanApproveSubmissions,
        Self::CanViewSystemLogs,
    ];

    /// Column name of the flag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CanCreateUsers => "can_create_users",
            Self::CanManageUsers => "can_manage_users",
            Self::CanSetDeadlines => "can_set_deadlines",
            Self::CanApproveSubmissions => "can_approve_submissions",
            Self::CanViewSystemLogs => "can_view_system_logs",
        }
    }
}

impl std::fmt::Display for PermissionFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PermissionFlag {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|flag| flag.as_str() == s.trim())
            .ok_or_else(|| ValidationError::UnknownPermissionFlag(s.to_string()))
    }
}

/// The full set of flags held by an actor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionFlags {
    /// See [`PermissionFlag::CanCreateUsers`].
    pub can_create_users: bool,
    /// See [`PermissionFlag::CanManageUsers`].
    pub can_manage_users: bool,
    /// See [`PermissionFlag::CanSetDeadlines`].
    pub can_set_deadlines: bool,
    /// See [`PermissionFlag::CanApproveSubmissions`].
    pub can_approve_submissions: bool,
    /// See [`PermissionFlag::CanViewSystemLogs`].
    pub can_view_system_logs: bool,
}

impl PermissionFlags {
    /// Every flag set.
    pub const fn all() -> Self {
        Self {
            can_create_users: true,
            can_manage_users: true,
            can_set_deadlines: true,
            can_approve_submissions: true,
            can_view_system_logs: true,
        }
    }

    /// No flag set.
    pub const fn none() -> Self {
        Self {
            can_create_users: false,
            can_manage_users: false,
            can_set_deadlines: false,
            can_approve_submissions: false,
            can_view_system_logs: false,
        }
    }

    /// Read one flag.
    pub fn get(&self, flag: PermissionFlag) -> bool {
        match flag {
            PermissionFlag::CanCreateUsers => self.can_create_users,
            PermissionFlag::CanManageUsers => self.can_manage_users,
            PermissionFlag::CanSetDeadlines => self.can_set_deadlines,
            PermissionFlag::CanApproveSubmissions => self.can_approve_submissions,
            PermissionFlag::CanViewSystemLogs => self.can_view_system_logs,
        }
    }

    /// Write one flag.
    pub fn set(&mut self, flag: PermissionFlag, value: bool) {
        let slot = match flag {
            PermissionFlag::CanCreateUsers => &mut self.can_create_users,
            PermissionFlag::CanManageUsers => &mut self.can_manage_users,
            PermissionFlag::CanSetDeadlines => &mut self.can_set_deadlines,
            PermissionFlag::CanApproveSubmissions => &mut self.can_approve_submissions,
            PermissionFlag::CanViewSystemLogs => &mut self.can_view_system_logs,
        };
        *slot = value;
    }

    /// Flags that are set, in column order.
    pub fn granted(&self) -> Vec<PermissionFlag> {
        PermissionFlag::ALL
            .into_iter()
            .filter(|flag| self.get(*flag))
            .collect()
    }

    /// Return a copy with `overrides` applied.
    pub fn with_overrides(mut self, overrides: &PermissionOverrides) -> Self {
        for flag in PermissionFlag::ALL {
            if let Some(value) = overrides.get(flag) {
                self.set(flag, value);
            }
        }
        self
    }
}

/// Explicit per-flag values supplied at creation or edit time. `None`
/// keeps the underlying value; `Some` replaces it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionOverrides {
    /// Override for `can_create_users`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_create_users: Option<bool>,
    /// Override for `can_manage_users`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_manage_users: Option<bool>,
    /// Override for `can_set_deadlines`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_set_deadlines: Option<bool>,
    /// Override for `can_approve_submissions`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_approve_submissions: Option<bool>,
    /// Override for `can_view_system_logs`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_view_system_logs: Option<bool>,
}

impl PermissionOverrides {
    /// Read the override for one flag.
    pub fn get(&self, flag: PermissionFlag) -> Option<bool> {
        match flag {
            PermissionFlag::CanCreateUsers => self.can_create_users,
            PermissionFlag::CanManageUsers => self.can_manage_users,
            PermissionFlag::CanSetDeadlines => self.can_set_deadlines,
            PermissionFlag::CanApproveSubmissions => self.can_approve_submissions,
            PermissionFlag::CanViewSystemLogs => self.can_view_system_logs,
        }
    }

    /// Builder-style setter.
    pub fn with(mut self, flag: PermissionFlag, value: bool) -> Self {
        let slot = match flag {
            PermissionFlag::CanCreateUsers => &mut self.can_create_users,
            PermissionFlag::CanManageUsers => &mut self.can_manage_users,
            PermissionFlag::CanSetDeadlines => &mut self.can_set_deadlines,
            PermissionFlag::CanApproveSubmissions => &mut self.can_approve_submissions,
            PermissionFlag::CanViewSystemLogs => &mut self.can_view_system_logs,
        };
        *slot = Some(value);
        self
    }

    /// True when no flag is overridden.
    pub fn is_empty(&self) -> bool {
        PermissionFlag::ALL.iter().all(|flag| self.get(*flag).is_none())
    }
}

/// Default flags for a newly created actor of `level`.
pub const fn default_permissions(level: AdminLevel) -> PermissionFlags {
    match level {
        AdminLevel::Central => PermissionFlags::all(),
        AdminLevel::Region => PermissionFlags {
            can_create_users: false,
            can_manage_users: false,
            can_set_deadlines: true,
            can_approve_submissions: true,
            can_view_system_logs: true,
        },
        AdminLevel::Division => PermissionFlags {
            can_create_users: true,
            can_manage_users: true,
            can_set_deadlines: false,
            can_approve_submissions: true,
            can_view_system_logs: false,
        },
        AdminLevel::District => PermissionFlags {
            can_create_users: false,
            can_manage_users: false,
            can_set_deadlines: false,
            can_approve_submissions: true,
            can_view_system_logs: false,
        },
        AdminLevel::School => PermissionFlags::none(),
    }
}
