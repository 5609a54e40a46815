//! # Identity Newtypes
//!
//! Numeric identifiers for actors and geographic nodes. Each is a distinct
//! type: a [`DivisionId`] cannot be passed where a [`DistrictId`] is
//! expected, which rules out the "compared the wrong column" class of scope
//! bugs at compile time.
//!
//! ## Validation
//!
//! Identifiers mirror database primary keys and must be strictly positive.
//! Zero and negative values are rejected at construction and at
//! deserialization time.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Declares a positive `i64` identifier newtype with validating
/// construction, `Display`, `FromStr`, and a `Deserialize` impl that routes
/// through `new()` so that invalid ids are rejected on the way in.
macro_rules! numeric_id {
    ($(#[$meta:meta])* $ty:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $ty(i64);

        impl $ty {
            /// Create an identifier, rejecting zero and negative values.
            ///
            /// # Errors
            ///
            /// Returns [`ValidationError::InvalidId`] for values `<= 0`.
            pub fn new(value: i64) -> Result<Self, ValidationError> {
                if value <= 0 {
                    return Err(ValidationError::InvalidId {
                        kind: $kind,
                        value,
                    });
                }
                Ok(Self(value))
            }

            /// Access the raw identifier.
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = i64::deserialize(deserializer)?;
                Self::new(raw).map_err(serde::de::Error::custom)
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $ty {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s.trim().parse::<i64>().map_err(|_| ValidationError::InvalidId {
                    kind: $kind,
                    value: 0,
                })?;
                Self::new(raw)
            }
        }

        impl TryFrom<i64> for $ty {
            type Error = ValidationError;

            fn try_from(value: i64) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }
    };
}

numeric_id!(
    /// Identifier of an administrative actor (a row in the admin users table).
    ActorId,
    "actor"
);

numeric_id!(
    /// Identifier of a region.
    RegionId,
    "region"
);

numeric_id!(
    /// Identifier of a schools division office.
    DivisionId,
    "division"
);

numeric_id!(
    /// Identifier of a district.
    DistrictId,
    "district"
);

numeric_id!(
    /// Identifier of a school.
    SchoolId,
    "school"
);
