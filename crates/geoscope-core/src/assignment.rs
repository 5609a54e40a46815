//! # Geographic Assignment
//!
//! [`GeoAssignment`] is the four nullable geography columns carried by an
//! actor (and, with the same shape, by resource locations and creation
//! targets). [`GeoRef`] names a single node of any kind.
//!
//! ## Level Consistency
//!
//! Exactly the fields implied by an admin level are non-null:
//!
//! | level    | region | division | district | school |
//! |----------|--------|----------|----------|--------|
//! | central  |        |          |          |        |
//! | region   |   x    |          |          |        |
//! | division |   x    |    x     |          |        |
//! | district |   x    |    x     |    x     |        |
//! | school   |   x    |    x     |    x     |   x    |

use serde::{Deserialize, Serialize};

use crate::error::AssignmentError;
use crate::identity::{DistrictId, DivisionId, RegionId, SchoolId};
use crate::level::AdminLevel;

/// Reference to one geographic node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum GeoRef {
    /// A region.
    Region(RegionId),
    /// A division.
    Division(DivisionId),
    /// A district.
    District(DistrictId),
    /// A school.
    School(SchoolId),
}

impl GeoRef {
    /// Node kind as used in messages (`region`, `division`, ...).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Region(_) => "region",
            Self::Division(_) => "division",
            Self::District(_) => "district",
            Self::School(_) => "school",
        }
    }

    /// The admin level whose own field addresses this node kind.
    pub fn level(&self) -> AdminLevel {
        match self {
            Self::Region(_) => AdminLevel::Region,
            Self::Division(_) => AdminLevel::Division,
            Self::District(_) => AdminLevel::District,
            Self::School(_) => AdminLevel::School,
        }
    }

    /// Raw numeric identifier.
    pub fn raw_id(&self) -> i64 {
        match self {
            Self::Region(id) => id.get(),
            Self::Division(id) => id.get(),
            Self::District(id) => id.get(),
            Self::School(id) => id.get(),
        }
    }
}

impl std::fmt::Display for GeoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind(), self.raw_id())
    }
}

/// The nullable geography columns of an actor, target, or resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeoAssignment {
    /// Region column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_id: Option<RegionId>,
    /// Division column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub division_id: Option<DivisionId>,
    /// District column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district_id: Option<DistrictId>,
    /// School column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school_id: Option<SchoolId>,
}

impl GeoAssignment {
    /// No geography (central office).
    pub fn nationwide() -> Self {
        Self::default()
    }

    /// Region-level assignment.
    pub fn region(region_id: RegionId) -> Self {
        Self {
            region_id: Some(region_id),
            ..Self::default()
        }
    }

    /// Division-level assignment.
    pub fn division(region_id: RegionId, division_id: DivisionId) -> Self {
        Self {
            region_id: Some(region_id),
            division_id: Some(division_id),
            ..Self::default()
        }
    }

    /// District-level assignment.
    pub fn district(region_id: RegionId, division_id: DivisionId, district_id: DistrictId) -> Self {
        Self {
            region_id: Some(region_id),
            division_id: Some(division_id),
            district_id: Some(district_id),
            school_id: None,
        }
    }

    /// School-level assignment.
    pub fn school(
        region_id: RegionId,
        division_id: DivisionId,
        district_id: DistrictId,
        school_id: SchoolId,
    ) -> Self {
        Self {
            region_id: Some(region_id),
            division_id: Some(division_id),
            district_id: Some(district_id),
            school_id: Some(school_id),
        }
    }

    /// True when every column is null.
    pub fn is_empty(&self) -> bool {
        self.region_id.is_none()
            && self.division_id.is_none()
            && self.district_id.is_none()
            && self.school_id.is_none()
    }

    /// The deepest non-null column, if any.
    pub fn most_specific(&self) -> Option<GeoRef> {
        self.school_id
            .map(GeoRef::School)
            .or(self.district_id.map(GeoRef::District))
            .or(self.division_id.map(GeoRef::Division))
            .or(self.region_id.map(GeoRef::Region))
    }

    /// The node an actor of `level` is anchored at, if the field is set.
    /// Central has no anchor.
    pub fn anchor_for(&self, level: AdminLevel) -> Option<GeoRef> {
        match level {
            AdminLevel::Central => None,
            AdminLevel::Region => self.region_id.map(GeoRef::Region),
            AdminLevel::Division => self.division_id.map(GeoRef::Division),
            AdminLevel::District => self.district_id.map(GeoRef::District),
            AdminLevel::School => self.school_id.map(GeoRef::School),
        }
    }

    /// Every non-null column as a node reference, region first.
    pub fn refs(&self) -> Vec<GeoRef> {
        let mut out = Vec::with_capacity(4);
        out.extend(self.region_id.map(GeoRef::Region));
        out.extend(self.division_id.map(GeoRef::Division));
        out.extend(self.district_id.map(GeoRef::District));
        out.extend(self.school_id.map(GeoRef::School));
        out
    }

    /// Check that exactly the fields implied by `level` are set.
    ///
    /// # Errors
    ///
    /// Returns the first missing or unexpected field, checked region-first.
    pub fn validate_for(&self, level: AdminLevel) -> Result<(), AssignmentError> {
        let depth = level.depth();
        let columns = [
            (1, "region_id", self.region_id.is_some()),
            (2, "division_id", self.division_id.is_some()),
            (3, "district_id", self.district_id.is_some()),
            (4, "school_id", self.school_id.is_some()),
        ];
        for (column_depth, field, present) in columns {
            let required = column_depth <= depth;
            if required && !present {
                return Err(AssignmentError::MissingField { level, field });
            }
            if !required && present {
                return Err(AssignmentError::UnexpectedField { level, field });
            }
        }
        Ok(())
    }

    /// Keep only the columns a `level` actor carries, dropping deeper ones.
    pub fn truncated_to(&self, level: AdminLevel) -> Self {
        let depth = level.depth();
        Self {
            region_id: self.region_id.filter(|_| depth >= 1),
            division_id: self.division_id.filter(|_| depth >= 2),
            district_id: self.district_id.filter(|_| depth >= 3),
            school_id: self.school_id.filter(|_| depth >= 4),
        }
    }
}
