//! # Geographic Nodes
//!
//! One struct per tier. Each non-root node names exactly one parent, which
//! is what makes the hierarchy a strict tree.

use geoscope_core::{DistrictId, DivisionId, GeoRef, RegionId, SchoolId};
use serde::{Deserialize, Serialize};

/// A region (root tier).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    pub name: String,
}

/// A schools division office, owned by one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Division {
    pub id: DivisionId,
    pub name: String,
    pub region_id: RegionId,
}

/// A district, owned by one division.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct District {
    pub id: DistrictId,
    pub name: String,
    pub division_id: DivisionId,
}

/// A school, owned by one district.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct School {
    pub id: SchoolId,
    pub name: String,
    pub district_id: DistrictId,
    /// The six-digit school identifier issued by the national registry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school_code: Option<String>,
}

/// Any node, for callers that walk the tree generically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeoNode {
    Region(Region),
    Division(Division),
    District(District),
    School(School),
}

impl GeoNode {
    /// Reference to this node.
    pub fn geo_ref(&self) -> GeoRef {
        match self {
            Self::Region(n) => GeoRef::Region(n.id),
            Self::Division(n) => GeoRef::Division(n.id),
            Self::District(n) => GeoRef::District(n.id),
            Self::School(n) => GeoRef::School(n.id),
        }
    }

    /// Display name.
    pub fn name(&self) -> &str {
        match self {
            Self::Region(n) => &n.name,
            Self::Division(n) => &n.name,
            Self::District(n) => &n.name,
            Self::School(n) => &n.name,
        }
    }

    /// Reference to the parent node. Regions have none.
    pub fn parent(&self) -> Option<GeoRef> {
        match self {
            Self::Region(_) => None,
            Self::Division(n) => Some(GeoRef::Region(n.region_id)),
            Self::District(n) => Some(GeoRef::Division(n.division_id)),
            Self::School(n) => Some(GeoRef::District(n.district_id)),
        }
    }
}
