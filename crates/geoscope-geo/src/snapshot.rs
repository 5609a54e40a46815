//! # Geography Snapshots
//!
//! The geography tables are maintained by an external import job. The
//! engine consumes an exported snapshot (YAML or JSON) and builds an
//! [`InMemoryHierarchy`] from it.
//!
//! ```yaml
//! regions:
//!   - { id: 4, name: "Region IV-A" }
//! divisions:
//!   - { id: 17, name: "Laguna", region_id: 4 }
//! districts:
//!   - { id: 1, name: "Calamba East", division_id: 17 }
//! schools:
//!   - { id: 101, name: "Calamba ES", district_id: 1, school_code: "107912" }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::hierarchy::{HierarchyError, InMemoryHierarchy};
use crate::node::{District, Division, GeoNode, Region, School};

/// Serialized form of the geography tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoSnapshot {
    #[serde(default)]
    pub regions: Vec<Region>,
    #[serde(default)]
    pub divisions: Vec<Division>,
    #[serde(default)]
    pub districts: Vec<District>,
    #[serde(default)]
    pub schools: Vec<School>,
}

impl GeoSnapshot {
    /// Parse a YAML document. JSON is valid YAML, so this accepts both.
    pub fn from_yaml_str(raw: &str) -> Result<Self, HierarchyError> {
        serde_yaml::from_str(raw).map_err(|e| HierarchyError::Parse(e.to_string()))
    }

    /// Read a snapshot file. `.json` files go through `serde_json` for
    /// precise error positions; everything else is parsed as YAML.
    pub fn load(path: &Path) -> Result<Self, HierarchyError> {
        let raw = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            serde_json::from_str(&raw).map_err(|e| HierarchyError::Parse(e.to_string()))
        } else {
            Self::from_yaml_str(&raw)
        }
    }

    /// Validate and index.
    pub fn into_hierarchy(self) -> Result<InMemoryHierarchy, HierarchyError> {
        let nodes = self
            .regions
            .into_iter()
            .map(GeoNode::Region)
            .chain(self.divisions.into_iter().map(GeoNode::Division))
            .chain(self.districts.into_iter().map(GeoNode::District))
            .chain(self.schools.into_iter().map(GeoNode::School));
        nodes
            .fold(InMemoryHierarchy::builder(), |builder, node| builder.node(node))
            .build()
    }
}
