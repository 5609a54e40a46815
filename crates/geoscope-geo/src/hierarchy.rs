//! # Hierarchy Index
//!
//! The [`GeoHierarchy`] trait is the read-only query surface the scope
//! resolver and the administrative service use. Implementors supply the
//! five primitive lookups; ancestry, subtree walks and assignment
//! completion are provided on top of them.
//!
//! ## Missing Nodes
//!
//! Queries about an unknown node return empty sets or an empty
//! [`Ancestry`]. An actor whose assignment points at a node that was
//! removed by the last import ends up with a small scope, not an error.

use std::collections::{BTreeMap, BTreeSet};

use geoscope_core::{
    AssignmentError, DistrictId, DivisionId, GeoAssignment, GeoRef, RegionId, SchoolId,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::node::{District, Division, GeoNode, Region, School};

/// Integrity failure while building an index.
#[derive(Error, Debug)]
pub enum HierarchyError {
    /// The same id appears twice within one tier.
    #[error("duplicate {kind} id {id}")]
    DuplicateNode { kind: &'static str, id: i64 },

    /// A node names a parent that does not exist.
    #[error("{kind} {id} references missing {parent_kind} {parent_id}")]
    DanglingParent {
        kind: &'static str,
        id: i64,
        parent_kind: &'static str,
        parent_id: i64,
    },

    /// Snapshot file could not be read.
    #[error("failed to read geography snapshot: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot file could not be parsed.
    #[error("failed to parse geography snapshot: {0}")]
    Parse(String),
}

/// The ancestor ids of a node. Fields above the node's own tier are set;
/// everything is `None` for regions and for unknown nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ancestry {
    pub region_id: Option<RegionId>,
    pub division_id: Option<DivisionId>,
    pub district_id: Option<DistrictId>,
}

/// Every node strictly below some root node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtree {
    pub divisions: BTreeSet<DivisionId>,
    pub districts: BTreeSet<DistrictId>,
    pub schools: BTreeSet<SchoolId>,
}

impl Subtree {
    /// Total number of nodes.
    pub fn len(&self) -> usize {
        self.divisions.len() + self.districts.len() + self.schools.len()
    }

    /// True when the root has no descendants.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read-only queries over the Region → Division → District → School tree.
pub trait GeoHierarchy: Send + Sync {
    /// Look up a node.
    fn node(&self, node: GeoRef) -> Option<GeoNode>;

    /// Divisions owned by a region.
    fn divisions_of(&self, region: RegionId) -> BTreeSet<DivisionId>;

    /// Districts owned by a division.
    fn districts_of(&self, division: DivisionId) -> BTreeSet<DistrictId>;

    /// Schools owned by a district.
    fn schools_of(&self, district: DistrictId) -> BTreeSet<SchoolId>;

    /// Parent of a node; `None` for regions and unknown nodes.
    fn parent_of(&self, node: GeoRef) -> Option<GeoRef>;

    /// Whether the node exists.
    fn contains(&self, node: GeoRef) -> bool {
        self.node(node).is_some()
    }

    /// Direct children of any node.
    fn children_of(&self, node: GeoRef) -> BTreeSet<GeoRef> {
        match node {
            GeoRef::Region(id) => self.divisions_of(id).into_iter().map(GeoRef::Division).collect(),
            GeoRef::Division(id) => self.districts_of(id).into_iter().map(GeoRef::District).collect(),
            GeoRef::District(id) => self.schools_of(id).into_iter().map(GeoRef::School).collect(),
            GeoRef::School(_) => BTreeSet::new(),
        }
    }

    /// Ancestor ids of a node, walking parent links.
    fn ancestors_of(&self, node: GeoRef) -> Ancestry {
        let mut ancestry = Ancestry::default();
        let mut cursor = self.parent_of(node);
        while let Some(parent) = cursor {
            match parent {
                GeoRef::Region(id) => ancestry.region_id = Some(id),
                GeoRef::Division(id) => ancestry.division_id = Some(id),
                GeoRef::District(id) => ancestry.district_id = Some(id),
                GeoRef::School(_) => break,
            }
            cursor = self.parent_of(parent);
        }
        ancestry
    }

    /// Every node strictly below `node`.
    fn descendants_of(&self, node: GeoRef) -> Subtree {
        let mut subtree = Subtree::default();
        let divisions = match node {
            GeoRef::Region(id) => self.divisions_of(id),
            GeoRef::Division(id) => BTreeSet::from([id]),
            GeoRef::District(_) | GeoRef::School(_) => BTreeSet::new(),
        };
        let mut districts = match node {
            GeoRef::District(id) => BTreeSet::from([id]),
            _ => BTreeSet::new(),
        };
        for division in &divisions {
            districts.extend(self.districts_of(*division));
        }
        for district in &districts {
            subtree.schools.extend(self.schools_of(*district));
        }
        if let GeoRef::Region(_) = node {
            subtree.divisions = divisions;
        }
        if matches!(node, GeoRef::Region(_) | GeoRef::Division(_)) {
            subtree.districts = districts;
        }
        subtree
    }

    /// Fill in the ancestors of an assignment's most specific node, and
    /// reject caller-supplied ancestors that contradict the tree.
    ///
    /// An empty assignment is returned unchanged.
    ///
    /// # Errors
    ///
    /// [`AssignmentError::UnknownNode`] if the most specific node is not in
    /// the index, [`AssignmentError::AncestryMismatch`] if a supplied
    /// ancestor disagrees with the tree.
    fn complete(&self, assignment: &GeoAssignment) -> Result<GeoAssignment, AssignmentError> {
        let Some(leaf) = assignment.most_specific() else {
            return Ok(*assignment);
        };
        if !self.contains(leaf) {
            return Err(AssignmentError::UnknownNode {
                kind: leaf.kind(),
                id: leaf.raw_id(),
            });
        }
        let derived = self.ancestors_of(leaf);

        let mismatch = |parent_kind: &'static str, actual: i64, claimed: i64| {
            AssignmentError::AncestryMismatch {
                kind: leaf.kind(),
                id: leaf.raw_id(),
                parent_kind,
                actual,
                claimed,
            }
        };
        if let (Some(claimed), Some(actual)) = (assignment.district_id, derived.district_id) {
            if claimed != actual {
                return Err(mismatch("district", actual.get(), claimed.get()));
            }
        }
        if let (Some(claimed), Some(actual)) = (assignment.division_id, derived.division_id) {
            if claimed != actual {
                return Err(mismatch("division", actual.get(), claimed.get()));
            }
        }
        if let (Some(claimed), Some(actual)) = (assignment.region_id, derived.region_id) {
            if claimed != actual {
                return Err(mismatch("region", actual.get(), claimed.get()));
            }
        }

        Ok(GeoAssignment {
            region_id: derived.region_id.or(assignment.region_id),
            division_id: derived.division_id.or(assignment.division_id),
            district_id: derived.district_id.or(assignment.district_id),
            school_id: assignment.school_id,
        })
    }
}

/// An index held entirely in memory, built from a validated set of nodes.
#[derive(Debug, Clone, Default)]
pub struct InMemoryHierarchy {
    regions: BTreeMap<RegionId, Region>,
    divisions: BTreeMap<DivisionId, Division>,
    districts: BTreeMap<DistrictId, District>,
    schools: BTreeMap<SchoolId, School>,
    divisions_by_region: BTreeMap<RegionId, BTreeSet<DivisionId>>,
    districts_by_division: BTreeMap<DivisionId, BTreeSet<DistrictId>>,
    schools_by_district: BTreeMap<DistrictId, BTreeSet<SchoolId>>,
}

impl InMemoryHierarchy {
    /// Start building an index.
    pub fn builder() -> HierarchyBuilder {
        HierarchyBuilder::default()
    }

    /// Node counts per tier: (regions, divisions, districts, schools).
    pub fn counts(&self) -> (usize, usize, usize, usize) {
        (
            self.regions.len(),
            self.divisions.len(),
            self.districts.len(),
            self.schools.len(),
        )
    }

    /// All regions in id order.
    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.values()
    }

    /// Look up a school by its registry code.
    pub fn school_by_code(&self, code: &str) -> Option<&School> {
        self.schools
            .values()
            .find(|s| s.school_code.as_deref() == Some(code))
    }
}

impl GeoHierarchy for InMemoryHierarchy {
    fn node(&self, node: GeoRef) -> Option<GeoNode> {
        match node {
            GeoRef::Region(id) => self.regions.get(&id).cloned().map(GeoNode::Region),
            GeoRef::Division(id) => self.divisions.get(&id).cloned().map(GeoNode::Division),
            GeoRef::District(id) => self.districts.get(&id).cloned().map(GeoNode::District),
            GeoRef::School(id) => self.schools.get(&id).cloned().map(GeoNode::School),
        }
    }

    fn contains(&self, node: GeoRef) -> bool {
        match node {
            GeoRef::Region(id) => self.regions.contains_key(&id),
            GeoRef::Division(id) => self.divisions.contains_key(&id),
            GeoRef::District(id) => self.districts.contains_key(&id),
            GeoRef::School(id) => self.schools.contains_key(&id),
        }
    }

    fn divisions_of(&self, region: RegionId) -> BTreeSet<DivisionId> {
        self.divisions_by_region.get(&region).cloned().unwrap_or_default()
    }

    fn districts_of(&self, division: DivisionId) -> BTreeSet<DistrictId> {
        self.districts_by_division.get(&division).cloned().unwrap_or_default()
    }

    fn schools_of(&self, district: DistrictId) -> BTreeSet<SchoolId> {
        self.schools_by_district.get(&district).cloned().unwrap_or_default()
    }

    fn parent_of(&self, node: GeoRef) -> Option<GeoRef> {
        match node {
            GeoRef::Region(_) => None,
            GeoRef::Division(id) => self.divisions.get(&id).map(|n| GeoRef::Region(n.region_id)),
            GeoRef::District(id) => self
                .districts
                .get(&id)
                .map(|n| GeoRef::Division(n.division_id)),
            GeoRef::School(id) => self.schools.get(&id).map(|n| GeoRef::District(n.district_id)),
        }
    }
}

/// Collects nodes, then validates the strict-tree invariant in
/// [`HierarchyBuilder::build`].
#[derive(Debug, Default)]
pub struct HierarchyBuilder {
    regions: Vec<Region>,
    divisions: Vec<Division>,
    districts: Vec<District>,
    schools: Vec<School>,
}

impl HierarchyBuilder {
    pub fn region(mut self, id: RegionId, name: impl Into<String>) -> Self {
        self.regions.push(Region {
            id,
            name: name.into(),
        });
        self
    }

    pub fn division(mut self, id: DivisionId, name: impl Into<String>, region_id: RegionId) -> Self {
        self.divisions.push(Division {
            id,
            name: name.into(),
            region_id,
        });
        self
    }

    pub fn district(
        mut self,
        id: DistrictId,
        name: impl Into<String>,
        division_id: DivisionId,
    ) -> Self {
        self.districts.push(District {
            id,
            name: name.into(),
            division_id,
        });
        self
    }

    pub fn school(mut self, id: SchoolId, name: impl Into<String>, district_id: DistrictId) -> Self {
        self.schools.push(School {
            id,
            name: name.into(),
            district_id,
            school_code: None,
        });
        self
    }

    /// Add a fully specified node.
    pub fn node(mut self, node: GeoNode) -> Self {
        match node {
            GeoNode::Region(n) => self.regions.push(n),
            GeoNode::Division(n) => self.divisions.push(n),
            GeoNode::District(n) => self.districts.push(n),
            GeoNode::School(n) => self.schools.push(n),
        }
        self
    }

    /// Validate and index.
    ///
    /// # Errors
    ///
    /// [`HierarchyError::DuplicateNode`] when an id repeats within a tier,
    /// [`HierarchyError::DanglingParent`] when a parent is missing.
    pub fn build(self) -> Result<InMemoryHierarchy, HierarchyError> {
        let mut index = InMemoryHierarchy::default();

        for region in self.regions {
            let id = region.id;
            if index.regions.insert(id, region).is_some() {
                return Err(HierarchyError::DuplicateNode {
                    kind: "region",
                    id: id.get(),
                });
            }
        }

        for division in self.divisions {
            if !index.regions.contains_key(&division.region_id) {
                return Err(HierarchyError::DanglingParent {
                    kind: "division",
                    id: division.id.get(),
                    parent_kind: "region",
                    parent_id: division.region_id.get(),
                });
            }
            let (id, parent) = (division.id, division.region_id);
            if index.divisions.insert(id, division).is_some() {
                return Err(HierarchyError::DuplicateNode {
                    kind: "division",
                    id: id.get(),
                });
            }
            index.divisions_by_region.entry(parent).or_default().insert(id);
        }

        for district in self.districts {
            if !index.divisions.contains_key(&district.division_id) {
                return Err(HierarchyError::DanglingParent {
                    kind: "district",
                    id: district.id.get(),
                    parent_kind: "division",
                    parent_id: district.division_id.get(),
                });
            }
            let (id, parent) = (district.id, district.division_id);
            if index.districts.insert(id, district).is_some() {
                return Err(HierarchyError::DuplicateNode {
                    kind: "district",
                    id: id.get(),
                });
            }
            index.districts_by_division.entry(parent).or_default().insert(id);
        }

        for school in self.schools {
            if !index.districts.contains_key(&school.district_id) {
                return Err(HierarchyError::DanglingParent {
                    kind: "school",
                    id: school.id.get(),
                    parent_kind: "district",
                    parent_id: school.district_id.get(),
                });
            }
            let (id, parent) = (school.id, school.district_id);
            if index.schools.insert(id, school).is_some() {
                return Err(HierarchyError::DuplicateNode {
                    kind: "school",
                    id: id.get(),
                });
            }
            index.schools_by_district.entry(parent).or_default().insert(id);
        }

        let (r, d, di, s) = index.counts();
        tracing::debug!(regions = r, divisions = d, districts = di, schools = s, "geography index built");
        Ok(index)
    }
}
