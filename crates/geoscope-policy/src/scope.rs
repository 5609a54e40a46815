//! # Scope Resolution
//!
//! Translates an actor into the concrete set of geographic nodes it may
//! act on.
//!
//! | level    | accessible set                                  | read context              |
//! |----------|-------------------------------------------------|---------------------------|
//! | central  | everything (no filtering)                       | none                      |
//! | region   | its region and every node beneath it            | none                      |
//! | division | its division and every district/school beneath  | region                    |
//! | district | its district and every school beneath it        | region, division          |
//! | school   | its own school                                  | region, division, district|
//!
//! Read context ids are for display and filtering. They never grant
//! access to siblings.
//!
//! ## Fail-closed
//!
//! A non-central actor whose assignment is missing a required field,
//! carries fields its level must not have, or names nodes that are not in
//! the hierarchy resolves to an empty accessible set. This is logged at
//! `warn` and is never an error.

use std::collections::BTreeSet;

use geoscope_core::{
    ActorId, AdminLevel, DistrictId, DivisionId, GeoAssignment, GeoRef, RegionId, SchoolId,
};
use geoscope_directory::Actor;
use geoscope_geo::{GeoHierarchy, Subtree};
use serde::{Deserialize, Serialize};

use crate::resource::ResourceLocation;

/// A bounded set of nodes, one set per tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoSet {
    pub regions: BTreeSet<RegionId>,
    pub divisions: BTreeSet<DivisionId>,
    pub districts: BTreeSet<DistrictId>,
    pub schools: BTreeSet<SchoolId>,
}

impl GeoSet {
    pub fn contains(&self, node: GeoRef) -> bool {
        match node {
            GeoRef::Region(id) => self.regions.contains(&id),
            GeoRef::Division(id) => self.divisions.contains(&id),
            GeoRef::District(id) => self.districts.contains(&id),
            GeoRef::School(id) => self.schools.contains(&id),
        }
    }

    pub fn insert(&mut self, node: GeoRef) {
        match node {
            GeoRef::Region(id) => self.regions.insert(id),
            GeoRef::Division(id) => self.divisions.insert(id),
            GeoRef::District(id) => self.districts.insert(id),
            GeoRef::School(id) => self.schools.insert(id),
        };
    }

    fn extend_subtree(&mut self, subtree: Subtree) {
        self.divisions.extend(subtree.divisions);
        self.districts.extend(subtree.districts);
        self.schools.extend(subtree.schools);
    }

    pub fn len(&self) -> usize {
        self.regions.len() + self.divisions.len() + self.districts.len() + self.schools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Nodes an actor may act on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum AccessibleSet {
    /// Nationwide. No geographic filtering applies.
    All,
    /// Exactly these nodes.
    Limited(GeoSet),
}

impl AccessibleSet {
    pub fn empty() -> Self {
        Self::Limited(GeoSet::default())
    }

    pub fn contains(&self, node: GeoRef) -> bool {
        match self {
            Self::All => true,
            Self::Limited(set) => set.contains(node),
        }
    }

    /// `None` for the nationwide sentinel.
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::All => None,
            Self::Limited(set) => Some(set.len()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }
}

/// Resolved scope of one actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeDescriptor {
    pub actor_id: ActorId,
    pub admin_level: AdminLevel,
    /// Ancestor ids above the actor's own level.
    pub read_context: GeoAssignment,
    pub accessible: AccessibleSet,
}

impl ScopeDescriptor {
    pub fn is_nationwide(&self) -> bool {
        matches!(self.accessible, AccessibleSet::All)
    }

    pub fn contains(&self, node: GeoRef) -> bool {
        self.accessible.contains(node)
    }

    /// Whether a resource at `location` falls inside this scope.
    ///
    /// Nationwide scopes cover everything. Otherwise every supplied id at
    /// or below the actor's level must be accessible, every supplied id
    /// above it must equal the read context, and at least one id at or
    /// below the actor's level must be supplied.
    pub fn covers(&self, location: &ResourceLocation) -> bool {
        if self.is_nationwide() {
            return true;
        }
        let depth = self.admin_level.depth();
        let mut anchored = false;
        for node in location.refs() {
            if node.level().depth() >= depth {
                if !self.accessible.contains(node) {
                    return false;
                }
                anchored = true;
            } else if !self.context_matches(node) {
                return false;
            }
        }
        anchored
    }

    fn context_matches(&self, node: GeoRef) -> bool {
        let ctx = &self.read_context;
        match node {
            GeoRef::Region(id) => ctx.region_id == Some(id),
            GeoRef::Division(id) => ctx.division_id == Some(id),
            GeoRef::District(id) => ctx.district_id == Some(id),
            GeoRef::School(id) => ctx.school_id == Some(id),
        }
    }

    /// Keep the items whose location this scope covers.
    pub fn filter<T>(
        &self,
        items: impl IntoIterator<Item = T>,
        location_of: impl Fn(&T) -> ResourceLocation,
    ) -> Vec<T> {
        items
            .into_iter()
            .filter(|item| self.covers(&location_of(item)))
            .collect()
    }
}

/// Resolve the scope of `actor` against `hierarchy`.
///
/// Does not consult the actor's status; callers fetch actors through
/// `get_active` first.
pub fn resolve(actor: &Actor, hierarchy: &dyn GeoHierarchy) -> ScopeDescriptor {
    let level = actor.admin_level;
    let fail_closed = |reason: String| {
        tracing::warn!(
            actor_id = %actor.id,
            level = %level,
            reason = %reason,
            "assignment unusable, resolving to empty scope"
        );
        ScopeDescriptor {
            actor_id: actor.id,
            admin_level: level,
            read_context: GeoAssignment::nationwide(),
            accessible: AccessibleSet::empty(),
        }
    };

    if level == AdminLevel::Central {
        return ScopeDescriptor {
            actor_id: actor.id,
            admin_level: level,
            read_context: GeoAssignment::nationwide(),
            accessible: AccessibleSet::All,
        };
    }

    if let Err(e) = actor.assignment.validate_for(level) {
        return fail_closed(e.to_string());
    }
    if let Err(e) = hierarchy.complete(&actor.assignment) {
        return fail_closed(e.to_string());
    }
    let Some(anchor) = actor.assignment.anchor_for(level) else {
        return fail_closed(format!("{level} assignment has no anchor"));
    };

    let mut set = GeoSet::default();
    set.insert(anchor);
    set.extend_subtree(hierarchy.descendants_of(anchor));

    ScopeDescriptor {
        actor_id: actor.id,
        admin_level: level,
        read_context: context_above(&actor.assignment, level),
        accessible: AccessibleSet::Limited(set),
    }
}

fn context_above(assignment: &GeoAssignment, level: AdminLevel) -> GeoAssignment {
    let depth = level.depth();
    GeoAssignment {
        region_id: assignment.region_id.filter(|_| depth > 1),
        division_id: assignment.division_id.filter(|_| depth > 2),
        district_id: assignment.district_id.filter(|_| depth > 3),
        school_id: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, d, di, r, s};
    use geoscope_directory::ActorDirectory;

    fn scope_of(id: i64) -> ScopeDescriptor {
        let fx = testing::fixture();
        let actor = fx.directory.get(testing::actor_id(id)).unwrap();
        resolve(&actor, fx.hierarchy.as_ref())
    }

    #[test]
    fn central_is_nationwide() {
        let scope = scope_of(testing::CENTRAL);
        assert!(scope.is_nationwide());
        assert_eq!(scope.accessible.len(), None);
        assert!(scope.covers(&GeoAssignment::nationwide()));
        assert!(scope.contains(GeoRef::School(s(401))));
    }

    #[test]
    fn region_covers_its_whole_subtree() {
        let scope = scope_of(testing::REGION_4);
        assert!(scope.contains(GeoRef::Region(r(4))));
        assert!(scope.contains(GeoRef::Division(d(15))));
        assert!(scope.contains(GeoRef::District(di(3))));
        assert!(scope.contains(GeoRef::School(s(301))));
        assert!(!scope.contains(GeoRef::Region(r(9))));
        assert!(!scope.contains(GeoRef::School(s(401))));
        assert_eq!(scope.read_context, GeoAssignment::nationwide());
    }

    #[test]
    fn division_keeps_region_as_context_only() {
        let scope = scope_of(testing::DIVISION_17);
        assert!(scope.contains(GeoRef::Division(d(17))));
        assert!(scope.contains(GeoRef::School(s(201))));
        assert!(!scope.contains(GeoRef::Region(r(4))));
        assert!(!scope.contains(GeoRef::Division(d(15))));
        assert_eq!(scope.read_context, GeoAssignment::region(r(4)));
    }

    #[test]
    fn school_sees_only_itself() {
        let scope = scope_of(testing::SCHOOL_101);
        let AccessibleSet::Limited(set) = &scope.accessible else {
            panic!("school scope must be limited");
        };
        assert_eq!(set.len(), 1);
        assert!(set.contains(GeoRef::School(s(101))));
        assert_eq!(scope.read_context, GeoAssignment::district(r(4), d(17), di(1)));
    }

    #[test]
    fn null_required_field_fails_closed() {
        let scope = scope_of(testing::BROKEN_REGION);
        assert!(scope.accessible.is_empty());
        assert!(!scope.covers(&GeoAssignment::region(r(4))));
    }

    #[test]
    fn assignment_contradicting_tree_fails_closed() {
        let fx = testing::fixture();
        let mut actor = fx.directory.get(testing::actor_id(testing::DIVISION_17)).unwrap();
        actor.assignment = GeoAssignment::division(r(9), d(17));
        assert!(resolve(&actor, fx.hierarchy.as_ref()).accessible.is_empty());
    }

    #[test]
    fn covers_requires_context_match_above_level() {
        let scope = scope_of(testing::DIVISION_17);
        assert!(scope.covers(&GeoAssignment::division(r(4), d(17))));
        assert!(scope.covers(&GeoAssignment::school(r(4), d(17), di(1), s(101))));
        assert!(!scope.covers(&GeoAssignment::division(r(9), d(17))));
        assert!(!scope.covers(&GeoAssignment::division(r(4), d(15))));
        // Region-only location is above a division actor's level.
        assert!(!scope.covers(&GeoAssignment::region(r(4))));
        assert!(!scope.covers(&GeoAssignment::nationwide()));
    }

    #[test]
    fn covers_accepts_partial_locations_below_level() {
        let scope = scope_of(testing::REGION_4);
        let school_only = GeoAssignment {
            school_id: Some(s(301)),
            ..GeoAssignment::default()
        };
        assert!(scope.covers(&school_only));
        let foreign = GeoAssignment {
            school_id: Some(s(401)),
            ..GeoAssignment::default()
        };
        assert!(!scope.covers(&foreign));
    }

    #[test]
    fn filter_keeps_covered_items() {
        let scope = scope_of(testing::DISTRICT_1);
        let items = vec![
            ("a", GeoAssignment::school(r(4), d(17), di(1), s(101))),
            ("b", GeoAssignment::school(r(4), d(17), di(2), s(201))),
            ("c", GeoAssignment::school(r(4), d(17), di(1), s(102))),
        ];
        let kept: Vec<_> = scope
            .filter(items, |(_, loc)| *loc)
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(kept, vec!["a", "c"]);
    }

    #[test]
    fn descriptor_serializes_with_scope_tag() {
        let json = serde_json::to_value(scope_of(testing::CENTRAL)).unwrap();
        assert_eq!(json["accessible"]["scope"], "all");
        let json = serde_json::to_value(scope_of(testing::SCHOOL_101)).unwrap();
        assert_eq!(json["accessible"]["scope"], "limited");
        assert_eq!(json["accessible"]["schools"], serde_json::json!([101]));
    }
}
