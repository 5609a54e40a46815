//! # Permission Evaluator
//!
//! [`AccessEngine`] is the library call surface consumed by the request
//! layer. Every gate returns an [`AccessDecision`] with a reason; only an
//! unreachable directory surfaces as `Err`.
//!
//! ## Gates
//!
//! - **Creation** ([`AccessEngine::can_create`]): central creates anything.
//!   Division creates district and school accounts inside its own division,
//!   and region accounts (the central-instruction exception; see
//!   [`crate::CentralInstruction`]). Region, district and school create
//!   nothing.
//! - **Management** ([`AccessEngine::can_access_user`]): strictly downward
//!   visibility. School actors see only themselves.
//! - **Resource** ([`AccessEngine::check_resource_access`]): the resource
//!   type's flag AND the location inside the actor's scope.
//! - **Deadline** ([`AccessEngine::can_set_deadline`]): region actors only,
//!   inside their own region. Central is excluded.
//!
//! Inactive and suspended actors are denied by every gate.

use std::sync::Arc;

use geoscope_audit::{AuditEntry, AuditRecorder, ClientInfo};
use geoscope_core::{
    AccessDecision, ActorId, AdminLevel, DistrictId, DivisionId, GeoAssignment,
    GeoRef, PermissionFlag, PermissionFlags, RegionId,
};
use geoscope_directory::{Actor, ActorDirectory, DirectoryError};
use geoscope_geo::GeoHierarchy;
use serde_json::{Map, Value};

use crate::error::EngineError;
use crate::resource::{ResourceAction, ResourceLocation, ResourceType};
use crate::scope::{self, ScopeDescriptor};

/// Outcome of looking an actor up for a gate.
enum Lookup {
    Active(Actor),
    Missing,
    Disabled,
}

#[derive(Clone)]
pub struct AccessEngine {
    hierarchy: Arc<dyn GeoHierarchy>,
    directory: Arc<dyn ActorDirectory>,
    audit: AuditRecorder,
}

impl std::fmt::Debug for AccessEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessEngine")
            .field("audit", &self.audit)
            .finish_non_exhaustive()
    }
}

impl AccessEngine {
    pub fn new(
        hierarchy: Arc<dyn GeoHierarchy>,
        directory: Arc<dyn ActorDirectory>,
        audit: AuditRecorder,
    ) -> Self {
        Self {
            hierarchy,
            directory,
            audit,
        }
    }

    pub fn hierarchy(&self) -> &dyn GeoHierarchy {
        self.hierarchy.as_ref()
    }

    pub fn directory(&self) -> &dyn ActorDirectory {
        self.directory.as_ref()
    }

    pub fn audit(&self) -> &AuditRecorder {
        &self.audit
    }

    fn lookup(&self, id: ActorId) -> Result<Lookup, EngineError> {
        match self.directory.get(id) {
            Ok(actor) if actor.is_active() => Ok(Lookup::Active(actor)),
            Ok(_) => Ok(Lookup::Disabled),
            Err(DirectoryError::NotFound(_)) => Ok(Lookup::Missing),
            Err(e) => Err(e.into()),
        }
    }

    /// Resolve the accessible subtree of an active actor.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] or [`EngineError::Inactive`]. An unusable
    /// assignment is not an error; it resolves to an empty set.
    pub fn resolve_scope(&self, actor_id: ActorId) -> Result<ScopeDescriptor, EngineError> {
        let actor = self.directory.get_active(actor_id)?;
        Ok(scope::resolve(&actor, self.hierarchy()))
    }

    /// Creation gate. Rules are evaluated in order; the first match wins.
    pub fn can_create(
        &self,
        creator_id: ActorId,
        target_level: AdminLevel,
        target_geo: &GeoAssignment,
    ) -> Result<AccessDecision, EngineError> {
        let creator = match self.lookup(creator_id)? {
            Lookup::Active(actor) => actor,
            Lookup::Missing | Lookup::Disabled => {
                return Ok(decided(
                    "create",
                    AccessDecision::deny("creator not found or inactive"),
                ))
            }
        };
        Ok(decided("create", creation_rule(&creator, target_level, target_geo)))
    }

    /// Management and visibility gate: may `actor_id` see or manage
    /// `target_id`? A missing or inactive actor, or a missing target, is
    /// `false`.
    pub fn can_access_user(&self, actor_id: ActorId, target_id: ActorId) -> Result<bool, EngineError> {
        let Lookup::Active(actor) = self.lookup(actor_id)? else {
            return Ok(false);
        };
        let target = match self.directory.get(target_id) {
            Ok(target) => target,
            Err(DirectoryError::NotFound(_)) => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        let visible = can_see(&actor, &target);
        metrics::counter!(
            "geoscope_decisions_total",
            "gate" => "access_user",
            "outcome" => if visible { "allow" } else { "deny" }
        )
        .increment(1);
        Ok(visible)
    }

    /// Resource gate: the required flag, then the location.
    pub fn check_resource_access(
        &self,
        actor_id: ActorId,
        resource_type: ResourceType,
        action: ResourceAction,
        location: Option<&ResourceLocation>,
    ) -> Result<AccessDecision, EngineError> {
        let actor = match self.lookup(actor_id)? {
            Lookup::Active(actor) => actor,
            Lookup::Missing => return Ok(decided("resource", AccessDecision::deny("actor not found"))),
            Lookup::Disabled => return Ok(decided("resource", AccessDecision::deny("inactive"))),
        };
        let flag = resource_type.required_flag();
        if !actor.has(flag) {
            return Ok(decided(
                "resource",
                AccessDecision::deny(format!("missing {flag} permission")),
            ));
        }
        if let Some(location) = location {
            let scope = scope::resolve(&actor, self.hierarchy());
            if !scope.covers(location) {
                tracing::debug!(
                    actor_id = %actor_id,
                    resource = %resource_type,
                    action = %action,
                    "resource outside scope"
                );
                return Ok(decided(
                    "resource",
                    AccessDecision::deny("resource outside admin's geographic scope"),
                ));
            }
            return Ok(decided("resource", AccessDecision::allow("within geographic scope")));
        }
        Ok(decided("resource", AccessDecision::allow(format!("has {flag} permission"))))
    }

    /// Deadline gate. Only region actors holding `can_set_deadlines`, and
    /// only inside their own region. Target division and district, when
    /// given, must lie in that region and nest inside each other.
    pub fn can_set_deadline(
        &self,
        actor_id: ActorId,
        region_id: Option<RegionId>,
        division_id: Option<DivisionId>,
        district_id: Option<DistrictId>,
    ) -> Result<AccessDecision, EngineError> {
        let actor = match self.lookup(actor_id)? {
            Lookup::Active(actor) => actor,
            Lookup::Missing => return Ok(decided("deadline", AccessDecision::deny("actor not found"))),
            Lookup::Disabled => return Ok(decided("deadline", AccessDecision::deny("inactive"))),
        };
        Ok(decided(
            "deadline",
            self.deadline_rule(&actor, region_id, division_id, district_id),
        ))
    }

    fn deadline_rule(
        &self,
        actor: &Actor,
        region_id: Option<RegionId>,
        division_id: Option<DivisionId>,
        district_id: Option<DistrictId>,
    ) -> AccessDecision {
        if actor.admin_level != AdminLevel::Region {
            return AccessDecision::deny("only region admins may set deadlines");
        }
        if !actor.has(PermissionFlag::CanSetDeadlines) {
            return AccessDecision::deny("missing can_set_deadlines permission");
        }
        let Some(own) = actor.region_id() else {
            return AccessDecision::deny("region admin has no assigned region");
        };
        if region_id.is_some_and(|r| r != own) {
            return AccessDecision::deny("deadline region outside admin's region");
        }
        if let Some(division) = division_id {
            if self.hierarchy.ancestors_of(GeoRef::Division(division)).region_id != Some(own) {
                return AccessDecision::deny("deadline division outside admin's region");
            }
        }
        if let Some(district) = district_id {
            let ancestry = self.hierarchy.ancestors_of(GeoRef::District(district));
            if ancestry.region_id != Some(own) {
                return AccessDecision::deny("deadline district outside admin's region");
            }
            if division_id.is_some_and(|d| ancestry.division_id != Some(d)) {
                return AccessDecision::deny("deadline district is not in the given division");
            }
        }
        AccessDecision::allow("within assigned region")
    }

    /// Record an audit event. Never fails; sink errors go to the
    /// recorder's failure channel.
    pub fn record_audit(
        &self,
        actor_id: ActorId,
        action: &str,
        resource_type: &str,
        resource_id: Option<String>,
        detail: Map<String, Value>,
        client: &ClientInfo,
    ) {
        let mut entry = AuditEntry::new(actor_id, action, resource_type)
            .detail_map(detail)
            .client(client.clone());
        entry.resource_id = resource_id;
        self.audit.record(entry);
    }

    /// Level default flags applied at creation.
    pub fn default_permissions(level: AdminLevel) -> PermissionFlags {
        geoscope_core::default_permissions(level)
    }
}

fn decided(gate: &'static str, decision: AccessDecision) -> AccessDecision {
    metrics::counter!(
        "geoscope_decisions_total",
        "gate" => gate,
        "outcome" => decision.outcome()
    )
    .increment(1);
    tracing::debug!(gate, outcome = decision.outcome(), reason = %decision.reason, "access decision");
    decision
}

fn creation_rule(creator: &Actor, target_level: AdminLevel, target_geo: &GeoAssignment) -> AccessDecision {
    let cannot = || {
        AccessDecision::deny(format!(
            "{} cannot create {} accounts",
            creator.admin_level, target_level
        ))
    };
    match creator.admin_level {
        AdminLevel::Central => AccessDecision::allow("central has full access"),
        AdminLevel::Division => match target_level {
            AdminLevel::District | AdminLevel::School => {
                let own = creator.division_id();
                if own.is_some() && target_geo.division_id == own {
                    AccessDecision::allow("within assigned division")
                } else {
                    AccessDecision::deny("division can only create within assigned division")
                }
            }
            AdminLevel::Region => {
                AccessDecision::allow("division may create region accounts when instructed by central")
            }
            AdminLevel::Central | AdminLevel::Division => cannot(),
        },
        AdminLevel::Region | AdminLevel::District | AdminLevel::School => cannot(),
    }
}

/// Downward-only visibility between two actor records.
pub fn can_see(actor: &Actor, target: &Actor) -> bool {
    fn same<T: PartialEq>(a: Option<T>, b: Option<T>) -> bool {
        matches!((a, b), (Some(a), Some(b)) if a == b)
    }
    match actor.admin_level {
        AdminLevel::Central => true,
        AdminLevel::Region => {
            matches!(
                target.admin_level,
                AdminLevel::Division | AdminLevel::District | AdminLevel::School
            ) && same(actor.region_id(), target.region_id())
        }
        AdminLevel::Division => {
            matches!(target.admin_level, AdminLevel::District | AdminLevel::School)
                && same(actor.division_id(), target.division_id())
        }
        AdminLevel::District => {
            target.admin_level == AdminLevel::School
                && same(actor.district_id(), target.district_id())
        }
        AdminLevel::School => target.id == actor.id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, actor_id, d, di, r, s};
    use geoscope_core::ActorStatus;
    use proptest::prelude::*;

    const ALL_ACTORS: std::ops::RangeInclusive<i64> = 1..=13;

    fn engine() -> AccessEngine {
        testing::fixture().engine
    }

    fn any_level() -> impl Strategy<Value = AdminLevel> {
        prop::sample::select(AdminLevel::ALL.to_vec())
    }

    fn any_geo() -> impl Strategy<Value = GeoAssignment> {
        (
            prop::option::of(1i64..12),
            prop::option::of(1i64..40),
            prop::option::of(1i64..6),
            prop::option::of(100i64..500),
        )
            .prop_map(|(rg, dv, ds, sc)| GeoAssignment {
                region_id: rg.map(r),
                division_id: dv.map(d),
                district_id: ds.map(di),
                school_id: sc.map(s),
            })
    }

    // Creation gate

    #[test]
    fn central_creates_school_account() {
        let decision = engine()
            .can_create(
                actor_id(testing::CENTRAL),
                AdminLevel::School,
                &GeoAssignment::school(r(4), d(17), di(1), s(101)),
            )
            .unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.reason, "central has full access");
    }

    #[test]
    fn division_creates_inside_own_division_only() {
        let engine = engine();
        let creator = actor_id(testing::DIVISION_17);
        let inside = engine
            .can_create(creator, AdminLevel::District, &GeoAssignment::division(r(4), d(17)))
            .unwrap();
        assert!(inside.allowed);
        assert_eq!(inside.reason, "within assigned division");

        let outside = engine
            .can_create(creator, AdminLevel::District, &GeoAssignment::division(r(4), d(15)))
            .unwrap();
        assert!(!outside.allowed);
        assert!(outside.reason.contains("only create within assigned division"));

        let unspecified = engine
            .can_create(creator, AdminLevel::School, &GeoAssignment::nationwide())
            .unwrap();
        assert!(!unspecified.allowed);
    }

    #[test]
    fn division_may_create_region_accounts() {
        let decision = engine()
            .can_create(actor_id(testing::DIVISION_15), AdminLevel::Region, &GeoAssignment::region(r(9)))
            .unwrap();
        assert!(decision.allowed);
        assert_eq!(
            decision.reason,
            "division may create region accounts when instructed by central"
        );
    }

    #[test]
    fn division_cannot_create_central_or_division() {
        let engine = engine();
        for level in [AdminLevel::Central, AdminLevel::Division] {
            let decision = engine
                .can_create(actor_id(testing::DIVISION_17), level, &GeoAssignment::division(r(4), d(17)))
                .unwrap();
            assert!(!decision.allowed);
            assert_eq!(decision.reason, format!("division cannot create {level} accounts"));
        }
    }

    #[test]
    fn inactive_or_missing_creator_denied() {
        let engine = engine();
        for id in [testing::RETIRED_DIVISION_17, 999] {
            let decision = engine
                .can_create(actor_id(id), AdminLevel::School, &GeoAssignment::division(r(4), d(17)))
                .unwrap();
            assert_eq!(decision, AccessDecision::deny("creator not found or inactive"));
        }
    }

    #[test]
    fn region_district_school_create_nothing() {
        let engine = engine();
        for (creator, level) in [
            (testing::REGION_4, "region"),
            (testing::DISTRICT_1, "district"),
            (testing::SCHOOL_101, "school"),
        ] {
            let decision = engine
                .can_create(actor_id(creator), AdminLevel::School, &GeoAssignment::nationwide())
                .unwrap();
            assert_eq!(decision.reason, format!("{level} cannot create school accounts"));
        }
    }

    proptest! {
        #[test]
        fn central_may_create_anything(level in any_level(), geo in any_geo()) {
            let decision = engine().can_create(actor_id(testing::CENTRAL), level, &geo).unwrap();
            prop_assert!(decision.allowed);
        }

        #[test]
        fn non_creating_levels_always_denied(
            creator in prop::sample::select(vec![
                testing::REGION_4, testing::REGION_9, testing::DISTRICT_1, testing::SCHOOL_301,
            ]),
            level in any_level(),
            geo in any_geo(),
        ) {
            let decision = engine().can_create(actor_id(creator), level, &geo).unwrap();
            prop_assert!(!decision.allowed);
        }

        #[test]
        fn division_rule_follows_division_id(level in any_level(), geo in any_geo()) {
            let decision = engine().can_create(actor_id(testing::DIVISION_17), level, &geo).unwrap();
            let expected = match level {
                AdminLevel::Region => true,
                AdminLevel::District | AdminLevel::School => geo.division_id == Some(d(17)),
                AdminLevel::Central | AdminLevel::Division => false,
            };
            prop_assert_eq!(decision.allowed, expected);
        }
    }

    // Management gate

    #[test]
    fn school_actor_sees_only_itself() {
        let engine = engine();
        let me = actor_id(testing::SCHOOL_101);
        assert!(engine.can_access_user(me, me).unwrap());
        for other in ALL_ACTORS.filter(|&id| id != testing::SCHOOL_101) {
            assert!(!engine.can_access_user(me, actor_id(other)).unwrap(), "school saw actor {other}");
        }
    }

    #[test]
    fn visibility_is_downward_only() {
        let engine = engine();
        let see = |a: i64, b: i64| engine.can_access_user(actor_id(a), actor_id(b)).unwrap();
        assert!(see(testing::REGION_4, testing::DIVISION_15));
        assert!(see(testing::REGION_4, testing::SCHOOL_101));
        assert!(!see(testing::REGION_4, testing::REGION_4));
        assert!(!see(testing::REGION_4, testing::SCHOOL_401));
        assert!(see(testing::DIVISION_17, testing::DISTRICT_2));
        assert!(!see(testing::DIVISION_17, testing::DIVISION_15));
        assert!(!see(testing::DIVISION_17, testing::SCHOOL_301));
        assert!(!see(testing::DIVISION_17, testing::REGION_4));
        assert!(see(testing::DISTRICT_1, testing::SCHOOL_102));
        assert!(!see(testing::DISTRICT_2, testing::SCHOOL_101));
        assert!(!see(testing::SCHOOL_101, testing::DISTRICT_1));
        assert!(see(testing::CENTRAL, testing::RETIRED_DIVISION_17));
    }

    #[test]
    fn missing_or_inactive_parties_are_not_visible() {
        let engine = engine();
        assert!(!engine.can_access_user(actor_id(999), actor_id(testing::SCHOOL_101)).unwrap());
        assert!(!engine.can_access_user(actor_id(testing::CENTRAL), actor_id(999)).unwrap());
        assert!(!engine
            .can_access_user(actor_id(testing::RETIRED_DIVISION_17), actor_id(testing::DISTRICT_1))
            .unwrap());
    }

    #[test]
    fn visibility_is_transitive_and_never_upward() {
        let engine = engine();
        let see = |a: i64, b: i64| engine.can_access_user(actor_id(a), actor_id(b)).unwrap();
        for a in ALL_ACTORS {
            for b in ALL_ACTORS {
                if a == b || !see(a, b) {
                    continue;
                }
                assert!(!see(b, a), "{a} and {b} see each other");
                for c in ALL_ACTORS {
                    if b != c && see(b, c) {
                        assert!(see(a, c), "{a} sees {b} sees {c} but not {a} sees {c}");
                    }
                }
            }
        }
    }

    // Resource gate

    #[test]
    fn missing_flag_denies_with_flag_name() {
        let decision = engine()
            .check_resource_access(actor_id(testing::DISTRICT_1), ResourceType::System, ResourceAction::View, None)
            .unwrap();
        assert_eq!(decision.reason, "missing can_view_system_logs permission");
    }

    #[test]
    fn flag_and_location_both_required() {
        let engine = engine();
        let division = actor_id(testing::DIVISION_17);
        let ours = GeoAssignment::school(r(4), d(17), di(2), s(201));
        let theirs = GeoAssignment::school(r(4), d(15), di(3), s(301));

        let allowed = engine
            .check_resource_access(division, ResourceType::Form, ResourceAction::Approve, Some(&ours))
            .unwrap();
        assert!(allowed.allowed);

        let outside = engine
            .check_resource_access(division, ResourceType::Form, ResourceAction::Approve, Some(&theirs))
            .unwrap();
        assert_eq!(outside.reason, "resource outside admin's geographic scope");

        let no_flag = engine
            .check_resource_access(division, ResourceType::Deadline, ResourceAction::Create, Some(&ours))
            .unwrap();
        assert_eq!(no_flag.reason, "missing can_set_deadlines permission");
    }

    #[test]
    fn unassigned_actor_has_no_geographic_reach() {
        let decision = engine()
            .check_resource_access(
                actor_id(testing::BROKEN_REGION),
                ResourceType::Form,
                ResourceAction::View,
                Some(&GeoAssignment::region(r(4))),
            )
            .unwrap();
        assert!(!decision.allowed);
    }

    #[test]
    fn inactive_actor_denied_with_inactive_reason() {
        let decision = engine()
            .check_resource_access(actor_id(testing::RETIRED_DIVISION_17), ResourceType::Form, ResourceAction::View, None)
            .unwrap();
        assert_eq!(decision, AccessDecision::deny("inactive"));
    }

    // Deadline gate

    #[test]
    fn region_sets_deadline_in_own_region_only() {
        let engine = engine();
        let rd4 = actor_id(testing::REGION_4);
        let own = engine.can_set_deadline(rd4, Some(r(4)), None, None).unwrap();
        assert!(own.allowed);
        assert_eq!(own.reason, "within assigned region");

        let other = engine.can_set_deadline(rd4, Some(r(9)), None, None).unwrap();
        assert!(!other.allowed);
        assert_eq!(other.reason, "deadline region outside admin's region");

        assert!(engine.can_set_deadline(rd4, None, None, None).unwrap().allowed);
    }

    #[test]
    fn deadline_division_and_district_must_be_in_region() {
        let engine = engine();
        let rd4 = actor_id(testing::REGION_4);
        assert!(engine.can_set_deadline(rd4, None, Some(d(15)), Some(di(3))).unwrap().allowed);
        assert!(!engine.can_set_deadline(rd4, None, Some(d(30)), None).unwrap().allowed);
        assert!(!engine.can_set_deadline(rd4, None, None, Some(di(4))).unwrap().allowed);
        let mismatched = engine.can_set_deadline(rd4, None, Some(d(17)), Some(di(3))).unwrap();
        assert_eq!(mismatched.reason, "deadline district is not in the given division");
    }

    #[test]
    fn central_never_sets_deadlines() {
        let decision = engine()
            .can_set_deadline(actor_id(testing::CENTRAL), Some(r(4)), None, None)
            .unwrap();
        assert_eq!(decision.reason, "only region admins may set deadlines");
    }

    #[test]
    fn region_without_flag_denied() {
        let fx = testing::fixture();
        fx.directory
            .try_update(actor_id(testing::REGION_9), &mut |a| {
                a.permissions.can_set_deadlines = false;
                Ok(())
            })
            .unwrap();
        let decision = fx
            .engine
            .can_set_deadline(actor_id(testing::REGION_9), Some(r(9)), None, None)
            .unwrap();
        assert_eq!(decision.reason, "missing can_set_deadlines permission");
    }

    #[test]
    fn suspended_region_denied() {
        let fx = testing::fixture();
        fx.directory
            .try_update(actor_id(testing::REGION_4), &mut |a| {
                a.status = ActorStatus::Suspended;
                Ok(())
            })
            .unwrap();
        let decision = fx
            .engine
            .can_set_deadline(actor_id(testing::REGION_4), Some(r(4)), None, None)
            .unwrap();
        assert_eq!(decision, AccessDecision::deny("inactive"));
    }

    // Scope and audit surface

    #[test]
    fn resolve_scope_reports_missing_and_inactive() {
        let engine = engine();
        assert!(matches!(engine.resolve_scope(actor_id(999)), Err(EngineError::NotFound(_))));
        assert!(matches!(
            engine.resolve_scope(actor_id(testing::RETIRED_DIVISION_17)),
            Err(EngineError::Inactive { .. })
        ));
    }

    #[test]
    fn record_audit_appends_event() {
        let fx = testing::fixture();
        let mut detail = Map::new();
        detail.insert("format".into(), Value::from("csv"));
        fx.engine.record_audit(
            actor_id(testing::REGION_4),
            "report.export",
            "form",
            Some("sf-4".into()),
            detail,
            &ClientInfo::new(Some("10.1.2.3".into()), None),
        );
        let events = fx.audit.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, "report.export");
        assert_eq!(events[0].resource_id.as_deref(), Some("sf-4"));
        assert_eq!(events[0].detail["format"], "csv");
        assert_eq!(events[0].client.ip_address.as_deref(), Some("10.1.2.3"));
    }

    #[test]
    fn default_permissions_exposed() {
        assert_eq!(
            AccessEngine::default_permissions(AdminLevel::School),
            PermissionFlags::none()
        );
    }
}
