//! # Administrative Service
//!
//! Explicit guards for the request layer. Handlers call
//! [`AccessService::check`] or [`AccessService::require`] before touching
//! business logic, and route mutations (accounts, deadlines, submission
//! review) through the service so each one is gated, applied as a single
//! read-modify-write, and audited.
//!
//! ## Audit
//!
//! Every guard decision is recorded as `access.decision`, allowed or not.
//! Mutations record their own event (`actor.create`, `actor.update`,
//! `actor.deactivate`, `deadline.create`, `submission.approve`,
//! `submission.return`, `submission.bulk_review`). Audit failures never
//! fail the mutation.
//!
//! ## Central instructions
//!
//! The creation gate lets a division create region accounts when
//! instructed by central. The service makes that instruction explicit: a
//! division caller must present a [`CentralInstruction`] naming an active
//! central actor, or the creation is refused. Promoting an existing
//! account to region level through [`AccessService::update_actor`] is
//! held to the same rule.
//!
//! ## Explicit grants
//!
//! Permission overrides that grant a flag are limited to flags the caller
//! holds itself. Central callers may grant anything.

use geoscope_audit::ClientInfo;
use geoscope_core::{
    default_permissions, AccessDecision, ActorId, AdminLevel, GeoAssignment, PermissionFlag,
    PermissionOverrides, Timestamp,
};
use geoscope_directory::{Actor, DirectoryError, NewActor};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::deadline::{Deadline, DeadlineRegistry, DeadlineRequest};
use crate::error::EngineError;
use crate::evaluator::{can_see, AccessEngine};
use crate::resource::{ResourceAction, ResourceLocation, ResourceType};
use crate::review::{BulkReviewOutcome, ReviewAction, ReviewFailure, Submission, SubmissionStore};
use crate::scope;

/// Record of a central administrator authorizing a division to create a
/// region account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CentralInstruction {
    pub issued_by: ActorId,
    /// Memo or ticket number of the instruction.
    pub reference: String,
    pub issued_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateActorRequest {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    pub admin_level: AdminLevel,
    /// May name only the most specific node; ancestors are filled from
    /// the hierarchy.
    #[serde(flatten)]
    pub assignment: GeoAssignment,
    #[serde(default)]
    pub permissions: PermissionOverrides,
    #[serde(default)]
    pub instruction: Option<CentralInstruction>,
}

/// Field changes for [`AccessService::update_actor`]. `None` leaves a
/// field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorChanges {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub admin_level: Option<AdminLevel>,
    #[serde(default)]
    pub assignment: Option<GeoAssignment>,
    #[serde(default)]
    pub permissions: PermissionOverrides,
    /// Required when a division promotes an account to region level.
    #[serde(default)]
    pub instruction: Option<CentralInstruction>,
}

impl ActorChanges {
    fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.email.is_some() {
            fields.push("email");
        }
        if self.full_name.is_some() {
            fields.push("full_name");
        }
        if self.admin_level.is_some() {
            fields.push("admin_level");
        }
        if self.assignment.is_some() {
            fields.push("assignment");
        }
        if !self.permissions.is_empty() {
            fields.push("permissions");
        }
        fields
    }
}

#[derive(Debug, Clone)]
pub struct AccessService {
    engine: AccessEngine,
    deadlines: DeadlineRegistry,
    submissions: SubmissionStore,
}

impl AccessService {
    pub fn new(engine: AccessEngine) -> Self {
        Self::with_stores(engine, DeadlineRegistry::new(), SubmissionStore::new())
    }

    pub fn with_stores(
        engine: AccessEngine,
        deadlines: DeadlineRegistry,
        submissions: SubmissionStore,
    ) -> Self {
        Self {
            engine,
            deadlines,
            submissions,
        }
    }

    pub fn engine(&self) -> &AccessEngine {
        &self.engine
    }

    pub fn deadlines(&self) -> &DeadlineRegistry {
        &self.deadlines
    }

    pub fn submissions(&self) -> &SubmissionStore {
        &self.submissions
    }

    fn audit_decision(
        &self,
        actor_id: ActorId,
        gate: &str,
        resource_type: &str,
        resource_id: Option<String>,
        decision: &AccessDecision,
        client: &ClientInfo,
    ) {
        let mut detail = Map::new();
        detail.insert("gate".into(), json!(gate));
        detail.insert("allowed".into(), json!(decision.allowed));
        detail.insert("reason".into(), json!(decision.reason));
        self.engine.record_audit(
            actor_id,
            "access.decision",
            resource_type,
            resource_id,
            detail,
            client,
        );
    }

    fn deny(
        &self,
        actor_id: ActorId,
        gate: &str,
        resource_type: &str,
        resource_id: Option<String>,
        decision: AccessDecision,
        client: &ClientInfo,
    ) -> EngineError {
        self.audit_decision(actor_id, gate, resource_type, resource_id, &decision, client);
        tracing::info!(actor_id = %actor_id, gate, reason = %decision.reason, "request denied");
        EngineError::denied(decision.reason)
    }

    /// Guard: evaluate the resource gate and audit the decision.
    pub fn check(
        &self,
        actor_id: ActorId,
        resource_type: ResourceType,
        action: ResourceAction,
        location: Option<&ResourceLocation>,
        client: &ClientInfo,
    ) -> Result<AccessDecision, EngineError> {
        let decision = self
            .engine
            .check_resource_access(actor_id, resource_type, action, location)?;
        let mut detail = Map::new();
        detail.insert("gate".into(), json!("resource"));
        detail.insert("action".into(), json!(action));
        detail.insert("allowed".into(), json!(decision.allowed));
        detail.insert("reason".into(), json!(decision.reason));
        if let Some(location) = location {
            detail.insert("location".into(), json!(location));
        }
        self.engine.record_audit(
            actor_id,
            "access.decision",
            resource_type.as_str(),
            None,
            detail,
            client,
        );
        Ok(decision)
    }

    /// Guard that turns a deny into [`EngineError::PermissionDenied`].
    pub fn require(
        &self,
        actor_id: ActorId,
        resource_type: ResourceType,
        action: ResourceAction,
        location: Option<&ResourceLocation>,
        client: &ClientInfo,
    ) -> Result<(), EngineError> {
        self.check(actor_id, resource_type, action, location, client)?
            .into_result(|reason| EngineError::PermissionDenied { reason })
    }

    /// Complete an assignment from the hierarchy and check it against the
    /// level.
    fn settle_assignment(
        &self,
        level: AdminLevel,
        assignment: &GeoAssignment,
    ) -> Result<GeoAssignment, EngineError> {
        let completed = self.engine.hierarchy().complete(assignment)?;
        completed.validate_for(level)?;
        Ok(completed)
    }

    /// Create an administrative account.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Validation`] for a blank username or bad email.
    /// - [`EngineError::InvalidAssignment`] if the geography does not fit
    ///   the level or the hierarchy.
    /// - [`EngineError::PermissionDenied`] if the creation gate denies, a
    ///   division creates a region account without a valid
    ///   [`CentralInstruction`], or an override grants a flag the creator
    ///   lacks.
    /// - [`EngineError::DuplicateIdentity`] if the username or email is
    ///   taken.
    pub fn create_actor(
        &self,
        creator_id: ActorId,
        request: CreateActorRequest,
        client: &ClientInfo,
    ) -> Result<Actor, EngineError> {
        let level = request.admin_level;
        let new_actor = NewActor {
            username: request.username,
            email: request.email,
            full_name: request.full_name,
            admin_level: level,
            assignment: request.assignment,
            permissions: default_permissions(level).with_overrides(&request.permissions),
            created_by: Some(creator_id),
        }
        .normalized();
        new_actor.validate()?;
        let assignment = self.settle_assignment(level, &new_actor.assignment)?;

        let decision = self.engine.can_create(creator_id, level, &assignment)?;
        if !decision.allowed {
            return Err(self.deny(creator_id, "create", "user", None, decision, client));
        }

        let creator = self.engine.directory().get_active(creator_id)?;
        if creator.admin_level == AdminLevel::Division && level == AdminLevel::Region {
            if let Err(reason) = self.verify_instruction(request.instruction.as_ref()) {
                return Err(self.deny(
                    creator_id,
                    "create",
                    "user",
                    None,
                    AccessDecision::deny(reason),
                    client,
                ));
            }
        }
        if let Err(reason) = check_grants(&creator, &request.permissions) {
            return Err(self.deny(creator_id, "create", "user", None, AccessDecision::deny(reason), client));
        }

        let actor = self.engine.directory().insert(NewActor {
            assignment,
            ..new_actor
        })?;

        let mut detail = Map::new();
        detail.insert("username".into(), json!(actor.username));
        detail.insert("admin_level".into(), json!(actor.admin_level));
        detail.insert("assignment".into(), json!(actor.assignment));
        detail.insert("permissions".into(), json!(actor.permissions));
        if let Some(instruction) = &request.instruction {
            detail.insert("instruction".into(), json!(instruction));
        }
        self.engine.record_audit(
            creator_id,
            "actor.create",
            "user",
            Some(actor.id.to_string()),
            detail,
            client,
        );
        tracing::info!(creator_id = %creator_id, actor_id = %actor.id, level = %level, "actor created");
        Ok(actor)
    }

    fn verify_instruction(&self, instruction: Option<&CentralInstruction>) -> Result<(), String> {
        let Some(instruction) = instruction else {
            return Err("division may create region accounts only with a central instruction".into());
        };
        if instruction.reference.trim().is_empty() {
            return Err("central instruction must carry a reference".into());
        }
        match self.engine.directory().get_active(instruction.issued_by) {
            Ok(issuer) if issuer.admin_level == AdminLevel::Central => Ok(()),
            _ => Err("central instruction must be issued by an active central admin".into()),
        }
    }

    /// Management guard shared by update and deactivate.
    fn manage_decision(&self, actor_id: ActorId, target_id: ActorId) -> Result<AccessDecision, EngineError> {
        let actor = match self.engine.directory().get(actor_id) {
            Ok(actor) if actor.is_active() => actor,
            Ok(_) => return Ok(AccessDecision::deny("inactive")),
            Err(DirectoryError::NotFound(_)) => {
                return Ok(AccessDecision::deny("actor not found"))
            }
            Err(e) => return Err(e.into()),
        };
        if actor.admin_level != AdminLevel::Central
            && !actor.has(PermissionFlag::CanManageUsers)
        {
            return Ok(AccessDecision::deny("missing can_manage_users permission"));
        }
        if !self.engine.can_access_user(actor_id, target_id)? {
            return Ok(AccessDecision::deny("target outside admin's management scope"));
        }
        Ok(AccessDecision::allow("within management scope"))
    }

    /// Edit another actor's account.
    ///
    /// A level or assignment change must also pass the creation gate for
    /// the resulting level and geography, so an administrator cannot move
    /// an account somewhere it could not have created it. A division
    /// promoting an account to region level needs a [`CentralInstruction`]
    /// in [`ActorChanges::instruction`].
    ///
    /// A level change replaces the account's flags with the new level's
    /// defaults before `changes.permissions` is applied. Without a level
    /// change the overrides apply to the stored flags.
    pub fn update_actor(
        &self,
        actor_id: ActorId,
        target_id: ActorId,
        changes: ActorChanges,
        client: &ClientInfo,
    ) -> Result<Actor, EngineError> {
        let resource_id = Some(target_id.to_string());
        let decision = self.manage_decision(actor_id, target_id)?;
        if !decision.allowed {
            return Err(self.deny(actor_id, "manage", "user", resource_id, decision, client));
        }

        let caller = self.engine.directory().get_active(actor_id)?;
        if let Err(reason) = check_grants(&caller, &changes.permissions) {
            return Err(self.deny(actor_id, "manage", "user", resource_id, AccessDecision::deny(reason), client));
        }

        let current = self.engine.directory().get(target_id)?;
        let level = changes.admin_level.unwrap_or(current.admin_level);
        let relocating = changes.admin_level.is_some() || changes.assignment.is_some();
        let assignment = if relocating {
            let requested = changes.assignment.unwrap_or(current.assignment);
            let settled = self.settle_assignment(level, &requested)?;
            let decision = self.engine.can_create(actor_id, level, &settled)?;
            if !decision.allowed {
                return Err(self.deny(actor_id, "create", "user", resource_id, decision, client));
            }
            if caller.admin_level == AdminLevel::Division && level == AdminLevel::Region {
                if let Err(reason) = self.verify_instruction(changes.instruction.as_ref()) {
                    return Err(self.deny(
                        actor_id,
                        "create",
                        "user",
                        resource_id,
                        AccessDecision::deny(reason),
                        client,
                    ));
                }
            }
            settled
        } else {
            current.assignment
        };
        let level_changed = relocating && level != current.admin_level;

        let email = changes.email.as_ref().map(|e| e.trim().to_ascii_lowercase());
        let updated = self.engine.directory().try_update(target_id, &mut |actor| {
            if let Some(email) = &email {
                actor.email = email.clone();
            }
            if let Some(full_name) = &changes.full_name {
                actor.full_name = full_name.trim().to_string();
            }
            if relocating {
                actor.admin_level = level;
                actor.assignment = assignment;
            }
            let base = if level_changed { default_permissions(level) } else { actor.permissions };
            actor.permissions = base.with_overrides(&changes.permissions);
            Ok(())
        })?;

        let mut detail = Map::new();
        detail.insert("changed".into(), json!(changes.changed_fields()));
        detail.insert("admin_level".into(), json!(updated.admin_level));
        detail.insert("assignment".into(), json!(updated.assignment));
        if level_changed {
            detail.insert("permissions".into(), json!(updated.permissions));
        }
        if let Some(instruction) = &changes.instruction {
            detail.insert("instruction".into(), json!(instruction));
        }
        self.engine
            .record_audit(actor_id, "actor.update", "user", resource_id, detail, client);
        Ok(updated)
    }

    /// Soft delete. An actor may not deactivate itself.
    pub fn deactivate_actor(
        &self,
        actor_id: ActorId,
        target_id: ActorId,
        client: &ClientInfo,
    ) -> Result<Actor, EngineError> {
        let resource_id = Some(target_id.to_string());
        let decision = if actor_id == target_id {
            AccessDecision::deny("cannot deactivate own account")
        } else {
            self.manage_decision(actor_id, target_id)?
        };
        if !decision.allowed {
            return Err(self.deny(actor_id, "manage", "user", resource_id, decision, client));
        }
        let previous = self.engine.directory().get(target_id)?.status;
        let actor = self.engine.directory().deactivate(target_id)?;
        let mut detail = Map::new();
        detail.insert("previous_status".into(), json!(previous));
        self.engine
            .record_audit(actor_id, "actor.deactivate", "user", resource_id, detail, client);
        Ok(actor)
    }

    /// Publish a deadline in the caller's region.
    pub fn set_deadline(
        &self,
        actor_id: ActorId,
        request: DeadlineRequest,
        client: &ClientInfo,
    ) -> Result<Deadline, EngineError> {
        request.validate()?;
        let decision = self.engine.can_set_deadline(
            actor_id,
            request.region_id,
            request.division_id,
            request.district_id,
        )?;
        if !decision.allowed {
            return Err(self.deny(actor_id, "deadline", "deadline", None, decision, client));
        }
        let actor = self.engine.directory().get_active(actor_id)?;
        let Some(region_id) = request.region_id.or(actor.region_id()) else {
            return Err(EngineError::denied("region admin has no assigned region"));
        };
        let deadline = self.deadlines.insert(Deadline {
            id: Uuid::new_v4(),
            form_type: request.form_type.trim().to_string(),
            deadline_date: request.deadline_date,
            region_id,
            division_id: request.division_id,
            district_id: request.district_id,
            is_active: true,
            created_by: actor_id,
            created_at: Timestamp::now(),
        });

        let mut detail = Map::new();
        detail.insert("form_type".into(), json!(deadline.form_type));
        detail.insert("deadline_date".into(), json!(deadline.deadline_date));
        detail.insert("scope".into(), json!(deadline.scope()));
        self.engine.record_audit(
            actor_id,
            "deadline.create",
            "deadline",
            Some(deadline.id.to_string()),
            detail,
            client,
        );
        Ok(deadline)
    }

    /// Approve or return many submissions. Each item is gated and applied
    /// on its own; failures are collected, never propagated.
    ///
    /// # Errors
    ///
    /// Only for a request that cannot start: a missing or inactive
    /// reviewer, a return without remarks, or an unreachable directory.
    pub fn bulk_review(
        &self,
        actor_id: ActorId,
        submission_ids: &[Uuid],
        action: ReviewAction,
        client: &ClientInfo,
    ) -> Result<BulkReviewOutcome, EngineError> {
        action.validate()?;
        self.engine.directory().get_active(actor_id)?;

        let mut outcome = BulkReviewOutcome {
            requested: submission_ids.len(),
            ..BulkReviewOutcome::default()
        };
        for &id in submission_ids {
            match self.review_one(actor_id, id, &action, client) {
                Ok(submission) => outcome.succeeded.push(submission.id),
                Err(reason) => {
                    tracing::debug!(actor_id = %actor_id, submission_id = %id, reason = %reason, "review item skipped");
                    outcome.failed.push(ReviewFailure {
                        submission_id: id,
                        reason,
                    })
                }
            }
        }

        let mut detail = Map::new();
        detail.insert("decision".into(), json!(action.audit_action()));
        detail.insert("requested".into(), json!(outcome.requested));
        detail.insert("succeeded".into(), json!(outcome.success_count()));
        detail.insert("failed".into(), json!(outcome.failure_count()));
        self.engine.record_audit(
            actor_id,
            "submission.bulk_review",
            "form",
            None,
            detail,
            client,
        );
        Ok(outcome)
    }

    fn review_one(
        &self,
        actor_id: ActorId,
        id: Uuid,
        action: &ReviewAction,
        client: &ClientInfo,
    ) -> Result<Submission, String> {
        let submission = self
            .submissions
            .get(id)
            .ok_or_else(|| "submission not found".to_string())?;
        let decision = self
            .engine
            .check_resource_access(
                actor_id,
                ResourceType::Form,
                ResourceAction::Approve,
                Some(&submission.location),
            )
            .map_err(|e| e.to_string())?;
        if !decision.allowed {
            return Err(decision.reason);
        }
        let reviewed = self.submissions.review(id, actor_id, action)?;

        let mut detail = Map::new();
        detail.insert("form_type".into(), json!(reviewed.form_type));
        detail.insert("location".into(), json!(reviewed.location));
        if let Some(remarks) = &reviewed.remarks {
            detail.insert("remarks".into(), Value::from(remarks.as_str()));
        }
        self.engine.record_audit(
            actor_id,
            action.audit_action(),
            "form",
            Some(id.to_string()),
            detail,
            client,
        );
        Ok(reviewed)
    }

    /// Actors the caller may see or manage, ordered by id.
    pub fn visible_actors(&self, actor_id: ActorId) -> Result<Vec<Actor>, EngineError> {
        let actor = self.engine.directory().get_active(actor_id)?;
        Ok(self
            .engine
            .directory()
            .list_where(&|target| can_see(&actor, target))?)
    }

    /// Submissions inside the caller's scope.
    pub fn visible_submissions(&self, actor_id: ActorId) -> Result<Vec<Submission>, EngineError> {
        let actor = self.engine.directory().get_active(actor_id)?;
        let scope = scope::resolve(&actor, self.engine.hierarchy());
        Ok(scope.filter(self.submissions.list(), |s| s.location))
    }
}

/// Overrides may only grant flags the caller holds, unless the caller is
/// central.
fn check_grants(caller: &Actor, overrides: &PermissionOverrides) -> Result<(), String> {
    if caller.admin_level == AdminLevel::Central {
        return Ok(());
    }
    match PermissionFlag::ALL
        .into_iter()
        .find(|&flag| overrides.get(flag) == Some(true) && !caller.has(flag))
    {
        Some(flag) => Err(format!("cannot grant {flag} without holding it")),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, actor_id, d, di, r, s};
    use geoscope_core::ActorStatus;
    use geoscope_directory::ActorDirectory;

    fn service() -> (AccessService, testing::Fixture) {
        let fx = testing::fixture();
        (AccessService::new(fx.engine.clone()), fx)
    }

    fn client() -> ClientInfo {
        ClientInfo::new(Some("192.168.10.4".into()), Some("curl/8.5".into()))
    }

    fn request(username: &str, level: AdminLevel, assignment: GeoAssignment) -> CreateActorRequest {
        CreateActorRequest {
            username: username.into(),
            email: format!("{username}@deped.gov.ph"),
            full_name: String::new(),
            admin_level: level,
            assignment,
            permissions: PermissionOverrides::default(),
            instruction: None,
        }
    }

    fn school_only(id: i64) -> GeoAssignment {
        GeoAssignment {
            school_id: Some(s(id)),
            ..GeoAssignment::default()
        }
    }

    #[test]
    fn create_completes_assignment_and_audits() {
        let (svc, fx) = service();
        let actor = svc
            .create_actor(
                actor_id(testing::CENTRAL),
                request("gen001", AdminLevel::School, school_only(101)),
                &client(),
            )
            .unwrap();
        assert_eq!(actor.email, "gen001@deped.gov.ph");
        assert_eq!(actor.assignment, GeoAssignment::school(r(4), d(17), di(1), s(101)));
        assert_eq!(actor.created_by, Some(actor_id(testing::CENTRAL)));
        assert_eq!(actor.permissions, default_permissions(AdminLevel::School));

        let events = fx.audit.by_action("actor.create");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].resource_id, Some(actor.id.to_string()));
        assert_eq!(events[0].client.user_agent.as_deref(), Some("curl/8.5"));
    }

    #[test]
    fn central_override_wins_over_default() {
        let (svc, _fx) = service();
        let mut req = request("co-auditor", AdminLevel::Central, GeoAssignment::nationwide());
        req.permissions = PermissionOverrides::default().with(PermissionFlag::CanViewSystemLogs, false);
        let actor = svc.create_actor(actor_id(testing::CENTRAL), req, &client()).unwrap();
        assert!(!actor.permissions.can_view_system_logs);
        assert!(actor.permissions.can_create_users);
        assert!(actor.permissions.can_manage_users);
        assert!(actor.permissions.can_set_deadlines);
        assert!(actor.permissions.can_approve_submissions);
    }

    #[test]
    fn division_create_outside_division_denied_and_audited() {
        let (svc, fx) = service();
        let err = svc
            .create_actor(
                actor_id(testing::DIVISION_17),
                request("psds-calamba", AdminLevel::District, GeoAssignment {
                    district_id: Some(di(3)),
                    ..GeoAssignment::default()
                }),
                &client(),
            )
            .unwrap_err();
        let EngineError::PermissionDenied { reason } = err else {
            panic!("expected denial, got {err:?}");
        };
        assert!(reason.contains("only create within assigned division"));
        let decisions = fx.audit.by_action("access.decision");
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].detail["allowed"], false);
    }

    #[test]
    fn inconsistent_assignment_rejected() {
        let (svc, _fx) = service();
        let err = svc
            .create_actor(
                actor_id(testing::CENTRAL),
                request("rd-x", AdminLevel::Region, GeoAssignment::division(r(4), d(17))),
                &client(),
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidAssignment(_)));

        let err = svc
            .create_actor(
                actor_id(testing::CENTRAL),
                request("sh-x", AdminLevel::School, school_only(999)),
                &client(),
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidAssignment(_)));
    }

    #[test]
    fn duplicate_username_rejected() {
        let (svc, _fx) = service();
        let mut req = request("SDS17", AdminLevel::District, GeoAssignment::district(r(4), d(17), di(1)));
        req.email = "other@deped.gov.ph".into();
        let err = svc
            .create_actor(actor_id(testing::CENTRAL), req, &client())
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateIdentity { field: "username", .. }));
    }

    #[test]
    fn division_creating_region_needs_central_instruction() {
        let (svc, _fx) = service();
        let creator = actor_id(testing::DIVISION_17);
        let base = request("rd4-oic", AdminLevel::Region, GeoAssignment::region(r(4)));

        let err = svc.create_actor(creator, base.clone(), &client()).unwrap_err();
        assert!(matches!(err, EngineError::PermissionDenied { .. }));

        let mut forged = base.clone();
        forged.instruction = Some(CentralInstruction {
            issued_by: actor_id(testing::REGION_4),
            reference: "memo-2026-114".into(),
            issued_at: Timestamp::now(),
        });
        let err = svc.create_actor(creator, forged, &client()).unwrap_err();
        assert_eq!(
            err,
            EngineError::denied("central instruction must be issued by an active central admin")
        );

        let mut instructed = base;
        instructed.instruction = Some(CentralInstruction {
            issued_by: actor_id(testing::CENTRAL),
            reference: "memo-2026-114".into(),
            issued_at: Timestamp::now(),
        });
        let actor = svc.create_actor(creator, instructed, &client()).unwrap();
        assert_eq!(actor.admin_level, AdminLevel::Region);
    }

    #[test]
    fn update_requires_management_scope() {
        let (svc, _fx) = service();
        let changes = ActorChanges {
            full_name: Some("Principal Reyes".into()),
            ..ActorChanges::default()
        };
        let updated = svc
            .update_actor(actor_id(testing::DIVISION_17), actor_id(testing::SCHOOL_101), changes.clone(), &client())
            .unwrap();
        assert_eq!(updated.full_name, "Principal Reyes");

        let err = svc
            .update_actor(actor_id(testing::DIVISION_17), actor_id(testing::SCHOOL_301), changes.clone(), &client())
            .unwrap_err();
        assert_eq!(err, EngineError::denied("target outside admin's management scope"));

        let err = svc
            .update_actor(actor_id(testing::REGION_4), actor_id(testing::SCHOOL_101), changes, &client())
            .unwrap_err();
        assert_eq!(err, EngineError::denied("missing can_manage_users permission"));
    }

    #[test]
    fn update_cannot_move_account_out_of_division() {
        let (svc, fx) = service();
        let changes = ActorChanges {
            assignment: Some(school_only(301)),
            ..ActorChanges::default()
        };
        let err = svc
            .update_actor(actor_id(testing::DIVISION_17), actor_id(testing::SCHOOL_101), changes, &client())
            .unwrap_err();
        assert!(matches!(err, EngineError::PermissionDenied { .. }));
        let unchanged = fx.directory.get(actor_id(testing::SCHOOL_101)).unwrap();
        assert_eq!(unchanged.school_id(), Some(s(101)));
    }

    #[test]
    fn update_cannot_promote_to_region_without_central_instruction() {
        let (svc, fx) = service();
        let promote = ActorChanges {
            admin_level: Some(AdminLevel::Region),
            assignment: Some(GeoAssignment::region(r(9))),
            ..ActorChanges::default()
        };
        let err = svc
            .update_actor(actor_id(testing::DIVISION_17), actor_id(testing::SCHOOL_101), promote.clone(), &client())
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::denied("division may create region accounts only with a central instruction")
        );
        let unchanged = fx.directory.get(actor_id(testing::SCHOOL_101)).unwrap();
        assert_eq!(unchanged.admin_level, AdminLevel::School);
        let deadline = fx
            .engine
            .can_set_deadline(actor_id(testing::SCHOOL_101), Some(r(9)), None, None)
            .unwrap();
        assert!(!deadline.allowed);
        assert_eq!(fx.audit.by_action("access.decision").len(), 1);
        assert!(fx.audit.by_action("actor.update").is_empty());

        let instructed = ActorChanges {
            instruction: Some(CentralInstruction {
                issued_by: actor_id(testing::CENTRAL),
                reference: "memo-2026-201".into(),
                issued_at: Timestamp::now(),
            }),
            ..promote
        };
        let promoted = svc
            .update_actor(actor_id(testing::DIVISION_17), actor_id(testing::SCHOOL_101), instructed, &client())
            .unwrap();
        assert_eq!(promoted.admin_level, AdminLevel::Region);
        assert_eq!(promoted.permissions, default_permissions(AdminLevel::Region));
        let events = fx.audit.by_action("actor.update");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].detail["instruction"]["reference"], "memo-2026-201");
    }

    #[test]
    fn level_change_resets_flags_to_new_defaults() {
        let (svc, _fx) = service();
        let demote = ActorChanges {
            admin_level: Some(AdminLevel::School),
            assignment: Some(school_only(101)),
            ..ActorChanges::default()
        };
        let demoted = svc
            .update_actor(actor_id(testing::CENTRAL), actor_id(testing::REGION_4), demote, &client())
            .unwrap();
        assert_eq!(demoted.permissions, default_permissions(AdminLevel::School));
        assert!(!demoted.has(PermissionFlag::CanViewSystemLogs));

        let revoke = ActorChanges {
            permissions: PermissionOverrides::default().with(PermissionFlag::CanViewSystemLogs, false),
            ..ActorChanges::default()
        };
        svc.update_actor(actor_id(testing::CENTRAL), actor_id(testing::REGION_9), revoke, &client())
            .unwrap();
        let rename = ActorChanges {
            full_name: Some("RD Region 9".into()),
            ..ActorChanges::default()
        };
        let renamed = svc
            .update_actor(actor_id(testing::CENTRAL), actor_id(testing::REGION_9), rename, &client())
            .unwrap();
        assert!(!renamed.has(PermissionFlag::CanViewSystemLogs));
        assert!(renamed.has(PermissionFlag::CanSetDeadlines));
    }

    #[test]
    fn grants_limited_to_callers_own_flags() {
        let (svc, fx) = service();
        let division = actor_id(testing::DIVISION_17);
        let grant = PermissionOverrides::default().with(PermissionFlag::CanSetDeadlines, true);

        let changes = ActorChanges {
            permissions: grant,
            ..ActorChanges::default()
        };
        let err = svc
            .update_actor(division, actor_id(testing::SCHOOL_101), changes, &client())
            .unwrap_err();
        assert_eq!(err, EngineError::denied("cannot grant can_set_deadlines without holding it"));
        assert!(!fx.directory.get(actor_id(testing::SCHOOL_101)).unwrap().has(PermissionFlag::CanSetDeadlines));

        let mut req = request("sh102-b", AdminLevel::School, school_only(102));
        req.permissions = grant;
        let err = svc.create_actor(division, req, &client()).unwrap_err();
        assert_eq!(err, EngineError::denied("cannot grant can_set_deadlines without holding it"));

        let held = ActorChanges {
            permissions: PermissionOverrides::default().with(PermissionFlag::CanApproveSubmissions, true),
            ..ActorChanges::default()
        };
        let updated = svc
            .update_actor(division, actor_id(testing::SCHOOL_101), held, &client())
            .unwrap();
        assert!(updated.has(PermissionFlag::CanApproveSubmissions));
    }

    #[test]
    fn deactivate_soft_deletes() {
        let (svc, fx) = service();
        let actor = svc
            .deactivate_actor(actor_id(testing::CENTRAL), actor_id(testing::DISTRICT_2), &client())
            .unwrap();
        assert_eq!(actor.status, ActorStatus::Inactive);
        assert!(fx.directory.get(actor_id(testing::DISTRICT_2)).is_ok());
        assert_eq!(fx.audit.by_action("actor.deactivate").len(), 1);

        let err = svc
            .deactivate_actor(actor_id(testing::CENTRAL), actor_id(testing::CENTRAL), &client())
            .unwrap_err();
        assert_eq!(err, EngineError::denied("cannot deactivate own account"));
    }

    #[test]
    fn set_deadline_defaults_to_own_region() {
        let (svc, fx) = service();
        let deadline = svc
            .set_deadline(
                actor_id(testing::REGION_4),
                DeadlineRequest {
                    form_type: "SF-4".into(),
                    deadline_date: "2026-11-30".parse().unwrap(),
                    region_id: None,
                    division_id: Some(d(15)),
                    district_id: None,
                },
                &client(),
            )
            .unwrap();
        assert_eq!(deadline.region_id, r(4));
        assert_eq!(deadline.created_by, actor_id(testing::REGION_4));
        assert_eq!(svc.deadlines().list().len(), 1);
        assert_eq!(fx.audit.by_action("deadline.create").len(), 1);

        let err = svc
            .set_deadline(
                actor_id(testing::REGION_4),
                DeadlineRequest {
                    form_type: "SF-4".into(),
                    deadline_date: "2026-11-30".parse().unwrap(),
                    region_id: Some(r(9)),
                    division_id: None,
                    district_id: None,
                },
                &client(),
            )
            .unwrap_err();
        assert_eq!(err, EngineError::denied("deadline region outside admin's region"));
    }

    #[test]
    fn bulk_review_reports_partial_success() {
        let (svc, fx) = service();
        let store = svc.submissions();
        let ours = store
            .submit("SF-4", GeoAssignment::school(r(4), d(17), di(1), s(101)))
            .unwrap();
        let also_ours = store
            .submit("SF-4", GeoAssignment::school(r(4), d(17), di(2), s(201)))
            .unwrap();
        let theirs = store
            .submit("SF-4", GeoAssignment::school(r(4), d(15), di(3), s(301)))
            .unwrap();
        store.review(also_ours.id, actor_id(testing::CENTRAL), &ReviewAction::Approve).unwrap();
        let missing = Uuid::new_v4();

        let outcome = svc
            .bulk_review(
                actor_id(testing::DIVISION_17),
                &[ours.id, also_ours.id, theirs.id, missing],
                ReviewAction::Approve,
                &client(),
            )
            .unwrap();

        assert_eq!(outcome.requested, 4);
        assert_eq!(outcome.succeeded, vec![ours.id]);
        assert_eq!(outcome.failure_count(), 3);
        let reason_for = |id: Uuid| {
            outcome
                .failed
                .iter()
                .find(|f| f.submission_id == id)
                .map(|f| f.reason.clone())
                .unwrap()
        };
        assert_eq!(reason_for(also_ours.id), "submission already approved");
        assert_eq!(reason_for(theirs.id), "resource outside admin's geographic scope");
        assert_eq!(reason_for(missing), "submission not found");

        assert_eq!(fx.audit.by_action("submission.approve").len(), 1);
        let summary = fx.audit.by_action("submission.bulk_review");
        assert_eq!(summary[0].detail["succeeded"], 1);
        assert_eq!(summary[0].detail["failed"], 3);
    }

    #[test]
    fn bulk_return_requires_remarks() {
        let (svc, _fx) = service();
        let err = svc
            .bulk_review(
                actor_id(testing::DIVISION_17),
                &[],
                ReviewAction::Return { remarks: " ".into() },
                &client(),
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn require_converts_denial() {
        let (svc, fx) = service();
        let err = svc
            .require(
                actor_id(testing::SCHOOL_101),
                ResourceType::System,
                ResourceAction::View,
                None,
                &client(),
            )
            .unwrap_err();
        assert_eq!(err, EngineError::denied("missing can_view_system_logs permission"));
        assert!(svc
            .require(actor_id(testing::REGION_4), ResourceType::System, ResourceAction::View, None, &client())
            .is_ok());
        assert_eq!(fx.audit.by_action("access.decision").len(), 2);
    }

    #[test]
    fn visible_listings_follow_scope() {
        let (svc, _fx) = service();
        let visible: Vec<i64> = svc
            .visible_actors(actor_id(testing::DISTRICT_1))
            .unwrap()
            .into_iter()
            .map(|a| a.id.get())
            .collect();
        assert_eq!(visible, vec![testing::SCHOOL_101, testing::SCHOOL_102]);

        svc.submissions()
            .submit("SF-1", GeoAssignment::school(r(4), d(17), di(1), s(102)))
            .unwrap();
        svc.submissions()
            .submit("SF-1", GeoAssignment::school(r(9), d(30), di(4), s(401)))
            .unwrap();
        assert_eq!(svc.visible_submissions(actor_id(testing::DISTRICT_1)).unwrap().len(), 1);
        assert_eq!(svc.visible_submissions(actor_id(testing::CENTRAL)).unwrap().len(), 2);
    }
}
