//! # Evaluation Subcommands
//!
//! Each command runs one gate against the loaded snapshot and prints a
//! JSON result on stdout.
//!
//! ```bash
//! geoscope scope --actor 3
//! geoscope can-create --creator 3 --level district --division 15
//! geoscope can-access --actor 2 --target 4
//! geoscope check --actor 3 --resource form --action approve --school 101
//! geoscope deadline --actor 2 --region 9
//! geoscope defaults --level division
//! ```
//!
//! Exit status: 0 allowed, 2 denied, 1 error.

use anyhow::Result;
use clap::Args;
use geoscope_audit::ClientInfo;
use geoscope_core::{
    default_permissions, AccessDecision, ActorId, AdminLevel, DistrictId, DivisionId,
    GeoAssignment, RegionId, SchoolId,
};
use geoscope_policy::{AccessService, ResourceAction, ResourceType};
use serde_json::{json, Value};

pub const EXIT_ALLOW: u8 = 0;
pub const EXIT_DENY: u8 = 2;

/// A JSON body and the exit status it maps to.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub body: Value,
    pub code: u8,
}

impl Outcome {
    fn info(body: Value) -> Self {
        Self {
            body,
            code: EXIT_ALLOW,
        }
    }

    fn decision(decision: &AccessDecision, body: Value) -> Self {
        Self {
            body,
            code: if decision.allowed { EXIT_ALLOW } else { EXIT_DENY },
        }
    }
}

/// Geography flags shared by commands that take a target location.
#[derive(Args, Debug, Clone, Default)]
pub struct LocationArgs {
    #[arg(long)]
    pub region: Option<RegionId>,
    #[arg(long)]
    pub division: Option<DivisionId>,
    #[arg(long)]
    pub district: Option<DistrictId>,
    #[arg(long)]
    pub school: Option<SchoolId>,
}

impl LocationArgs {
    pub fn to_assignment(&self) -> GeoAssignment {
        GeoAssignment {
            region_id: self.region,
            division_id: self.division,
            district_id: self.district,
            school_id: self.school,
        }
    }

    fn is_empty(&self) -> bool {
        self.to_assignment().is_empty()
    }
}

#[derive(Args, Debug)]
pub struct ScopeArgs {
    /// Actor whose scope to resolve.
    #[arg(long)]
    pub actor: ActorId,
}

#[derive(Args, Debug)]
pub struct CanCreateArgs {
    #[arg(long)]
    pub creator: ActorId,
    /// Admin level of the account to create.
    #[arg(long)]
    pub level: AdminLevel,
    #[command(flatten)]
    pub location: LocationArgs,
}

#[derive(Args, Debug)]
pub struct CanAccessArgs {
    #[arg(long)]
    pub actor: ActorId,
    #[arg(long)]
    pub target: ActorId,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    #[arg(long)]
    pub actor: ActorId,
    /// user, form, system or deadline.
    #[arg(long)]
    pub resource: ResourceType,
    #[arg(long, default_value = "view")]
    pub action: ResourceAction,
    #[command(flatten)]
    pub location: LocationArgs,
    /// Client address recorded in the audit event.
    #[arg(long)]
    pub ip: Option<String>,
}

#[derive(Args, Debug)]
pub struct DeadlineArgs {
    #[arg(long)]
    pub actor: ActorId,
    #[arg(long)]
    pub region: Option<RegionId>,
    #[arg(long)]
    pub division: Option<DivisionId>,
    #[arg(long)]
    pub district: Option<DistrictId>,
}

#[derive(Args, Debug)]
pub struct DefaultsArgs {
    /// Show one level only.
    #[arg(long)]
    pub level: Option<AdminLevel>,
}

pub fn scope(args: &ScopeArgs, service: &AccessService) -> Result<Outcome> {
    let scope = service.engine().resolve_scope(args.actor)?;
    Ok(Outcome::info(serde_json::to_value(scope)?))
}

pub fn can_create(args: &CanCreateArgs, service: &AccessService) -> Result<Outcome> {
    let target = args.location.to_assignment();
    let decision = service.engine().can_create(args.creator, args.level, &target)?;
    let body = json!({
        "creator": args.creator,
        "target_level": args.level,
        "target_geo": target,
        "allowed": decision.allowed,
        "reason": decision.reason,
    });
    Ok(Outcome::decision(&decision, body))
}

pub fn can_access(args: &CanAccessArgs, service: &AccessService) -> Result<Outcome> {
    let allowed = service.engine().can_access_user(args.actor, args.target)?;
    let body = json!({
        "actor": args.actor,
        "target": args.target,
        "allowed": allowed,
    });
    Ok(Outcome {
        body,
        code: if allowed { EXIT_ALLOW } else { EXIT_DENY },
    })
}

/// Resource check through the audited guard.
pub fn check(args: &CheckArgs, service: &AccessService) -> Result<Outcome> {
    let location = (!args.location.is_empty()).then(|| args.location.to_assignment());
    let client = ClientInfo::new(args.ip.clone(), Some(format!("geoscope-cli/{}", env!("CARGO_PKG_VERSION"))));
    let decision = service.check(args.actor, args.resource, args.action, location.as_ref(), &client)?;
    let body = json!({
        "actor": args.actor,
        "resource": args.resource,
        "action": args.action,
        "location": location,
        "allowed": decision.allowed,
        "reason": decision.reason,
    });
    Ok(Outcome::decision(&decision, body))
}

pub fn deadline(args: &DeadlineArgs, service: &AccessService) -> Result<Outcome> {
    let decision =
        service
            .engine()
            .can_set_deadline(args.actor, args.region, args.division, args.district)?;
    let body = json!({
        "actor": args.actor,
        "region_id": args.region,
        "division_id": args.division,
        "district_id": args.district,
        "allowed": decision.allowed,
        "reason": decision.reason,
    });
    Ok(Outcome::decision(&decision, body))
}

/// Default flag table. Needs no snapshot.
pub fn defaults(args: &DefaultsArgs) -> Result<Outcome> {
    let levels = match args.level {
        Some(level) => vec![level],
        None => AdminLevel::ALL.to_vec(),
    };
    let mut table = serde_json::Map::new();
    for level in levels {
        table.insert(level.to_string(), serde_json::to_value(default_permissions(level))?);
    }
    Ok(Outcome::info(Value::Object(table)))
}
