//! Shared fixture for unit tests: a two-region hierarchy and one actor per
//! interesting role, seeded through the directory.
//!
//! ```text
//! region 4 ── division 17 ── district 1 ── school 101, 102
//!          │              └─ district 2 ── school 201
//!          └─ division 15 ── district 3 ── school 301
//! region 9 ── division 30 ── district 4 ── school 401
//! ```

use std::sync::Arc;

use geoscope_audit::{AuditRecorder, MemoryAuditLog};
use geoscope_core::{
    ActorId, ActorStatus, AdminLevel, DistrictId, DivisionId, GeoAssignment, PermissionOverrides,
    RegionId, SchoolId, Timestamp,
};
use geoscope_directory::{ActorSeed, InMemoryDirectory};
use geoscope_geo::InMemoryHierarchy;

use crate::evaluator::AccessEngine;

pub const CENTRAL: i64 = 1;
pub const REGION_4: i64 = 2;
pub const REGION_9: i64 = 3;
pub const DIVISION_17: i64 = 4;
pub const DIVISION_15: i64 = 5;
pub const DISTRICT_1: i64 = 6;
pub const DISTRICT_2: i64 = 7;
pub const SCHOOL_101: i64 = 8;
pub const SCHOOL_102: i64 = 9;
pub const SCHOOL_301: i64 = 10;
pub const SCHOOL_401: i64 = 11;
pub const RETIRED_DIVISION_17: i64 = 12;
pub const BROKEN_REGION: i64 = 13;

pub fn r(id: i64) -> RegionId {
    RegionId::new(id).unwrap()
}
pub fn d(id: i64) -> DivisionId {
    DivisionId::new(id).unwrap()
}
pub fn di(id: i64) -> DistrictId {
    DistrictId::new(id).unwrap()
}
pub fn s(id: i64) -> SchoolId {
    SchoolId::new(id).unwrap()
}
pub fn actor_id(id: i64) -> ActorId {
    ActorId::new(id).unwrap()
}

pub struct Fixture {
    pub hierarchy: Arc<InMemoryHierarchy>,
    pub directory: InMemoryDirectory,
    pub audit: MemoryAuditLog,
    pub engine: AccessEngine,
}

pub fn hierarchy() -> InMemoryHierarchy {
    InMemoryHierarchy::builder()
        .region(r(4), "Region IV-A CALABARZON")
        .region(r(9), "Region IX Zamboanga Peninsula")
        .division(d(17), "Division of Batangas", r(4))
        .division(d(15), "Division of Laguna", r(4))
        .division(d(30), "Division of Zamboanga City", r(9))
        .district(di(1), "Lipa North", d(17))
        .district(di(2), "Lipa South", d(17))
        .district(di(3), "Calamba East", d(15))
        .district(di(4), "Tetuan", d(30))
        .school(s(101), "Lipa City Central ES", di(1))
        .school(s(102), "Marawoy ES", di(1))
        .school(s(201), "Tambo ES", di(2))
        .school(s(301), "Calamba ES", di(3))
        .school(s(401), "Tetuan Central School", di(4))
        .build()
        .unwrap()
}

fn seed(
    id: i64,
    username: &str,
    level: AdminLevel,
    assignment: GeoAssignment,
    status: ActorStatus,
) -> ActorSeed {
    ActorSeed {
        id: actor_id(id),
        username: username.into(),
        email: format!("{username}@deped.gov.ph"),
        full_name: String::new(),
        admin_level: level,
        status,
        assignment,
        permissions: PermissionOverrides::default(),
        created_by: None,
    }
}

pub fn seeds() -> Vec<ActorSeed> {
    use ActorStatus::{Active, Inactive};
    use AdminLevel::*;
    vec![
        seed(CENTRAL, "co-admin", Central, GeoAssignment::nationwide(), Active),
        seed(REGION_4, "rd4", Region, GeoAssignment::region(r(4)), Active),
        seed(REGION_9, "rd9", Region, GeoAssignment::region(r(9)), Active),
        seed(DIVISION_17, "sds17", Division, GeoAssignment::division(r(4), d(17)), Active),
        seed(DIVISION_15, "sds15", Division, GeoAssignment::division(r(4), d(15)), Active),
        seed(DISTRICT_1, "psds1", District, GeoAssignment::district(r(4), d(17), di(1)), Active),
        seed(DISTRICT_2, "psds2", District, GeoAssignment::district(r(4), d(17), di(2)), Active),
        seed(SCHOOL_101, "sh101", School, GeoAssignment::school(r(4), d(17), di(1), s(101)), Active),
        seed(SCHOOL_102, "sh102", School, GeoAssignment::school(r(4), d(17), di(1), s(102)), Active),
        seed(SCHOOL_301, "sh301", School, GeoAssignment::school(r(4), d(15), di(3), s(301)), Active),
        seed(SCHOOL_401, "sh401", School, GeoAssignment::school(r(9), d(30), di(4), s(401)), Active),
        seed(RETIRED_DIVISION_17, "sds17-old", Division, GeoAssignment::division(r(4), d(17)), Inactive),
        seed(BROKEN_REGION, "rd-unassigned", Region, GeoAssignment::nationwide(), Active),
    ]
}

pub fn fixture() -> Fixture {
    let hierarchy = Arc::new(hierarchy());
    let directory = InMemoryDirectory::new();
    let now = Timestamp::now();
    for seed in seeds() {
        directory.seed(seed.into_actor(now)).unwrap();
    }
    let audit = MemoryAuditLog::new();
    let engine = AccessEngine::new(
        hierarchy.clone(),
        Arc::new(directory.clone()),
        AuditRecorder::new(Arc::new(audit.clone())),
    );
    Fixture {
        hierarchy,
        directory,
        audit,
        engine,
    }
}
