//! # Deadlines
//!
//! Submission deadlines published by region administrators. A deadline is
//! always anchored at a region and may be narrowed to a division or a
//! district inside it.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use geoscope_core::{
    ActorId, DistrictId, DivisionId, GeoAssignment, RegionId, Timestamp, ValidationError,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;
use crate::resource::ResourceLocation;

/// What a region administrator asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadlineRequest {
    pub form_type: String,
    pub deadline_date: NaiveDate,
    /// Defaults to the requesting administrator's region.
    #[serde(default)]
    pub region_id: Option<RegionId>,
    #[serde(default)]
    pub division_id: Option<DivisionId>,
    #[serde(default)]
    pub district_id: Option<DistrictId>,
}

impl DeadlineRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.form_type.trim().is_empty() {
            return Err(ValidationError::EmptyField("form_type"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deadline {
    pub id: Uuid,
    pub form_type: String,
    pub deadline_date: NaiveDate,
    pub region_id: RegionId,
    pub division_id: Option<DivisionId>,
    pub district_id: Option<DistrictId>,
    pub is_active: bool,
    pub created_by: ActorId,
    pub created_at: Timestamp,
}

impl Deadline {
    pub fn scope(&self) -> GeoAssignment {
        GeoAssignment {
            region_id: Some(self.region_id),
            division_id: self.division_id,
            district_id: self.district_id,
            school_id: None,
        }
    }

    /// Whether this deadline applies to a submission at `location`. The
    /// location must carry its full ancestry.
    pub fn applies_to(&self, location: &ResourceLocation) -> bool {
        location.region_id == Some(self.region_id)
            && self.division_id.map_or(true, |d| location.division_id == Some(d))
            && self.district_id.map_or(true, |d| location.district_id == Some(d))
    }
}

/// In-memory deadline table. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct DeadlineRegistry {
    deadlines: Arc<RwLock<BTreeMap<Uuid, Deadline>>>,
}

impl DeadlineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, deadline: Deadline) -> Deadline {
        self.deadlines.write().insert(deadline.id, deadline.clone());
        deadline
    }

    pub fn get(&self, id: Uuid) -> Option<Deadline> {
        self.deadlines.read().get(&id).cloned()
    }

    /// Every deadline, ordered by date then id.
    pub fn list(&self) -> Vec<Deadline> {
        let mut all: Vec<_> = self.deadlines.read().values().cloned().collect();
        all.sort_by(|a, b| a.deadline_date.cmp(&b.deadline_date).then(a.id.cmp(&b.id)));
        all
    }

    /// Active deadlines for one form type that apply at `location`.
    pub fn active_for(&self, form_type: &str, location: &ResourceLocation) -> Vec<Deadline> {
        self.list()
            .into_iter()
            .filter(|d| d.is_active && d.form_type == form_type && d.applies_to(location))
            .collect()
    }

    /// Mark a deadline inactive.
    ///
    /// # Errors
    ///
    /// [`EngineError::RecordNotFound`] for an unknown id.
    pub fn deactivate(&self, id: Uuid) -> Result<Deadline, EngineError> {
        let mut deadlines = self.deadlines.write();
        let deadline = deadlines.get_mut(&id).ok_or_else(|| EngineError::RecordNotFound {
            kind: "deadline",
            id: id.to_string(),
        })?;
        deadline.is_active = false;
        Ok(deadline.clone())
    }
}
