//! # Submission Review
//!
//! School form submissions and their review state. A submission moves
//! from `submitted` to either `approved` or `returned` exactly once; the
//! transition is checked under the store's write lock so two reviewers
//! cannot both act on the same submission.

use std::collections::BTreeMap;
use std::sync::Arc;

use geoscope_core::{ActorId, Timestamp, ValidationError};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::resource::ResourceLocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Submitted,
    Approved,
    Returned,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Returned => "returned",
        }
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub form_type: String,
    /// Submitting school with its full ancestry.
    #[serde(flatten)]
    pub location: ResourceLocation,
    pub status: SubmissionStatus,
    pub remarks: Option<String>,
    pub submitted_at: Timestamp,
    pub reviewed_by: Option<ActorId>,
    pub reviewed_at: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ReviewAction {
    Approve,
    Return { remarks: String },
}

impl ReviewAction {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Return { remarks } if remarks.trim().is_empty() => {
                Err(ValidationError::EmptyField("remarks"))
            }
            _ => Ok(()),
        }
    }

    /// Audit action tag.
    pub fn audit_action(&self) -> &'static str {
        match self {
            Self::Approve => "submission.approve",
            Self::Return { .. } => "submission.return",
        }
    }

    fn target_status(&self) -> SubmissionStatus {
        match self {
            Self::Approve => SubmissionStatus::Approved,
            Self::Return { .. } => SubmissionStatus::Returned,
        }
    }
}

/// One item a bulk review could not process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewFailure {
    pub submission_id: Uuid,
    pub reason: String,
}

/// Per-item result of a bulk review. Items are independent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkReviewOutcome {
    pub requested: usize,
    pub succeeded: Vec<Uuid>,
    pub failed: Vec<ReviewFailure>,
}

impl BulkReviewOutcome {
    pub fn success_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// In-memory submission table. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct SubmissionStore {
    submissions: Arc<RwLock<BTreeMap<Uuid, Submission>>>,
}

impl SubmissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// File a new submission from a school location.
    ///
    /// # Errors
    ///
    /// [`ValidationError::EmptyField`] for a blank form type or a location
    /// without a school.
    pub fn submit(
        &self,
        form_type: impl Into<String>,
        location: ResourceLocation,
    ) -> Result<Submission, ValidationError> {
        let form_type = form_type.into();
        if form_type.trim().is_empty() {
            return Err(ValidationError::EmptyField("form_type"));
        }
        if location.school_id.is_none() {
            return Err(ValidationError::EmptyField("school_id"));
        }
        let submission = Submission {
            id: Uuid::new_v4(),
            form_type,
            location,
            status: SubmissionStatus::Submitted,
            remarks: None,
            submitted_at: Timestamp::now(),
            reviewed_by: None,
            reviewed_at: None,
        };
        self.submissions
            .write()
            .insert(submission.id, submission.clone());
        Ok(submission)
    }

    pub fn get(&self, id: Uuid) -> Option<Submission> {
        self.submissions.read().get(&id).cloned()
    }

    pub fn list(&self) -> Vec<Submission> {
        self.submissions.read().values().cloned().collect()
    }

    /// Apply a review. The reason string is returned for a missing
    /// submission or one that is no longer pending.
    pub fn review(
        &self,
        id: Uuid,
        reviewer: ActorId,
        action: &ReviewAction,
    ) -> Result<Submission, String> {
        let mut submissions = self.submissions.write();
        let submission = submissions
            .get_mut(&id)
            .ok_or_else(|| "submission not found".to_string())?;
        if submission.status != SubmissionStatus::Submitted {
            return Err(format!("submission already {}", submission.status));
        }
        submission.status = action.target_status();
        submission.remarks = match action {
            ReviewAction::Approve => None,
            ReviewAction::Return { remarks } => Some(remarks.trim().to_string()),
        };
        submission.reviewed_by = Some(reviewer);
        submission.reviewed_at = Some(Timestamp::now());
        Ok(submission.clone())
    }
}
