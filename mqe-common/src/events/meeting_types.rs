//! Meeting event payload types
//!
//! Supporting types carried inside `MeetingEvent` variants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Phase;

/// Roster entry as broadcast to meeting viewers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub user_id: Uuid,
    pub username: String,
    pub is_creator: bool,
    pub joined_at: DateTime<Utc>,
    /// Last presence ping (None until the participant first reports presence)
    pub last_seen_at: Option<DateTime<Utc>>,
}

/// Summary of what changed in a `MeetingUpdated` event
///
/// Viewers treat this as an invalidation hint and re-query authoritative state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MeetingChange {
    /// Meeting was created
    Created { creator_id: Uuid },
    /// A submission was stored (first write or amendment)
    SubmissionRecorded {
        phase: Phase,
        participant_id: Uuid,
        revision: i64,
    },
    /// Creator toggled a task's approval flag
    TaskApprovalChanged { task_id: Uuid, approved: bool },
    /// Author edited a task
    TaskUpdated { task_id: Uuid, author_id: Uuid },
}

impl std::fmt::Display for MeetingChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeetingChange::Created { .. } => write!(f, "Created"),
            MeetingChange::SubmissionRecorded { .. } => write!(f, "SubmissionRecorded"),
            MeetingChange::TaskApprovalChanged { .. } => write!(f, "TaskApprovalChanged"),
            MeetingChange::TaskUpdated { .. } => write!(f, "TaskUpdated"),
        }
    }
}
