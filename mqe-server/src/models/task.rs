//! Tasks derived from task planning submissions
//!
//! A task outlives the meeting's phase lifecycle: its author may keep editing
//! description and deadline after the meeting is finished.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub meeting_id: Uuid,
    pub author_id: Uuid,
    pub description: String,
    pub common_question: String,
    pub deadline: NaiveDate,
    /// Expected contribution percentage from the plan
    pub expected_contribution: f64,
    /// Set only by the meeting creator
    pub approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Visibility rule for task evaluation
    ///
    /// Nobody evaluates their own task; the creator sees every other task,
    /// everyone else only approved ones.
    pub fn is_evaluable_by(&self, viewer_id: Uuid, creator_id: Uuid) -> bool {
        self.author_id != viewer_id && (viewer_id == creator_id || self.approved)
    }
}

/// Author-editable task fields (request body for `PATCH /api/tasks/:id`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskUpdate {
    pub description: Option<String>,
    pub deadline: Option<NaiveDate>,
}
