//! Read-only views produced by the aggregation engine

use chrono::{DateTime, Utc};
use mqe_common::Phase;
use serde::Serialize;
use uuid::Uuid;

use super::{MeetingDetail, PhaseTransition, StoredSubmission, Task};

/// Submission progress for the meeting's current phase
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VotingInfo {
    pub meeting_id: Uuid,
    pub phase: Phase,
    pub total_participants: usize,
    /// Roster order; empty once the meeting is finished
    pub submitted_participant_ids: Vec<Uuid>,
}

/// Descriptive statistics over a list of scores
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSummary {
    pub count: usize,
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
}

/// Per-task evaluation statistics
///
/// Statistic fields are `None` while a task has no evaluations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskEvaluationStats {
    pub task_id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub description: String,
    pub original_expected_contribution: f64,
    pub evaluation_count: usize,
    pub average: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub median: Option<f64>,
    /// average - original_expected_contribution
    pub evaluation_difference: Option<f64>,
}

/// Per-participant view across the meeting's phases
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticipantStats {
    pub user_id: Uuid,
    pub username: String,
    /// Emotional scale received from peers
    pub emotional_received: Option<ScoreSummary>,
    pub toxic_flags_received: usize,
    /// Contribution percentages attributed by peers
    pub contribution_received: Option<ScoreSummary>,
    pub understanding_score: Option<f64>,
    pub expected_contribution: Option<f64>,
    /// Attributed average minus expected contribution
    pub contribution_delta: Option<f64>,
}

/// All submissions of one phase, in roster order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseSubmissionGroup {
    pub phase: Phase,
    pub submissions: Vec<StoredSubmission>,
}

/// Full export of a finished meeting
#[derive(Debug, Clone, Serialize)]
pub struct FinishedMeetingReport {
    pub meeting: MeetingDetail,
    pub phases: Vec<PhaseSubmissionGroup>,
    pub tasks: Vec<Task>,
    pub phase_history: Vec<PhaseTransition>,
    pub task_analytics: Vec<TaskEvaluationStats>,
    pub participant_analytics: Vec<ParticipantStats>,
    pub generated_at: DateTime<Utc>,
}
