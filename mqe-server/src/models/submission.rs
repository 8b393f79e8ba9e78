//! Phase submission payloads
//!
//! Each non-terminal phase has exactly one payload shape. On the wire a
//! payload is `{"phase": "<phase>", "data": {...}}`; in storage the `data`
//! part is kept as JSON text next to the phase column.

use chrono::{DateTime, NaiveDate, Utc};
use mqe_common::{Error, Phase, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Task;

/// Emotional perception of one peer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalEntry {
    pub target_participant_id: Uuid,
    /// -100 (very negative) ..= 100 (very positive)
    pub emotional_scale: f64,
    #[serde(default)]
    pub is_toxic: bool,
}

/// Share of the meeting's outcome attributed to one peer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionEntry {
    pub participant_id: Uuid,
    pub contribution_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnderstandingContribution {
    pub understanding_score: f64,
    #[serde(default)]
    pub contributions: Vec<ContributionEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPlan {
    pub task_description: String,
    #[serde(default)]
    pub common_question: String,
    pub deadline: NaiveDate,
    pub expected_contribution_percentage: f64,
    pub emotional_scale: f64,
}

/// Importance rating of one peer's task (tasks are keyed by author)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEvaluationEntry {
    pub task_author_id: Uuid,
    pub importance_score: f64,
}

/// Submission payload, tagged with the phase it belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "data", rename_all = "snake_case")]
pub enum PhasePayload {
    EmotionalEvaluation(Vec<EmotionalEntry>),
    UnderstandingContribution(UnderstandingContribution),
    TaskPlanning(TaskPlan),
    TaskEvaluation(Vec<TaskEvaluationEntry>),
}

impl PhasePayload {
    pub fn phase(&self) -> Phase {
        match self {
            PhasePayload::EmotionalEvaluation(_) => Phase::EmotionalEvaluation,
            PhasePayload::UnderstandingContribution(_) => Phase::UnderstandingContribution,
            PhasePayload::TaskPlanning(_) => Phase::TaskPlanning,
            PhasePayload::TaskEvaluation(_) => Phase::TaskEvaluation,
        }
    }

    /// Serialize the `data` part for storage
    pub fn to_data_json(&self) -> Result<String> {
        let encoded = match self {
            PhasePayload::EmotionalEvaluation(entries) => serde_json::to_string(entries),
            PhasePayload::UnderstandingContribution(data) => serde_json::to_string(data),
            PhasePayload::TaskPlanning(plan) => serde_json::to_string(plan),
            PhasePayload::TaskEvaluation(entries) => serde_json::to_string(entries),
        };
        encoded.map_err(|e| Error::Internal(format!("Failed to serialize payload: {}", e)))
    }

    /// Rebuild a payload from its stored phase and `data` JSON
    pub fn from_data_json(phase: Phase, data: &str) -> Result<Self> {
        let decoded = match phase {
            Phase::EmotionalEvaluation => {
                serde_json::from_str(data).map(PhasePayload::EmotionalEvaluation)
            }
            Phase::UnderstandingContribution => {
                serde_json::from_str(data).map(PhasePayload::UnderstandingContribution)
            }
            Phase::TaskPlanning => serde_json::from_str(data).map(PhasePayload::TaskPlanning),
            Phase::TaskEvaluation => serde_json::from_str(data).map(PhasePayload::TaskEvaluation),
            Phase::Finished => {
                return Err(Error::Internal(
                    "Stored submission refers to the finished phase".to_string(),
                ))
            }
        };
        decoded.map_err(|e| Error::Internal(format!("Failed to deserialize {} payload: {}", phase, e)))
    }
}

/// Authoritative submission for one (meeting, phase, participant) key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredSubmission {
    pub meeting_id: Uuid,
    pub participant_id: Uuid,
    #[serde(flatten)]
    pub payload: PhasePayload,
    /// 1 on first write, bumped only when an amendment changes the payload
    pub revision: i64,
    pub submitted_at: DateTime<Utc>,
}

impl StoredSubmission {
    pub fn phase(&self) -> Phase {
        self.payload.phase()
    }
}

/// Result of an accepted `submitPhaseData`
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReceipt {
    pub submission: StoredSubmission,
    /// Task projection written alongside a task planning submission
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<Task>,
}
