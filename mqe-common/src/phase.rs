//! Meeting phase ordering
//!
//! A meeting moves through a fixed, totally ordered sequence:
//! EMOTIONAL_EVALUATION → UNDERSTANDING_CONTRIBUTION → TASK_PLANNING → TASK_EVALUATION → FINISHED
//!
//! The derived `Ord` follows declaration order, so `a < b` means "a comes before b".

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Meeting phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Participants rate their emotional perception of each peer
    EmotionalEvaluation,
    /// Participants score their understanding and split contribution percentages
    UnderstandingContribution,
    /// Each participant plans one task
    TaskPlanning,
    /// Participants rate the importance of each other's tasks
    TaskEvaluation,
    /// Terminal: the meeting is archived
    Finished,
}

impl Phase {
    /// All phases in lifecycle order
    pub const ALL: [Phase; 5] = [
        Phase::EmotionalEvaluation,
        Phase::UnderstandingContribution,
        Phase::TaskPlanning,
        Phase::TaskEvaluation,
        Phase::Finished,
    ];

    /// Phases that accept submissions
    pub const SUBMITTABLE: [Phase; 4] = [
        Phase::EmotionalEvaluation,
        Phase::UnderstandingContribution,
        Phase::TaskPlanning,
        Phase::TaskEvaluation,
    ];

    /// The phase every new meeting starts in
    pub fn initial() -> Self {
        Phase::EmotionalEvaluation
    }

    /// Position in the lifecycle (0-based)
    pub fn index(self) -> usize {
        match self {
            Phase::EmotionalEvaluation => 0,
            Phase::UnderstandingContribution => 1,
            Phase::TaskPlanning => 2,
            Phase::TaskEvaluation => 3,
            Phase::Finished => 4,
        }
    }

    /// The following phase, or `None` when terminal
    pub fn next(self) -> Option<Phase> {
        Phase::ALL.get(self.index() + 1).copied()
    }

    /// Whether this is the terminal phase
    pub fn is_terminal(self) -> bool {
        self == Phase::Finished
    }

    /// Whether the phase has a submission schema
    pub fn accepts_submissions(self) -> bool {
        !self.is_terminal()
    }

    /// Stable identifier used in storage and on the wire
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::EmotionalEvaluation => "emotional_evaluation",
            Phase::UnderstandingContribution => "understanding_contribution",
            Phase::TaskPlanning => "task_planning",
            Phase::TaskEvaluation => "task_evaluation",
            Phase::Finished => "finished",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Phase::ALL
            .iter()
            .copied()
            .find(|phase| phase.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown phase: {}", s)))
    }
}
