//! Data models for mqe-server
//!
//! - Meetings, participants and phase history
//! - Phase submission payloads
//! - Tasks derived from task planning
//! - Aggregated views (voting info, analytics, reports)

pub mod meeting;
pub mod report;
pub mod submission;
pub mod task;
pub mod user;

pub use meeting::{Meeting, MeetingDetail, NewMeeting, PhaseTransition};
pub use report::{
    FinishedMeetingReport, ParticipantStats, PhaseSubmissionGroup, ScoreSummary,
    TaskEvaluationStats, VotingInfo,
};
pub use submission::{
    ContributionEntry, EmotionalEntry, PhasePayload, StoredSubmission, SubmissionReceipt,
    TaskEvaluationEntry, TaskPlan, UnderstandingContribution,
};
pub use task::{Task, TaskUpdate};
pub use user::{NewUser, User};
