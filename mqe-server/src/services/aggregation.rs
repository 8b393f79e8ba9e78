//! Aggregation and reporting views
//!
//! Read-only: nothing here takes a meeting lock or writes. Statistics are
//! computed from the stored submissions at query time.

use std::collections::HashMap;

use mqe_common::{time, Phase};
use tracing::debug;
use uuid::Uuid;

use super::{MeetingEngine, SessionContext};
use crate::db;
use crate::error::{ProtocolError, ProtocolResult};
use crate::models::{
    FinishedMeetingReport, MeetingDetail, ParticipantStats, PhasePayload, PhaseSubmissionGroup,
    ScoreSummary, StoredSubmission, Task, TaskEvaluationStats, VotingInfo,
};
use mqe_common::events::ParticipantInfo;

/// Median of an ascending-sorted, non-empty slice
///
/// Even length averages the two middle values. Only reached through
/// `summarize`, which rejects empty input.
fn median(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Count, average, min, max and median; `None` for an empty list
pub fn summarize(scores: &[f64]) -> Option<ScoreSummary> {
    if scores.is_empty() {
        return None;
    }
    let mut sorted = scores.to_vec();
    sorted.sort_by(f64::total_cmp);

    Some(ScoreSummary {
        count: sorted.len(),
        average: sorted.iter().sum::<f64>() / sorted.len() as f64,
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        median: median(&sorted),
    })
}

/// Per-task statistics over task evaluation submissions
///
/// An evaluation only counts while the task is evaluable by its submitter, so
/// withdrawing approval also withdraws the non-creator scores.
pub fn task_evaluation_stats(
    tasks: &[Task],
    evaluations: &[StoredSubmission],
    creator_id: Uuid,
    names: &HashMap<Uuid, String>,
) -> Vec<TaskEvaluationStats> {
    tasks
        .iter()
        .map(|task| {
            let scores: Vec<f64> = evaluations
                .iter()
                .filter(|submission| task.is_evaluable_by(submission.participant_id, creator_id))
                .filter_map(|submission| match &submission.payload {
                    PhasePayload::TaskEvaluation(entries) => Some(entries),
                    _ => None,
                })
                .flatten()
                .filter(|entry| entry.task_author_id == task.author_id)
                .map(|entry| entry.importance_score)
                .collect();
            let summary = summarize(&scores);

            TaskEvaluationStats {
                task_id: task.id,
                author_id: task.author_id,
                author_name: names.get(&task.author_id).cloned().unwrap_or_default(),
                description: task.description.clone(),
                original_expected_contribution: task.expected_contribution,
                evaluation_count: scores.len(),
                average: summary.as_ref().map(|s| s.average),
                min: summary.as_ref().map(|s| s.min),
                max: summary.as_ref().map(|s| s.max),
                median: summary.as_ref().map(|s| s.median),
                evaluation_difference: summary
                    .as_ref()
                    .map(|s| s.average - task.expected_contribution),
            }
        })
        .collect()
}

/// Per-participant statistics across all phases
pub fn participant_stats(
    roster: &[ParticipantInfo],
    submissions: &[StoredSubmission],
    tasks: &[Task],
) -> Vec<ParticipantStats> {
    roster
        .iter()
        .map(|participant| {
            let id = participant.user_id;
            let mut emotional = Vec::new();
            let mut toxic_flags = 0;
            let mut contributions = Vec::new();
            let mut understanding_score = None;

            for submission in submissions {
                match &submission.payload {
                    PhasePayload::EmotionalEvaluation(entries) => {
                        for entry in entries.iter().filter(|e| e.target_participant_id == id) {
                            emotional.push(entry.emotional_scale);
                            if entry.is_toxic {
                                toxic_flags += 1;
                            }
                        }
                    }
                    PhasePayload::UnderstandingContribution(data) => {
                        if submission.participant_id == id {
                            understanding_score = Some(data.understanding_score);
                        }
                        contributions.extend(
                            data.contributions
                                .iter()
                                .filter(|c| c.participant_id == id)
                                .map(|c| c.contribution_percentage),
                        );
                    }
                    _ => {}
                }
            }

            let contribution_received = summarize(&contributions);
            let expected_contribution = tasks
                .iter()
                .find(|task| task.author_id == id)
                .map(|task| task.expected_contribution);
            let contribution_delta = match (&contribution_received, expected_contribution) {
                (Some(received), Some(expected)) => Some(received.average - expected),
                _ => None,
            };

            ParticipantStats {
                user_id: id,
                username: participant.username.clone(),
                emotional_received: summarize(&emotional),
                toxic_flags_received: toxic_flags,
                contribution_received,
                understanding_score,
                expected_contribution,
                contribution_delta,
            }
        })
        .collect()
}

impl MeetingEngine {
    /// Submission progress for the current phase
    pub async fn voting_info(&self, ctx: &SessionContext, meeting_id: Uuid) -> ProtocolResult<VotingInfo> {
        let mut conn = self.db.acquire().await?;
        let meeting = Self::load_for_participant(&mut conn, ctx, meeting_id).await?;

        let submitted_participant_ids = if meeting.is_finished() {
            Vec::new()
        } else {
            db::submissions::submitted_participant_ids(&mut conn, meeting_id, meeting.current_phase)
                .await?
        };

        Ok(VotingInfo {
            meeting_id,
            phase: meeting.current_phase,
            total_participants: meeting.participant_ids.len(),
            submitted_participant_ids,
        })
    }

    /// Participants without a submission for the current phase
    pub async fn pending_voters(
        &self,
        ctx: &SessionContext,
        meeting_id: Uuid,
    ) -> ProtocolResult<Vec<ParticipantInfo>> {
        let mut conn = self.db.acquire().await?;
        let meeting = Self::load_for_participant(&mut conn, ctx, meeting_id).await?;
        if meeting.is_finished() {
            return Ok(Vec::new());
        }

        let submitted =
            db::submissions::submitted_participant_ids(&mut conn, meeting_id, meeting.current_phase).await?;
        let roster = db::participants::roster(&mut conn, meeting_id, meeting.creator_id).await?;
        Ok(roster
            .into_iter()
            .filter(|p| !submitted.contains(&p.user_id))
            .collect())
    }

    pub async fn task_evaluation_analytics(
        &self,
        ctx: &SessionContext,
        meeting_id: Uuid,
    ) -> ProtocolResult<Vec<TaskEvaluationStats>> {
        let mut conn = self.db.acquire().await?;
        let meeting = Self::load_for_participant(&mut conn, ctx, meeting_id).await?;
        let roster = db::participants::roster(&mut conn, meeting_id, meeting.creator_id).await?;
        let tasks = db::tasks::list_for_meeting(&mut conn, meeting_id).await?;
        let evaluations =
            db::submissions::list_for_phase(&mut conn, meeting_id, Phase::TaskEvaluation).await?;

        debug!(meeting_id = %meeting_id, tasks = tasks.len(), evaluations = evaluations.len(), "Task analytics");
        Ok(task_evaluation_stats(
            &tasks,
            &evaluations,
            meeting.creator_id,
            &username_map(&roster),
        ))
    }

    pub async fn participant_analytics(
        &self,
        ctx: &SessionContext,
        meeting_id: Uuid,
    ) -> ProtocolResult<Vec<ParticipantStats>> {
        let mut conn = self.db.acquire().await?;
        let meeting = Self::load_for_participant(&mut conn, ctx, meeting_id).await?;
        let roster = db::participants::roster(&mut conn, meeting_id, meeting.creator_id).await?;
        let tasks = db::tasks::list_for_meeting(&mut conn, meeting_id).await?;

        let mut submissions = Vec::new();
        for phase in [Phase::EmotionalEvaluation, Phase::UnderstandingContribution] {
            submissions.extend(db::submissions::list_for_phase(&mut conn, meeting_id, phase).await?);
        }

        Ok(participant_stats(&roster, &submissions, &tasks))
    }

    /// Full export once the meeting is finished
    pub async fn finished_meeting_report(
        &self,
        ctx: &SessionContext,
        meeting_id: Uuid,
    ) -> ProtocolResult<FinishedMeetingReport> {
        let mut conn = self.db.acquire().await?;
        let meeting = Self::load_for_participant(&mut conn, ctx, meeting_id).await?;
        if !meeting.is_finished() {
            return Err(ProtocolError::MeetingNotFinished);
        }

        let roster = db::participants::roster(&mut conn, meeting_id, meeting.creator_id).await?;
        let tasks = db::tasks::list_for_meeting(&mut conn, meeting_id).await?;
        let phase_history = db::transitions::list_transitions(&mut conn, meeting_id).await?;

        let mut phases = Vec::with_capacity(Phase::SUBMITTABLE.len());
        for phase in Phase::SUBMITTABLE {
            let submissions = db::submissions::list_for_phase(&mut conn, meeting_id, phase).await?;
            phases.push(PhaseSubmissionGroup { phase, submissions });
        }

        let all_submissions: Vec<StoredSubmission> = phases
            .iter()
            .flat_map(|group| group.submissions.iter().cloned())
            .collect();
        let evaluations = phases
            .iter()
            .find(|group| group.phase == Phase::TaskEvaluation)
            .map(|group| group.submissions.as_slice())
            .unwrap_or_default();

        let names = username_map(&roster);
        let task_analytics = task_evaluation_stats(&tasks, evaluations, meeting.creator_id, &names);
        let participant_analytics = participant_stats(&roster, &all_submissions, &tasks);

        debug!(meeting_id = %meeting_id, "Finished meeting report generated");
        Ok(FinishedMeetingReport {
            meeting: MeetingDetail {
                meeting,
                participants: roster,
            },
            phases,
            tasks,
            phase_history,
            task_analytics,
            participant_analytics,
            generated_at: time::now(),
        })
    }
}

fn username_map(roster: &[ParticipantInfo]) -> HashMap<Uuid, String> {
    roster
        .iter()
        .map(|p| (p.user_id, p.username.clone()))
        .collect()
}
