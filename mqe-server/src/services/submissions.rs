//! Submission store commands and queries

use std::collections::BTreeMap;

use mqe_common::events::{MeetingChange, MeetingEvent};
use mqe_common::{time, Phase};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{MeetingEngine, SessionContext};
use crate::db;
use crate::error::{ProtocolError, ProtocolResult};
use crate::models::{PhasePayload, PhaseSubmissionGroup, StoredSubmission, SubmissionReceipt};
use crate::validation::{self, RosterSnapshot};

impl MeetingEngine {
    /// Validate and store the caller's payload for the phase it names
    ///
    /// The target phase must already have been reached; earlier phases accept
    /// amendments. A task planning submission also upserts the caller's task
    /// in the same transaction.
    pub async fn submit_phase_data(
        &self,
        ctx: &SessionContext,
        meeting_id: Uuid,
        payload: PhasePayload,
    ) -> ProtocolResult<SubmissionReceipt> {
        let phase = payload.phase();
        let _guard = self.locks.lock(meeting_id).await;
        let mut tx = self.db.begin().await?;

        let meeting = Self::load_for_participant(&mut tx, ctx, meeting_id).await?;
        if meeting.is_finished() {
            return Err(ProtocolError::MeetingFinished);
        }
        if phase > meeting.current_phase {
            return Err(ProtocolError::PhaseNotReached {
                requested: phase,
                current: meeting.current_phase,
            });
        }

        let tasks = if phase == Phase::TaskEvaluation {
            db::tasks::list_for_meeting(&mut tx, meeting_id).await?
        } else {
            Vec::new()
        };
        let snapshot = RosterSnapshot::new(
            meeting.participant_ids.clone(),
            meeting.creator_id,
            ctx.user_id,
            &tasks,
        );
        if let Err(e) = validation::validate(&payload, ctx.user_id, &snapshot, time::today()) {
            warn!(
                meeting_id = %meeting_id,
                participant_id = %ctx.user_id,
                phase = %phase,
                code = e.code(),
                "Submission rejected: {}", e
            );
            return Err(e.into());
        }

        let now = time::now();
        let previous = db::submissions::get(&mut tx, meeting_id, phase, ctx.user_id).await?;
        let submission = db::submissions::upsert(&mut tx, meeting_id, ctx.user_id, &payload, &now).await?;

        // Identical resubmission: nothing downstream may move, including the
        // task projection an author may have edited since.
        if previous.as_ref() == Some(&submission) {
            let task = match &payload {
                PhasePayload::TaskPlanning(_) => {
                    db::tasks::find_for_author(&mut tx, meeting_id, ctx.user_id).await?
                }
                _ => None,
            };
            tx.commit().await?;
            debug!(
                meeting_id = %meeting_id,
                participant_id = %ctx.user_id,
                phase = %phase,
                "Identical resubmission ignored"
            );
            return Ok(SubmissionReceipt { submission, task });
        }

        let task = match &payload {
            PhasePayload::TaskPlanning(plan) => {
                Some(db::tasks::upsert_from_plan(&mut tx, meeting_id, ctx.user_id, plan, &now).await?)
            }
            _ => None,
        };
        db::meetings::touch(&mut tx, meeting_id, &now).await?;
        tx.commit().await?;

        info!(
            meeting_id = %meeting_id,
            participant_id = %ctx.user_id,
            phase = %phase,
            revision = submission.revision,
            amendment = phase < meeting.current_phase,
            "Submission recorded"
        );
        self.event_bus.emit_lossy(MeetingEvent::MeetingUpdated {
            meeting_id,
            change: MeetingChange::SubmissionRecorded {
                phase,
                participant_id: ctx.user_id,
                revision: submission.revision,
            },
            timestamp: now,
        });

        Ok(SubmissionReceipt { submission, task })
    }

    /// The caller's own stored submission for `phase`
    pub async fn get_own_submission(
        &self,
        ctx: &SessionContext,
        meeting_id: Uuid,
        phase: Phase,
    ) -> ProtocolResult<StoredSubmission> {
        let mut conn = self.db.acquire().await?;
        Self::load_for_participant(&mut conn, ctx, meeting_id).await?;
        db::submissions::get(&mut conn, meeting_id, phase, ctx.user_id)
            .await?
            .ok_or_else(|| ProtocolError::NotFound(format!("{} submission", phase)))
    }

    /// All submissions for one phase keyed by participant
    pub async fn list_for_phase(
        &self,
        ctx: &SessionContext,
        meeting_id: Uuid,
        phase: Phase,
    ) -> ProtocolResult<BTreeMap<Uuid, StoredSubmission>> {
        let mut conn = self.db.acquire().await?;
        Self::load_for_participant(&mut conn, ctx, meeting_id).await?;
        let submissions = db::submissions::list_for_phase(&mut conn, meeting_id, phase).await?;
        Ok(submissions
            .into_iter()
            .map(|s| (s.participant_id, s))
            .collect())
    }

    /// Submissions grouped by phase
    ///
    /// The creator sees everyone's data; other participants only their own.
    pub async fn phase_submissions(
        &self,
        ctx: &SessionContext,
        meeting_id: Uuid,
    ) -> ProtocolResult<Vec<PhaseSubmissionGroup>> {
        let mut conn = self.db.acquire().await?;
        let meeting = Self::load_for_participant(&mut conn, ctx, meeting_id).await?;
        let sees_all = meeting.is_creator(ctx.user_id);

        let mut groups = Vec::with_capacity(Phase::SUBMITTABLE.len());
        for phase in Phase::SUBMITTABLE {
            let mut submissions = db::submissions::list_for_phase(&mut conn, meeting_id, phase).await?;
            if !sees_all {
                submissions.retain(|s| s.participant_id == ctx.user_id);
            }
            groups.push(PhaseSubmissionGroup { phase, submissions });
        }

        debug!(meeting_id = %meeting_id, viewer = %ctx.user_id, sees_all, "Phase submissions listed");
        Ok(groups)
    }
}
