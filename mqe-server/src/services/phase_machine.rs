//! Phase state machine and task approval
//!
//! The authoritative phase only moves forward, one step at a time, and only
//! on the creator's request.

use chrono::{DateTime, Utc};
use mqe_common::events::{MeetingChange, MeetingEvent};
use mqe_common::{time, Phase};
use sqlx::SqliteConnection;
use tracing::{debug, info};
use uuid::Uuid;

use super::{MeetingEngine, SessionContext};
use crate::db;
use crate::error::{ProtocolError, ProtocolResult};
use crate::models::{Meeting, PhaseTransition, Task, TaskUpdate};
use crate::validation;

/// Decide what a request to move from `current` to `target` does
///
/// `Ok(None)` means the meeting already is in `target`; `Ok(Some(next))` is a
/// single forward step. Backward moves and skips are rejected.
pub fn plan_transition(current: Phase, target: Phase) -> ProtocolResult<Option<Phase>> {
    if target == current {
        return Ok(None);
    }
    if current.is_terminal() {
        return Err(ProtocolError::AlreadyFinished);
    }
    match current.next() {
        Some(next) if next == target => Ok(Some(next)),
        _ => Err(ProtocolError::InvalidTransition {
            from: current,
            to: target,
        }),
    }
}

impl MeetingEngine {
    /// Move the meeting to its next phase (creator only)
    pub async fn advance_phase(&self, ctx: &SessionContext, meeting_id: Uuid) -> ProtocolResult<Phase> {
        let _guard = self.locks.lock(meeting_id).await;
        let mut tx = self.db.begin().await?;

        let meeting = Self::load_meeting(&mut tx, meeting_id).await?;
        if !meeting.is_creator(ctx.user_id) {
            return Err(ProtocolError::NotCreator);
        }
        let next = meeting
            .current_phase
            .next()
            .ok_or(ProtocolError::AlreadyFinished)?;

        let transition = Self::apply_transition(&mut tx, &meeting, next, ctx.user_id, time::now()).await?;
        tx.commit().await?;

        self.announce_transition(&transition);
        Ok(next)
    }

    /// Creator-driven direct targeting of a phase
    ///
    /// Re-targeting the current phase is a no-op; targeting the next phase is
    /// the same as `advance_phase`.
    pub async fn change_meeting_phase(
        &self,
        ctx: &SessionContext,
        meeting_id: Uuid,
        target: Phase,
    ) -> ProtocolResult<Phase> {
        let _guard = self.locks.lock(meeting_id).await;
        let mut tx = self.db.begin().await?;

        let meeting = Self::load_meeting(&mut tx, meeting_id).await?;
        if !meeting.is_creator(ctx.user_id) {
            return Err(ProtocolError::NotCreator);
        }

        let Some(next) = plan_transition(meeting.current_phase, target)? else {
            debug!(meeting_id = %meeting_id, phase = %target, "Meeting already in requested phase");
            return Ok(meeting.current_phase);
        };

        let transition = Self::apply_transition(&mut tx, &meeting, next, ctx.user_id, time::now()).await?;
        tx.commit().await?;

        self.announce_transition(&transition);
        Ok(next)
    }

    async fn apply_transition(
        conn: &mut SqliteConnection,
        meeting: &Meeting,
        to_phase: Phase,
        actor_id: Uuid,
        at: DateTime<Utc>,
    ) -> ProtocolResult<PhaseTransition> {
        let transition = PhaseTransition {
            meeting_id: meeting.id,
            from_phase: meeting.current_phase,
            to_phase,
            actor_id,
            transitioned_at: at,
        };
        db::meetings::update_phase(conn, meeting.id, to_phase, &at).await?;
        db::transitions::record_transition(conn, &transition).await?;
        Ok(transition)
    }

    fn announce_transition(&self, transition: &PhaseTransition) {
        info!(
            meeting_id = %transition.meeting_id,
            from = %transition.from_phase,
            to = %transition.to_phase,
            actor = %transition.actor_id,
            "Meeting phase advanced"
        );
        self.event_bus.emit_lossy(MeetingEvent::PhaseChanged {
            meeting_id: transition.meeting_id,
            old_phase: transition.from_phase,
            new_phase: transition.to_phase,
            changed_by: transition.actor_id,
            timestamp: transition.transitioned_at,
        });
    }

    /// Phase history of a meeting, oldest first
    pub async fn phase_history(
        &self,
        ctx: &SessionContext,
        meeting_id: Uuid,
    ) -> ProtocolResult<Vec<PhaseTransition>> {
        let mut conn = self.db.acquire().await?;
        Self::load_for_participant(&mut conn, ctx, meeting_id).await?;
        Ok(db::transitions::list_transitions(&mut conn, meeting_id).await?)
    }

    /// Toggle a task's approval flag (creator of the task's meeting only)
    pub async fn approve_task(&self, ctx: &SessionContext, task_id: Uuid) -> ProtocolResult<Task> {
        let meeting_id = {
            let mut conn = self.db.acquire().await?;
            Self::find_task(&mut conn, task_id).await?.meeting_id
        };

        let _guard = self.locks.lock(meeting_id).await;
        let mut tx = self.db.begin().await?;

        let task = Self::find_task(&mut tx, task_id).await?;
        let meeting = Self::load_meeting(&mut tx, task.meeting_id).await?;
        if !meeting.is_creator(ctx.user_id) {
            return Err(ProtocolError::NotCreator);
        }

        let now = time::now();
        let approved = !task.approved;
        db::tasks::set_approved(&mut tx, task_id, approved, &now).await?;
        db::meetings::touch(&mut tx, meeting_id, &now).await?;
        let task = Self::find_task(&mut tx, task_id).await?;
        tx.commit().await?;

        info!(task_id = %task_id, meeting_id = %meeting_id, approved, "Task approval changed");
        self.event_bus.emit_lossy(MeetingEvent::MeetingUpdated {
            meeting_id,
            change: MeetingChange::TaskApprovalChanged { task_id, approved },
            timestamp: now,
        });

        Ok(task)
    }

    /// Tasks the caller may evaluate in this meeting
    pub async fn evaluable_tasks(&self, ctx: &SessionContext, meeting_id: Uuid) -> ProtocolResult<Vec<Task>> {
        let mut conn = self.db.acquire().await?;
        let meeting = Self::load_for_participant(&mut conn, ctx, meeting_id).await?;
        let tasks = db::tasks::list_for_meeting(&mut conn, meeting_id).await?;
        Ok(tasks
            .into_iter()
            .filter(|task| task.is_evaluable_by(ctx.user_id, meeting.creator_id))
            .collect())
    }

    /// Author edit of description and/or deadline
    ///
    /// Allowed in any phase, including after the meeting has finished.
    pub async fn update_task(
        &self,
        ctx: &SessionContext,
        task_id: Uuid,
        update: TaskUpdate,
    ) -> ProtocolResult<Task> {
        let description = update.description.as_deref().map(str::trim);
        if let Some(description) = description {
            validation::validate_description(description)?;
        }
        if let Some(deadline) = update.deadline {
            validation::validate_deadline(deadline, time::today())?;
        }

        let mut tx = self.db.begin().await?;
        let task = Self::find_task(&mut tx, task_id).await?;
        if task.author_id != ctx.user_id {
            return Err(ProtocolError::NotTaskAuthor);
        }

        let now = time::now();
        db::tasks::update_fields(&mut tx, task_id, description, update.deadline, &now).await?;
        let task = Self::find_task(&mut tx, task_id).await?;
        tx.commit().await?;

        info!(task_id = %task_id, author_id = %ctx.user_id, "Task updated");
        self.event_bus.emit_lossy(MeetingEvent::MeetingUpdated {
            meeting_id: task.meeting_id,
            change: MeetingChange::TaskUpdated {
                task_id,
                author_id: task.author_id,
            },
            timestamp: now,
        });

        Ok(task)
    }

    /// The caller's tasks across all meetings
    pub async fn tasks_for_author(&self, ctx: &SessionContext) -> ProtocolResult<Vec<Task>> {
        let mut conn = self.db.acquire().await?;
        Ok(db::tasks::list_for_author(&mut conn, ctx.user_id).await?)
    }

    async fn find_task(conn: &mut SqliteConnection, task_id: Uuid) -> ProtocolResult<Task> {
        db::tasks::find_task(conn, task_id)
            .await?
            .ok_or_else(|| ProtocolError::NotFound(format!("task {}", task_id)))
    }
}
