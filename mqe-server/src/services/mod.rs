//! Meeting engine
//!
//! `MeetingEngine` is the command/query façade over the roster, submission
//! store, phase state machine and aggregation views. Every call receives an
//! explicit `SessionContext`; there is no ambient "current user" state.
//!
//! Mutations follow one pattern: take the meeting lock, open a transaction,
//! read the meeting, check authorization and phase, write, commit, then emit
//! the push event. A failing call never leaves a partial write behind.

mod aggregation;
mod locks;
mod meetings;
mod phase_machine;
mod roster;
mod submissions;

pub use aggregation::{participant_stats, summarize, task_evaluation_stats};
pub use locks::MeetingLocks;
pub use phase_machine::plan_transition;

use mqe_common::events::EventBus;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::error::{ProtocolError, ProtocolResult};
use crate::models::Meeting;

/// Authenticated identity of the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionContext {
    pub user_id: Uuid,
}

impl SessionContext {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

#[derive(Clone)]
pub struct MeetingEngine {
    db: SqlitePool,
    event_bus: EventBus,
    locks: MeetingLocks,
}

impl MeetingEngine {
    pub fn new(db: SqlitePool, event_bus: EventBus) -> Self {
        Self {
            db,
            event_bus,
            locks: MeetingLocks::new(),
        }
    }

    pub fn db(&self) -> &SqlitePool {
        &self.db
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    async fn load_meeting(conn: &mut SqliteConnection, meeting_id: Uuid) -> ProtocolResult<Meeting> {
        crate::db::meetings::load_meeting(conn, meeting_id)
            .await?
            .ok_or_else(|| ProtocolError::NotFound(format!("meeting {}", meeting_id)))
    }

    /// Load a meeting the caller participates in
    async fn load_for_participant(
        conn: &mut SqliteConnection,
        ctx: &SessionContext,
        meeting_id: Uuid,
    ) -> ProtocolResult<Meeting> {
        let meeting = Self::load_meeting(conn, meeting_id).await?;
        if !meeting.is_participant(ctx.user_id) {
            return Err(ProtocolError::NotAParticipant);
        }
        Ok(meeting)
    }
}
