//! Participant roster
//!
//! Presence data is informational only; protocol checks use roster
//! membership, never last-seen times.

use chrono::{DateTime, Utc};
use mqe_common::events::{MeetingEvent, ParticipantInfo};
use mqe_common::time;
use tracing::{debug, info};
use uuid::Uuid;

use super::{MeetingEngine, SessionContext};
use crate::db;
use crate::error::{ProtocolError, ProtocolResult};

impl MeetingEngine {
    /// Add `user_id` to the roster (idempotent)
    ///
    /// Any participant may invite while the meeting is in its first phase;
    /// afterwards only the creator may.
    pub async fn add_participant(
        &self,
        ctx: &SessionContext,
        meeting_id: Uuid,
        user_id: Uuid,
    ) -> ProtocolResult<Vec<ParticipantInfo>> {
        let _guard = self.locks.lock(meeting_id).await;
        let mut tx = self.db.begin().await?;

        let meeting = Self::load_meeting(&mut tx, meeting_id).await?;
        if meeting.is_finished() {
            return Err(ProtocolError::MeetingFinished);
        }
        if !meeting.is_creator(ctx.user_id) {
            if !meeting.is_participant(ctx.user_id) {
                return Err(ProtocolError::NotAParticipant);
            }
            if meeting.is_participant_locked() {
                return Err(ProtocolError::NotCreator);
            }
        }
        if db::users::find_user(&mut tx, user_id).await?.is_none() {
            return Err(ProtocolError::NotFound(format!("user {}", user_id)));
        }

        let now = time::now();
        let added = db::participants::add_participant(&mut tx, meeting_id, user_id, &now).await?;
        if added {
            db::meetings::touch(&mut tx, meeting_id, &now).await?;
        }
        let participants = db::participants::roster(&mut tx, meeting_id, meeting.creator_id).await?;
        tx.commit().await?;

        if added {
            info!(meeting_id = %meeting_id, user_id = %user_id, added_by = %ctx.user_id, "Participant added");
            self.event_bus.emit_lossy(MeetingEvent::ParticipantsUpdated {
                meeting_id,
                participants: participants.clone(),
                timestamp: now,
            });
        } else {
            debug!(meeting_id = %meeting_id, user_id = %user_id, "Participant already on roster");
        }

        Ok(participants)
    }

    /// Record that the caller is looking at the meeting
    pub async fn record_presence(
        &self,
        ctx: &SessionContext,
        meeting_id: Uuid,
        at: DateTime<Utc>,
    ) -> ProtocolResult<Vec<ParticipantInfo>> {
        let mut conn = self.db.acquire().await?;
        let meeting = Self::load_meeting(&mut conn, meeting_id).await?;
        if !db::participants::touch_presence(&mut conn, meeting_id, ctx.user_id, &at).await? {
            return Err(ProtocolError::NotAParticipant);
        }
        let participants = db::participants::roster(&mut conn, meeting_id, meeting.creator_id).await?;

        debug!(meeting_id = %meeting_id, user_id = %ctx.user_id, "Presence recorded");
        self.event_bus.emit_lossy(MeetingEvent::ParticipantsUpdated {
            meeting_id,
            participants: participants.clone(),
            timestamp: at,
        });

        Ok(participants)
    }

    /// Roster in roster order
    pub async fn roster(
        &self,
        ctx: &SessionContext,
        meeting_id: Uuid,
    ) -> ProtocolResult<Vec<ParticipantInfo>> {
        let mut conn = self.db.acquire().await?;
        let meeting = Self::load_for_participant(&mut conn, ctx, meeting_id).await?;
        Ok(db::participants::roster(&mut conn, meeting_id, meeting.creator_id).await?)
    }
}
