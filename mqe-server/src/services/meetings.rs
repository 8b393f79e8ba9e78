//! Users and meeting lifecycle entry points

use mqe_common::events::{MeetingChange, MeetingEvent};
use mqe_common::{time, Phase};
use tracing::{debug, info};
use uuid::Uuid;

use super::{MeetingEngine, SessionContext};
use crate::db;
use crate::error::{ProtocolError, ProtocolResult, ValidationError};
use crate::models::{Meeting, MeetingDetail, NewMeeting, User};

impl MeetingEngine {
    /// Register a user (identity bootstrap; no session required)
    pub async fn create_user(&self, username: &str) -> ProtocolResult<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ValidationError::MissingField("username").into());
        }

        let mut tx = self.db.begin().await?;
        if let Some(existing) = db::users::find_by_username(&mut tx, username).await? {
            debug!(user_id = %existing.id, "Username already registered");
            return Err(ProtocolError::Conflict(format!(
                "username '{}' is already taken",
                username
            )));
        }

        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            created_at: time::now(),
        };
        db::users::insert_user(&mut tx, &user).await?;
        tx.commit().await?;

        info!(user_id = %user.id, username = %user.username, "User created");
        Ok(user)
    }

    pub async fn list_users(&self) -> ProtocolResult<Vec<User>> {
        let mut conn = self.db.acquire().await?;
        Ok(db::users::list_users(&mut conn).await?)
    }

    /// Create a meeting in its initial phase
    ///
    /// The caller becomes the creator and the first roster entry; invited
    /// participants follow in the given order with duplicates dropped.
    pub async fn create_meeting(
        &self,
        ctx: &SessionContext,
        request: NewMeeting,
    ) -> ProtocolResult<MeetingDetail> {
        let title = request.title.trim();
        if title.is_empty() {
            return Err(ValidationError::MissingField("title").into());
        }
        let question = request.question.trim();
        if question.is_empty() {
            return Err(ValidationError::MissingField("question").into());
        }

        let mut participant_ids = vec![ctx.user_id];
        for id in request.participant_ids {
            if !participant_ids.contains(&id) {
                participant_ids.push(id);
            }
        }

        let mut tx = self.db.begin().await?;
        for id in &participant_ids {
            if db::users::find_user(&mut tx, *id).await?.is_none() {
                return Err(ProtocolError::NotFound(format!("user {}", id)));
            }
        }

        let now = time::now();
        let meeting = Meeting {
            id: Uuid::new_v4(),
            title: title.to_string(),
            question: question.to_string(),
            creator_id: ctx.user_id,
            participant_ids: participant_ids.clone(),
            current_phase: Phase::initial(),
            created_at: now,
            updated_at: now,
            finished_at: None,
        };
        db::meetings::insert_meeting(&mut tx, &meeting).await?;
        for id in &participant_ids {
            db::participants::add_participant(&mut tx, meeting.id, *id, &now).await?;
        }
        let participants = db::participants::roster(&mut tx, meeting.id, meeting.creator_id).await?;
        tx.commit().await?;

        info!(
            meeting_id = %meeting.id,
            creator_id = %meeting.creator_id,
            participants = participants.len(),
            "Meeting created"
        );
        self.event_bus.emit_lossy(MeetingEvent::MeetingUpdated {
            meeting_id: meeting.id,
            change: MeetingChange::Created {
                creator_id: meeting.creator_id,
            },
            timestamp: now,
        });

        Ok(MeetingDetail {
            meeting,
            participants,
        })
    }

    pub async fn get_meeting(
        &self,
        ctx: &SessionContext,
        meeting_id: Uuid,
    ) -> ProtocolResult<MeetingDetail> {
        let mut conn = self.db.acquire().await?;
        let meeting = Self::load_for_participant(&mut conn, ctx, meeting_id).await?;
        let participants = db::participants::roster(&mut conn, meeting.id, meeting.creator_id).await?;
        Ok(MeetingDetail {
            meeting,
            participants,
        })
    }

    /// Meetings the caller participates in, newest first
    pub async fn list_meetings(&self, ctx: &SessionContext) -> ProtocolResult<Vec<Meeting>> {
        let mut conn = self.db.acquire().await?;
        Ok(db::meetings::list_for_user(&mut conn, ctx.user_id).await?)
    }
}
