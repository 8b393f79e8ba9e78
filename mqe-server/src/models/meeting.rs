//! Meeting aggregate
//!
//! The meeting row owns the authoritative phase; the participant list is kept
//! in roster order with the creator first.

use chrono::{DateTime, Utc};
use mqe_common::events::ParticipantInfo;
use mqe_common::Phase;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    pub id: Uuid,
    pub title: String,
    pub question: String,
    pub creator_id: Uuid,
    /// Roster order (creator at position 0)
    pub participant_ids: Vec<Uuid>,
    pub current_phase: Phase,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set when the meeting enters the terminal phase
    pub finished_at: Option<DateTime<Utc>>,
}

impl Meeting {
    pub fn is_creator(&self, user_id: Uuid) -> bool {
        self.creator_id == user_id
    }

    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.participant_ids.contains(&user_id)
    }

    pub fn is_finished(&self) -> bool {
        self.current_phase.is_terminal()
    }

    /// Roster additions by ordinary participants close once the meeting
    /// leaves its first phase
    pub fn is_participant_locked(&self) -> bool {
        self.current_phase > Phase::initial()
    }
}

/// Meeting with its roster, as returned by `getMeeting`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingDetail {
    #[serde(flatten)]
    pub meeting: Meeting,
    pub participants: Vec<ParticipantInfo>,
}

/// Request body for meeting creation
#[derive(Debug, Clone, Deserialize)]
pub struct NewMeeting {
    pub title: String,
    pub question: String,
    /// Invited participants; the creator is added implicitly
    #[serde(default)]
    pub participant_ids: Vec<Uuid>,
}

/// One recorded step of the phase state machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub meeting_id: Uuid,
    pub from_phase: Phase,
    pub to_phase: Phase,
    pub actor_id: Uuid,
    pub transitioned_at: DateTime<Utc>,
}
