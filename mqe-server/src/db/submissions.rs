//! Submission store database operations
//!
//! One row per (meeting, phase, participant). The `data` part of the payload is
//! stored as JSON text; replacing it with an identical payload leaves
//! `revision` and `submitted_at` untouched.

use chrono::{DateTime, Utc};
use mqe_common::{time, Phase, Result};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection};
use uuid::Uuid;

use super::{parse_phase, parse_uuid};
use crate::models::{PhasePayload, StoredSubmission};

fn submission_from_row(row: &SqliteRow) -> Result<StoredSubmission> {
    let meeting_id: String = row.get("meeting_id");
    let participant_id: String = row.get("participant_id");
    let phase: String = row.get("phase");
    let payload: String = row.get("payload");
    let submitted_at: String = row.get("submitted_at");

    Ok(StoredSubmission {
        meeting_id: parse_uuid(&meeting_id)?,
        participant_id: parse_uuid(&participant_id)?,
        payload: PhasePayload::from_data_json(parse_phase(&phase)?, &payload)?,
        revision: row.get("revision"),
        submitted_at: time::from_db(&submitted_at)?,
    })
}

/// Insert or fully replace a submission (last-write-wins)
///
/// Returns the stored row after the write.
pub async fn upsert(
    conn: &mut SqliteConnection,
    meeting_id: Uuid,
    participant_id: Uuid,
    payload: &PhasePayload,
    at: &DateTime<Utc>,
) -> Result<StoredSubmission> {
    let data = payload.to_data_json()?;

    let row = sqlx::query(
        r#"
        INSERT INTO submissions (meeting_id, phase, participant_id, payload, revision, submitted_at)
        VALUES (?, ?, ?, ?, 1, ?)
        ON CONFLICT(meeting_id, phase, participant_id) DO UPDATE SET
            revision = CASE WHEN submissions.payload = excluded.payload
                            THEN submissions.revision ELSE submissions.revision + 1 END,
            submitted_at = CASE WHEN submissions.payload = excluded.payload
                                THEN submissions.submitted_at ELSE excluded.submitted_at END,
            payload = excluded.payload
        RETURNING meeting_id, phase, participant_id, payload, revision, submitted_at
        "#,
    )
    .bind(meeting_id.to_string())
    .bind(payload.phase().as_str())
    .bind(participant_id.to_string())
    .bind(&data)
    .bind(time::to_db(at))
    .fetch_one(conn)
    .await?;

    submission_from_row(&row)
}

pub async fn get(
    conn: &mut SqliteConnection,
    meeting_id: Uuid,
    phase: Phase,
    participant_id: Uuid,
) -> Result<Option<StoredSubmission>> {
    let row = sqlx::query(
        r#"
        SELECT meeting_id, phase, participant_id, payload, revision, submitted_at
        FROM submissions
        WHERE meeting_id = ? AND phase = ? AND participant_id = ?
        "#,
    )
    .bind(meeting_id.to_string())
    .bind(phase.as_str())
    .bind(participant_id.to_string())
    .fetch_optional(conn)
    .await?;

    row.as_ref().map(submission_from_row).transpose()
}

/// Every submission of one phase, in roster order
pub async fn list_for_phase(
    conn: &mut SqliteConnection,
    meeting_id: Uuid,
    phase: Phase,
) -> Result<Vec<StoredSubmission>> {
    let rows = sqlx::query(
        r#"
        SELECT s.meeting_id, s.phase, s.participant_id, s.payload, s.revision, s.submitted_at
        FROM submissions s
        LEFT JOIN meeting_participants p
               ON p.meeting_id = s.meeting_id AND p.user_id = s.participant_id
        WHERE s.meeting_id = ? AND s.phase = ?
        ORDER BY p.position
        "#,
    )
    .bind(meeting_id.to_string())
    .bind(phase.as_str())
    .fetch_all(conn)
    .await?;

    rows.iter().map(submission_from_row).collect()
}

/// Participants with a submission for `phase`, in roster order
pub async fn submitted_participant_ids(
    conn: &mut SqliteConnection,
    meeting_id: Uuid,
    phase: Phase,
) -> Result<Vec<Uuid>> {
    let ids: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT s.participant_id
        FROM submissions s
        JOIN meeting_participants p
          ON p.meeting_id = s.meeting_id AND p.user_id = s.participant_id
        WHERE s.meeting_id = ? AND s.phase = ?
        ORDER BY p.position
        "#,
    )
    .bind(meeting_id.to_string())
    .bind(phase.as_str())
    .fetch_all(conn)
    .await?;

    ids.iter().map(|id| parse_uuid(id)).collect()
}
