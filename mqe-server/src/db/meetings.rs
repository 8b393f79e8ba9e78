//! Meeting database operations

use chrono::{DateTime, Utc};
use mqe_common::{time, Phase, Result};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection};
use uuid::Uuid;

use super::{parse_phase, parse_uuid};
use crate::models::Meeting;

pub async fn insert_meeting(conn: &mut SqliteConnection, meeting: &Meeting) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO meetings (guid, title, question, creator_id, current_phase,
                              created_at, updated_at, finished_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(meeting.id.to_string())
    .bind(&meeting.title)
    .bind(&meeting.question)
    .bind(meeting.creator_id.to_string())
    .bind(meeting.current_phase.as_str())
    .bind(time::to_db(&meeting.created_at))
    .bind(time::to_db(&meeting.updated_at))
    .bind(meeting.finished_at.as_ref().map(time::to_db))
    .execute(conn)
    .await?;
    Ok(())
}

async fn meeting_from_row(conn: &mut SqliteConnection, row: &SqliteRow) -> Result<Meeting> {
    let id: String = row.get("guid");
    let id = parse_uuid(&id)?;
    let creator_id: String = row.get("creator_id");
    let current_phase: String = row.get("current_phase");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");
    let finished_at: Option<String> = row.get("finished_at");

    Ok(Meeting {
        id,
        title: row.get("title"),
        question: row.get("question"),
        creator_id: parse_uuid(&creator_id)?,
        participant_ids: participant_ids(conn, id).await?,
        current_phase: parse_phase(&current_phase)?,
        created_at: time::from_db(&created_at)?,
        updated_at: time::from_db(&updated_at)?,
        finished_at: time::from_db_opt(finished_at)?,
    })
}

/// Participant ids in roster order
pub async fn participant_ids(conn: &mut SqliteConnection, meeting_id: Uuid) -> Result<Vec<Uuid>> {
    let ids: Vec<String> = sqlx::query_scalar(
        "SELECT user_id FROM meeting_participants WHERE meeting_id = ? ORDER BY position",
    )
    .bind(meeting_id.to_string())
    .fetch_all(conn)
    .await?;
    ids.iter().map(|id| parse_uuid(id)).collect()
}

pub async fn load_meeting(conn: &mut SqliteConnection, meeting_id: Uuid) -> Result<Option<Meeting>> {
    let row = sqlx::query(
        r#"
        SELECT guid, title, question, creator_id, current_phase,
               created_at, updated_at, finished_at
        FROM meetings
        WHERE guid = ?
        "#,
    )
    .bind(meeting_id.to_string())
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => Ok(Some(meeting_from_row(conn, &row).await?)),
        None => Ok(None),
    }
}

/// Meetings the user participates in, newest first
pub async fn list_for_user(conn: &mut SqliteConnection, user_id: Uuid) -> Result<Vec<Meeting>> {
    let rows = sqlx::query(
        r#"
        SELECT m.guid, m.title, m.question, m.creator_id, m.current_phase,
               m.created_at, m.updated_at, m.finished_at
        FROM meetings m
        JOIN meeting_participants p ON p.meeting_id = m.guid
        WHERE p.user_id = ?
        ORDER BY m.created_at DESC
        "#,
    )
    .bind(user_id.to_string())
    .fetch_all(&mut *conn)
    .await?;

    let mut meetings = Vec::with_capacity(rows.len());
    for row in &rows {
        meetings.push(meeting_from_row(conn, row).await?);
    }
    Ok(meetings)
}

/// Store a new authoritative phase
///
/// `finished_at` is stamped when the terminal phase is entered.
pub async fn update_phase(
    conn: &mut SqliteConnection,
    meeting_id: Uuid,
    phase: Phase,
    at: &DateTime<Utc>,
) -> Result<()> {
    let finished_at = phase.is_terminal().then(|| time::to_db(at));
    sqlx::query(
        r#"
        UPDATE meetings
        SET current_phase = ?, updated_at = ?, finished_at = COALESCE(?, finished_at)
        WHERE guid = ?
        "#,
    )
    .bind(phase.as_str())
    .bind(time::to_db(at))
    .bind(finished_at)
    .bind(meeting_id.to_string())
    .execute(conn)
    .await?;
    Ok(())
}

/// Bump `updated_at` after a change to meeting-scoped data
pub async fn touch(conn: &mut SqliteConnection, meeting_id: Uuid, at: &DateTime<Utc>) -> Result<()> {
    sqlx::query("UPDATE meetings SET updated_at = ? WHERE guid = ?")
        .bind(time::to_db(at))
        .bind(meeting_id.to_string())
        .execute(conn)
        .await?;
    Ok(())
}
