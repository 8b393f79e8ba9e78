//! Meeting roster database operations

use chrono::{DateTime, Utc};
use mqe_common::events::ParticipantInfo;
use mqe_common::{time, Result};
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use super::parse_uuid;

/// Append a user to the roster
///
/// Returns `false` when the user was already a participant.
pub async fn add_participant(
    conn: &mut SqliteConnection,
    meeting_id: Uuid,
    user_id: Uuid,
    joined_at: &DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO meeting_participants (meeting_id, user_id, position, joined_at)
        VALUES (
            ?1, ?2,
            (SELECT COALESCE(MAX(position) + 1, 0) FROM meeting_participants WHERE meeting_id = ?1),
            ?3
        )
        "#,
    )
    .bind(meeting_id.to_string())
    .bind(user_id.to_string())
    .bind(time::to_db(joined_at))
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Update last-seen for a participant
///
/// Returns `false` when the user is not on the roster.
pub async fn touch_presence(
    conn: &mut SqliteConnection,
    meeting_id: Uuid,
    user_id: Uuid,
    at: &DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE meeting_participants SET last_seen_at = ? WHERE meeting_id = ? AND user_id = ?",
    )
    .bind(time::to_db(at))
    .bind(meeting_id.to_string())
    .bind(user_id.to_string())
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Full roster with usernames, in roster order
pub async fn roster(
    conn: &mut SqliteConnection,
    meeting_id: Uuid,
    creator_id: Uuid,
) -> Result<Vec<ParticipantInfo>> {
    let rows = sqlx::query(
        r#"
        SELECT p.user_id, u.username, p.joined_at, p.last_seen_at
        FROM meeting_participants p
        JOIN users u ON u.guid = p.user_id
        WHERE p.meeting_id = ?
        ORDER BY p.position
        "#,
    )
    .bind(meeting_id.to_string())
    .fetch_all(conn)
    .await?;

    rows.iter()
        .map(|row| {
            let user_id: String = row.get("user_id");
            let user_id = parse_uuid(&user_id)?;
            let joined_at: String = row.get("joined_at");
            let last_seen_at: Option<String> = row.get("last_seen_at");
            Ok(ParticipantInfo {
                user_id,
                username: row.get("username"),
                is_creator: user_id == creator_id,
                joined_at: time::from_db(&joined_at)?,
                last_seen_at: time::from_db_opt(last_seen_at)?,
            })
        })
        .collect()
}
