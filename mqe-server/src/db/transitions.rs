//! Phase history (append-only)

use mqe_common::{time, Result};
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use super::{parse_phase, parse_uuid};
use crate::models::PhaseTransition;

pub async fn record_transition(conn: &mut SqliteConnection, transition: &PhaseTransition) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO phase_transitions (meeting_id, from_phase, to_phase, actor_id, transitioned_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(transition.meeting_id.to_string())
    .bind(transition.from_phase.as_str())
    .bind(transition.to_phase.as_str())
    .bind(transition.actor_id.to_string())
    .bind(time::to_db(&transition.transitioned_at))
    .execute(conn)
    .await?;
    Ok(())
}

/// Transitions of one meeting in the order they happened
pub async fn list_transitions(
    conn: &mut SqliteConnection,
    meeting_id: Uuid,
) -> Result<Vec<PhaseTransition>> {
    let rows = sqlx::query(
        r#"
        SELECT meeting_id, from_phase, to_phase, actor_id, transitioned_at
        FROM phase_transitions
        WHERE meeting_id = ?
        ORDER BY id
        "#,
    )
    .bind(meeting_id.to_string())
    .fetch_all(conn)
    .await?;

    rows.iter()
        .map(|row| {
            let meeting_id: String = row.get("meeting_id");
            let from_phase: String = row.get("from_phase");
            let to_phase: String = row.get("to_phase");
            let actor_id: String = row.get("actor_id");
            let transitioned_at: String = row.get("transitioned_at");
            Ok(PhaseTransition {
                meeting_id: parse_uuid(&meeting_id)?,
                from_phase: parse_phase(&from_phase)?,
                to_phase: parse_phase(&to_phase)?,
                actor_id: parse_uuid(&actor_id)?,
                transitioned_at: time::from_db(&transitioned_at)?,
            })
        })
        .collect()
}
