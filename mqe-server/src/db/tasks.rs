//! Task database operations
//!
//! Tasks are a projection of task planning submissions: one row per
//! (meeting, author), written in the same transaction as the submission.

use chrono::{DateTime, NaiveDate, Utc};
use mqe_common::{time, Result};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection};
use uuid::Uuid;

use super::parse_uuid;
use crate::models::{Task, TaskPlan};

const TASK_COLUMNS: &str = "guid, meeting_id, author_id, description, common_question, deadline, \
                            expected_contribution, approved, created_at, updated_at";

fn task_from_row(row: &SqliteRow) -> Result<Task> {
    let id: String = row.get("guid");
    let meeting_id: String = row.get("meeting_id");
    let author_id: String = row.get("author_id");
    let deadline: String = row.get("deadline");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Task {
        id: parse_uuid(&id)?,
        meeting_id: parse_uuid(&meeting_id)?,
        author_id: parse_uuid(&author_id)?,
        description: row.get("description"),
        common_question: row.get("common_question"),
        deadline: time::date_from_db(&deadline)?,
        expected_contribution: row.get("expected_contribution"),
        approved: row.get("approved"),
        created_at: time::from_db(&created_at)?,
        updated_at: time::from_db(&updated_at)?,
    })
}

/// Create the author's task, or update its author-mutable fields
///
/// The approval flag is never touched here.
pub async fn upsert_from_plan(
    conn: &mut SqliteConnection,
    meeting_id: Uuid,
    author_id: Uuid,
    plan: &TaskPlan,
    at: &DateTime<Utc>,
) -> Result<Task> {
    let row = sqlx::query(&format!(
        r#"
        INSERT INTO tasks (guid, meeting_id, author_id, description, common_question, deadline,
                           expected_contribution, approved, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?, ?)
        ON CONFLICT(meeting_id, author_id) DO UPDATE SET
            description = excluded.description,
            common_question = excluded.common_question,
            deadline = excluded.deadline,
            expected_contribution = excluded.expected_contribution,
            updated_at = excluded.updated_at
        RETURNING {}
        "#,
        TASK_COLUMNS
    ))
    .bind(Uuid::new_v4().to_string())
    .bind(meeting_id.to_string())
    .bind(author_id.to_string())
    .bind(plan.task_description.trim())
    .bind(&plan.common_question)
    .bind(plan.deadline.to_string())
    .bind(plan.expected_contribution_percentage)
    .bind(time::to_db(at))
    .bind(time::to_db(at))
    .fetch_one(conn)
    .await?;

    task_from_row(&row)
}

pub async fn find_task(conn: &mut SqliteConnection, task_id: Uuid) -> Result<Option<Task>> {
    let row = sqlx::query(&format!("SELECT {} FROM tasks WHERE guid = ?", TASK_COLUMNS))
        .bind(task_id.to_string())
        .fetch_optional(conn)
        .await?;
    row.as_ref().map(task_from_row).transpose()
}

/// The task `author_id` planned in `meeting_id`, if any
pub async fn find_for_author(
    conn: &mut SqliteConnection,
    meeting_id: Uuid,
    author_id: Uuid,
) -> Result<Option<Task>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM tasks WHERE meeting_id = ? AND author_id = ?",
        TASK_COLUMNS
    ))
    .bind(meeting_id.to_string())
    .bind(author_id.to_string())
    .fetch_optional(conn)
    .await?;
    row.as_ref().map(task_from_row).transpose()
}

pub async fn list_for_meeting(conn: &mut SqliteConnection, meeting_id: Uuid) -> Result<Vec<Task>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM tasks WHERE meeting_id = ? ORDER BY created_at, guid",
        TASK_COLUMNS
    ))
    .bind(meeting_id.to_string())
    .fetch_all(conn)
    .await?;
    rows.iter().map(task_from_row).collect()
}

pub async fn list_for_author(conn: &mut SqliteConnection, author_id: Uuid) -> Result<Vec<Task>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM tasks WHERE author_id = ? ORDER BY deadline, created_at",
        TASK_COLUMNS
    ))
    .bind(author_id.to_string())
    .fetch_all(conn)
    .await?;
    rows.iter().map(task_from_row).collect()
}

pub async fn set_approved(
    conn: &mut SqliteConnection,
    task_id: Uuid,
    approved: bool,
    at: &DateTime<Utc>,
) -> Result<()> {
    sqlx::query("UPDATE tasks SET approved = ?, updated_at = ? WHERE guid = ?")
        .bind(approved)
        .bind(time::to_db(at))
        .bind(task_id.to_string())
        .execute(conn)
        .await?;
    Ok(())
}

/// Apply an author edit; `None` fields keep their value
pub async fn update_fields(
    conn: &mut SqliteConnection,
    task_id: Uuid,
    description: Option<&str>,
    deadline: Option<NaiveDate>,
    at: &DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE tasks
        SET description = COALESCE(?, description),
            deadline = COALESCE(?, deadline),
            updated_at = ?
        WHERE guid = ?
        "#,
    )
    .bind(description)
    .bind(deadline.map(|d| d.to_string()))
    .bind(time::to_db(at))
    .bind(task_id.to_string())
    .execute(conn)
    .await?;
    Ok(())
}
