//! User database operations

use mqe_common::{time, Result};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection};
use uuid::Uuid;

use super::parse_uuid;
use crate::models::User;

fn user_from_row(row: &SqliteRow) -> Result<User> {
    let id: String = row.get("guid");
    let created_at: String = row.get("created_at");
    Ok(User {
        id: parse_uuid(&id)?,
        username: row.get("username"),
        created_at: time::from_db(&created_at)?,
    })
}

pub async fn insert_user(conn: &mut SqliteConnection, user: &User) -> Result<()> {
    sqlx::query("INSERT INTO users (guid, username, created_at) VALUES (?, ?, ?)")
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(time::to_db(&user.created_at))
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn find_user(conn: &mut SqliteConnection, user_id: Uuid) -> Result<Option<User>> {
    let row = sqlx::query("SELECT guid, username, created_at FROM users WHERE guid = ?")
        .bind(user_id.to_string())
        .fetch_optional(conn)
        .await?;
    row.as_ref().map(user_from_row).transpose()
}

pub async fn find_by_username(conn: &mut SqliteConnection, username: &str) -> Result<Option<User>> {
    let row = sqlx::query("SELECT guid, username, created_at FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(conn)
        .await?;
    row.as_ref().map(user_from_row).transpose()
}

pub async fn list_users(conn: &mut SqliteConnection) -> Result<Vec<User>> {
    let rows = sqlx::query("SELECT guid, username, created_at FROM users ORDER BY username")
        .fetch_all(conn)
        .await?;
    rows.iter().map(user_from_row).collect()
}
