//! Database initialization
//!
//! Creates the SQLite database on first run and brings the schema up to date.
//! All `CREATE TABLE` statements are idempotent.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// SQLite busy timeout (milliseconds)
const BUSY_TIMEOUT_MS: u64 = 5000;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    // WAL allows concurrent readers with one writer
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query(&format!("PRAGMA busy_timeout = {}", BUSY_TIMEOUT_MS))
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;
    crate::db::migrations::run_migrations(&pool).await?;

    Ok(pool)
}

/// Create all tables (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_users_table(pool).await?;
    create_meetings_table(pool).await?;
    create_meeting_participants_table(pool).await?;
    create_submissions_table(pool).await?;
    create_tasks_table(pool).await?;
    create_phase_transitions_table(pool).await?;
    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            guid TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_meetings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS meetings (
            guid TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            question TEXT NOT NULL,
            creator_id TEXT NOT NULL REFERENCES users(guid),
            current_phase TEXT NOT NULL DEFAULT 'emotional_evaluation'
                CHECK (current_phase IN ('emotional_evaluation', 'understanding_contribution',
                                         'task_planning', 'task_evaluation', 'finished')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            finished_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_meetings_creator ON meetings(creator_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_meeting_participants_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS meeting_participants (
            meeting_id TEXT NOT NULL REFERENCES meetings(guid),
            user_id TEXT NOT NULL REFERENCES users(guid),
            position INTEGER NOT NULL,
            joined_at TEXT NOT NULL,
            last_seen_at TEXT,
            PRIMARY KEY (meeting_id, user_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_meeting_participants_user ON meeting_participants(user_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Submissions: one row per (meeting, phase, participant); payload is JSON
async fn create_submissions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS submissions (
            meeting_id TEXT NOT NULL REFERENCES meetings(guid),
            phase TEXT NOT NULL,
            participant_id TEXT NOT NULL REFERENCES users(guid),
            payload TEXT NOT NULL,
            revision INTEGER NOT NULL DEFAULT 1,
            submitted_at TEXT NOT NULL,
            PRIMARY KEY (meeting_id, phase, participant_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Tasks: materialized from task_planning submissions, one per (meeting, author)
async fn create_tasks_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tasks (
            guid TEXT PRIMARY KEY,
            meeting_id TEXT NOT NULL REFERENCES meetings(guid),
            author_id TEXT NOT NULL REFERENCES users(guid),
            description TEXT NOT NULL,
            common_question TEXT NOT NULL DEFAULT '',
            deadline TEXT NOT NULL,
            expected_contribution REAL NOT NULL,
            approved INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (meeting_id, author_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tasks_author ON tasks(author_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Append-only phase history
async fn create_phase_transitions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS phase_transitions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            meeting_id TEXT NOT NULL REFERENCES meetings(guid),
            from_phase TEXT NOT NULL,
            to_phase TEXT NOT NULL,
            actor_id TEXT NOT NULL,
            transitioned_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_phase_transitions_meeting ON phase_transitions(meeting_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
