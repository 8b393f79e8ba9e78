//! Task endpoints

use axum::{
    extract::{Path, State},
    routing::{get, patch, post},
    Json, Router,
};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::models::{Task, TaskUpdate};
use crate::services::SessionContext;
use crate::AppState;

/// GET /api/tasks - the caller's tasks across meetings
pub async fn list_tasks(
    State(state): State<AppState>,
    ctx: SessionContext,
) -> ApiResult<Json<Vec<Task>>> {
    Ok(Json(state.engine.tasks_for_author(&ctx).await?))
}

/// PATCH /api/tasks/:id
pub async fn update_task(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(task_id): Path<Uuid>,
    Json(update): Json<TaskUpdate>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.engine.update_task(&ctx, task_id, update).await?))
}

/// POST /api/tasks/:id/approve - toggles approval
pub async fn approve_task(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.engine.approve_task(&ctx, task_id).await?))
}

/// GET /api/meetings/:id/tasks/evaluable
pub async fn evaluable_tasks(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(meeting_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Task>>> {
    Ok(Json(state.engine.evaluable_tasks(&ctx, meeting_id).await?))
}

pub fn task_routes() -> Router<AppState> {
    Router::new()
        .route("/api/tasks", get(list_tasks))
        .route("/api/tasks/:id", patch(update_task))
        .route("/api/tasks/:id/approve", post(approve_task))
        .route("/api/meetings/:id/tasks/evaluable", get(evaluable_tasks))
}
