//! Voting progress, analytics and report endpoints

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use mqe_common::events::ParticipantInfo;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::models::{FinishedMeetingReport, ParticipantStats, TaskEvaluationStats, VotingInfo};
use crate::services::SessionContext;
use crate::AppState;

/// GET /api/meetings/:id/voting
pub async fn voting_info(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(meeting_id): Path<Uuid>,
) -> ApiResult<Json<VotingInfo>> {
    Ok(Json(state.engine.voting_info(&ctx, meeting_id).await?))
}

/// GET /api/meetings/:id/voting/pending
pub async fn pending_voters(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(meeting_id): Path<Uuid>,
) -> ApiResult<Json<Vec<ParticipantInfo>>> {
    Ok(Json(state.engine.pending_voters(&ctx, meeting_id).await?))
}

/// GET /api/meetings/:id/analytics/tasks
pub async fn task_analytics(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(meeting_id): Path<Uuid>,
) -> ApiResult<Json<Vec<TaskEvaluationStats>>> {
    Ok(Json(
        state
            .engine
            .task_evaluation_analytics(&ctx, meeting_id)
            .await?,
    ))
}

/// GET /api/meetings/:id/analytics/participants
pub async fn participant_analytics(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(meeting_id): Path<Uuid>,
) -> ApiResult<Json<Vec<ParticipantStats>>> {
    Ok(Json(state.engine.participant_analytics(&ctx, meeting_id).await?))
}

/// GET /api/meetings/:id/report
pub async fn finished_report(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(meeting_id): Path<Uuid>,
) -> ApiResult<Json<FinishedMeetingReport>> {
    Ok(Json(
        state
            .engine
            .finished_meeting_report(&ctx, meeting_id)
            .await?,
    ))
}

pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/api/meetings/:id/voting", get(voting_info))
        .route("/api/meetings/:id/voting/pending", get(pending_voters))
        .route("/api/meetings/:id/analytics/tasks", get(task_analytics))
        .route(
            "/api/meetings/:id/analytics/participants",
            get(participant_analytics),
        )
        .route("/api/meetings/:id/report", get(finished_report))
}
