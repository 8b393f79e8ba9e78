//! Submission endpoints

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use mqe_common::Phase;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{PhasePayload, PhaseSubmissionGroup, StoredSubmission, SubmissionReceipt};
use crate::services::SessionContext;
use crate::AppState;

/// POST /api/meetings/:id/submissions
///
/// Body: `{"phase": "<phase>", "data": {...}}`
pub async fn submit_phase_data(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(meeting_id): Path<Uuid>,
    Json(payload): Json<PhasePayload>,
) -> ApiResult<Json<SubmissionReceipt>> {
    let receipt = state
        .engine
        .submit_phase_data(&ctx, meeting_id, payload)
        .await?;
    Ok(Json(receipt))
}

/// GET /api/meetings/:id/submissions
pub async fn phase_submissions(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(meeting_id): Path<Uuid>,
) -> ApiResult<Json<Vec<PhaseSubmissionGroup>>> {
    Ok(Json(state.engine.phase_submissions(&ctx, meeting_id).await?))
}

/// GET /api/meetings/:id/submissions/:phase
pub async fn own_submission(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path((meeting_id, phase)): Path<(Uuid, String)>,
) -> ApiResult<Json<StoredSubmission>> {
    let phase: Phase = phase
        .parse()
        .map_err(|e: mqe_common::Error| ApiError::BadRequest(e.to_string()))?;
    Ok(Json(
        state
            .engine
            .get_own_submission(&ctx, meeting_id, phase)
            .await?,
    ))
}

pub fn submission_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/meetings/:id/submissions",
            get(phase_submissions).post(submit_phase_data),
        )
        .route("/api/meetings/:id/submissions/:phase", get(own_submission))
}
