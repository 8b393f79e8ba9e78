//! Meeting, roster and phase endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use mqe_common::events::ParticipantInfo;
use mqe_common::{time, Phase};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::models::{Meeting, MeetingDetail, NewMeeting, PhaseTransition};
use crate::services::SessionContext;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AddParticipantRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ChangePhaseRequest {
    pub phase: Phase,
}

#[derive(Debug, Serialize)]
pub struct PhaseResponse {
    pub meeting_id: Uuid,
    pub current_phase: Phase,
}

/// POST /api/meetings
pub async fn create_meeting(
    State(state): State<AppState>,
    ctx: SessionContext,
    Json(request): Json<NewMeeting>,
) -> ApiResult<(StatusCode, Json<MeetingDetail>)> {
    let detail = state.engine.create_meeting(&ctx, request).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// GET /api/meetings
pub async fn list_meetings(
    State(state): State<AppState>,
    ctx: SessionContext,
) -> ApiResult<Json<Vec<Meeting>>> {
    Ok(Json(state.engine.list_meetings(&ctx).await?))
}

/// GET /api/meetings/:id
pub async fn get_meeting(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(meeting_id): Path<Uuid>,
) -> ApiResult<Json<MeetingDetail>> {
    Ok(Json(state.engine.get_meeting(&ctx, meeting_id).await?))
}

/// POST /api/meetings/:id/participants
pub async fn add_participant(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(meeting_id): Path<Uuid>,
    Json(request): Json<AddParticipantRequest>,
) -> ApiResult<Json<Vec<ParticipantInfo>>> {
    let roster = state
        .engine
        .add_participant(&ctx, meeting_id, request.user_id)
        .await?;
    Ok(Json(roster))
}

/// POST /api/meetings/:id/presence
pub async fn record_presence(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(meeting_id): Path<Uuid>,
) -> ApiResult<Json<Vec<ParticipantInfo>>> {
    let roster = state
        .engine
        .record_presence(&ctx, meeting_id, time::now())
        .await?;
    Ok(Json(roster))
}

/// POST /api/meetings/:id/advance
pub async fn advance_phase(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(meeting_id): Path<Uuid>,
) -> ApiResult<Json<PhaseResponse>> {
    let current_phase = state.engine.advance_phase(&ctx, meeting_id).await?;
    Ok(Json(PhaseResponse {
        meeting_id,
        current_phase,
    }))
}

/// PUT /api/meetings/:id/phase
pub async fn change_phase(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(meeting_id): Path<Uuid>,
    Json(request): Json<ChangePhaseRequest>,
) -> ApiResult<Json<PhaseResponse>> {
    let current_phase = state
        .engine
        .change_meeting_phase(&ctx, meeting_id, request.phase)
        .await?;
    Ok(Json(PhaseResponse {
        meeting_id,
        current_phase,
    }))
}

/// GET /api/meetings/:id/history
pub async fn phase_history(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(meeting_id): Path<Uuid>,
) -> ApiResult<Json<Vec<PhaseTransition>>> {
    Ok(Json(state.engine.phase_history(&ctx, meeting_id).await?))
}

pub fn meeting_routes() -> Router<AppState> {
    Router::new()
        .route("/api/meetings", get(list_meetings).post(create_meeting))
        .route("/api/meetings/:id", get(get_meeting))
        .route("/api/meetings/:id/participants", post(add_participant))
        .route("/api/meetings/:id/presence", post(record_presence))
        .route("/api/meetings/:id/advance", post(advance_phase))
        .route("/api/meetings/:id/phase", put(change_phase))
        .route("/api/meetings/:id/history", get(phase_history))
}
